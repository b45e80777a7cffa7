pub mod error;
pub mod model;
pub mod planner;

pub use error::PlanError;
pub use model::{Batch, BatchPlan, BatchStatus};
pub use planner::BatchPlanner;
