pub mod health;
pub mod progress;
