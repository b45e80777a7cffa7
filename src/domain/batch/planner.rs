use super::error::PlanError;
use super::model::{Batch, BatchPlan};
use crate::domain::text::{Chunk, SizeMetric};
use std::num::NonZeroUsize;
use std::ops::Range;

/// Structural levels, coarsest first. A group that does not fit in a fresh batch is broken
/// into groups of the next finer level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Level {
    Page,
    Paragraph,
    Chunk,
}

impl Level {
    fn finer(self) -> Option<Level> {
        match self {
            Level::Page => Some(Level::Paragraph),
            Level::Paragraph => Some(Level::Chunk),
            Level::Chunk => None,
        }
    }

    fn key(self, chunk: &Chunk) -> Option<u32> {
        match self {
            Level::Page => chunk.position.map(|p| p.page),
            Level::Paragraph => chunk.position.map(|p| p.paragraph),
            Level::Chunk => None,
        }
    }
}

/// Groups chunks into batches bounded by a cumulative size budget.
pub struct BatchPlanner {
    max_size: usize,
    metric: SizeMetric,
}

impl BatchPlanner {
    pub fn new(max_size: NonZeroUsize, metric: SizeMetric) -> Self {
        Self {
            max_size: max_size.get(),
            metric,
        }
    }

    pub fn plan(&self, chunks: &[Chunk]) -> Result<BatchPlan, PlanError> {
        for (expected, chunk) in chunks.iter().enumerate() {
            if chunk.index != expected {
                return Err(PlanError::NonContiguousChunks {
                    expected,
                    found: chunk.index,
                });
            }
        }

        let sizes: Vec<usize> = chunks
            .iter()
            .map(|c| self.metric.measure(c.spoken()))
            .collect();
        let mut acc = Accumulator::new(chunks, &sizes, self.max_size);

        for page in groups(chunks, 0..chunks.len(), Level::Page) {
            self.place(&mut acc, Level::Page, page);
        }
        acc.close();

        let batches = acc.batches;
        tracing::debug!(
            chunk_count = chunks.len(),
            batch_count = batches.len(),
            max_size = self.max_size,
            metric = %self.metric,
            "Batch plan created"
        );

        Ok(BatchPlan {
            metric: self.metric,
            max_size: self.max_size,
            total_chunks: chunks.len(),
            batches,
        })
    }

    fn place(&self, acc: &mut Accumulator<'_>, level: Level, range: Range<usize>) {
        let size: usize = acc.sizes[range.clone()].iter().sum();

        if acc.fits(size) {
            acc.extend(range, size);
            return;
        }

        if size <= self.max_size {
            acc.close();
            acc.extend(range, size);
            return;
        }

        match level.finer() {
            Some(finer) => {
                for group in groups(acc.chunks, range, finer) {
                    self.place(acc, finer, group);
                }
            }
            None => {
                // A single chunk larger than the budget stands alone.
                acc.close();
                acc.extend(range, size);
                acc.close();
            }
        }
    }
}

/// Split `range` into maximal runs of chunks sharing the same key at `level`. Chunks without
/// position metadata form runs of one.
fn groups(chunks: &[Chunk], range: Range<usize>, level: Level) -> Vec<Range<usize>> {
    let mut groups = Vec::new();
    let mut start = range.start;

    for i in range.clone() {
        if i == start {
            continue;
        }
        let same = match (level.key(&chunks[i - 1]), level.key(&chunks[i])) {
            (Some(prev), Some(cur)) => prev == cur,
            _ => false,
        };
        if !same {
            groups.push(start..i);
            start = i;
        }
    }
    if start < range.end {
        groups.push(start..range.end);
    }

    groups
}

struct Accumulator<'a> {
    chunks: &'a [Chunk],
    sizes: &'a [usize],
    max_size: usize,
    open: Option<Range<usize>>,
    size: usize,
    batches: Vec<Batch>,
}

impl<'a> Accumulator<'a> {
    fn new(chunks: &'a [Chunk], sizes: &'a [usize], max_size: usize) -> Self {
        Self {
            chunks,
            sizes,
            max_size,
            open: None,
            size: 0,
            batches: Vec::new(),
        }
    }

    fn fits(&self, size: usize) -> bool {
        self.size + size <= self.max_size
    }

    fn extend(&mut self, range: Range<usize>, size: usize) {
        self.open = match self.open.take() {
            Some(open) => Some(open.start..range.end),
            None => Some(range),
        };
        self.size += size;
    }

    fn close(&mut self) {
        let Some(range) = self.open.take() else {
            return;
        };
        let members = &self.chunks[range.clone()];
        self.batches.push(Batch {
            index: self.batches.len() as u32 + 1,
            size: self.size,
            char_count: members.iter().map(|c| c.spoken().chars().count()).sum(),
            first_position: members.first().and_then(|c| c.position),
            last_position: members.last().and_then(|c| c.position),
            chunks: range,
        });
        self.size = 0;
    }
}
