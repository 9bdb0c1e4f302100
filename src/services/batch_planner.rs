use crate::domain::models::TestRef;

/// A contiguous slice of the request's tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    /// Position of this batch in the plan, zero-based
    pub index: usize,
    pub tests: Vec<TestRef>,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.tests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tests.is_empty()
    }
}

/// Splits an ordered test list into fixed-size batches.
#[derive(Debug, Clone, Copy)]
pub struct BatchPlanner {
    batch_size: usize,
}

impl BatchPlanner {
    /// A `batch_size` of zero is treated as one.
    pub const fn new(batch_size: usize) -> Self {
        let batch_size = if batch_size == 0 { 1 } else { batch_size };
        Self { batch_size }
    }

    pub const fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Every batch holds `batch_size` tests except possibly the last.
    pub fn plan(&self, tests: &[TestRef]) -> Vec<Batch> {
        tests
            .chunks(self.batch_size)
            .enumerate()
            .map(|(index, chunk)| Batch {
                index,
                tests: chunk.to_vec(),
            })
            .collect()
    }
}

impl Default for BatchPlanner {
    fn default() -> Self {
        Self::new(20)
    }
}
