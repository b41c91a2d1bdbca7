//! Numeric id allocation.

use crate::config::DEFAULT_ID_BASE;
use crate::error::{CoreError, CoreResult};

/// Hands out numeric entity ids.
///
/// Ids are `base + counter` with the counter starting at zero, so they are:
/// - Strictly increasing within one allocator
/// - Large enough to stand apart from hand-written test ids
/// - Not unique across allocators or process restarts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdAllocator {
    base: i64,
    counter: i64,
}

impl IdAllocator {
    /// Creates an allocator starting at `base`.
    #[must_use]
    pub const fn new(base: i64) -> Self {
        Self { base, counter: 0 }
    }

    /// Returns the next id.
    ///
    /// # Errors
    ///
    /// Fails with `InvalidOperation` once `base + counter` would overflow
    /// `i64`. The counter does not advance on failure.
    pub fn next_id(&mut self) -> CoreResult<i64> {
        let id = self.base.checked_add(self.counter).ok_or_else(|| {
            CoreError::invalid_operation(format!(
                "id space exhausted after {} ids from base {}",
                self.counter, self.base
            ))
        })?;
        self.counter += 1;
        Ok(id)
    }

    /// Returns the counter to zero.
    pub fn reset(&mut self) {
        self.counter = 0;
    }

    /// Number of ids handed out since creation or the last reset.
    #[must_use]
    pub const fn issued(&self) -> i64 {
        self.counter
    }

    /// The configured base.
    #[must_use]
    pub const fn base(&self) -> i64 {
        self.base
    }
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new(DEFAULT_ID_BASE)
    }
}
