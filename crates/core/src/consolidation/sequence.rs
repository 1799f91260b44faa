//! GLM sequence allocation for buckets created during posting.

use std::collections::VecDeque;

use glb_shared::types::GlmSequence;

use super::error::ConsolidationError;

/// Hands out `glm_sequence` values for new GLM rows.
pub trait GlmSequenceAllocator {
    /// Returns the next unused sequence value.
    ///
    /// # Errors
    ///
    /// Returns `ConsolidationError::SequenceExhausted` if no value is available.
    fn next_glm_sequence(&mut self) -> Result<GlmSequence, ConsolidationError>;
}

/// Values reserved up front from the database sequence.
#[derive(Debug, Clone, Default)]
pub struct ReservedSequences {
    values: VecDeque<GlmSequence>,
}

impl ReservedSequences {
    /// Wraps reserved values; they are handed out in the given order.
    #[must_use]
    pub fn new(values: impl IntoIterator<Item = GlmSequence>) -> Self {
        Self {
            values: values.into_iter().collect(),
        }
    }

    /// Values not handed out yet.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.values.len()
    }
}

impl GlmSequenceAllocator for ReservedSequences {
    fn next_glm_sequence(&mut self) -> Result<GlmSequence, ConsolidationError> {
        self.values
            .pop_front()
            .ok_or(ConsolidationError::SequenceExhausted)
    }
}

/// Counts upward from a starting value. Used for in-memory runs.
#[derive(Debug, Clone, Copy)]
pub struct CountingSequences {
    next: i32,
}

impl CountingSequences {
    /// Starts handing out values at `first`.
    #[must_use]
    pub const fn starting_at(first: i32) -> Self {
        Self { next: first }
    }
}

impl GlmSequenceAllocator for CountingSequences {
    fn next_glm_sequence(&mut self) -> Result<GlmSequence, ConsolidationError> {
        let value = self.next;
        self.next = value
            .checked_add(1)
            .ok_or(ConsolidationError::SequenceExhausted)?;
        Ok(GlmSequence(value))
    }
}

impl<A: GlmSequenceAllocator + ?Sized> GlmSequenceAllocator for &mut A {
    fn next_glm_sequence(&mut self) -> Result<GlmSequence, ConsolidationError> {
        (**self).next_glm_sequence()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reserved_sequences_in_order_then_exhausted() {
        let mut seqs = ReservedSequences::new([GlmSequence(10), GlmSequence(11)]);

        assert_eq!(seqs.next_glm_sequence(), Ok(GlmSequence(10)));
        assert_eq!(seqs.remaining(), 1);
        assert_eq!(seqs.next_glm_sequence(), Ok(GlmSequence(11)));
        assert_eq!(
            seqs.next_glm_sequence(),
            Err(ConsolidationError::SequenceExhausted)
        );
    }

    #[test]
    fn test_counting_sequences() {
        let mut seqs = CountingSequences::starting_at(100);
        assert_eq!(seqs.next_glm_sequence(), Ok(GlmSequence(100)));
        assert_eq!(seqs.next_glm_sequence(), Ok(GlmSequence(101)));
    }
}
