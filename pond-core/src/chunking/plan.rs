use std::collections::BTreeSet;

/// Byte range of one chunk inside the source payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkRange {
    pub index: u64,
    pub offset: u64,
    pub len: u64,
}

/// How a payload is split for transfer and which pieces the server has acked.
///
/// Acks merge by set union, so delivery order and duplicates never change the
/// outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkPlan {
    size: u64,
    chunk_size: u64,
    total: u64,
    acked: BTreeSet<u64>,
}

impl ChunkPlan {
    /// An empty payload still travels as one (empty) chunk.
    pub fn for_size(size: u64, chunk_size: u64) -> Self {
        let chunk_size = chunk_size.max(1);
        let total = size.div_ceil(chunk_size).max(1);
        Self {
            size,
            chunk_size,
            total,
            acked: BTreeSet::new(),
        }
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn chunk_size(&self) -> u64 {
        self.chunk_size
    }

    pub fn total_chunks(&self) -> u64 {
        self.total
    }

    pub fn acked_count(&self) -> u64 {
        self.acked.len() as u64
    }

    pub fn acked(&self) -> impl Iterator<Item = u64> + '_ {
        self.acked.iter().copied()
    }

    /// Returns true only when `index` is in range and was not acked before.
    pub fn ack(&mut self, index: u64) -> bool {
        if index >= self.total {
            return false;
        }
        self.acked.insert(index)
    }

    pub fn is_complete(&self) -> bool {
        self.acked_count() == self.total
    }

    pub fn progress(&self) -> f64 {
        (self.acked_count() as f64 / self.total as f64).clamp(0.0, 1.0)
    }

    pub fn range(&self, index: u64) -> Option<ChunkRange> {
        if index >= self.total {
            return None;
        }
        let offset = index * self.chunk_size;
        let len = self.chunk_size.min(self.size.saturating_sub(offset));
        Some(ChunkRange { index, offset, len })
    }

    pub fn ranges(&self) -> impl Iterator<Item = ChunkRange> + '_ {
        (0..self.total).filter_map(|i| self.range(i))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_count_rounds_up() {
        assert_eq!(ChunkPlan::for_size(10, 4).total_chunks(), 3);
        assert_eq!(ChunkPlan::for_size(12, 4).total_chunks(), 3);
        assert_eq!(ChunkPlan::for_size(1, 4).total_chunks(), 1);
        assert_eq!(ChunkPlan::for_size(0, 4).total_chunks(), 1);
    }

    #[test]
    fn last_range_is_short() {
        let plan = ChunkPlan::for_size(10, 4);
        let ranges: Vec<_> = plan.ranges().map(|r| (r.offset, r.len)).collect();
        assert_eq!(ranges, vec![(0, 4), (4, 4), (8, 2)]);
        assert_eq!(plan.range(3), None);
    }

    #[test]
    fn acks_are_idempotent_and_bounded() {
        let mut plan = ChunkPlan::for_size(9, 3);
        assert!(plan.ack(2));
        assert!(!plan.ack(2));
        assert!(!plan.ack(3));
        assert_eq!(plan.acked_count(), 1);
        assert!((plan.progress() - 1.0 / 3.0).abs() < 1e-9);
        assert!(plan.ack(0));
        assert!(plan.ack(1));
        assert!(plan.is_complete());
        assert_eq!(plan.progress(), 1.0);
        assert_eq!(plan.acked().collect::<Vec<_>>(), vec![0, 1, 2]);
    }
}
