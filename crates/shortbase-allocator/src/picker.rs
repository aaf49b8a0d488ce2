use shortbase_core::{ShardId, MAX_SHARD_COUNT};

/// Chooses which shard the next allocation attempt draws from.
pub trait ShardPicker: Send + Sync + 'static {
    /// Returns a shard below `shard_count`. `shard_count` is never zero.
    fn pick(&self, shard_count: u8) -> ShardId;
}

/// Picks shards uniformly at random.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomPicker;

impl ShardPicker for RandomPicker {
    fn pick(&self, shard_count: u8) -> ShardId {
        let shard = rand::random_range(0..shard_count.min(MAX_SHARD_COUNT));
        ShardId::new(shard).expect("random shard is below MAX_SHARD_COUNT")
    }
}

/// Always picks the same shard.
///
/// Useful for pinning allocations in tests and tools.
#[derive(Debug, Clone, Copy)]
pub struct FixedPicker(pub ShardId);

impl ShardPicker for FixedPicker {
    fn pick(&self, _shard_count: u8) -> ShardId {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn random_picker_stays_in_range() {
        let picker = RandomPicker;
        for _ in 0..10_000 {
            assert!(picker.pick(5).get() < 5);
        }
    }

    #[test]
    fn random_picker_reaches_every_shard() {
        let picker = RandomPicker;
        let seen: HashSet<_> = (0..10_000).map(|_| picker.pick(4)).collect();
        assert_eq!(seen.len(), 4);
    }

    #[test]
    fn fixed_picker_ignores_count() {
        let shard = ShardId::new(7).unwrap();
        assert_eq!(FixedPicker(shard).pick(99), shard);
    }
}
