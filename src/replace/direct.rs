use crate::cache::{Addr, Block};

use super::{AccessResult, Replace};

/// One candidate slot per address. A miss always overwrites it.
#[derive(Debug)]
pub struct DirectMapped {}

impl Replace for DirectMapped {
    fn new(_n_blocks: usize) -> Self {
        DirectMapped {}
    }

    fn access(&mut self, blocks: &mut [Block], addr: Addr) -> AccessResult {
        let block = &mut blocks[addr.index];
        if block.holds(addr.tag) {
            AccessResult::Hit
        } else {
            block.apply(addr);
            AccessResult::Miss
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflicting_tags_evict_each_other() {
        let mut blocks = vec![Block::default(); 2];
        let mut dm = DirectMapped::new(blocks.len());

        let a = Addr { index: 1, tag: 3 };
        let b = Addr { index: 1, tag: 4 };
        assert_eq!(dm.access(&mut blocks, a), AccessResult::Miss);
        assert_eq!(dm.access(&mut blocks, a), AccessResult::Hit);
        assert_eq!(dm.access(&mut blocks, b), AccessResult::Miss);
        assert_eq!(dm.access(&mut blocks, a), AccessResult::Miss);
        assert!(!blocks[0].valid);
    }

    #[test]
    fn zero_tag_misses_on_empty_slot() {
        let mut blocks = vec![Block::default(); 1];
        let mut dm = DirectMapped::new(1);
        let zero = Addr { index: 0, tag: 0 };
        assert_eq!(dm.access(&mut blocks, zero), AccessResult::Miss);
        assert_eq!(dm.access(&mut blocks, zero), AccessResult::Hit);
    }
}
