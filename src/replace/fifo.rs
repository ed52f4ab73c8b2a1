use crate::cache::{Addr, Block};

use super::{AccessResult, Replace};

/// Fully associative placement. Empty slots fill in ascending order, then
/// victims are picked round-robin starting from slot 0.
#[derive(Debug)]
pub struct Fifo {
    next_victim: usize,
    n_blocks: usize,
}

impl Fifo {
    pub fn next_victim(&self) -> usize {
        self.next_victim
    }
}

impl Replace for Fifo {
    fn new(n_blocks: usize) -> Self {
        Fifo {
            next_victim: 0,
            n_blocks,
        }
    }

    fn access(&mut self, blocks: &mut [Block], addr: Addr) -> AccessResult {
        debug_assert_eq!(blocks.len(), self.n_blocks);

        // Slots never empty out, so valid blocks always form a prefix
        if blocks.iter().any(|b| b.holds(addr.tag)) {
            return AccessResult::Hit;
        }

        if let Some(vacant) = blocks.iter_mut().find(|b| !b.valid) {
            vacant.apply(addr);
        } else {
            blocks[self.next_victim].apply(addr);
            self.next_victim = (self.next_victim + 1) % self.n_blocks;
        }
        AccessResult::Miss
    }
}
