pub mod direct;
pub mod fifo;

use crate::cache::{Addr, Block};

/// Hit/miss decision for one region of the store. `blocks` is the region's
/// slice, so `addr.index` and any cursor kept by the policy are region-local.
pub trait Replace: Sized {
    fn new(n_blocks: usize) -> Self;
    fn access(&mut self, blocks: &mut [Block], addr: Addr) -> AccessResult;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessResult {
    Hit,
    Miss,
}
