use std::iter;

use crate::{
    config::CacheConfig,
    replace::{AccessResult, Replace},
    stats::Stats,
    trace::{AccessKind, MemAccess},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Addr {
    pub index: usize,
    pub tag: u32,
}

#[derive(Debug, Clone, Copy)]
pub struct BitSection {
    shift: u32,
    mask: u32,
}

impl BitSection {
    fn apply(&self, num: u32) -> u32 {
        (num >> self.shift) & self.mask
    }
}

/// Splits raw addresses into index and tag. The block offset is dropped.
#[derive(Debug, Clone, Copy)]
pub struct Decoder {
    index_sec: BitSection,
    tag_sec: BitSection,
}

impl Decoder {
    pub fn new(config: &CacheConfig) -> Self {
        let offset_bits = config.offset_bits();
        let index_bits = config.index_bits();

        let index_sec = BitSection {
            shift: offset_bits,
            mask: (1 << index_bits) - 1,
        };
        let tag_sec = BitSection {
            shift: offset_bits + index_bits,
            mask: u32::MAX,
        };

        Decoder { index_sec, tag_sec }
    }

    pub fn split_addr(&self, addr: u32) -> Addr {
        Addr {
            index: self.index_sec.apply(addr) as usize,
            tag: self.tag_sec.apply(addr),
        }
    }
}

pub fn decode(config: &CacheConfig, access: MemAccess) -> Addr {
    Decoder::new(config).split_addr(access.address)
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Block {
    pub valid: bool,
    pub tag: u32,
}

impl Block {
    pub fn apply(&mut self, addr: Addr) {
        self.valid = true;
        self.tag = addr.tag;
    }

    pub fn holds(&self, tag: u32) -> bool {
        self.valid && self.tag == tag
    }
}

/// Tag slots of the whole cache. Split caches carve it into two halves.
#[derive(Debug, Clone)]
pub struct Store {
    blocks: Vec<Block>,
}

impl Store {
    pub fn allocate(n_blocks: usize) -> Self {
        Store {
            blocks: iter::repeat_with(Block::default).take(n_blocks).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_vacant(&self, i: usize) -> bool {
        !self.blocks[i].valid
    }

    pub fn get(&self, i: usize) -> Option<u32> {
        let block = &self.blocks[i];
        block.valid.then_some(block.tag)
    }

    pub fn set(&mut self, i: usize, tag: u32) {
        self.blocks[i] = Block { valid: true, tag };
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn blocks_mut(&mut self) -> &mut [Block] {
        &mut self.blocks
    }
}

pub trait IsCache {
    fn access(&mut self, access: MemAccess) -> AccessResult;
    fn split_addr(&self, addr: u32) -> Addr;
    fn config(&self) -> &CacheConfig;
    fn store(&self) -> &Store;
    fn stats(&self) -> &Stats;
    fn clear_stats(&mut self);
}

/// Instructions and data compete for every slot.
#[derive(Debug)]
pub struct UnifiedCache<R: Replace> {
    config: CacheConfig,
    decoder: Decoder,
    store: Store,
    repl: R,
    stats: Stats,
}

impl<R: Replace> UnifiedCache<R> {
    pub fn new(config: CacheConfig) -> Self {
        UnifiedCache {
            config,
            decoder: Decoder::new(&config),
            store: Store::allocate(config.n_blocks()),
            repl: R::new(config.region_blocks()),
            stats: Stats::default(),
        }
    }
}

impl<R: Replace> IsCache for UnifiedCache<R> {
    fn access(&mut self, access: MemAccess) -> AccessResult {
        let addr = self.split_addr(access.address);
        let result = self.repl.access(self.store.blocks_mut(), addr);
        self.stats.record(result);
        result
    }

    fn split_addr(&self, addr: u32) -> Addr {
        self.decoder.split_addr(addr)
    }

    fn config(&self) -> &CacheConfig {
        &self.config
    }

    fn store(&self) -> &Store {
        &self.store
    }

    fn stats(&self) -> &Stats {
        &self.stats
    }

    fn clear_stats(&mut self) {
        self.stats.clear();
    }
}

/// Instructions live in the low half of the store, data in the high half.
/// Each half has its own replacement state.
#[derive(Debug)]
pub struct SplitCache<R: Replace> {
    config: CacheConfig,
    decoder: Decoder,
    store: Store,
    instr_repl: R,
    data_repl: R,
    stats: Stats,
}

impl<R: Replace> SplitCache<R> {
    pub fn new(config: CacheConfig) -> Self {
        SplitCache {
            config,
            decoder: Decoder::new(&config),
            store: Store::allocate(config.n_blocks()),
            instr_repl: R::new(config.region_blocks()),
            data_repl: R::new(config.region_blocks()),
            stats: Stats::default(),
        }
    }
}

impl<R: Replace> IsCache for SplitCache<R> {
    fn access(&mut self, access: MemAccess) -> AccessResult {
        let addr = self.split_addr(access.address);
        let half = self.config.region_blocks();
        let (instr, data) = self.store.blocks_mut().split_at_mut(half);
        let result = match access.kind {
            AccessKind::Instruction => self.instr_repl.access(instr, addr),
            AccessKind::Data => self.data_repl.access(data, addr),
        };
        self.stats.record(result);
        result
    }

    fn split_addr(&self, addr: u32) -> Addr {
        self.decoder.split_addr(addr)
    }

    fn config(&self) -> &CacheConfig {
        &self.config
    }

    fn store(&self) -> &Store {
        &self.store
    }

    fn stats(&self) -> &Stats {
        &self.stats
    }

    fn clear_stats(&mut self) {
        self.stats.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Mapping, Organization};

    fn config(size: u32, mapping: Mapping, org: Organization) -> CacheConfig {
        CacheConfig::new(size, mapping, org).unwrap()
    }

    #[test]
    fn direct_mapped_split() {
        let dec = Decoder::new(&config(1024, Mapping::DirectMapped, Organization::Unified));
        // tag 0b101101, index 0b1101, offset 0b000101
        let addr = dec.split_addr(0b1011_0111_0100_0101);
        assert_eq!(addr.index, 0b1101);
        assert_eq!(addr.tag, 0b1011_01);

        let addr = dec.split_addr(u32::MAX);
        assert_eq!(addr.index, 15);
        assert_eq!(addr.tag, u32::MAX >> 10);
    }

    #[test]
    fn direct_mapped_properties() {
        let mut rng = fastrand::Rng::with_seed(0x5eed);
        for size in [128, 256, 512, 1024, 2048, 4096] {
            let cfg = config(size, Mapping::DirectMapped, Organization::Unified);
            let dec = Decoder::new(&cfg);
            let offset_bits = cfg.offset_bits();
            let index_bits = cfg.index_bits();
            for _ in 0..1000 {
                let raw = rng.u32(..);
                let addr = dec.split_addr(raw);
                assert!(addr.index < cfg.n_blocks());
                assert!((addr.tag as u64) < 1u64 << cfg.tag_bits());

                let rebuilt =
                    (((addr.tag as u64) << index_bits) | addr.index as u64) << offset_bits;
                assert_eq!(rebuilt as u32, raw & !(crate::config::BLOCK_SIZE - 1));
            }
        }
    }

    #[test]
    fn fully_associative_has_no_index() {
        let mut rng = fastrand::Rng::with_seed(7);
        for org in [Organization::Unified, Organization::Split] {
            let cfg = config(2048, Mapping::FullyAssociative, org);
            for _ in 0..1000 {
                let raw = rng.u32(..);
                let addr = decode(&cfg, MemAccess::data(raw));
                assert_eq!(addr.index, 0);
                assert_eq!(addr.tag, raw >> 6);
            }
        }
    }

    #[test]
    fn split_index_stays_in_half() {
        let cfg = config(256, Mapping::DirectMapped, Organization::Split);
        let dec = Decoder::new(&cfg);
        for raw in (0..0x1000).step_by(0x40) {
            assert!(dec.split_addr(raw).index < cfg.region_blocks());
        }
        assert_eq!(dec.split_addr(0x40), Addr { index: 1, tag: 0 });
        assert_eq!(dec.split_addr(0x80), Addr { index: 0, tag: 1 });
    }

    #[test]
    fn store_slots() {
        let mut store = Store::allocate(4);
        assert_eq!(store.len(), 4);
        assert!((0..4).all(|i| store.is_vacant(i)));

        store.set(2, 0);
        assert!(!store.is_vacant(2));
        assert_eq!(store.get(2), Some(0));
        assert_eq!(store.get(1), None);
    }

    #[test]
    fn split_cache_uses_high_half_for_data() {
        let cfg = config(256, Mapping::DirectMapped, Organization::Split);
        let mut cache = SplitCache::<crate::replace::direct::DirectMapped>::new(cfg);

        cache.access(MemAccess::data(0x40));
        assert_eq!(cache.store().get(3), Some(0));
        assert!((0..3).all(|i| cache.store().is_vacant(i)));

        cache.access(MemAccess::instr(0x80));
        assert_eq!(cache.store().get(0), Some(1));
    }
}
