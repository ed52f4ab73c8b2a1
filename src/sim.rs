use crate::{
    cache::IsCache,
    config::CacheConfig,
    stats::{Report, Stats},
    trace::MemAccess,
};

/// Feeds access batches through one cache, optionally discarding the stats
/// gathered during a warmup prefix.
pub struct Simulator {
    cache: Box<dyn IsCache>,
    processed: u64,
    warmup_left: u64,
    heartbeat_int: u64,
    next_heartbeat: u64,
}

impl Simulator {
    pub fn new(cache: Box<dyn IsCache>, n_warm: u64, heartbeat_int: u64) -> Self {
        Simulator {
            cache,
            processed: 0,
            warmup_left: n_warm,
            heartbeat_int,
            next_heartbeat: heartbeat_int,
        }
    }

    pub fn operate(&mut self, accesses: &[MemAccess]) {
        for &access in accesses {
            self.cache.access(access);
            self.processed += 1;

            if self.warmup_left > 0 {
                self.warmup_left -= 1;
                if self.warmup_left == 0 {
                    self.cache.clear_stats();
                    log::info!("Finished warmup after {} accesses", self.processed);
                }
            }

            if self.heartbeat_int != 0 && self.processed >= self.next_heartbeat {
                log::info!("Accesses: {}", self.processed);
                self.next_heartbeat += self.heartbeat_int;
            }
        }
    }

    pub fn processed(&self) -> u64 {
        self.processed
    }

    pub fn cache(&self) -> &dyn IsCache {
        self.cache.as_ref()
    }

    pub fn report(&self) -> Report {
        self.cache.stats().report(self.cache.config())
    }
}

/// Runs a whole trace through a fresh cache built from `config`.
pub fn simulate<I>(config: CacheConfig, trace: I) -> Stats
where
    I: IntoIterator<Item = MemAccess>,
{
    let mut cache = config.to_cache();
    for access in trace {
        cache.access(access);
    }
    *cache.stats()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Mapping, Organization};

    fn dm_uc_128() -> CacheConfig {
        CacheConfig::new(128, Mapping::DirectMapped, Organization::Unified).unwrap()
    }

    #[test]
    fn warmup_clears_stats_but_keeps_contents() {
        let mut sim = Simulator::new(dm_uc_128().to_cache(), 2, 0);
        sim.operate(&[MemAccess::instr(0x0), MemAccess::instr(0x40)]);
        assert_eq!(sim.cache().stats().accesses(), 0);

        sim.operate(&[MemAccess::instr(0x0), MemAccess::data(0x80)]);
        let stats = sim.cache().stats();
        assert_eq!(stats.accesses(), 2);
        assert_eq!(stats.hits(), 1);
        assert_eq!(sim.processed(), 4);
    }

    #[test]
    fn no_warmup_counts_everything() {
        let mut sim = Simulator::new(dm_uc_128().to_cache(), 0, 1);
        sim.operate(&[MemAccess::data(0x0), MemAccess::data(0x0), MemAccess::data(0x0)]);

        let report = sim.report();
        assert_eq!(report.accesses, 3);
        assert_eq!(report.hits, 2);
        assert_eq!(report.misses, 1);
    }

    #[test]
    fn simulate_folds_trace() {
        let stats = simulate(dm_uc_128(), vec![MemAccess::instr(0x0); 4]);
        assert_eq!(stats.accesses(), 4);
        assert_eq!(stats.hits(), 3);
    }
}
