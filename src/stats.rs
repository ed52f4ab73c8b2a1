use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::{config::CacheConfig, replace::AccessResult};

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("ratio is undefined for a run with zero accesses")]
pub struct DivisionUndefined;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Stats {
    accesses: u64,
    hits: u64,
}

impl Stats {
    pub fn record_access(&mut self) {
        self.accesses += 1;
    }

    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub fn record(&mut self, result: AccessResult) {
        self.record_access();
        if result == AccessResult::Hit {
            self.record_hit();
        }
    }

    pub fn accesses(&self) -> u64 {
        self.accesses
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.accesses.saturating_sub(self.hits)
    }

    pub fn hit_rate(&self) -> Result<f64, DivisionUndefined> {
        self.ratio(self.hits)
    }

    pub fn miss_rate(&self) -> Result<f64, DivisionUndefined> {
        self.ratio(self.misses())
    }

    fn ratio(&self, count: u64) -> Result<f64, DivisionUndefined> {
        if self.accesses == 0 {
            return Err(DivisionUndefined);
        }
        Ok(count as f64 / self.accesses as f64)
    }

    pub fn clear(&mut self) {
        self.accesses = 0;
        self.hits = 0;
    }

    pub fn report(&self, config: &CacheConfig) -> Report {
        Report {
            name: config.label(),
            accesses: self.accesses,
            hits: self.hits,
            misses: self.misses(),
            hit_rate: self.hit_rate().ok(),
            miss_rate: self.miss_rate().ok(),
        }
    }
}

/// End-of-run summary. Undefined ratios are `None` (`null` in JSON).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub name: String,
    pub accesses: u64,
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: Option<f64>,
    pub miss_rate: Option<f64>,
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "\nCache Statistics")?;
        writeln!(f, "-----------------\n")?;
        writeln!(f, "Accesses: {}", self.accesses)?;
        writeln!(f, "Hits:     {}", self.hits)?;
        match self.hit_rate {
            Some(rate) => writeln!(f, "Hit Rate: {rate:.4}"),
            None => writeln!(f, "Hit Rate: undefined"),
        }
    }
}
