use std::{fmt, str::FromStr};

use serde::Deserialize;
use thiserror::Error;

use crate::{
    cache::{IsCache, SplitCache, UnifiedCache},
    replace::{direct::DirectMapped, fifo::Fifo},
};

pub const BLOCK_SIZE: u32 = 64;
pub const MIN_CACHE_SIZE: u32 = 128;
pub const MAX_CACHE_SIZE: u32 = 4096;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("unknown cache mapping `{0}` (expected dm or fa)")]
    UnknownMapping(String),
    #[error("unknown cache organization `{0}` (expected uc or sc)")]
    UnknownOrganization(String),
    #[error("cache size {0} is outside 128..=4096")]
    SizeOutOfRange(u32),
    #[error("cache size {0} is not a multiple of the 64 byte block size")]
    NotBlockMultiple(u32),
    #[error("cache size {0} is not a power of two")]
    NotPowerOfTwo(u32),
    #[error("malformed config: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum Mapping {
    #[serde(rename = "dm")]
    DirectMapped,
    #[serde(rename = "fa")]
    FullyAssociative,
}

impl FromStr for Mapping {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "dm" => Ok(Mapping::DirectMapped),
            "fa" => Ok(Mapping::FullyAssociative),
            _ => Err(ConfigError::UnknownMapping(s.to_owned())),
        }
    }
}

impl fmt::Display for Mapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Mapping::DirectMapped => "dm",
            Mapping::FullyAssociative => "fa",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum Organization {
    #[serde(rename = "uc")]
    Unified,
    #[serde(rename = "sc")]
    Split,
}

impl FromStr for Organization {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "uc" => Ok(Organization::Unified),
            "sc" => Ok(Organization::Split),
            _ => Err(ConfigError::UnknownOrganization(s.to_owned())),
        }
    }
}

impl fmt::Display for Organization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Organization::Unified => "uc",
            Organization::Split => "sc",
        })
    }
}

/// Shape of the simulated cache. Fixed for the whole run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct CacheConfig {
    pub size: u32,
    pub mapping: Mapping,
    #[serde(alias = "org")]
    pub organization: Organization,
}

impl CacheConfig {
    pub fn new(
        size: u32,
        mapping: Mapping,
        organization: Organization,
    ) -> Result<Self, ConfigError> {
        let config = CacheConfig {
            size,
            mapping,
            organization,
        };
        config.validate()?;
        Ok(config)
    }

    /// Parses and validates a JSON config such as
    /// `{"size": 1024, "mapping": "dm", "organization": "uc"}`.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: CacheConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(MIN_CACHE_SIZE..=MAX_CACHE_SIZE).contains(&self.size) {
            return Err(ConfigError::SizeOutOfRange(self.size));
        }
        if self.size % BLOCK_SIZE != 0 {
            return Err(ConfigError::NotBlockMultiple(self.size));
        }
        // Index masks are built from n_blocks - 1
        if !self.size.is_power_of_two() {
            return Err(ConfigError::NotPowerOfTwo(self.size));
        }
        Ok(())
    }

    pub fn n_blocks(&self) -> usize {
        (self.size / BLOCK_SIZE) as usize
    }

    /// Slots available to one access kind: the whole store when unified, half of it when split.
    pub fn region_blocks(&self) -> usize {
        match self.organization {
            Organization::Unified => self.n_blocks(),
            Organization::Split => self.n_blocks() / 2,
        }
    }

    pub fn offset_bits(&self) -> u32 {
        BLOCK_SIZE.ilog2()
    }

    /// Sized to one region, so split direct-mapped caches use `log2(n_blocks / 2)` bits.
    pub fn index_bits(&self) -> u32 {
        match self.mapping {
            Mapping::DirectMapped => self.region_blocks().ilog2(),
            Mapping::FullyAssociative => 0,
        }
    }

    pub fn tag_bits(&self) -> u32 {
        32 - self.index_bits() - self.offset_bits()
    }

    pub fn label(&self) -> String {
        format!("{} {} {}", self.size, self.mapping, self.organization)
    }

    pub fn to_cache(self) -> Box<dyn IsCache> {
        match (self.organization, self.mapping) {
            (Organization::Unified, Mapping::DirectMapped) => {
                Box::new(UnifiedCache::<DirectMapped>::new(self)) as Box<dyn IsCache>
            }
            (Organization::Unified, Mapping::FullyAssociative) => {
                Box::new(UnifiedCache::<Fifo>::new(self)) as Box<dyn IsCache>
            }
            (Organization::Split, Mapping::DirectMapped) => {
                Box::new(SplitCache::<DirectMapped>::new(self)) as Box<dyn IsCache>
            }
            (Organization::Split, Mapping::FullyAssociative) => {
                Box::new(SplitCache::<Fifo>::new(self)) as Box<dyn IsCache>
            }
        }
    }
}
