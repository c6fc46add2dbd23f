use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

fn default_entries() -> usize {
    64
}
fn default_assoc() -> usize {
    4
}
fn default_page_size() -> u64 {
    4096
}
fn default_hit_latency() -> u64 {
    1
}
fn default_miss_latency() -> u64 {
    20
}
fn default_max_walks() -> usize {
    4
}
fn default_bandwidth() -> usize {
    1
}
fn default_cycle_time() -> f64 {
    1.0
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TlbConfig {
    /// Number of translation entries. Zero requests an unbounded store, which also makes the
    /// TLB perfect unless `perfect` says otherwise.
    #[serde(default = "default_entries")]
    pub entries: usize,

    /// Number of ways per bucket. The bucket count is `entries / assoc`.
    #[serde(default = "default_assoc")]
    pub assoc: usize,

    /// Page size in bytes.
    #[serde(default = "default_page_size")]
    pub page_size: u64,

    /// Cycles between accepting a hitting request and reporting its completion.
    #[serde(default = "default_hit_latency")]
    pub hit_latency: u64,

    /// Cycles a simulated page walk takes.
    #[serde(default = "default_miss_latency")]
    pub miss_latency: u64,

    /// Maximum number of distinct pages being walked at the same time. 0 means unbounded.
    #[serde(default = "default_max_walks")]
    pub max_walks: usize,

    /// Maximum number of requests accepted per cycle. 0 means unbounded.
    #[serde(default = "default_bandwidth")]
    pub bandwidth: usize,

    /// Whether every lookup should hit. Defaults to `entries == 0`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub perfect: Option<bool>,

    /// Location of the energy/area characterization of this TLB, used for power estimates.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub characterization: Option<PathBuf>,
}

impl Default for TlbConfig {
    fn default() -> Self {
        TlbConfig {
            entries: default_entries(),
            assoc: default_assoc(),
            page_size: default_page_size(),
            hit_latency: default_hit_latency(),
            miss_latency: default_miss_latency(),
            max_walks: default_max_walks(),
            bandwidth: default_bandwidth(),
            perfect: None,
            characterization: None,
        }
    }
}

impl TlbConfig {
    pub fn is_perfect(&self) -> bool {
        self.perfect.unwrap_or(self.entries == 0)
    }

    /// Number of buckets of the set-associative store. Zero for the unbounded store.
    pub fn buckets(&self) -> usize {
        if self.entries == 0 {
            0
        } else {
            self.entries / self.assoc
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.page_size == 0 {
            return Err(Error::InvalidConfig("page size must be nonzero".to_owned()));
        }
        // The unbounded store has no geometry to check.
        if self.entries == 0 {
            return Ok(());
        }
        if self.assoc == 0 {
            return Err(Error::InvalidConfig(format!(
                "associativity must be nonzero for a {}-entry TLB",
                self.entries
            )));
        }
        if self.assoc > self.entries {
            return Err(Error::InvalidConfig(format!(
                "associativity {} exceeds entry count {}",
                self.assoc, self.entries
            )));
        }
        if self.entries % self.assoc != 0 {
            return Err(Error::InvalidConfig(format!(
                "entry count {} is not a multiple of associativity {}",
                self.entries, self.assoc
            )));
        }
        Ok(())
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SimConfig {
    /// Duration of a cycle in nanoseconds. Only used to turn energy into power.
    #[serde(default = "default_cycle_time")]
    pub cycle_time: f64,

    #[serde(default)]
    pub tlb: TlbConfig,
}

impl Default for SimConfig {
    fn default() -> Self {
        SimConfig { cycle_time: default_cycle_time(), tlb: TlbConfig::default() }
    }
}

impl SimConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<SimConfig> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|err| Error::io(path, err))?;
        let mut config: SimConfig = toml::from_str(&text)?;

        // Characterization paths are relative to the config file.
        if let (Some(file), Some(dir)) = (config.tlb.characterization.as_mut(), path.parent()) {
            if file.is_relative() {
                *file = dir.join(&*file);
            }
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.cycle_time > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "cycle time must be positive, got {}",
                self.cycle_time
            )));
        }
        self.tlb.validate()
    }
}
