//! Power and area estimates from aggregate access counts.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Energy and area characterization of an SRAM structure, as produced by an external
/// characterization tool.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Default)]
pub struct Characterization {
    /// Dynamic energy of one read, in pJ.
    pub read_energy: f64,

    /// Dynamic energy of one write, in pJ.
    pub write_energy: f64,

    /// Leakage power, in mW.
    #[serde(default)]
    pub leakage: f64,

    /// Area, in mm².
    #[serde(default)]
    pub area: f64,
}

/// Average power over a simulated interval, all in mW.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PowerReport {
    pub dynamic: f64,
    pub leakage: f64,
    pub total: f64,
    /// Area in mm², copied from the characterization.
    pub area: f64,
}

impl Characterization {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Characterization> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|err| Error::io(path, err))?;
        let characterization: Characterization = toml::from_str(&text)?;
        debug!(
            target: "Power",
            "loaded characterization from {}: read {} pJ, write {} pJ, leakage {} mW",
            path.display(),
            characterization.read_energy,
            characterization.write_energy,
            characterization.leakage
        );
        Ok(characterization)
    }

    /// Average power of `reads` reads and `writes` writes spread over `cycles` cycles of
    /// `cycle_time` nanoseconds. An empty interval has no dynamic power.
    pub fn average_power(&self, reads: u64, writes: u64, cycles: u64, cycle_time: f64) -> PowerReport {
        let duration = cycles as f64 * cycle_time;
        // pJ / ns = mW
        let dynamic = if duration > 0.0 {
            (reads as f64 * self.read_energy + writes as f64 * self.write_energy) / duration
        } else {
            0.0
        };
        PowerReport { dynamic, leakage: self.leakage, total: dynamic + self.leakage, area: self.area }
    }
}
