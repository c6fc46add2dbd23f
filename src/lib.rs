//! Cycle-level timing and admission model of a translation lookaside buffer.
//!
//! The TLB model in [`sim::memory::tlb`] never blocks: all waiting is expressed as events queued
//! on a [`sim::event::Scheduler`], and completed translations are reported to a
//! [`sim::memory::tlb::Datapath`]. [`sim::pipeline`] ties these together to run address traces.

#[macro_use]
extern crate log;

pub mod config;
pub mod error;
pub mod sim;

pub use config::{SimConfig, TlbConfig};
pub use error::{Error, Result};
