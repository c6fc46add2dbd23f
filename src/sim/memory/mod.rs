pub mod cache_set;
pub mod power;
pub mod tlb;

pub use power::{Characterization, PowerReport};
pub use tlb::TimingTlb;
