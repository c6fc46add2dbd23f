pub mod event;
pub mod memory;
pub mod pipeline;

pub use event::{EventLoop, Scheduler};
pub use memory::TimingTlb;
pub use pipeline::{run, Report, TracePipeline};
