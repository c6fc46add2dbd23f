use crate::config::TlbConfig;
use crate::error::Result;
use std::io::Write;

mod assoc;
mod perfect;
mod timing;
mod walk;

pub use assoc::SetAssocStore;
pub use perfect::PerfectStore;
pub use timing::TimingTlb;
pub use walk::{MissCoordinator, MissKind};

/// Storage of resolved translations.
///
/// `vpn` and `ppn` are page-aligned addresses, i.e. addresses with the in-page offset masked
/// off.
pub trait TranslationStore {
    /// Look up a translation. A found entry has its hit counter incremented and, if `set_mru`,
    /// its recency refreshed to `now`. A miss has no side effects.
    fn lookup(&mut self, vpn: u64, now: u64, set_mru: bool) -> Option<u64>;

    /// Check whether a translation is present without touching it.
    fn contains(&self, vpn: u64) -> bool;

    /// Install a translation. Does nothing if `vpn` is already present. Returns the virtual
    /// page of the entry evicted to make room, if any.
    fn insert(&mut self, vpn: u64, ppn: u64, now: u64) -> Option<u64>;

    /// Remove the translation of `vpn`, or all translations if `None`. Returns the number of
    /// entries removed.
    fn flush(&mut self, vpn: Option<u64>) -> usize;

    /// Number of valid entries.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Maximum number of entries, or `None` if unbounded.
    fn capacity(&self) -> Option<usize>;
}

/// Create the store matching the geometry in `config`.
pub fn new_store(config: &TlbConfig) -> Result<Box<dyn TranslationStore>> {
    config.validate()?;
    let store: Box<dyn TranslationStore> = if config.entries == 0 {
        Box::new(PerfectStore::new())
    } else {
        Box::new(SetAssocStore::new(config.buckets(), config.assoc, config.page_size))
    };
    Ok(store)
}

/// Basic performance statistics gathered from the TLB.
///
/// Every translate call counts as a read. A read is then either a hit, a miss, or rejected
/// because no walk could be allocated, so `hits + misses + rejections == reads`.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
pub struct Statistics {
    pub reads: u64,
    pub hits: u64,
    pub misses: u64,
    /// Translations installed by completed walks.
    pub updates: u64,
    /// Misses folded into a walk already in flight. Included in `misses`.
    pub coalesced: u64,
    pub rejections: u64,
    pub evictions: u64,
    pub flushes: u64,
}

impl Statistics {
    pub const fn new() -> Self {
        Self {
            reads: 0,
            hits: 0,
            misses: 0,
            updates: 0,
            coalesced: 0,
            rejections: 0,
            evictions: 0,
            flushes: 0,
        }
    }

    pub fn clear(&mut self) {
        *self = Self::new();
    }

    pub fn hit_rate(&self) -> f64 {
        let lookups = self.hits + self.misses;
        if lookups == 0 {
            0.0
        } else {
            self.hits as f64 / lookups as f64
        }
    }

    /// Print relevant statistics counter
    pub fn print(&self, writer: &mut dyn Write, prefix: &str) -> std::io::Result<()> {
        writeln!(writer, "{} Reads      {}", prefix, self.reads)?;
        writeln!(writer, "{} Hits       {}", prefix, self.hits)?;
        writeln!(writer, "{} Misses     {}", prefix, self.misses)?;
        writeln!(writer, "{} Coalesced  {}", prefix, self.coalesced)?;
        writeln!(writer, "{} Rejections {}", prefix, self.rejections)?;
        writeln!(writer, "{} Updates    {}", prefix, self.updates)?;
        writeln!(writer, "{} Evictions  {}", prefix, self.evictions)?;
        writeln!(writer, "{} Flushes    {}", prefix, self.flushes)?;
        writeln!(writer, "{} HitRate    {:.4}", prefix, self.hit_rate())?;
        Ok(())
    }
}

/// Basic performance model of a TLB.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PerformanceModel {
    /// `hit_latency` is the number of cycles between accepting a request that hits and
    /// reporting it as complete.
    pub hit_latency: u64,

    /// `miss_latency` is the number of cycles a page walk takes, from allocating the walk
    /// until the translation is installed and all requests waiting on it are completed.
    pub miss_latency: u64,
}

impl From<&TlbConfig> for PerformanceModel {
    fn from(config: &TlbConfig) -> Self {
        PerformanceModel { hit_latency: config.hit_latency, miss_latency: config.miss_latency }
    }
}

/// Completion events the TLB queues on the scheduler.
///
/// The events carry no payload: the requests they complete are found at the head of the hit
/// queue or of the outstanding walk list, which works because all events of one kind share the
/// same latency.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TlbEvent {
    HitReturn,
    WalkReturn,
}

/// The pipeline a TLB reports completed translations to.
pub trait Datapath<R> {
    /// A request that hit in the TLB has completed.
    fn hit_completed(&mut self, request: R);

    /// A request that missed has completed after its page walk.
    fn miss_completed(&mut self, request: R, success: bool);
}

/// Outcome of presenting a request to the TLB.
#[must_use]
#[derive(Debug, PartialEq, Eq)]
pub enum Admission<R> {
    Accepted,
    /// The request could not be taken this cycle. It is handed back so it can be presented
    /// again later; the TLB has not recorded anything about it apart from the read.
    Rejected(R),
}

impl<R> Admission<R> {
    pub fn is_accepted(&self) -> bool {
        match self {
            Admission::Accepted => true,
            Admission::Rejected(_) => false,
        }
    }
}
