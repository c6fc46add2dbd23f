use crate::config::SimConfig;
use crate::error::Result;
use crate::sim::event::{EventLoop, Scheduler};
use crate::sim::memory::tlb::{Admission, Datapath, Statistics, TimingTlb, TlbEvent};
use crate::sim::memory::{Characterization, PowerReport};
use std::collections::VecDeque;
use std::fmt;

mod trace;
pub use trace::{parse_line, parse_trace, read_trace, AccessType, TraceEvent};

/// Life of a single request of the trace.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Record {
    pub vaddr: u64,
    /// Cycle the TLB accepted the request.
    pub issued: Option<u64>,
    /// Cycle the translation completed.
    pub completed: Option<u64>,
    pub missed: bool,
    /// Number of times the TLB turned the request away.
    pub retries: u32,
}

impl Record {
    pub fn latency(&self) -> Option<u64> {
        Some(self.completed? - self.issued?)
    }
}

/// A pipeline that does nothing but issue the memory accesses of a trace in order.
///
/// Every cycle it issues as many requests as the TLB admits. A request the TLB rejects stays at
/// the head of the queue and blocks the ones behind it until a later cycle.
pub struct TracePipeline {
    queue: VecDeque<usize>,
    records: Vec<Record>,
    cycle: u64,
    completed: usize,
}

impl TracePipeline {
    pub fn new(addrs: impl IntoIterator<Item = u64>) -> Self {
        let records: Vec<Record> =
            addrs.into_iter().map(|vaddr| Record { vaddr, ..Default::default() }).collect();
        TracePipeline { queue: (0..records.len()).collect(), records, cycle: 0, completed: 0 }
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Whether requests are still waiting to be issued.
    pub fn has_pending(&self) -> bool {
        !self.queue.is_empty()
    }

    /// Whether every request has completed.
    pub fn is_done(&self) -> bool {
        self.completed == self.records.len()
    }

    /// Set the cycle completions are attributed to.
    pub fn set_cycle(&mut self, cycle: u64) {
        self.cycle = cycle;
    }

    /// Issue requests for this cycle. Returns the number issued.
    pub fn issue<S>(&mut self, tlb: &mut TimingTlb<usize>, sched: &mut S) -> usize
    where
        S: Scheduler<TlbEvent> + ?Sized,
    {
        let now = sched.now();
        let mut issued = 0;
        while let Some(&id) = self.queue.front() {
            if !tlb.can_accept(now) {
                break;
            }
            match tlb.translate(sched, self.records[id].vaddr, id) {
                Admission::Accepted => {
                    self.queue.pop_front();
                    self.records[id].issued = Some(now);
                    issued += 1;
                }
                Admission::Rejected(id) => {
                    self.records[id].retries += 1;
                    break;
                }
            }
        }
        issued
    }

    fn complete(&mut self, id: usize, missed: bool) {
        let record = &mut self.records[id];
        assert!(record.completed.is_none(), "request {} completed twice", id);
        record.completed = Some(self.cycle);
        record.missed = missed;
        self.completed += 1;
    }
}

impl Datapath<usize> for TracePipeline {
    fn hit_completed(&mut self, request: usize) {
        self.complete(request, false);
    }

    fn miss_completed(&mut self, request: usize, success: bool) {
        if !success {
            warn!(target: "Pipeline", "translation of request {} failed", request);
        }
        self.complete(request, true);
    }
}

/// Summary of a simulation run.
#[derive(Debug, Clone)]
pub struct Report {
    pub stats: Statistics,
    pub cycles: u64,
    pub requests: usize,
    pub retries: u64,
    pub avg_latency: f64,
    pub max_latency: u64,
    pub power: Option<PowerReport>,
}

impl Report {
    fn new(tlb: &TimingTlb<usize>, pipeline: &TracePipeline, cycles: u64, power: Option<PowerReport>) -> Self {
        let latencies: Vec<u64> = pipeline.records().iter().filter_map(Record::latency).collect();
        let avg_latency = if latencies.is_empty() {
            0.0
        } else {
            latencies.iter().sum::<u64>() as f64 / latencies.len() as f64
        };
        Report {
            stats: *tlb.stats(),
            cycles,
            requests: pipeline.records().len(),
            retries: pipeline.records().iter().map(|record| u64::from(record.retries)).sum(),
            avg_latency,
            max_latency: latencies.iter().copied().max().unwrap_or(0),
            power,
        }
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "CYCLE = {}", self.cycles)?;
        writeln!(f, "REQUESTS = {}", self.requests)?;
        writeln!(f, "RETRIES = {}", self.retries)?;
        writeln!(f, "LATENCY avg {:.2} max {}", self.avg_latency, self.max_latency)?;
        let mut stats = Vec::new();
        self.stats.print(&mut stats, "TLB").map_err(|_| fmt::Error)?;
        write!(f, "{}", String::from_utf8_lossy(&stats))?;
        if let Some(power) = &self.power {
            writeln!(
                f,
                "POWER dynamic {:.4} mW, leakage {:.4} mW, total {:.4} mW, area {:.4} mm2",
                power.dynamic, power.leakage, power.total, power.area
            )?;
        }
        Ok(())
    }
}

/// Run a trace through a TLB configured by `config` until every request has completed.
pub fn run(config: &SimConfig, addrs: impl IntoIterator<Item = u64>) -> Result<Report> {
    config.validate()?;
    let characterization = match &config.tlb.characterization {
        Some(path) => Some(Characterization::from_file(path)?),
        None => None,
    };

    let mut tlb = TimingTlb::new("tlb", &config.tlb)?;
    let mut events = EventLoop::<TlbEvent>::new();
    let mut pipeline = TracePipeline::new(addrs);
    info!(target: "Pipeline", "running {} requests", pipeline.records().len());

    loop {
        let now = events.cycle();
        pipeline.set_cycle(now);
        // Completions of this cycle are seen before new requests are issued.
        events.handle_events(|_, event| tlb.handle_event(event, now, &mut pipeline));
        pipeline.issue(&mut tlb, &mut events);
        // Zero-latency completions of requests issued this cycle.
        events.handle_events(|_, event| tlb.handle_event(event, now, &mut pipeline));

        let next = if pipeline.has_pending() {
            now + 1
        } else {
            match events.next_event() {
                Some(cycle) => cycle,
                None => break,
            }
        };
        events.advance_to(next);
    }
    assert!(pipeline.is_done() && tlb.is_idle());

    let cycles = events.cycle();
    let power = characterization.map(|c| tlb.average_power(&c, cycles, config.cycle_time));
    info!(target: "Pipeline", "finished after {} cycles", cycles);
    Ok(Report::new(&tlb, &pipeline, cycles, power))
}
