use super::super::power::{Characterization, PowerReport};
use super::{
    new_store, Admission, Datapath, MissCoordinator, MissKind, PerformanceModel, Statistics,
    TlbEvent, TranslationStore,
};
use crate::config::TlbConfig;
use crate::error::Result;
use crate::sim::event::Scheduler;
use std::collections::VecDeque;

/// Timing model of a TLB in front of a memory access pipeline.
///
/// The model never blocks. A request that hits completes `hit_latency` cycles after it is
/// accepted. A request that misses either allocates a page walk, or joins the walk already in
/// flight for the same page, and completes when that walk returns `miss_latency` cycles after
/// allocation. Walks always succeed and install an identity mapping.
///
/// Completions are queued on a [`Scheduler`] as [`TlbEvent`]s and must be fed back through
/// [`TimingTlb::handle_event`] when they fire, in the order the scheduler fires them.
pub struct TimingTlb<R> {
    name: String,
    perf: PerformanceModel,
    page_size: u64,
    perfect: bool,
    bandwidth: usize,
    store: Box<dyn TranslationStore>,
    walks: MissCoordinator<R>,
    hit_queue: VecDeque<R>,
    stats: Statistics,
    // Cycle of the last accepted request and number of requests accepted in that cycle.
    cycle: u64,
    requests_this_cycle: usize,
}

impl<R> TimingTlb<R> {
    pub fn new(name: impl Into<String>, config: &TlbConfig) -> Result<Self> {
        let store = new_store(config)?;
        Ok(Self {
            name: name.into(),
            perf: config.into(),
            page_size: config.page_size,
            perfect: config.is_perfect(),
            bandwidth: config.bandwidth,
            store,
            walks: MissCoordinator::new(config.max_walks),
            hit_queue: VecDeque::new(),
            stats: Statistics::new(),
            cycle: 0,
            requests_this_cycle: 0,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn performance_model(&self) -> PerformanceModel {
        self.perf
    }

    pub fn page_size(&self) -> u64 {
        self.page_size
    }

    pub fn is_perfect(&self) -> bool {
        self.perfect
    }

    pub fn stats(&self) -> &Statistics {
        &self.stats
    }

    /// Reset all statistics
    pub fn reset_stats(&mut self) {
        self.stats.clear();
    }

    pub fn store(&self) -> &dyn TranslationStore {
        &*self.store
    }

    pub fn walks(&self) -> &MissCoordinator<R> {
        &self.walks
    }

    /// Number of hits waiting for their completion.
    pub fn pending_hits(&self) -> usize {
        self.hit_queue.len()
    }

    /// Whether anything is still waiting for a completion event.
    pub fn is_idle(&self) -> bool {
        self.hit_queue.is_empty() && self.walks.outstanding() == 0
    }

    /// Split a virtual address into its page (with the offset masked off) and in-page offset.
    pub fn split(&self, vaddr: u64) -> (u64, u64) {
        let offset = vaddr % self.page_size;
        (vaddr - offset, offset)
    }

    fn requests_in(&self, now: u64) -> usize {
        if now == self.cycle {
            self.requests_this_cycle
        } else {
            0
        }
    }

    /// Check whether a new request can be issued at cycle `now`.
    ///
    /// This requires both spare bandwidth in this cycle and a free miss handling entry. A
    /// request that passes can still be rejected by [`translate`](Self::translate) if it misses
    /// on a page with no walk in flight while all walks are busy.
    pub fn can_accept(&self, now: u64) -> bool {
        let max_walks = self.walks.max_walks();
        (self.bandwidth == 0 || self.requests_in(now) < self.bandwidth)
            && (max_walks == 0 || self.walks.occupied() < max_walks)
    }

    fn count_request(&mut self, now: u64) {
        if now != self.cycle {
            self.cycle = now;
            self.requests_this_cycle = 0;
        }
        self.requests_this_cycle += 1;
    }

    /// Present a translation request for `vaddr`.
    ///
    /// On [`Admission::Rejected`] the only change is the read counter (and the rejection
    /// counter), so the same request can be presented again in a later cycle.
    pub fn translate<S>(&mut self, sched: &mut S, vaddr: u64, request: R) -> Admission<R>
    where
        S: Scheduler<TlbEvent> + ?Sized,
    {
        let now = sched.now();
        let (vpn, offset) = self.split(vaddr);
        trace!(target: "Tlb", "{}: translating vaddr {:#x}", self.name, vaddr);

        // Both hits and misses perform a read.
        self.stats.reads += 1;

        let hit = if self.perfect { Some(vpn) } else { self.store.lookup(vpn, now, true) };
        if let Some(ppn) = hit {
            trace!(target: "Tlb", "{}: hit, paddr {:#x}", self.name, ppn + offset);
            self.stats.hits += 1;
            self.count_request(now);
            self.hit_queue.push_back(request);
            sched.schedule_after(self.perf.hit_latency, TlbEvent::HitReturn);
            return Admission::Accepted;
        }

        match self.walks.register(vpn, request) {
            Err(request) => {
                trace!(
                    target: "Tlb",
                    "{}: miss for vaddr {:#x}, all {} walks busy",
                    self.name,
                    vaddr,
                    self.walks.outstanding()
                );
                self.stats.rejections += 1;
                Admission::Rejected(request)
            }
            Ok(kind) => {
                match kind {
                    MissKind::NewWalk => {
                        trace!(
                            target: "Tlb",
                            "{}: allocated walk for vaddr {:#x}, page {:#x}",
                            self.name,
                            vaddr,
                            vpn
                        );
                        sched.schedule_after(self.perf.miss_latency, TlbEvent::WalkReturn);
                    }
                    MissKind::Coalesced => {
                        trace!(target: "Tlb", "{}: collapsed into walk for page {:#x}", self.name, vpn);
                        self.stats.coalesced += 1;
                    }
                }
                self.stats.misses += 1;
                self.count_request(now);
                Admission::Accepted
            }
        }
    }

    /// Deliver a completion event previously queued by this TLB.
    ///
    /// # Panics
    /// Panics if there is nothing for the event to complete, which means the event was not
    /// queued by this TLB or the scheduler reordered events.
    pub fn handle_event<D>(&mut self, event: TlbEvent, now: u64, datapath: &mut D)
    where
        D: Datapath<R> + ?Sized,
    {
        match event {
            TlbEvent::HitReturn => {
                let request = match self.hit_queue.pop_front() {
                    Some(request) => request,
                    None => panic!("{}: hit completion with empty hit queue", self.name),
                };
                datapath.hit_completed(request);
            }
            TlbEvent::WalkReturn => {
                let (vpn, waiting) = self.walks.complete();
                trace!(
                    target: "Tlb",
                    "{}: walk for page {:#x} returned, {} waiting",
                    self.name,
                    vpn,
                    waiting.len()
                );
                // Page tables are not modelled; for now, vpn == ppn.
                self.insert(vpn, vpn, now);
                for request in waiting {
                    datapath.miss_completed(request, true);
                }
                self.stats.updates += 1;
            }
        }
    }

    /// Install a translation directly.
    pub fn insert(&mut self, vpn: u64, ppn: u64, now: u64) {
        if self.store.insert(vpn, ppn, now).is_some() {
            self.stats.evictions += 1;
        }
    }

    /// Flush this TLB. `None` means a wildcard match. Walks in flight are not affected and will
    /// still install their translation when they return.
    pub fn flush(&mut self, vaddr: Option<u64>) {
        let vpn = vaddr.map(|vaddr| self.split(vaddr).0);
        let num_flush = self.store.flush(vpn);
        self.stats.flushes += num_flush as u64;
    }

    /// Average power over a run of `cycles` cycles of `cycle_time` nanoseconds each.
    pub fn average_power(
        &self,
        characterization: &Characterization,
        cycles: u64,
        cycle_time: f64,
    ) -> PowerReport {
        characterization.average_power(self.stats.reads, self.stats.updates, cycles, cycle_time)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::event::EventLoop;

    #[derive(Default)]
    struct Recorder {
        hits: Vec<(u32, u64)>,
        misses: Vec<(u32, u64, bool)>,
        cycle: u64,
    }

    impl Datapath<u32> for Recorder {
        fn hit_completed(&mut self, request: u32) {
            self.hits.push((request, self.cycle));
        }

        fn miss_completed(&mut self, request: u32, success: bool) {
            self.misses.push((request, self.cycle, success));
        }
    }

    fn config(entries: usize, assoc: usize, max_walks: usize, bandwidth: usize) -> TlbConfig {
        TlbConfig {
            entries,
            assoc,
            page_size: 4096,
            hit_latency: 1,
            miss_latency: 10,
            max_walks,
            bandwidth,
            ..Default::default()
        }
    }

    /// Advance to `cycle`, firing every event due on the way.
    fn run_to(
        tlb: &mut TimingTlb<u32>,
        events: &mut EventLoop<TlbEvent>,
        recorder: &mut Recorder,
        cycle: u64,
    ) {
        while let Some(next) = events.next_event() {
            if next > cycle {
                break;
            }
            events.advance_to(next);
            recorder.cycle = next;
            while let Some(event) = events.next_due() {
                tlb.handle_event(event, next, recorder);
            }
        }
        events.advance_to(cycle);
        recorder.cycle = cycle;
    }

    #[test]
    fn test_miss_then_hit() {
        let mut tlb = TimingTlb::new("tlb", &config(4, 1, 2, 0)).unwrap();
        let mut events = EventLoop::<TlbEvent>::new();
        let mut recorder = Recorder::default();

        assert!(tlb.translate(&mut events, 0x1234, 0).is_accepted());
        run_to(&mut tlb, &mut events, &mut recorder, 10);
        assert_eq!(recorder.misses, vec![(0, 10, true)]);
        assert!(tlb.store().contains(0x1000));

        assert!(tlb.translate(&mut events, 0x1ff8, 1).is_accepted());
        run_to(&mut tlb, &mut events, &mut recorder, 11);
        assert_eq!(recorder.hits, vec![(1, 11)]);

        let stats = tlb.stats();
        assert_eq!((stats.reads, stats.hits, stats.misses, stats.updates), (2, 1, 1, 1));
        assert!(tlb.is_idle());
    }

    #[test]
    fn test_hits_complete_in_order() {
        let mut tlb = TimingTlb::new("tlb", &config(0, 1, 0, 0)).unwrap();
        let mut events = EventLoop::<TlbEvent>::new();
        let mut recorder = Recorder::default();

        for i in 0..8 {
            assert!(tlb.translate(&mut events, u64::from(i) * 0x10000, i).is_accepted());
        }
        assert_eq!(tlb.pending_hits(), 8);
        run_to(&mut tlb, &mut events, &mut recorder, 1);
        assert_eq!(recorder.hits, (0..8).map(|i| (i, 1)).collect::<Vec<_>>());
        assert_eq!(tlb.stats().hits, tlb.stats().reads);
        assert_eq!(tlb.stats().misses, 0);
    }

    #[test]
    fn test_unbounded_store_without_perfect_flag_misses_once() {
        let mut cfg = config(0, 1, 0, 0);
        cfg.perfect = Some(false);
        let mut tlb = TimingTlb::new("tlb", &cfg).unwrap();
        let mut events = EventLoop::<TlbEvent>::new();
        let mut recorder = Recorder::default();

        for i in 0..3 {
            assert!(tlb.translate(&mut events, 0x5000, i).is_accepted());
        }
        run_to(&mut tlb, &mut events, &mut recorder, 10);
        assert!(tlb.translate(&mut events, 0x5008, 3).is_accepted());
        run_to(&mut tlb, &mut events, &mut recorder, 11);

        assert_eq!(recorder.misses.len(), 3);
        assert_eq!(recorder.hits, vec![(3, 11)]);
        assert_eq!(tlb.stats().coalesced, 2);
        assert_eq!(tlb.stats().updates, 1);
    }

    #[test]
    fn test_bandwidth_limits_requests_per_cycle() {
        let mut tlb = TimingTlb::new("tlb", &config(0, 1, 0, 2)).unwrap();
        let mut events = EventLoop::<TlbEvent>::new();

        assert!(tlb.can_accept(0));
        assert!(tlb.translate(&mut events, 0, 0).is_accepted());
        assert!(tlb.can_accept(0));
        assert!(tlb.translate(&mut events, 0, 1).is_accepted());
        assert!(!tlb.can_accept(0));

        // The count starts over in the next cycle.
        events.advance_to(1);
        assert!(tlb.can_accept(1));
    }

    #[test]
    fn test_can_accept_tracks_occupied_miss_entries() {
        let mut tlb = TimingTlb::new("tlb", &config(4, 1, 1, 0)).unwrap();
        let mut events = EventLoop::<TlbEvent>::new();
        let mut recorder = Recorder::default();

        assert!(tlb.can_accept(0));
        assert!(tlb.translate(&mut events, 0x3000, 0).is_accepted());
        assert!(!tlb.can_accept(0));

        run_to(&mut tlb, &mut events, &mut recorder, 10);
        assert!(tlb.can_accept(10));
    }

    #[test]
    fn test_rejection_changes_only_reads() {
        let mut tlb = TimingTlb::new("tlb", &config(4, 1, 1, 0)).unwrap();
        let mut events = EventLoop::<TlbEvent>::new();

        assert!(tlb.translate(&mut events, 0x0000, 0).is_accepted());
        let before = *tlb.stats();
        let pending = events.len();

        assert_eq!(tlb.translate(&mut events, 0x1000, 1), Admission::Rejected(1));
        let after = *tlb.stats();
        assert_eq!(after.reads, before.reads + 1);
        assert_eq!(after.rejections, before.rejections + 1);
        assert_eq!((after.hits, after.misses), (before.hits, before.misses));
        assert_eq!(events.len(), pending);
        assert_eq!(tlb.walks().outstanding(), 1);
        assert!(!tlb.walks().is_walking(0x1000));
    }

    #[test]
    fn test_walk_return_counts_evictions() {
        let mut tlb = TimingTlb::new("tlb", &config(1, 1, 0, 0)).unwrap();
        let mut events = EventLoop::<TlbEvent>::new();
        let mut recorder = Recorder::default();

        assert!(tlb.translate(&mut events, 0x0000, 0).is_accepted());
        assert!(tlb.translate(&mut events, 0x1000, 1).is_accepted());
        run_to(&mut tlb, &mut events, &mut recorder, 10);

        assert_eq!(recorder.misses, vec![(0, 10, true), (1, 10, true)]);
        assert_eq!(tlb.stats().evictions, 1);
        assert!(tlb.store().contains(0x1000));
        assert!(!tlb.store().contains(0x0000));
    }

    #[test]
    fn test_flush_forces_miss() {
        let mut tlb = TimingTlb::new("tlb", &config(4, 1, 0, 0)).unwrap();
        let mut events = EventLoop::<TlbEvent>::new();
        let mut recorder = Recorder::default();

        tlb.insert(0x2000, 0x2000, 0);
        tlb.flush(Some(0x2abc));
        assert_eq!(tlb.stats().flushes, 1);
        assert!(tlb.translate(&mut events, 0x2000, 0).is_accepted());
        run_to(&mut tlb, &mut events, &mut recorder, 10);
        assert_eq!(tlb.stats().misses, 1);
        assert_eq!(recorder.misses.len(), 1);
    }

    #[test]
    #[should_panic]
    fn test_spurious_hit_completion_panics() {
        let mut tlb = TimingTlb::<u32>::new("tlb", &config(4, 1, 0, 0)).unwrap();
        tlb.handle_event(TlbEvent::HitReturn, 0, &mut Recorder::default());
    }
}
