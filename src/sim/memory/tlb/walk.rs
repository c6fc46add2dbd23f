use fnv::FnvHashMap;
use std::collections::VecDeque;

/// How a missing request was taken in by the [`MissCoordinator`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MissKind {
    /// A new walk was allocated for the page; the caller must schedule its completion.
    NewWalk,
    /// A walk for the page is already in flight and the request will complete with it.
    Coalesced,
}

/// Bookkeeping of page walks in flight and of the requests waiting on them.
///
/// Walks complete in the order they are allocated, as they all take the same time.
pub struct MissCoordinator<R> {
    /// Maximum number of walks in flight. 0 means unbounded.
    max_walks: usize,
    /// Pages being walked, oldest first.
    walks: VecDeque<u64>,
    /// Requests waiting on each page being walked, in arrival order.
    pending: FnvHashMap<u64, Vec<R>>,
}

impl<R> MissCoordinator<R> {
    pub fn new(max_walks: usize) -> Self {
        Self { max_walks, walks: VecDeque::new(), pending: FnvHashMap::default() }
    }

    pub fn max_walks(&self) -> usize {
        self.max_walks
    }

    /// Number of walks in flight.
    pub fn outstanding(&self) -> usize {
        self.walks.len()
    }

    /// Number of distinct pages with requests waiting on a walk.
    pub fn occupied(&self) -> usize {
        self.pending.len()
    }

    pub fn is_walking(&self, vpn: u64) -> bool {
        self.pending.contains_key(&vpn)
    }

    /// Number of requests waiting on the walk of `vpn`.
    pub fn waiting(&self, vpn: u64) -> usize {
        self.pending.get(&vpn).map_or(0, Vec::len)
    }

    pub fn is_full(&self) -> bool {
        self.max_walks != 0 && self.walks.len() >= self.max_walks
    }

    /// Pages being walked, oldest first.
    pub fn walks(&self) -> impl Iterator<Item = u64> + '_ {
        self.walks.iter().copied()
    }

    /// Register a request that missed on `vpn`.
    ///
    /// If no walk tracks `vpn` and no more walks can be allocated, the request is handed back
    /// and nothing is changed.
    pub fn register(&mut self, vpn: u64, request: R) -> Result<MissKind, R> {
        if let Some(waiting) = self.pending.get_mut(&vpn) {
            waiting.push(request);
            return Ok(MissKind::Coalesced);
        }
        if self.is_full() {
            return Err(request);
        }
        self.walks.push_back(vpn);
        self.pending.insert(vpn, vec![request]);
        Ok(MissKind::NewWalk)
    }

    /// Retire the oldest walk, returning its page and the requests that were waiting on it in
    /// arrival order.
    ///
    /// # Panics
    /// Panics if no walk is in flight. That means a walk completion was delivered that was never
    /// scheduled, or was delivered twice.
    pub fn complete(&mut self) -> (u64, Vec<R>) {
        let vpn = match self.walks.pop_front() {
            Some(vpn) => vpn,
            None => panic!("walk completion with no walk in flight"),
        };
        let waiting = match self.pending.remove(&vpn) {
            Some(waiting) => waiting,
            None => panic!("walk for vpn {:#x} has no waiting requests", vpn),
        };
        (vpn, waiting)
    }
}
