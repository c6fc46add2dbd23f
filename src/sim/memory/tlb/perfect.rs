use super::TranslationStore;
use fnv::FnvHashMap;

/// A translation store without capacity limit. Nothing is ever evicted, so once a page has been
/// installed every later lookup of it hits.
#[derive(Default)]
pub struct PerfectStore {
    entries: FnvHashMap<u64, u64>,
}

impl PerfectStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TranslationStore for PerfectStore {
    fn lookup(&mut self, vpn: u64, _now: u64, _set_mru: bool) -> Option<u64> {
        self.entries.get(&vpn).copied()
    }

    fn contains(&self, vpn: u64) -> bool {
        self.entries.contains_key(&vpn)
    }

    fn insert(&mut self, vpn: u64, ppn: u64, _now: u64) -> Option<u64> {
        self.entries.entry(vpn).or_insert(ppn);
        None
    }

    fn flush(&mut self, vpn: Option<u64>) -> usize {
        match vpn {
            None => {
                let num_flush = self.entries.len();
                self.entries.clear();
                num_flush
            }
            Some(vpn) => self.entries.remove(&vpn).map_or(0, |_| 1),
        }
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn capacity(&self) -> Option<usize> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_never_evicts() {
        let mut store = PerfectStore::new();
        for i in 0..10_000u64 {
            assert_eq!(store.insert(i << 12, i << 12, i), None);
        }
        assert_eq!(store.len(), 10_000);
        assert_eq!(store.lookup(0, 0, true), Some(0));
        assert_eq!(store.lookup(9_999 << 12, 0, true), Some(9_999 << 12));
        assert_eq!(store.lookup(10_000 << 12, 0, true), None);
        assert_eq!(store.capacity(), None);
    }

    #[test]
    fn test_first_insert_wins() {
        let mut store = PerfectStore::new();
        store.insert(0x1000, 0x1000, 0);
        store.insert(0x1000, 0x7000, 1);
        assert_eq!(store.lookup(0x1000, 2, true), Some(0x1000));
        assert_eq!(store.flush(Some(0x1000)), 1);
        assert!(store.is_empty());
    }
}
