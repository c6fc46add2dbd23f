use super::super::cache_set::{CacheSet, Line};
use super::TranslationStore;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Entry {
    vpn: u64,
    ppn: u64,
}

/// A set associative translation store with LRU replacement within each set.
pub struct SetAssocStore {
    sets: Box<[CacheSet<Entry>]>,
    page_size: u64,
}

impl SetAssocStore {
    /// Create a new set associative store of `set * assoc` entries.
    pub fn new(set: usize, assoc: usize, page_size: u64) -> Self {
        assert!(set > 0 && assoc > 0 && page_size > 0);
        let mut sets = Vec::with_capacity(set);
        for _ in 0..set {
            sets.push(CacheSet::new(assoc));
        }
        Self { sets: sets.into_boxed_slice(), page_size }
    }

    /// Find out which set to use for a given page.
    pub fn index(&self, vpn: u64) -> usize {
        ((vpn / self.page_size) % self.sets.len() as u64) as usize
    }

    /// Most recent use and hit count of the entry for `vpn`, if present.
    pub fn line(&self, vpn: u64) -> Option<(u64, u64)> {
        let set = &self.sets[self.index(vpn)];
        let ptr = set.find(|entry| entry.vpn == vpn)?;
        set[ptr].as_ref().map(|line: &Line<Entry>| (line.mru_tick, line.hits))
    }
}

impl TranslationStore for SetAssocStore {
    fn lookup(&mut self, vpn: u64, now: u64, set_mru: bool) -> Option<u64> {
        let idx = self.index(vpn);
        let set = &mut self.sets[idx];
        let ptr = set.find(|entry| entry.vpn == vpn)?;
        set.touch(ptr, now, set_mru).map(|line| line.data.ppn)
    }

    fn contains(&self, vpn: u64) -> bool {
        self.sets[self.index(vpn)].find(|entry| entry.vpn == vpn).is_some()
    }

    fn insert(&mut self, vpn: u64, ppn: u64, now: u64) -> Option<u64> {
        if self.contains(vpn) {
            return None;
        }
        let idx = self.index(vpn);
        let set = &mut self.sets[idx];
        let insert_ptr = set.select();
        let evict = set.insert(insert_ptr, Entry { vpn, ppn }, now);
        if let Some(evict) = evict {
            debug!(target: "Tlb", "evicting entry for vpn {:#x} from set {}", evict.vpn, idx);
        }
        evict.map(|entry| entry.vpn)
    }

    fn flush(&mut self, vpn: Option<u64>) -> usize {
        match vpn {
            None => self.sets.iter_mut().map(|set| set.retain(|_| false)).sum(),
            Some(vpn) => {
                let idx = self.index(vpn);
                let set = &mut self.sets[idx];
                match set.find(|entry| entry.vpn == vpn) {
                    Some(ptr) => set.remove(ptr).map_or(0, |_| 1),
                    None => 0,
                }
            }
        }
    }

    fn len(&self) -> usize {
        self.sets.iter().map(|set| set.iter().count()).sum()
    }

    fn capacity(&self) -> Option<usize> {
        Some(self.sets.len() * self.sets[0].associativity())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: u64 = 4096;

    #[test]
    fn test_index_uses_page_number() {
        let store = SetAssocStore::new(4, 1, PAGE);
        assert_eq!(store.index(0x0000), 0);
        assert_eq!(store.index(0x1000), 1);
        assert_eq!(store.index(0x3000), 3);
        assert_eq!(store.index(0x4000), 0);
        assert_eq!(store.capacity(), Some(4));
    }

    #[test]
    fn test_lookup_after_insert() {
        let mut store = SetAssocStore::new(2, 2, PAGE);
        assert_eq!(store.lookup(0x5000, 0, true), None);
        assert_eq!(store.insert(0x5000, 0x9000, 1), None);
        assert_eq!(store.lookup(0x5000, 2, true), Some(0x9000));
        assert_eq!(store.line(0x5000), Some((2, 1)));
        assert_eq!(store.lookup(0x5000, 3, false), Some(0x9000));
        assert_eq!(store.line(0x5000), Some((2, 2)));
    }

    #[test]
    fn test_insert_present_page_is_noop() {
        let mut store = SetAssocStore::new(1, 2, PAGE);
        store.insert(0x1000, 0x1000, 1);
        store.insert(0x2000, 0x2000, 2);
        assert_eq!(store.insert(0x1000, 0xdead000, 10), None);
        // Neither the mapping nor its recency changed.
        assert_eq!(store.lookup(0x1000, 11, false), Some(0x1000));
        assert_eq!(store.line(0x1000), Some((1, 1)));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_evicts_least_recently_used_in_set() {
        let mut store = SetAssocStore::new(1, 2, PAGE);
        store.insert(0x1000, 0x1000, 1);
        store.insert(0x2000, 0x2000, 2);
        // Touch the older entry so the other one becomes the victim.
        store.lookup(0x1000, 3, true);
        assert_eq!(store.insert(0x3000, 0x3000, 4), Some(0x2000));
        assert!(store.contains(0x1000));
        assert!(!store.contains(0x2000));
        assert!(store.contains(0x3000));
    }

    #[test]
    fn test_eviction_stays_within_set() {
        let mut store = SetAssocStore::new(2, 1, PAGE);
        store.insert(0x0000, 0x0000, 1);
        store.insert(0x1000, 0x1000, 2);
        // 0x2000 maps to set 0, so 0x0000 is evicted while 0x1000 stays.
        assert_eq!(store.insert(0x2000, 0x2000, 3), Some(0x0000));
        assert!(store.contains(0x1000));
    }

    #[test]
    fn test_flush() {
        let mut store = SetAssocStore::new(2, 2, PAGE);
        for i in 0..4 {
            store.insert(i * PAGE, i * PAGE, i);
        }
        assert_eq!(store.flush(Some(PAGE)), 1);
        assert_eq!(store.flush(Some(PAGE)), 0);
        assert_eq!(store.len(), 3);
        assert!(!store.contains(PAGE));
        // Same set, different page.
        assert!(store.contains(3 * PAGE));
        // The freed way is reused before anything is evicted.
        assert_eq!(store.insert(5 * PAGE, 5 * PAGE, 9), None);
        assert_eq!(store.len(), 4);
        assert_eq!(store.flush(Some(5 * PAGE)), 1);
        assert_eq!(store.flush(None), 3);
        assert!(store.is_empty());
    }
}
