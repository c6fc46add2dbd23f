/// A valid entry of a [`CacheSet`], together with the bookkeeping used for replacement.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Line<T> {
    pub data: T,
    /// Cycle of the most recent use of this line.
    pub mru_tick: u64,
    /// Number of lookups that found this line since it was filled.
    pub hits: u64,
}

/// One set (bucket) of an associative structure, with least-recently-used replacement.
pub struct CacheSet<T> {
    arr: Box<[Option<Line<T>>]>,
}

impl<T> std::ops::Index<usize> for CacheSet<T> {
    type Output = Option<Line<T>>;

    fn index(&self, index: usize) -> &Option<Line<T>> {
        &self.arr[index]
    }
}

impl<T> CacheSet<T> {
    pub fn new(size: usize) -> Self {
        let mut vec = Vec::with_capacity(size);
        for _ in 0..size {
            vec.push(None);
        }
        CacheSet { arr: vec.into_boxed_slice() }
    }

    pub fn associativity(&self) -> usize {
        self.arr.len()
    }

    /// Search in the set without updating any bookkeeping.
    pub fn find(&self, mut matcher: impl FnMut(&T) -> bool) -> Option<usize> {
        self.arr.iter().position(|line| match line {
            Some(line) => matcher(&line.data),
            None => false,
        })
    }

    /// Record a lookup hitting the line at `ptr`. The recency is only refreshed if `set_mru`.
    pub fn touch(&mut self, ptr: usize, now: u64, set_mru: bool) -> Option<&mut Line<T>> {
        let line = self.arr[ptr].as_mut()?;
        if set_mru {
            line.mru_tick = now;
        }
        line.hits += 1;
        Some(line)
    }

    /// Select a way to fill: the first free way, otherwise the least recently used one. Ties
    /// go to the way scanned first.
    pub fn select(&self) -> usize {
        let mut victim = 0;
        let mut min_tick = u64::max_value();
        for (i, line) in self.arr.iter().enumerate() {
            match line {
                None => return i,
                Some(line) => {
                    if line.mru_tick < min_tick {
                        min_tick = line.mru_tick;
                        victim = i;
                    }
                }
            }
        }
        victim
    }

    /// Fill the way at `insert_ptr`, returning whatever was evicted.
    pub fn insert(&mut self, insert_ptr: usize, insert: T, now: u64) -> Option<T> {
        std::mem::replace(&mut self.arr[insert_ptr], Some(Line { data: insert, mru_tick: now, hits: 0 }))
            .map(|line| line.data)
    }

    pub fn remove(&mut self, ptr: usize) -> Option<T> {
        self.arr[ptr].take().map(|line| line.data)
    }

    /// Keep only lines for which `filter` returns true. Returns the number of lines dropped.
    pub fn retain(&mut self, mut filter: impl FnMut(&T) -> bool) -> usize {
        let mut removed = 0;
        for slot in self.arr.iter_mut() {
            match slot {
                None => continue,
                Some(line) => {
                    if filter(&line.data) {
                        continue;
                    }
                }
            }
            *slot = None;
            removed += 1;
        }
        removed
    }

    pub fn iter(&self) -> impl Iterator<Item = &Line<T>> {
        self.arr.iter().filter_map(Option::as_ref)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_prefers_free_way() {
        let mut set = CacheSet::new(4);
        set.insert(0, 'a', 5);
        set.insert(2, 'c', 1);
        // Way 1 is free even though way 2 is older.
        assert_eq!(set.select(), 1);
    }

    #[test]
    fn test_select_least_recently_used() {
        let mut set = CacheSet::new(3);
        set.insert(0, 'a', 1);
        set.insert(1, 'b', 2);
        set.insert(2, 'c', 3);
        assert_eq!(set.select(), 0);

        let ptr = set.find(|&c| c == 'a').unwrap();
        set.touch(ptr, 4, true);
        assert_eq!(set.select(), 1);

        // A lookup that does not refresh recency still counts as a hit.
        let line = set.touch(1, 9, false).unwrap();
        assert_eq!((line.mru_tick, line.hits), (2, 1));
        assert_eq!(set.select(), 1);
    }

    #[test]
    fn test_select_ties_go_to_first_way() {
        let mut set = CacheSet::new(3);
        set.insert(0, 'a', 7);
        set.insert(1, 'b', 3);
        set.insert(2, 'c', 3);
        assert_eq!(set.select(), 1);
    }

    #[test]
    fn test_retain() {
        let mut set = CacheSet::new(4);
        for (i, c) in "abcd".chars().enumerate() {
            set.insert(i, c, 0);
        }
        assert_eq!(set.retain(|&c| c != 'b' && c != 'd'), 2);
        assert_eq!(set.iter().map(|line| line.data).collect::<String>(), "ac");
        assert_eq!(set.remove(0), Some('a'));
        assert!(set[0].is_none());
    }
}
