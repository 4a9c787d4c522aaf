//! # Indexed Pair Frequency Heap
//!
//! A binary max-heap over *pair → occurrence count*, where the count is the
//! cardinality of the pair's occurrence set: the stream positions at which
//! the pair currently begins.
//!
//! Entries live in an arena and the heap array stores entry handles; each
//! entry records its own array index, so a position update can re-sift the
//! affected entry in place in O(log H). A pair → entry map provides the
//! back-pointers.
//!
//! Ordering key is `(count, pair)`, so pops are deterministic: equal counts
//! break toward the greater pair, which prefers the most recently minted
//! token.

use crate::training::token_stream::{NIL, TokenStream};
use crate::types::{CommonHashMap, CommonHashSet, Pair, TokenType, boundary};

struct HeapEntry<T> {
    pair: Pair<T>,
    heap_idx: u32,
    positions: CommonHashSet<u32>,
}

/// An indexed max-heap of pair occurrence sets.
pub struct PairHeap<T: TokenType> {
    entries: Vec<HeapEntry<T>>,
    entry_free: Vec<u32>,
    heap: Vec<u32>,
    pair_map: CommonHashMap<Pair<T>, u32>,
    lossy: bool,
}

impl<T: TokenType> PairHeap<T> {
    /// Create an empty heap.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            entry_free: Vec::new(),
            heap: Vec::new(),
            pair_map: CommonHashMap::new(),
            lossy: false,
        }
    }

    /// The number of heap entries (distinct indexed pairs).
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Is the heap empty?
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Has truncation ever dropped a populated entry?
    ///
    /// Once true, a pair present in the stream may transiently have no
    /// entry until `add_position` re-creates one.
    pub fn is_lossy(&self) -> bool {
        self.lossy
    }

    /// The pair an entry represents.
    pub fn pair_of(
        &self,
        entry: u32,
    ) -> Pair<T> {
        self.entries[entry as usize].pair
    }

    /// The occurrence count of an entry.
    pub fn count_of(
        &self,
        entry: u32,
    ) -> usize {
        self.entries[entry as usize].positions.len()
    }

    /// Take the entry's positions, sorted in stream-allocation order.
    ///
    /// Handles are allocated in corpus order during the initial scan, so
    /// ascending handle order is ascending stream order; processing merges
    /// left to right keeps training deterministic and in agreement with the
    /// encoder's left-to-right sweep.
    pub fn take_positions(
        &mut self,
        entry: u32,
    ) -> Vec<u32> {
        let mut positions: Vec<u32> = core::mem::take(&mut self.entries[entry as usize].positions)
            .into_iter()
            .collect();
        positions.sort_unstable();
        positions
    }

    /// The pair at `n`, if `n` begins an indexable adjacency.
    ///
    /// Returns `None` at [`NIL`], at the stream tail, or when either value
    /// is the boundary sentinel.
    fn indexable_pair(
        stream: &TokenStream<T>,
        n: u32,
    ) -> Option<Pair<T>> {
        if n == NIL {
            return None;
        }
        let next = stream.next(n);
        if next == NIL {
            return None;
        }

        let pair = (stream.value(n), stream.value(next));
        if pair.0 == boundary::<T>() || pair.1 == boundary::<T>() {
            return None;
        }
        Some(pair)
    }

    /// Index the pair beginning at `n`, without re-sifting.
    ///
    /// Used by the initial scan; must be followed by [`Self::make_heap`].
    pub fn add_position_unsifted(
        &mut self,
        stream: &TokenStream<T>,
        n: u32,
    ) {
        self.add_position_inner(stream, n);
    }

    /// Index the pair beginning at `n`.
    ///
    /// Creates the entry if the pair is new; otherwise grows its occurrence
    /// set and re-sifts. A no-op at [`NIL`], at the tail, or across the
    /// boundary sentinel.
    pub fn add_position(
        &mut self,
        stream: &TokenStream<T>,
        n: u32,
    ) {
        if let Some(entry) = self.add_position_inner(stream, n) {
            self.sift_up(entry);
        }
    }

    fn add_position_inner(
        &mut self,
        stream: &TokenStream<T>,
        n: u32,
    ) -> Option<u32> {
        let pair = Self::indexable_pair(stream, n)?;

        let entry = match self.pair_map.get(&pair) {
            Some(&entry) => {
                self.entries[entry as usize].positions.insert(n);
                entry
            }
            None => {
                let entry = self.alloc_entry(pair, n);
                self.heap.push(entry);
                self.entries[entry as usize].heap_idx = (self.heap.len() - 1) as u32;
                self.pair_map.insert(pair, entry);
                entry
            }
        };
        Some(entry)
    }

    /// Un-index the pair beginning at `n` and re-sift its entry.
    ///
    /// A no-op when the pair has no entry or `n` is not in its set. Entries
    /// whose set empties are kept: they sink in the heap and are reclaimed
    /// by [`Self::truncate`].
    pub fn remove_position(
        &mut self,
        stream: &TokenStream<T>,
        n: u32,
    ) {
        let Some(pair) = Self::indexable_pair(stream, n) else {
            return;
        };
        let Some(&entry) = self.pair_map.get(&pair) else {
            return;
        };

        self.entries[entry as usize].positions.remove(&n);
        self.sift_down(entry);
    }

    /// Pop the root entry.
    ///
    /// Detaches the entry from the heap array *and* from the pair map, so
    /// position updates during the subsequent rewrite cannot touch it. The
    /// entry handle stays valid until [`Self::remove_entry`].
    pub fn pop_top(&mut self) -> Option<u32> {
        let root = *self.heap.first()?;

        let last = self.heap.pop().unwrap();
        if !self.heap.is_empty() {
            self.heap[0] = last;
            self.entries[last as usize].heap_idx = 0;
            self.sift_down(last);
        }

        self.pair_map.remove(&self.entries[root as usize].pair);
        self.entries[root as usize].heap_idx = u32::MAX;
        Some(root)
    }

    /// Free a popped entry.
    pub fn remove_entry(
        &mut self,
        entry: u32,
    ) {
        self.entries[entry as usize].positions = CommonHashSet::new();
        self.entry_free.push(entry);
    }

    /// Bulk-establish the heap order, bottom-up, in O(n).
    ///
    /// Used after the initial scan populates entries unsifted.
    pub fn make_heap(&mut self) {
        if self.heap.len() < 2 {
            return;
        }
        let last_non_leaf = (self.heap.len() - 2) / 2;
        for k in (0..=last_non_leaf).rev() {
            self.sift_down(self.heap[k]);
        }
    }

    /// Keep only the first `capacity` heap slots, dropping the array tail.
    ///
    /// Once the merge count is fixed, no more than that many distinct pairs
    /// can ever matter; tail entries are leaves with small counts. A dropped
    /// pair that later gains occurrences re-enters through
    /// [`Self::add_position`] with a fresh set.
    pub fn truncate(
        &mut self,
        capacity: usize,
    ) {
        while self.heap.len() > capacity {
            let entry = self.heap.pop().unwrap();
            self.pair_map.remove(&self.entries[entry as usize].pair);
            if !self.entries[entry as usize].positions.is_empty() {
                self.lossy = true;
            }
            self.remove_entry(entry);
        }
    }

    fn alloc_entry(
        &mut self,
        pair: Pair<T>,
        n: u32,
    ) -> u32 {
        let mut positions = CommonHashSet::with_capacity(4);
        positions.insert(n);

        let node = HeapEntry {
            pair,
            heap_idx: u32::MAX,
            positions,
        };

        match self.entry_free.pop() {
            Some(entry) => {
                self.entries[entry as usize] = node;
                entry
            }
            None => {
                self.entries.push(node);
                (self.entries.len() - 1) as u32
            }
        }
    }

    /// Total ordering key: count first, then pair.
    fn key(
        &self,
        entry: u32,
    ) -> (usize, Pair<T>) {
        let e = &self.entries[entry as usize];
        (e.positions.len(), e.pair)
    }

    fn swap_slots(
        &mut self,
        i: usize,
        j: usize,
    ) {
        self.heap.swap(i, j);
        self.entries[self.heap[i] as usize].heap_idx = i as u32;
        self.entries[self.heap[j] as usize].heap_idx = j as u32;
    }

    fn sift_up(
        &mut self,
        entry: u32,
    ) {
        let mut k = self.entries[entry as usize].heap_idx as usize;
        while k > 0 {
            let parent = (k - 1) / 2;
            if self.key(self.heap[parent]) >= self.key(entry) {
                break;
            }
            self.swap_slots(parent, k);
            k = parent;
        }
    }

    fn sift_down(
        &mut self,
        entry: u32,
    ) {
        let mut k = self.entries[entry as usize].heap_idx as usize;
        loop {
            let left = 2 * k + 1;
            let right = 2 * k + 2;
            if left >= self.heap.len() {
                break;
            }

            let mut biggest = left;
            if right < self.heap.len() && self.key(self.heap[right]) > self.key(self.heap[left]) {
                biggest = right;
            }

            if self.key(self.heap[biggest]) <= self.key(entry) {
                break;
            }
            self.swap_slots(biggest, k);
            k = biggest;
        }
    }

    /// Assert the structural invariants, in debug builds and tests.
    ///
    /// Checks that the heap array, back indices, and pair map agree; that
    /// the max-heap order holds; and that every indexed position is a live
    /// stream occurrence of its pair. While the heap is lossless it also
    /// checks the converse: every indexable stream adjacency is indexed.
    #[cfg(any(test, debug_assertions))]
    pub fn validate_invariants(
        &self,
        stream: &TokenStream<T>,
    ) {
        assert_eq!(self.pair_map.len(), self.heap.len());

        for (k, &entry) in self.heap.iter().enumerate() {
            let e = &self.entries[entry as usize];
            assert_eq!(e.heap_idx as usize, k, "back index mismatch at slot {k}");
            assert_eq!(
                self.pair_map.get(&e.pair),
                Some(&entry),
                "pair map mismatch for {:?}",
                e.pair
            );

            if k > 0 {
                let parent = self.heap[(k - 1) / 2];
                assert!(
                    self.key(parent) >= self.key(entry),
                    "heap order violated at slot {k}"
                );
            }

            for &n in &e.positions {
                let next = stream.next(n);
                assert_ne!(next, NIL, "indexed position {n} has no successor");
                assert_eq!(
                    (stream.value(n), stream.value(next)),
                    e.pair,
                    "indexed position {n} no longer matches {:?}",
                    e.pair
                );
            }
        }

        if !self.lossy {
            let mut n = stream.head();
            while n != NIL {
                if let Some(pair) = Self::indexable_pair(stream, n) {
                    let entry = self
                        .pair_map
                        .get(&pair)
                        .unwrap_or_else(|| panic!("stream pair {pair:?} has no entry"));
                    assert!(
                        self.entries[*entry as usize].positions.contains(&n),
                        "stream position {n} missing from {pair:?}"
                    );
                }
                n = stream.next(n);
            }
        }
    }
}

impl<T: TokenType> Default for PairHeap<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stream_of(values: &[u32]) -> (TokenStream<u32>, Vec<u32>) {
        let mut stream = TokenStream::new();
        let handles = values.iter().map(|&v| stream.append(v)).collect();
        (stream, handles)
    }

    fn scan(
        stream: &TokenStream<u32>,
        heap: &mut PairHeap<u32>,
    ) {
        let mut n = stream.head();
        while n != NIL {
            heap.add_position_unsifted(stream, n);
            n = stream.next(n);
        }
        heap.make_heap();
    }

    #[test]
    fn test_scan_and_pop_order() {
        // "aaabda": pairs aa x2(overlapping at n0,n1), ab, bd, da.
        let (stream, _) = stream_of(&[97, 97, 97, 98, 100, 97]);
        let mut heap = PairHeap::new();
        scan(&stream, &mut heap);
        heap.validate_invariants(&stream);

        assert_eq!(heap.len(), 4);

        let top = heap.pop_top().unwrap();
        assert_eq!(heap.pair_of(top), (97, 97));
        assert_eq!(heap.count_of(top), 2);
        assert_eq!(heap.take_positions(top), vec![0, 1]);
    }

    #[test]
    fn test_tie_breaks_toward_greater_pair() {
        // (98, 99) and (97, 98) both occur once.
        let (stream, _) = stream_of(&[97, 98, u32::MAX, 98, 99]);
        let mut heap = PairHeap::new();
        scan(&stream, &mut heap);

        let top = heap.pop_top().unwrap();
        assert_eq!(heap.pair_of(top), (98, 99));
    }

    #[test]
    fn test_boundary_is_never_indexed() {
        let (stream, _) = stream_of(&[97, u32::MAX, 98]);
        let mut heap = PairHeap::new();
        scan(&stream, &mut heap);

        assert!(heap.is_empty());
        heap.validate_invariants(&stream);
    }

    #[test]
    fn test_merge_rewrite_keeps_invariants() {
        // Hand-drive one merge of (1, 2) -> 300 the way the driver does.
        let (mut stream, h) = stream_of(&[1, 2, 1, 2, 3, 4]);
        let mut heap = PairHeap::new();
        scan(&stream, &mut heap);
        heap.validate_invariants(&stream);

        let top = heap.pop_top().unwrap();
        assert_eq!(heap.pair_of(top), (1, 2));

        for n in heap.take_positions(top) {
            let next = stream.next(n);
            if next == NIL || stream.value(n) != 1 || stream.value(next) != 2 {
                continue;
            }
            let p = stream.prev(n);
            heap.remove_position(&stream, p);
            heap.remove_position(&stream, next);
            stream.set_value(n, 300);
            stream.remove(next);
            heap.add_position(&stream, p);
            heap.add_position(&stream, n);
        }
        heap.remove_entry(top);

        assert_eq!(stream.values().collect::<Vec<_>>(), vec![300, 300, 3, 4]);
        heap.validate_invariants(&stream);

        // The new adjacency (300, 300) wins the next pop.
        let top = heap.pop_top().unwrap();
        assert_eq!(heap.pair_of(top), (300, 300));
        assert_eq!(heap.take_positions(top), vec![h[0]]);
    }

    #[test]
    fn test_pop_detaches_pair_map() {
        let (stream, h) = stream_of(&[5, 6, 5, 6]);
        let mut heap = PairHeap::new();
        scan(&stream, &mut heap);

        let top = heap.pop_top().unwrap();
        assert_eq!(heap.pair_of(top), (5, 6));

        // The popped pair is unmapped: removing its positions is a no-op.
        heap.remove_position(&stream, h[0]);
        assert_eq!(heap.count_of(top), 2);

        heap.remove_entry(top);
    }

    #[test]
    fn test_truncate_drops_tail_and_unmaps() {
        let (stream, h) = stream_of(&[1, 2, 3, 4, 5, 6, 7, 8]);
        let mut heap = PairHeap::new();
        scan(&stream, &mut heap);
        assert_eq!(heap.len(), 7);

        heap.truncate(3);
        assert_eq!(heap.len(), 3);
        assert!(heap.is_lossy());

        // A dropped pair re-enters with a fresh set. (4, 5) is a tail drop:
        // make_heap leaves the three largest pairs in the kept prefix.
        heap.add_position(&stream, h[3]);
        assert_eq!(heap.len(), 4);
        heap.validate_invariants(&stream);
    }

    #[test]
    fn test_truncate_within_capacity_is_noop() {
        let (stream, _) = stream_of(&[1, 2, 3]);
        let mut heap = PairHeap::new();
        scan(&stream, &mut heap);

        heap.truncate(10);
        assert_eq!(heap.len(), 2);
        assert!(!heap.is_lossy());
    }

    #[test]
    fn test_entry_slot_reuse() {
        let (mut stream, h) = stream_of(&[1, 2, 3]);
        let mut heap = PairHeap::new();
        scan(&stream, &mut heap);
        assert_eq!(heap.len(), 2);

        let top = heap.pop_top().unwrap();
        assert_eq!(heap.pair_of(top), (2, 3));
        heap.remove_entry(top);

        // The freed slot backs the next new entry.
        stream.remove(h[2]);
        stream.append(9);
        heap.add_position(&stream, h[1]);
        assert_eq!(heap.len(), 2);
        heap.validate_invariants(&stream);
    }
}
