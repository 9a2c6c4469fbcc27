//! Per-search scratch space for "has this node been visited" marking, reused
//! across queries without re-zeroing, à la the generation-counter visited
//! lists used throughout the graph-search literature.
//!
//! Each [`VisitedList`] is a flat array of 16-bit generation counters sized
//! to the graph's node count. A search bumps the list's current generation
//! and writes it into each visited slot; a node is "visited" iff its slot
//! equals the current generation. Reset is then O(1) — bump the counter —
//! except on the rare wraparound, where the backing array is zeroed once.

use parking_lot::Mutex;

/// A single reusable visited-marking scratch buffer.
#[derive(Debug)]
pub struct VisitedList {
    marks: Vec<u16>,
    generation: u16,
}

impl VisitedList {
    /// Creates a list sized for `capacity` node ids, all initially unvisited.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            marks: vec![0; capacity],
            generation: 0,
        }
    }

    /// Grows the backing array to cover at least `capacity` ids, if needed.
    pub fn ensure_capacity(&mut self, capacity: usize) {
        if self.marks.len() < capacity {
            self.marks.resize(capacity, 0);
        }
    }

    /// Starts a fresh search: bumps the generation, wrapping to a full
    /// zero-out only when the counter itself wraps around.
    pub fn reset(&mut self) {
        let (next, overflowed) = self.generation.overflowing_add(1);
        if overflowed {
            self.marks.fill(0);
            self.generation = 1;
        } else {
            self.generation = next;
        }
    }

    /// Marks `id` as visited in the current generation.
    pub fn visit(&mut self, id: usize) {
        self.marks[id] = self.generation;
    }

    /// Returns true if `id` was marked visited in the current generation.
    #[must_use]
    pub fn is_visited(&self, id: usize) -> bool {
        self.marks.get(id).is_some_and(|&m| m == self.generation)
    }
}

/// A mutex-guarded pool of [`VisitedList`]s, so concurrent searches don't
/// each pay for a fresh allocation.
///
/// Borrowing locks the pool only long enough to pop (or allocate) a list;
/// the borrowed list is returned to the pool on drop via its guard.
#[derive(Debug, Default)]
pub struct VisitedPool {
    free: Mutex<Vec<VisitedList>>,
}

// The pool is just a reuse cache; a clone starts with an empty one rather
// than copying cached scratch buffers.
impl Clone for VisitedPool {
    fn clone(&self) -> Self {
        Self::default()
    }
}

impl VisitedPool {
    /// Creates an empty pool.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Borrows a visited list sized for at least `capacity` ids, allocating
    /// a new one if the pool is empty. The returned list has already been
    /// [`VisitedList::reset`].
    pub fn acquire(&self, capacity: usize) -> PooledVisitedList<'_> {
        let mut list = self.free.lock().pop().unwrap_or_else(|| VisitedList::new(capacity));
        list.ensure_capacity(capacity);
        list.reset();
        PooledVisitedList {
            pool: self,
            list: Some(list),
        }
    }
}

/// A [`VisitedList`] on loan from a [`VisitedPool`]; returned to the pool
/// when dropped.
pub struct PooledVisitedList<'a> {
    pool: &'a VisitedPool,
    list: Option<VisitedList>,
}

impl std::ops::Deref for PooledVisitedList<'_> {
    type Target = VisitedList;

    fn deref(&self) -> &VisitedList {
        self.list.as_ref().expect("list taken before drop")
    }
}

impl std::ops::DerefMut for PooledVisitedList<'_> {
    fn deref_mut(&mut self) -> &mut VisitedList {
        self.list.as_mut().expect("list taken before drop")
    }
}

impl Drop for PooledVisitedList<'_> {
    fn drop(&mut self) {
        if let Some(list) = self.list.take() {
            self.pool.free.lock().push(list);
        }
    }
}
