use core::cell::UnsafeCell;
use core::mem::MaybeUninit;

/// log2 of the segment size. 64 items per segment keeps the directory small
/// without large contiguous allocations.
const SEG_SHIFT: usize = 6;
const SEG_SIZE: usize = 1 << SEG_SHIFT;
const SEG_MASK: usize = SEG_SIZE - 1;

type Segment<T> = Box<[UnsafeCell<MaybeUninit<T>>]>;

fn new_segment<T>() -> Segment<T> {
    (0..SEG_SIZE)
        .map(|_| UnsafeCell::new(MaybeUninit::uninit()))
        .collect()
}

/// Append-only segmented storage with stable addressing.
///
/// Items live in fixed-size boxed segments. Growing the segment directory may
/// reallocate the directory itself, but never the segments, so the address of
/// a written slot is stable for the lifetime of the `SegVec`. That is what
/// lets consumers hold `&T` into this storage while the producer keeps
/// appending on another thread.
///
/// Slots sit behind [`UnsafeCell`] and every write goes through the cell's
/// raw pointer, one slot at a time: no `&mut` is ever formed over a whole
/// segment, so a write to slot `k` cannot invalidate a reference a consumer
/// already holds into slot `j` of the same segment.
///
/// Each position maps to `(pos >> SEG_SHIFT, pos & SEG_MASK)`. Slots at
/// indices `0..len` are initialized; slots past `len` are not. All mutation
/// happens under the owner's lock; this type itself is not synchronized.
pub(crate) struct SegVec<T> {
    segments: Vec<Segment<T>>,
    len: usize,
}

impl<T> SegVec<T> {
    pub(crate) const fn new() -> Self {
        Self {
            segments: Vec::new(),
            len: 0,
        }
    }

    pub(crate) const fn len(&self) -> usize {
        self.len
    }

    pub(crate) const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Appends a value, allocating a fresh segment at each segment boundary.
    pub(crate) fn push(&mut self, value: T) {
        if self.len & SEG_MASK == 0 {
            self.segments.push(new_segment());
        }
        let slot = &self.segments[self.len >> SEG_SHIFT][self.len & SEG_MASK];
        // SAFETY: slot `len` has never been written (slots at or past `len`
        // are uninitialized), no reader reaches slots at or past `len`, and
        // `&mut self` excludes other writers.
        unsafe { (*slot.get()).write(value) };
        self.len += 1;
    }

    /// Pre-sizes the segment directory for `n` items. Only the directory is
    /// reserved eagerly; segments themselves stay lazily allocated.
    pub(crate) fn reserve(&mut self, n: usize) {
        let segs = n.div_ceil(SEG_SIZE);
        self.segments.reserve(segs.saturating_sub(self.segments.len()));
    }

    /// Returns a pointer to the initialized slot at `index`.
    ///
    /// The pointee is valid for reads for the remaining lifetime of this
    /// `SegVec`: written slots are never moved, overwritten, or dropped before
    /// the `SegVec` itself drops.
    ///
    /// # Panics
    /// Panics if `index >= len`.
    pub(crate) fn slot_ptr(&self, index: usize) -> *const T {
        assert!(index < self.len, "slot {index} is not initialized");
        self.segments[index >> SEG_SHIFT][index & SEG_MASK]
            .get()
            .cast::<T>()
            .cast_const()
    }

    /// Shared reference to the initialized slot at `index`, bounds-checked.
    #[cfg(test)]
    pub(crate) fn get(&self, index: usize) -> &T {
        // SAFETY: `slot_ptr` asserts `index < len`, and slots below `len` are
        // initialized.
        unsafe { &*self.slot_ptr(index) }
    }
}

impl<T> Drop for SegVec<T> {
    fn drop(&mut self) {
        // Drop the initialized prefix, segment by segment.
        for (i, seg) in self.segments.iter().enumerate() {
            let base = i << SEG_SHIFT;
            if base >= self.len {
                break;
            }
            let init = (self.len - base).min(SEG_SIZE);
            for slot in &seg[..init] {
                // SAFETY: slots below `len` were written exactly once by
                // `push` and are dropped exactly once here.
                unsafe { (*slot.get()).assume_init_drop() };
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    #[test]
    fn addresses_stay_stable_across_growth() {
        let mut v = SegVec::new();
        v.push(0_u64);
        let first = v.slot_ptr(0);
        // Cross several segment boundaries.
        for i in 1..1000_u64 {
            v.push(i);
        }
        assert_eq!(v.slot_ptr(0), first);
        for i in 0..1000 {
            assert_eq!(*v.get(i), i as u64);
        }
    }

    #[test]
    fn reads_of_claimed_slots_survive_writes_to_their_segment() {
        // A held reference into slot 0 must stay readable while later slots
        // of the same segment are written.
        let mut v = SegVec::new();
        v.push(String::from("first"));
        let held = v.get(0) as *const String;
        for i in 1..SEG_SIZE {
            v.push(format!("item {i}"));
        }
        // SAFETY: slot 0 is initialized and never moves.
        assert_eq!(*unsafe { &*held }, "first");
    }

    #[test]
    fn drops_only_the_initialized_prefix() {
        let marker = Rc::new(());
        let mut v = SegVec::new();
        // Partially fill a second segment.
        for _ in 0..(SEG_SIZE + SEG_SIZE / 2) {
            v.push(Rc::clone(&marker));
        }
        drop(v);
        assert_eq!(Rc::strong_count(&marker), 1);
    }

    #[test]
    fn reserve_is_observably_inert() {
        let mut v = SegVec::new();
        v.reserve(10_000);
        assert_eq!(v.len(), 0);
        v.push(7_u8);
        assert_eq!(*v.get(0), 7);
    }

    #[test]
    #[should_panic(expected = "not initialized")]
    fn out_of_bounds_slot_panics() {
        let v = SegVec::<u8>::new();
        let _ = v.slot_ptr(0);
    }
}
