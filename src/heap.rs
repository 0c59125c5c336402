use std::ptr::{self, NonNull};

use log::{debug, trace, warn};

use crate::{
  align::{UNIT, units_for},
  block::{Header, end_of, header_of, payload_of, write_header},
  error::HeapError,
  space::{AddressSpace, Sbrk},
  stats::HeapStats,
};

/// Minimum number of units requested from the address space per growth.
pub const MIN_GROWTH_UNITS: usize = 1024;

/// Next-fit free-list allocator over an [`AddressSpace`].
///
/// Free blocks form a circular list sorted by address and closed by a size-0
/// anchor. The anchor lives in the first unit of the first arena, so a heap can
/// be moved freely and needs no memory besides what `space` hands out.
pub struct Heap<S: AddressSpace> {
  space: S,
  anchor: *mut Header,
  cursor: *mut Header,
  min_batch: usize,
  arenas: usize,
  arena_units: usize,
}

impl Heap<Sbrk> {
  /// Heap growing the process data segment.
  pub fn sbrk() -> Self {
    Self::new(Sbrk)
  }
}

impl<S: AddressSpace> Heap<S> {
  pub fn new(space: S) -> Self {
    Self::with_min_batch(space, MIN_GROWTH_UNITS)
  }

  pub fn with_min_batch(
    space: S,
    min_batch: usize,
  ) -> Self {
    Self {
      space,
      anchor: ptr::null_mut(),
      cursor: ptr::null_mut(),
      min_batch: min_batch.max(1),
      arenas: 0,
      arena_units: 0,
    }
  }

  pub fn space(&self) -> &S {
    &self.space
  }

  pub fn min_batch(&self) -> usize {
    self.min_batch
  }

  /// Returns a unit-aligned pointer to at least `bytes` writable bytes.
  ///
  /// A zero-byte request still yields a distinct block that must be released.
  pub fn acquire(
    &mut self,
    bytes: usize,
  ) -> Result<NonNull<u8>, HeapError> {
    let units = units_for(bytes).ok_or(HeapError::InvalidRequest)?;

    if self.anchor.is_null() {
      self.grow(units)?;
    }

    unsafe {
      let mut prev = self.cursor;
      let mut block = (*prev).next;

      loop {
        if (*block).size >= units {
          if (*block).size == units {
            trace!("exact fit of {} units at {:p}", units, block);
            (*prev).next = (*block).next;
          } else {
            trace!("splitting {} units off {:p} ({} units)", units, block, (*block).size);
            (*block).size -= units;
            block = write_header(end_of(block), units, ptr::null_mut());
          }

          self.cursor = prev;

          return NonNull::new(payload_of(block)).ok_or(HeapError::OutOfMemory);
        }

        if block == self.cursor {
          block = self.grow(units)?;
        }

        prev = block;
        block = (*block).next;
      }
    }
  }

  /// Like [`acquire`](Self::acquire) for `count` elements of `size` bytes,
  /// with the whole region zeroed.
  pub fn acquire_zeroed(
    &mut self,
    count: usize,
    size: usize,
  ) -> Result<NonNull<u8>, HeapError> {
    let bytes = count.checked_mul(size).ok_or(HeapError::InvalidRequest)?;
    let payload = self.acquire(bytes)?;

    unsafe { ptr::write_bytes(payload.as_ptr(), 0, bytes) };

    Ok(payload)
  }

  /// Returns a block to the free list, merging it with address-adjacent free
  /// neighbours on either side. Releasing null does nothing.
  ///
  /// # Safety
  ///
  /// `payload` must be null or a pointer returned by this heap's
  /// [`acquire`](Self::acquire) that has not been released since. Double
  /// releases and foreign pointers are undefined behavior; debug builds catch
  /// the anchor and blocks already on the free list.
  pub unsafe fn release(
    &mut self,
    payload: *mut u8,
  ) {
    if payload.is_null() {
      return;
    }

    unsafe {
      let block = header_of(payload);

      debug_assert!(!self.anchor.is_null(), "release into a heap that never grew");
      debug_assert!(block != self.anchor, "release of the free-list anchor");

      let mut p = self.cursor;
      while !(block > p && block < (*p).next) {
        debug_assert!(block != p, "double release of {:p}", payload);

        // p is the highest free block and block lies past either end.
        if p >= (*p).next && (block > p || block < (*p).next) {
          break;
        }
        p = (*p).next;
      }

      let next = (*p).next;
      if end_of(block) == next && next != self.anchor {
        trace!("merging {:p} with following {:p}", block, next);
        (*block).size += (*next).size;
        (*block).next = (*next).next;
      } else {
        (*block).next = next;
      }

      if end_of(p) == block {
        trace!("merging {:p} into preceding {:p}", block, p);
        (*p).size += (*block).size;
        (*p).next = (*block).next;
      } else {
        (*p).next = block;
      }

      self.cursor = p;
    }
  }

  /// Resizes a live block, moving it when it has no room for `bytes`.
  ///
  /// On failure the original block is left untouched. A null `payload`
  /// behaves like [`acquire`](Self::acquire).
  ///
  /// # Safety
  ///
  /// Same contract as [`release`](Self::release).
  pub unsafe fn resize(
    &mut self,
    payload: *mut u8,
    bytes: usize,
  ) -> Result<NonNull<u8>, HeapError> {
    if payload.is_null() {
      return self.acquire(bytes);
    }

    let units = units_for(bytes).ok_or(HeapError::InvalidRequest)?;

    unsafe {
      if (*header_of(payload)).size >= units {
        return NonNull::new(payload).ok_or(HeapError::InvalidRequest);
      }

      let fresh = self.acquire(bytes)?;
      ptr::copy_nonoverlapping(payload, fresh.as_ptr(), self.usable_size(payload));
      self.release(payload);

      Ok(fresh)
    }
  }

  /// Bytes writable through a live block's payload pointer.
  ///
  /// # Safety
  ///
  /// `payload` must be a live pointer returned by this heap.
  pub unsafe fn usable_size(
    &self,
    payload: *mut u8,
  ) -> usize {
    unsafe { ((*header_of(payload)).size - 1) * UNIT }
  }

  pub fn stats(&self) -> HeapStats {
    let mut stats = HeapStats {
      arenas: self.arenas,
      arena_units: self.arena_units,
      ..HeapStats::default()
    };

    if self.anchor.is_null() {
      return stats;
    }

    unsafe {
      let mut block = (*self.anchor).next;
      while block != self.anchor {
        stats.free_blocks += 1;
        stats.free_units += (*block).size;
        block = (*block).next;
      }
    }

    stats
  }

  /// Extends the address space by at least `units` units and releases the new
  /// arena into the free list. The first growth also installs the anchor.
  ///
  /// Returns the cursor left behind by the release.
  fn grow(
    &mut self,
    units: usize,
  ) -> Result<*mut Header, HeapError> {
    let units = units.max(self.min_batch);
    let reserved = usize::from(self.anchor.is_null());
    let total = units.checked_add(reserved).ok_or(HeapError::InvalidRequest)?;

    let Some(start) = self.space.extend(total) else {
      warn!("address space extension of {} units failed", total);
      return Err(HeapError::OutOfMemory);
    };

    self.arenas += 1;
    self.arena_units += total;

    let mut arena = start.as_ptr() as *mut Header;
    debug!("extended address space by {} units at {:p}", total, arena);

    unsafe {
      if self.anchor.is_null() {
        write_header(arena, 0, arena);
        self.anchor = arena;
        self.cursor = arena;
        arena = arena.add(1);
        debug!("installed free-list anchor at {:p}", self.anchor);
      }

      write_header(arena, units, ptr::null_mut());
      self.release(payload_of(arena));
    }

    Ok(self.cursor)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::space::Region;

  /// Hands out spans from the top of a buffer downwards, each one ending where
  /// the previous one starts.
  struct Descending {
    base: *mut u8,
    top: usize,
  }

  impl Descending {
    fn new(bytes: &mut [u8]) -> Self {
      let base = bytes.as_mut_ptr();
      let skip = crate::align!(base as usize) - base as usize;
      let top = (bytes.len() - skip) / UNIT * UNIT;

      Self {
        base: base.wrapping_add(skip),
        top,
      }
    }
  }

  unsafe impl AddressSpace for Descending {
    fn extend(
      &mut self,
      units: usize,
    ) -> Option<NonNull<u8>> {
      let bytes = units.checked_mul(UNIT)?;
      self.top = self.top.checked_sub(bytes)?;
      NonNull::new(self.base.wrapping_add(self.top))
    }
  }

  #[test]
  fn test_first_acquire_installs_anchor() {
    let mut bytes = vec![0u8; 64 * UNIT];
    let mut heap = Heap::with_min_batch(Region::new(&mut bytes), 16);

    assert_eq!(heap.stats(), HeapStats::default());

    let ptr = heap.acquire(UNIT).unwrap().as_ptr();

    let stats = heap.stats();
    assert_eq!(stats.arenas, 1);
    assert_eq!(stats.arena_units, 17);
    assert_eq!(stats.free_blocks, 1);
    assert_eq!(stats.free_units, 14);
    assert_eq!(heap.space().used_units(), 17);
    assert_eq!(unsafe { heap.usable_size(ptr) }, UNIT);
  }

  #[test]
  fn test_split_hands_out_tail() {
    let mut bytes = vec![0u8; 64 * UNIT];
    let mut heap = Heap::with_min_batch(Region::new(&mut bytes), 16);

    let first = heap.acquire(UNIT).unwrap().as_ptr();
    let second = heap.acquire(UNIT).unwrap().as_ptr();

    // Tails are carved off the same block, so each allocation sits below the last.
    assert_eq!(unsafe { second.add(2 * UNIT) }, first);
  }

  #[test]
  fn test_exact_fit_unlinks_block() {
    let mut bytes = vec![0u8; 64 * UNIT];
    let mut heap = Heap::with_min_batch(Region::new(&mut bytes), 16);

    let whole = heap.acquire(15 * UNIT).unwrap();

    let stats = heap.stats();
    assert_eq!(stats.free_blocks, 0);
    assert_eq!(stats.free_units, 0);

    unsafe { heap.release(whole.as_ptr()) };

    assert_eq!(heap.stats().free_blocks, 1);
    assert_eq!(heap.stats().free_units, 16);
  }

  #[test]
  fn test_release_merges_both_sides() {
    let mut bytes = vec![0u8; 64 * UNIT];
    let mut heap = Heap::with_min_batch(Region::new(&mut bytes), 16);

    let a = heap.acquire(UNIT).unwrap().as_ptr();
    let b = heap.acquire(UNIT).unwrap().as_ptr();
    let c = heap.acquire(UNIT).unwrap().as_ptr();
    let _rest = heap.acquire(9 * UNIT).unwrap();

    assert_eq!(heap.stats().free_blocks, 0);

    unsafe {
      heap.release(a);
      heap.release(c);
      assert_eq!(heap.stats().free_blocks, 2);

      heap.release(b);
    }

    let stats = heap.stats();
    assert_eq!(stats.free_blocks, 1);
    assert_eq!(stats.free_units, 6);
  }

  #[test]
  fn test_release_null_is_noop() {
    let mut bytes = vec![0u8; 64 * UNIT];
    let mut heap = Heap::with_min_batch(Region::new(&mut bytes), 16);
    let _ = heap.acquire(0).unwrap();
    let before = heap.stats();

    unsafe { heap.release(ptr::null_mut()) };

    assert_eq!(heap.stats(), before);
  }

  #[test]
  fn test_arena_below_anchor_never_absorbs_it() {
    let mut bytes = vec![0u8; 64 * UNIT];
    let mut heap = Heap::with_min_batch(Descending::new(&mut bytes), 8);

    let small = heap.acquire(UNIT).unwrap();
    // Does not fit the first arena, so a second one lands right below the anchor.
    let big = heap.acquire(12 * UNIT).unwrap();

    let stats = heap.stats();
    assert_eq!(stats.arenas, 2);
    assert_eq!(stats.arena_units, 9 + 13);

    unsafe {
      heap.release(big.as_ptr());
      heap.release(small.as_ptr());
    }

    // The anchor splits the two arenas, so they stay separate blocks.
    let stats = heap.stats();
    assert_eq!(stats.free_blocks, 2);
    assert_eq!(stats.free_units, 8 + 13);

    let again = heap.acquire(12 * UNIT).unwrap();
    assert_eq!(again, big);
  }

  #[test]
  fn test_out_of_memory() {
    let mut bytes = vec![0u8; 8 * UNIT];
    let mut heap = Heap::with_min_batch(Region::new(&mut bytes), 4);

    assert_eq!(heap.acquire(64 * UNIT), Err(HeapError::OutOfMemory));
    assert_eq!(heap.stats().arenas, 0);

    assert!(heap.acquire(UNIT).is_ok());
  }

  #[test]
  fn test_invalid_request() {
    let mut bytes = vec![0u8; 8 * UNIT];
    let mut heap = Heap::with_min_batch(Region::new(&mut bytes), 4);

    assert_eq!(heap.acquire(usize::MAX), Err(HeapError::InvalidRequest));
    assert_eq!(heap.acquire_zeroed(usize::MAX, 2), Err(HeapError::InvalidRequest));
    assert_eq!(heap.stats().arenas, 0);
  }

  #[test]
  fn test_min_batch_is_at_least_one() {
    let mut bytes = vec![0u8; 8 * UNIT];
    let heap = Heap::with_min_batch(Region::new(&mut bytes), 0);

    assert_eq!(heap.min_batch(), 1);
  }
}
