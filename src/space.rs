use std::{marker::PhantomData, ptr::NonNull};

use libc::{c_void, intptr_t, sbrk};

use crate::{align, align::UNIT};

/// Source of fresh address space for a heap.
///
/// # Safety
///
/// A span returned by `extend(units)` must be aligned to [`UNIT`], valid for
/// reads and writes of `units * UNIT` bytes for as long as the implementor
/// lives, and must not overlap any span returned before. Spans need not be
/// contiguous with earlier ones.
pub unsafe trait AddressSpace {
  /// Extends the address space by `units` units and returns the start of the
  /// new span, or `None` if the extension cannot be satisfied.
  fn extend(
    &mut self,
    units: usize,
  ) -> Option<NonNull<u8>>;
}

/// Grows the process data segment with `sbrk(2)`.
///
/// Memory obtained this way stays mapped until process exit.
#[derive(Debug, Default)]
pub struct Sbrk;

/// Current program break.
pub fn program_break() -> *mut c_void {
  unsafe { sbrk(0) }
}

unsafe impl AddressSpace for Sbrk {
  fn extend(
    &mut self,
    units: usize,
  ) -> Option<NonNull<u8>> {
    let bytes = units.checked_mul(UNIT)?;

    let current = program_break() as usize;
    if current == usize::MAX {
      return None;
    }
    // Pad an unaligned break up to the next unit; an aligned one needs nothing.
    let slack = align!(current) - current;
    let increment = intptr_t::try_from(bytes.checked_add(slack)?).ok()?;

    let start = unsafe { sbrk(increment) };
    if start as usize == usize::MAX {
      return None;
    }

    let start = start as *mut u8;
    let skip = align!(start as usize) - start as usize;

    // Someone else moved the break in between; top up the missing bytes.
    if skip > slack {
      let missing = intptr_t::try_from(skip - slack).ok()?;
      let extra = unsafe { sbrk(missing) } as *mut u8;
      if extra != start.wrapping_add(bytes + slack) {
        return None;
      }
    }

    NonNull::new(start.wrapping_add(skip))
  }
}

/// Monotonic address space carved from caller-owned bytes.
///
/// Successive extensions are contiguous.
pub struct Region<'a> {
  base: *mut u8,
  capacity: usize,
  used: usize,
  _bytes: PhantomData<&'a mut [u8]>,
}

impl<'a> Region<'a> {
  pub fn new(bytes: &'a mut [u8]) -> Self {
    let start = bytes.as_mut_ptr();
    let skip = (align!(start as usize) - start as usize).min(bytes.len());
    let capacity = (bytes.len() - skip) / UNIT * UNIT;

    Self {
      base: start.wrapping_add(skip),
      capacity,
      used: 0,
      _bytes: PhantomData,
    }
  }

  /// Total units this region can ever hand out.
  pub fn capacity_units(&self) -> usize {
    self.capacity / UNIT
  }

  /// Units already handed out.
  pub fn used_units(&self) -> usize {
    self.used / UNIT
  }
}

unsafe impl AddressSpace for Region<'_> {
  fn extend(
    &mut self,
    units: usize,
  ) -> Option<NonNull<u8>> {
    let bytes = units.checked_mul(UNIT)?;
    if bytes > self.capacity - self.used {
      return None;
    }

    let start = self.base.wrapping_add(self.used);
    self.used += bytes;

    NonNull::new(start)
  }
}
