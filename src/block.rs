use std::ptr;

/// Block header, stored in the first unit of every block.
///
/// `size` counts whole units including this header. `next` is only meaningful
/// while the block sits on the free list.
#[repr(C, align(16))]
pub struct Header {
  pub next: *mut Header,
  pub size: usize,
}

impl Header {
  pub fn new(
    size: usize,
    next: *mut Header,
  ) -> Self {
    Self { next, size }
  }
}

/// Payload start of the block described by `header`.
#[inline]
pub fn payload_of(header: *mut Header) -> *mut u8 {
  header.wrapping_add(1) as *mut u8
}

/// Header of the block whose payload starts at `payload`.
#[inline]
pub fn header_of(payload: *mut u8) -> *mut Header {
  debug_assert!(
    payload as usize % align_of::<Header>() == 0,
    "payload {payload:?} is not unit aligned"
  );

  (payload as *mut Header).wrapping_sub(1)
}

/// First address past the block.
///
/// # Safety
///
/// `header` must point to an initialized header.
#[inline]
pub unsafe fn end_of(header: *mut Header) -> *mut Header {
  unsafe { header.wrapping_add((*header).size) }
}

/// Writes a fresh header at `at` and returns it.
///
/// # Safety
///
/// `at` must be unit aligned and valid for writes of one unit.
#[inline]
pub unsafe fn write_header(
  at: *mut Header,
  size: usize,
  next: *mut Header,
) -> *mut Header {
  unsafe { ptr::write(at, Header::new(size, next)) };
  at
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::align::UNIT;

  #[test]
  fn test_offsets_are_one_unit() {
    let mut units = [Header::new(0, ptr::null_mut()), Header::new(0, ptr::null_mut())];
    let header: *mut Header = &mut units[0];

    let payload = payload_of(header);

    assert_eq!(payload as usize - header as usize, UNIT);
    assert_eq!(header_of(payload), header);
  }

  #[test]
  fn test_end_of() {
    let mut units: [Header; 4] = std::array::from_fn(|_| Header::new(0, ptr::null_mut()));
    let base: *mut Header = units.as_mut_ptr();

    unsafe {
      let header = write_header(base, 3, ptr::null_mut());

      assert_eq!(end_of(header), base.add(3));
      assert_eq!((*header).size, 3);
      assert!((*header).next.is_null());
    }
  }
}
