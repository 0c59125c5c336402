use std::mem;

use crate::block::Header;

/// Size of one allocation unit in bytes. Every block, header included, is a
/// whole number of units long.
pub const UNIT: usize = mem::size_of::<Header>();

/// Rounds `value` up to the next multiple of [`UNIT`].
///
/// # Examples
///
/// ```rust
/// use rheap::{align, align::UNIT};
///
/// assert_eq!(align!(1), UNIT);
/// assert_eq!(align!(UNIT), UNIT);
/// assert_eq!(align!(UNIT + 1), 2 * UNIT);
/// ```
#[macro_export]
macro_rules! align {
  ($value:expr) => {
    ($value + $crate::align::UNIT - 1) & !($crate::align::UNIT - 1)
  };
}

/// Number of units needed to hold `bytes` of payload plus the block header.
///
/// Returns `None` when the block would not fit in `isize::MAX` bytes, which is
/// the most any extension can ever hand out.
pub const fn units_for(bytes: usize) -> Option<usize> {
  let payload = bytes.div_ceil(UNIT);
  let units = match payload.checked_add(1) {
    Some(units) => units,
    None => return None,
  };

  match units.checked_mul(UNIT) {
    Some(total) if total <= isize::MAX as usize => Some(units),
    _ => None,
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_unit_is_power_of_two() {
    assert!(UNIT.is_power_of_two());
    assert!(UNIT >= 2 * mem::size_of::<usize>());
  }

  #[test]
  fn test_align() {
    let mut alignments = Vec::new();

    for i in 0..10 {
      let sizes = (UNIT * i + 1)..=(UNIT * (i + 1));

      let expected_alignment = UNIT * (i + 1);

      alignments.push((sizes, expected_alignment));
    }

    for (sizes, expected) in alignments {
      for size in sizes {
        assert_eq!(expected, align!(size));
      }
    }
  }

  #[test]
  fn test_units_for() {
    assert_eq!(units_for(0), Some(1));
    assert_eq!(units_for(1), Some(2));
    assert_eq!(units_for(UNIT), Some(2));
    assert_eq!(units_for(UNIT + 1), Some(3));
    assert_eq!(units_for(10 * UNIT), Some(11));
  }

  #[test]
  fn test_units_for_overflow() {
    assert_eq!(units_for(usize::MAX), None);
    assert_eq!(units_for(usize::MAX - UNIT), None);
    assert_eq!(units_for(isize::MAX as usize), None);
  }
}
