use std::{error, fmt};

/// Reasons an acquire can fail. There is no partial success.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeapError {
  /// The address space could not be extended far enough.
  OutOfMemory,
  /// The requested size overflows the unit computation.
  InvalidRequest,
}

impl fmt::Display for HeapError {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    match self {
      HeapError::OutOfMemory => write!(f, "out of memory: address space extension failed"),
      HeapError::InvalidRequest => write!(f, "invalid request: size computation overflows"),
    }
  }
}

impl error::Error for HeapError {}
