use std::{error, fmt};

/// Why a request could not be served.
///
/// The entry points that replace `malloc` and friends turn every variant into
/// a null pointer; nothing is retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocError {
  /// An allocation of zero bytes was requested.
  ZeroSize,
  /// The heap boundary could not be moved far enough.
  OutOfMemory,
  /// A requested alignment was not a power of two.
  InvalidAlignment,
}

impl fmt::Display for AllocError {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    match self {
      AllocError::ZeroSize => f.write_str("zero-sized allocation request"),
      AllocError::OutOfMemory => f.write_str("heap boundary could not be extended"),
      AllocError::InvalidAlignment => f.write_str("alignment is not a power of two"),
    }
  }
}

impl error::Error for AllocError {}
