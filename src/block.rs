use core::{mem, ptr, ptr::NonNull};

use crate::align::ALIGNMENT;

/// Bytes occupied by a [`Block`] header in front of every payload.
pub const HEADER_SIZE: usize = mem::size_of::<Block>();

/// Metadata written right before each payload handed out by the heap.
///
/// The header is padded to [`ALIGNMENT`], so a payload starting right after an
/// aligned header is aligned as well.
///
/// Payloads with a stricter alignment sit somewhere inside a regular block and
/// get an alias header of their own: `is_alias` is set, `size` counts the bytes
/// from the aligned payload to the end of the block, and `next` points at the
/// block that owns the bytes. Alias headers are never linked.
#[repr(C, align(16))]
pub struct Block {
  pub size: usize,
  pub next: *mut Block,
  pub prev: *mut Block,
  pub is_free: bool,
  pub is_alias: bool,
}

const _: () = assert!(HEADER_SIZE % ALIGNMENT == 0);
const _: () = assert!(mem::align_of::<Block>() == ALIGNMENT);

impl Block {
  /// An unlinked, in-use block with `size` payload bytes.
  pub const fn new(size: usize) -> Self {
    Self {
      size,
      next: ptr::null_mut(),
      prev: ptr::null_mut(),
      is_free: false,
      is_alias: false,
    }
  }

  /// An alias header for a payload of `size` bytes carved out of `owner`.
  pub const fn alias(
    owner: NonNull<Block>,
    size: usize,
  ) -> Self {
    Self {
      size,
      next: owner.as_ptr(),
      prev: ptr::null_mut(),
      is_free: false,
      is_alias: true,
    }
  }

  /// The linked block behind `payload`, following an alias header if there
  /// is one.
  ///
  /// # Safety
  ///
  /// Same as [`Block::from_payload`].
  pub unsafe fn owner(payload: NonNull<u8>) -> NonNull<Block> {
    unsafe {
      let block = Block::from_payload(payload);

      if (*block.as_ptr()).is_alias {
        NonNull::new_unchecked((*block.as_ptr()).next)
      } else {
        block
      }
    }
  }

  /// Address of the first payload byte of `block`.
  pub fn payload(block: NonNull<Block>) -> NonNull<u8> {
    // Safety: the header is immediately followed by its payload, so one past
    // the header is still inside the same region and not null.
    unsafe { block.add(1).cast::<u8>() }
  }

  /// Recovers the header in front of a payload returned by [`Block::payload`].
  ///
  /// # Safety
  ///
  /// `payload` must have been produced by [`Block::payload`] for a block that
  /// is still linked into the directory.
  pub unsafe fn from_payload(payload: NonNull<u8>) -> NonNull<Block> {
    debug_assert_eq!(payload.as_ptr() as usize % ALIGNMENT, 0);

    unsafe { payload.cast::<Block>().sub(1) }
  }

  /// One past the last payload byte.
  pub fn end(&self) -> *mut u8 {
    let start = self as *const Block as *mut Block;
    start.wrapping_add(1).cast::<u8>().wrapping_add(self.size)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_header_layout() {
    match mem::size_of::<usize>() {
      8 => assert_eq!(HEADER_SIZE, 32),
      4 => assert_eq!(HEADER_SIZE, 16),
      _ => {},
    }
    assert_eq!(HEADER_SIZE % ALIGNMENT, 0);
  }

  #[test]
  fn test_payload_round_trip() {
    let mut block = Block::new(64);
    let header = NonNull::from(&mut block);

    let payload = Block::payload(header);

    assert_eq!(payload.as_ptr() as usize - header.as_ptr() as usize, HEADER_SIZE);
    assert_eq!(unsafe { Block::from_payload(payload) }, header);
  }

  #[test]
  fn test_end() {
    let block = Block::new(48);
    let start = &block as *const Block as usize;

    assert_eq!(block.end() as usize, start + HEADER_SIZE + 48);
    assert!(!block.is_free);
    assert!(!block.is_alias);
    assert!(block.next.is_null() && block.prev.is_null());
  }

  #[test]
  fn test_owner_follows_alias() {
    #[repr(C, align(64))]
    struct Region([Block; 4]);

    let mut region = Region([Block::new(96), Block::new(0), Block::new(0), Block::new(0)]);
    let base = region.0.as_mut_ptr();

    unsafe {
      let owner = NonNull::new_unchecked(base);
      assert_eq!(Block::owner(Block::payload(owner)), owner);

      let alias = NonNull::new_unchecked(base.add(2));
      alias.write(Block::alias(owner, 32));

      let payload = Block::payload(alias);
      assert_eq!(Block::from_payload(payload), alias);
      assert_eq!(Block::owner(payload), owner);
      assert_eq!((*alias.as_ptr()).size, 32);
    }
  }
}
