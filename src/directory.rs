use core::ptr::{self, NonNull};

use crate::block::Block;

/// Every block of a heap, in allocation order.
///
/// Blocks are only ever appended at the tail, and since each new block is
/// carved out at the current heap boundary, list order is also address order:
/// `tail` is always the physically last block.
pub struct Directory {
  head: *mut Block,
  tail: *mut Block,
  len: usize,
}

impl Directory {
  pub const fn new() -> Self {
    Self {
      head: ptr::null_mut(),
      tail: ptr::null_mut(),
      len: 0,
    }
  }

  pub fn len(&self) -> usize {
    self.len
  }

  pub fn is_empty(&self) -> bool {
    self.head.is_null()
  }

  #[cfg(test)]
  pub fn head(&self) -> Option<NonNull<Block>> {
    NonNull::new(self.head)
  }

  pub fn tail(&self) -> Option<NonNull<Block>> {
    NonNull::new(self.tail)
  }

  /// First-fit search: the first free block, in list order, that can hold
  /// `min_size` bytes.
  ///
  /// # Safety
  ///
  /// Every linked block must still be valid.
  pub unsafe fn find_first_free(
    &self,
    min_size: usize,
  ) -> Option<NonNull<Block>> {
    unsafe {
      let mut current: *mut Block = self.head;

      while !current.is_null() {
        if (*current).is_free && (*current).size >= min_size {
          return NonNull::new(current);
        }
        current = (*current).next;
      }

      None
    }
  }

  /// Links `block` after the current tail.
  ///
  /// # Safety
  ///
  /// `block` must be valid, not yet linked, and lie past every linked block.
  pub unsafe fn append(
    &mut self,
    block: NonNull<Block>,
  ) {
    unsafe {
      let block = block.as_ptr();
      (*block).next = ptr::null_mut();
      (*block).prev = self.tail;

      if self.head.is_null() {
        self.head = block;
      } else {
        debug_assert!(block > self.tail);
        (*self.tail).next = block;
      }

      self.tail = block;
      self.len += 1;
    }
  }

  /// Unlinks the tail and returns it; its predecessor becomes the new tail.
  ///
  /// # Safety
  ///
  /// Every linked block must still be valid.
  pub unsafe fn remove_tail(&mut self) -> Option<NonNull<Block>> {
    unsafe {
      let removed = NonNull::new(self.tail)?;

      if self.head == self.tail {
        self.head = ptr::null_mut();
        self.tail = ptr::null_mut();
      } else {
        let previous = (*self.tail).prev;
        (*previous).next = ptr::null_mut();
        self.tail = previous;
      }

      (*removed.as_ptr()).prev = ptr::null_mut();
      self.len -= 1;

      Some(removed)
    }
  }
}

impl Default for Directory {
  fn default() -> Self {
    Self::new()
  }
}
