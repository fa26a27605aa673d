use core::ptr::{self, NonNull};

use log::{debug, trace};

use crate::{
  align::{ALIGNMENT, checked_align},
  block::{Block, HEADER_SIZE},
  boundary::HeapBoundary,
  directory::Directory,
  error::AllocError,
};

/// A first-fit heap over a [`HeapBoundary`].
///
/// Free blocks are reused as they are: never split, never merged with their
/// neighbours. Memory goes back to the boundary only when the physically last
/// block is released.
///
/// `Heap` is not synchronized; wrap it in [`Locked`](crate::Locked) to share
/// it between threads.
pub struct Heap<B> {
  directory: Directory,
  boundary: B,
}

// Safety: the heap exclusively owns every block it links.
unsafe impl<B: Send> Send for Heap<B> {}

impl<B> Heap<B> {
  pub const fn new(boundary: B) -> Self {
    Self {
      directory: Directory::new(),
      boundary,
    }
  }

  /// Number of blocks currently tracked, free or not.
  pub fn len(&self) -> usize {
    self.directory.len()
  }

  pub fn is_empty(&self) -> bool {
    self.directory.is_empty()
  }

  pub fn boundary(&self) -> &B {
    &self.boundary
  }
}

impl<B: HeapBoundary> Heap<B> {
  /// Returns a 16-aligned payload of at least `size` bytes.
  ///
  /// A free block is reused if one is large enough, otherwise the boundary is
  /// extended by a header plus `size` rounded up to the alignment.
  pub fn allocate(
    &mut self,
    size: usize,
  ) -> Result<NonNull<u8>, AllocError> {
    if size == 0 {
      return Err(AllocError::ZeroSize);
    }

    let size = checked_align(size).ok_or(AllocError::OutOfMemory)?;

    // Safety: the directory only links blocks this heap created.
    if let Some(block) = unsafe { self.directory.find_first_free(size) } {
      unsafe { (*block.as_ptr()).is_free = false };
      let payload = Block::payload(block);

      trace!("allocate({size}): reused {payload:?}");
      return Ok(payload);
    }

    let total_size = HEADER_SIZE
      .checked_add(size)
      .ok_or(AllocError::OutOfMemory)?;

    let address = self.boundary.extend(total_size).inspect_err(|_| {
      debug!("allocate({size}): boundary refused {total_size} bytes");
    })?;

    let block = address.cast::<Block>();

    // Safety: `extend` handed us `total_size` fresh, aligned bytes past every
    // block already linked.
    unsafe {
      block.write(Block::new(size));
      self.directory.append(block);
    }

    let payload = Block::payload(block);
    debug!("allocate({size}): extended boundary by {total_size} bytes, block at {block:?}");
    trace!("allocate({size}): new {payload:?}");

    Ok(payload)
  }

  /// Like [`Heap::allocate`], for payloads aligned to `align` bytes.
  ///
  /// Alignments up to [`ALIGNMENT`] are plain allocations. Stricter ones
  /// allocate enough slack to place an alias header and the payload at the
  /// next `align` boundary inside the block; every other operation follows
  /// the alias back to the owning block.
  pub fn allocate_aligned(
    &mut self,
    size: usize,
    align: usize,
  ) -> Result<NonNull<u8>, AllocError> {
    if !align.is_power_of_two() {
      return Err(AllocError::InvalidAlignment);
    }

    if align <= ALIGNMENT {
      return self.allocate(size);
    }

    if size == 0 {
      return Err(AllocError::ZeroSize);
    }

    // The owner's payload is only 16-aligned, so reaching the next `align`
    // boundary past an alias header costs at most this much.
    let slack = HEADER_SIZE + (align - ALIGNMENT);
    let padded = size.checked_add(slack).ok_or(AllocError::OutOfMemory)?;

    let base = self.allocate(padded)?;

    unsafe {
      let owner = Block::from_payload(base);
      let capacity = (*owner.as_ptr()).size;

      let start = base.as_ptr() as usize;
      let offset = ((start + HEADER_SIZE + align - 1) & !(align - 1)) - start;
      debug_assert!(offset >= HEADER_SIZE && offset <= slack);

      let payload = base.add(offset);
      Block::from_payload(payload).write(Block::alias(owner, capacity - offset));

      trace!("allocate_aligned({size}, {align}): {payload:?} inside {base:?}");
      Ok(payload)
    }
  }

  /// Releases the block behind `address`.
  ///
  /// The last block of the heap is unlinked and its bytes returned to the
  /// boundary; any other block is only marked free. Null is ignored.
  ///
  /// # Safety
  ///
  /// `address` must be null or a live payload returned by this heap.
  pub unsafe fn deallocate(
    &mut self,
    address: *mut u8,
  ) {
    let Some(payload) = NonNull::new(address) else {
      return;
    };

    unsafe {
      let block = Block::owner(payload);
      let size = (*block.as_ptr()).size;

      let is_last = (*block.as_ptr()).end() == self.boundary.current_boundary()
        && self.directory.tail() == Some(block);

      if !is_last {
        (*block.as_ptr()).is_free = true;
        trace!("deallocate({payload:?}): marked free");
        return;
      }

      self.directory.remove_tail();
      self.boundary.shrink(HEADER_SIZE + size);

      debug!("deallocate({payload:?}): trimmed {} bytes", HEADER_SIZE + size);
    }
  }

  /// Grows the block behind `address` to hold `new_size` bytes.
  ///
  /// Blocks that are already large enough are returned untouched. Otherwise
  /// the contents move to a fresh allocation and the old block is released;
  /// if that allocation fails the old block stays valid.
  ///
  /// Capacity is compared in whole [`ALIGNMENT`] units, not in requested
  /// bytes: a block allocated for 40 bytes holds 48, so growing it to 45
  /// keeps it in place.
  ///
  /// Null `address` or zero `new_size` behave like [`Heap::allocate`].
  ///
  /// # Safety
  ///
  /// `address` must be null or a live payload returned by this heap.
  pub unsafe fn resize(
    &mut self,
    address: *mut u8,
    new_size: usize,
  ) -> Result<NonNull<u8>, AllocError> {
    unsafe { self.resize_aligned(address, new_size, ALIGNMENT) }
  }

  /// [`Heap::resize`] for payloads that were allocated with `align`; a moved
  /// payload keeps that alignment.
  ///
  /// # Safety
  ///
  /// `address` must be null or a live payload returned by this heap.
  pub unsafe fn resize_aligned(
    &mut self,
    address: *mut u8,
    new_size: usize,
    align: usize,
  ) -> Result<NonNull<u8>, AllocError> {
    let payload = match NonNull::new(address) {
      Some(payload) if new_size != 0 => payload,
      _ => return self.allocate_aligned(new_size, align),
    };

    unsafe {
      let size = self.usable_size(payload.as_ptr());

      if size >= new_size {
        trace!("resize({payload:?}, {new_size}): fits in {size} bytes");
        return Ok(payload);
      }

      let moved = self.allocate_aligned(new_size, align)?;

      ptr::copy_nonoverlapping(payload.as_ptr(), moved.as_ptr(), size.min(new_size));
      self.deallocate(payload.as_ptr());

      trace!("resize({payload:?}, {new_size}): moved to {moved:?}");
      Ok(moved)
    }
  }

  /// Payload capacity of the block behind `address`; 0 for null.
  ///
  /// # Safety
  ///
  /// `address` must be null or a live payload returned by this heap.
  pub unsafe fn usable_size(
    &self,
    address: *mut u8,
  ) -> usize {
    match NonNull::new(address) {
      Some(payload) => unsafe { (*Block::from_payload(payload).as_ptr()).size },
      None => 0,
    }
  }
}
