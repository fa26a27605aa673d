use core::ptr::{self, NonNull};

use libc::{c_void, intptr_t, sbrk};
use log::debug;

use crate::{
  align,
  align::{ALIGNMENT, checked_align},
  error::AllocError,
};

/// Something that owns one contiguous region and can move its end.
///
/// # Safety
///
/// Regions returned by [`HeapBoundary::extend`] must be valid for reads and
/// writes, aligned to [`ALIGNMENT`], and must not overlap anything else until
/// they are given back through [`HeapBoundary::shrink`].
pub unsafe trait HeapBoundary {
  /// Grows the region by exactly `total_bytes` and returns where the new
  /// bytes start. Either all of them are granted or none.
  fn extend(
    &mut self,
    total_bytes: usize,
  ) -> Result<NonNull<u8>, AllocError>;

  /// Address right past the last byte currently owned.
  fn current_boundary(&self) -> *mut u8;

  /// Gives the last `total_bytes` back.
  ///
  /// # Safety
  ///
  /// The bytes must come from previous calls to [`HeapBoundary::extend`], be
  /// the last ones before the boundary, and no longer be in use.
  unsafe fn shrink(
    &mut self,
    total_bytes: usize,
  );
}

/// The program break, moved with `sbrk(2)`.
#[derive(Debug, Default, Clone, Copy)]
pub struct Sbrk;

fn sbrk_failed(address: *mut c_void) -> bool {
  address == usize::MAX as *mut c_void
}

unsafe impl HeapBoundary for Sbrk {
  fn extend(
    &mut self,
    total_bytes: usize,
  ) -> Result<NonNull<u8>, AllocError> {
    unsafe {
      let current = sbrk(0);
      if sbrk_failed(current) {
        return Err(AllocError::OutOfMemory);
      }

      // The initial break is not necessarily aligned.
      let padding = align!(current as usize) - current as usize;

      let increment = total_bytes
        .checked_add(padding)
        .filter(|&increment| increment <= intptr_t::MAX as usize)
        .ok_or(AllocError::OutOfMemory)?;

      let address = sbrk(increment as intptr_t);
      if sbrk_failed(address) {
        return Err(AllocError::OutOfMemory);
      }

      // Someone else moved the break in between; what we got may not leave
      // room for the padding.
      let start = align!(address as usize);
      if start + total_bytes > address as usize + increment {
        debug!("sbrk: break moved concurrently, dropping {increment} bytes at {address:?}");
        return Err(AllocError::OutOfMemory);
      }

      if padding != 0 {
        debug!("sbrk: padded break by {padding} bytes");
      }

      NonNull::new(start as *mut u8).ok_or(AllocError::OutOfMemory)
    }
  }

  fn current_boundary(&self) -> *mut u8 {
    unsafe { sbrk(0) as *mut u8 }
  }

  unsafe fn shrink(
    &mut self,
    total_bytes: usize,
  ) {
    unsafe {
      sbrk(0 - total_bytes as intptr_t);
    }
  }
}

#[repr(C, align(16))]
#[derive(Clone, Copy)]
struct Chunk([u8; ALIGNMENT]);

/// A fixed-capacity region with its own break cursor.
///
/// Lets a [`Heap`](crate::Heap) run on memory it fully controls, independent
/// of the process break and of any other heap.
pub struct ArenaBoundary {
  start: NonNull<Chunk>,
  chunks: usize,
  used: usize,
}

// Safety: the arena exclusively owns its buffer.
unsafe impl Send for ArenaBoundary {}

impl ArenaBoundary {
  /// Creates an arena of at least `bytes` bytes (rounded up to
  /// [`ALIGNMENT`]).
  ///
  /// Fails with [`AllocError::OutOfMemory`] when the rounded capacity does
  /// not fit in `usize` or the buffer cannot be allocated.
  pub fn with_capacity(bytes: usize) -> Result<Self, AllocError> {
    let chunks = checked_align(bytes).ok_or(AllocError::OutOfMemory)? / ALIGNMENT;

    let mut storage: Vec<Chunk> = Vec::new();
    storage
      .try_reserve_exact(chunks)
      .map_err(|_| AllocError::OutOfMemory)?;
    storage.resize(chunks, Chunk([0; ALIGNMENT]));

    let start = NonNull::from(Box::leak(storage.into_boxed_slice())).cast::<Chunk>();

    Ok(Self {
      start,
      chunks,
      used: 0,
    })
  }

  /// First byte of the arena.
  pub fn base(&self) -> *mut u8 {
    self.start.as_ptr().cast()
  }

  pub fn capacity(&self) -> usize {
    self.chunks * ALIGNMENT
  }

  /// Bytes currently below the break.
  pub fn used(&self) -> usize {
    self.used
  }
}

impl Drop for ArenaBoundary {
  fn drop(&mut self) {
    unsafe {
      drop(Box::from_raw(ptr::slice_from_raw_parts_mut(
        self.start.as_ptr(),
        self.chunks,
      )));
    }
  }
}

unsafe impl HeapBoundary for ArenaBoundary {
  fn extend(
    &mut self,
    total_bytes: usize,
  ) -> Result<NonNull<u8>, AllocError> {
    if total_bytes > self.capacity() - self.used {
      return Err(AllocError::OutOfMemory);
    }

    debug_assert_eq!(total_bytes % ALIGNMENT, 0);

    let start = self.current_boundary();
    self.used += total_bytes;

    NonNull::new(start).ok_or(AllocError::OutOfMemory)
  }

  fn current_boundary(&self) -> *mut u8 {
    self.base().wrapping_add(self.used)
  }

  unsafe fn shrink(
    &mut self,
    total_bytes: usize,
  ) {
    debug_assert!(total_bytes <= self.used);
    self.used -= total_bytes;
  }
}
