use core::{
  alloc::{GlobalAlloc, Layout},
  ptr::{self, NonNull},
};

use spin::{Mutex, MutexGuard};

use crate::{
  boundary::{HeapBoundary, Sbrk},
  heap::Heap,
};

/// A [`Heap`] on the process break, usable as the global allocator.
///
/// ```rust,ignore
/// use brkalloc::{BrkAllocator, Locked, Sbrk};
///
/// #[global_allocator]
/// static ALLOCATOR: BrkAllocator = Locked::new(Sbrk);
/// ```
pub type BrkAllocator = Locked<Sbrk>;

/// A [`Heap`] behind a single lock.
///
/// Every operation holds the lock from start to end, boundary adjustments
/// included, so requests from different threads never interleave.
pub struct Locked<B> {
  inner: Mutex<Heap<B>>,
}

impl<B> Locked<B> {
  pub const fn new(boundary: B) -> Self {
    Self {
      inner: Mutex::new(Heap::new(boundary)),
    }
  }

  /// Blocks until the heap is available.
  pub fn lock(&self) -> MutexGuard<'_, Heap<B>> {
    self.inner.lock()
  }
}

impl<B: HeapBoundary> Locked<B> {
  /// `malloc`: a payload of at least `size` bytes, or null.
  pub fn allocate(
    &self,
    size: usize,
  ) -> *mut u8 {
    self
      .lock()
      .allocate(size)
      .map_or(ptr::null_mut(), NonNull::as_ptr)
  }

  /// `aligned_alloc`: a payload of at least `size` bytes aligned to `align`,
  /// or null. `align` must be a power of two.
  pub fn allocate_aligned(
    &self,
    size: usize,
    align: usize,
  ) -> *mut u8 {
    self
      .lock()
      .allocate_aligned(size, align)
      .map_or(ptr::null_mut(), NonNull::as_ptr)
  }

  /// `calloc`: `number * size` zeroed bytes, or null on overflow.
  pub fn allocate_zeroed(
    &self,
    number: usize,
    size: usize,
  ) -> *mut u8 {
    let Some(total) = number.checked_mul(size) else {
      return ptr::null_mut();
    };

    let address = self.allocate(total);
    if !address.is_null() {
      // A reused block still holds whatever its previous owner wrote.
      unsafe { address.write_bytes(0, total) };
    }

    address
  }

  /// `free`.
  ///
  /// # Safety
  ///
  /// `address` must be null or a live payload returned by this allocator.
  pub unsafe fn deallocate(
    &self,
    address: *mut u8,
  ) {
    unsafe { self.lock().deallocate(address) }
  }

  /// `realloc`: null on failure, in which case `address` is still valid.
  ///
  /// # Safety
  ///
  /// `address` must be null or a live payload returned by this allocator.
  pub unsafe fn resize(
    &self,
    address: *mut u8,
    new_size: usize,
  ) -> *mut u8 {
    unsafe {
      self
        .lock()
        .resize(address, new_size)
        .map_or(ptr::null_mut(), NonNull::as_ptr)
    }
  }

  /// `malloc_usable_size`.
  ///
  /// # Safety
  ///
  /// `address` must be null or a live payload returned by this allocator.
  pub unsafe fn usable_size(
    &self,
    address: *mut u8,
  ) -> usize {
    unsafe { self.lock().usable_size(address) }
  }
}

impl<B: Default> Default for Locked<B> {
  fn default() -> Self {
    Self::new(B::default())
  }
}

unsafe impl<B: HeapBoundary> GlobalAlloc for Locked<B> {
  unsafe fn alloc(
    &self,
    layout: Layout,
  ) -> *mut u8 {
    self.allocate_aligned(layout.size(), layout.align())
  }

  unsafe fn dealloc(
    &self,
    ptr: *mut u8,
    _layout: Layout,
  ) {
    unsafe { self.deallocate(ptr) }
  }

  unsafe fn realloc(
    &self,
    ptr: *mut u8,
    layout: Layout,
    new_size: usize,
  ) -> *mut u8 {
    unsafe {
      self
        .lock()
        .resize_aligned(ptr, new_size, layout.align())
        .map_or(ptr::null_mut(), NonNull::as_ptr)
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{block::HEADER_SIZE, boundary::ArenaBoundary};

  #[test]
  fn test_entry_points() {
    let allocator = Locked::new(ArenaBoundary::with_capacity(1024).unwrap());

    assert!(allocator.allocate(0).is_null());

    let a = allocator.allocate(20);
    assert!(!a.is_null());
    assert_eq!(unsafe { allocator.usable_size(a) }, 32);

    unsafe {
      a.write_bytes(7, 20);

      let b = allocator.resize(a, 100);
      assert!(!b.is_null());
      assert_ne!(a, b);
      assert_eq!(*b.add(19), 7);

      allocator.deallocate(b);
    }

    assert_eq!(allocator.lock().boundary().used(), HEADER_SIZE + 32);
  }

  #[test]
  fn test_resize_failure_keeps_block() {
    let allocator = Locked::new(ArenaBoundary::with_capacity(128).unwrap());

    let a = allocator.allocate(16);

    unsafe {
      a.write(42);

      assert!(allocator.resize(a, 4096).is_null());
      assert_eq!(*a, 42);
      assert_eq!(allocator.usable_size(a), 16);
    }

    assert_eq!(allocator.lock().len(), 1);
  }

  #[test]
  fn test_global_alloc_large_alignment() {
    let allocator = Locked::new(ArenaBoundary::with_capacity(4096).unwrap());

    unsafe {
      let layout = Layout::from_size_align(512, 128).unwrap();
      let ptr = allocator.alloc(layout);
      assert!(!ptr.is_null());
      assert_eq!(ptr as usize % 128, 0);
      ptr.write_bytes(0x5A, 512);

      let grown = allocator.realloc(ptr, layout, 1024);
      assert!(!grown.is_null());
      assert_eq!(grown as usize % 128, 0);
      assert!((0..512).all(|i| *grown.add(i) == 0x5A));

      let small = Layout::from_size_align(64, 16).unwrap();
      let zeroed = allocator.alloc_zeroed(small);
      assert_eq!(zeroed as usize % 16, 0);
      assert!((0..64).all(|i| *zeroed.add(i) == 0));

      allocator.dealloc(zeroed, small);
      allocator.dealloc(grown, Layout::from_size_align(1024, 128).unwrap());
    }

    // Only the first block, released while not last, stays behind.
    assert_eq!(allocator.lock().len(), 1);
  }

  #[test]
  fn test_allocate_zeroed_clears_reused_block() {
    let allocator = Locked::new(ArenaBoundary::with_capacity(1024).unwrap());

    let dirty = allocator.allocate(64);
    let _guard = allocator.allocate(16);

    unsafe {
      dirty.write_bytes(0xFF, 64);
      allocator.deallocate(dirty);
    }

    let zeroed = allocator.allocate_zeroed(4, 16);
    assert_eq!(zeroed, dirty);
    assert!((0..64).all(|i| unsafe { *zeroed.add(i) } == 0));
  }

  #[test]
  fn test_allocate_zeroed_overflow() {
    let allocator = Locked::new(ArenaBoundary::with_capacity(1024).unwrap());

    assert!(allocator.allocate_zeroed(usize::MAX, 2).is_null());
    assert!(allocator.allocate_zeroed(0, 16).is_null());
    assert!(allocator.lock().is_empty());
  }

  #[test]
  fn test_allocate_aligned_entry_point() {
    let allocator = Locked::new(ArenaBoundary::with_capacity(1024).unwrap());

    assert!(allocator.allocate_aligned(16, 24).is_null());

    let address = allocator.allocate_aligned(40, 64);
    assert_eq!(address as usize % 64, 0);

    unsafe { allocator.deallocate(address) };
    assert!(allocator.lock().is_empty());
  }
}
