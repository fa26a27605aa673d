//! C allocation entry points on the process break.
//!
//! Linking this crate with the `override` feature replaces `malloc`,
//! `calloc`, `realloc`, `free` and the aligned variants for the whole
//! process, so every pointer a C caller frees comes from the same heap. Do
//! not install a `log` logger that allocates in such a process: it would
//! re-enter the lock.

use core::{
  ffi::{c_int, c_void},
  mem, ptr,
};

use crate::{ALIGNMENT, BrkAllocator, Locked, Sbrk};

static HEAP: BrkAllocator = Locked::new(Sbrk);

fn page_size() -> usize {
  unsafe { libc::sysconf(libc::_SC_PAGESIZE) as usize }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn malloc(size: usize) -> *mut c_void {
  HEAP.allocate(size).cast()
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn calloc(
  number: usize,
  size: usize,
) -> *mut c_void {
  HEAP.allocate_zeroed(number, size).cast()
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn realloc(
  address: *mut c_void,
  size: usize,
) -> *mut c_void {
  unsafe { HEAP.resize(address.cast(), size).cast() }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn free(address: *mut c_void) {
  unsafe { HEAP.deallocate(address.cast()) }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn malloc_usable_size(address: *mut c_void) -> usize {
  unsafe { HEAP.usable_size(address.cast()) }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn aligned_alloc(
  align: usize,
  size: usize,
) -> *mut c_void {
  HEAP.allocate_aligned(size, align.max(ALIGNMENT)).cast()
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn memalign(
  align: usize,
  size: usize,
) -> *mut c_void {
  unsafe { aligned_alloc(align, size) }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn posix_memalign(
  out: *mut *mut c_void,
  align: usize,
  size: usize,
) -> c_int {
  if !align.is_power_of_two() || align % mem::size_of::<*mut c_void>() != 0 {
    return libc::EINVAL;
  }

  if size == 0 {
    unsafe { out.write(ptr::null_mut()) };
    return 0;
  }

  let address = unsafe { aligned_alloc(align, size) };
  if address.is_null() {
    return libc::ENOMEM;
  }

  unsafe { out.write(address) };
  0
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn valloc(size: usize) -> *mut c_void {
  unsafe { aligned_alloc(page_size(), size) }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn pvalloc(size: usize) -> *mut c_void {
  let page_size = page_size();

  match size.checked_add(page_size - 1) {
    Some(size) => unsafe { aligned_alloc(page_size, size & !(page_size - 1)) },
    None => ptr::null_mut(),
  }
}
