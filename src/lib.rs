//! # brkalloc - A First-Fit Heap on the Program Break
//!
//! This crate provides a small **first-fit** allocator that manages one
//! contiguous heap region, grown and shrunk with `sbrk(2)`, and can stand in
//! for the allocation entry points of a program.
//!
//! ## Overview
//!
//! Every allocation is a block: a fixed-size header followed by the payload.
//! Blocks are linked in the order they were created, which is also their
//! address order, since each new block is carved out at the current break:
//!
//! ```text
//!   ┌──────────────────────────────────────────────────────────────────────┐
//!   │                         HEAP MEMORY                                  │
//!   │                                                                      │
//!   │   ┌──────┬──────┬──────┬──────┐                                      │
//!   │   │  B1  │  B2  │  B3  │  B4  │                                      │
//!   │   │ used │ free │ used │ used │                                      │
//!   │   └──────┴──────┴──────┴──────┘                                      │
//!   │   ▲                    ▲      ▲                                      │
//!   │   │                    │      │                                      │
//!   │  head                 tail  Program                                  │
//!   │                              Break                                   │
//!   └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! - **allocate**: the first free block large enough is reused as a whole
//!   (B2 above). If there is none, the break is moved up and a new block is
//!   appended after the tail.
//! - **deallocate**: the tail block, if it ends exactly at the break, is
//!   unlinked and the break moved back down. Any other block is only marked
//!   free. Free blocks are never split nor merged.
//! - **resize**: blocks that are already large enough are kept, otherwise the
//!   contents move to a fresh allocation.
//!
//! ## Crate Structure
//!
//! ```text
//!   brkalloc
//!   ├── align      - Alignment constant and macro (align!)
//!   ├── block      - Block header (internal)
//!   ├── boundary   - HeapBoundary trait, Sbrk and ArenaBoundary
//!   ├── directory  - Linked list of blocks (internal)
//!   ├── error      - AllocError
//!   ├── heap       - Heap: allocate, deallocate, resize
//!   ├── locked     - Locked: the heap behind a lock, GlobalAlloc
//!   └── ffi        - malloc, free and friends (feature "override")
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use brkalloc::{BrkAllocator, Locked, Sbrk};
//!
//! #[global_allocator]
//! static ALLOCATOR: BrkAllocator = Locked::new(Sbrk);
//!
//! fn main() {
//!     let v: Vec<u32> = vec![1, 2, 3];
//!     println!("{:?}", v);
//! }
//! ```
//!
//! A heap can also run on a buffer of its own, independent of the break:
//!
//! ```rust
//! use brkalloc::{ArenaBoundary, Heap};
//!
//! let mut heap = Heap::new(ArenaBoundary::with_capacity(1024).unwrap());
//!
//! let a = heap.allocate(64).unwrap();
//! let b = heap.allocate(64).unwrap();
//!
//! unsafe {
//!     heap.deallocate(a.as_ptr());
//!     assert_eq!(heap.allocate(40).unwrap(), a);
//!
//!     heap.deallocate(b.as_ptr());
//!     heap.deallocate(a.as_ptr());
//! }
//!
//! assert!(heap.is_empty());
//! assert_eq!(heap.boundary().used(), 0);
//! ```
//!
//! ## Block Layout
//!
//! ```text
//!   ┌───────────────────────┬────────────────────────────────┐
//!   │    Block Header       │         User Data              │
//!   │  ┌─────────────────┐  │                                │
//!   │  │ size: N         │  │  ┌──────────────────────────┐  │
//!   │  │ next: ptr/null  │  │  │                          │  │
//!   │  │ prev: ptr/null  │  │  │  N bytes usable          │  │
//!   │  │ is_free: false  │  │  │  (multiple of 16)        │  │
//!   │  │ is_alias: false │  │  │                          │  │
//!   │  └─────────────────┘  │  └──────────────────────────┘  │
//!   │  32 bytes (64-bit)    │                                │
//!   └───────────────────────┴────────────────────────────────┘
//!                           ▲
//!                           └── Pointer returned to user
//! ```
//!
//! ## Limitations
//!
//! - **Over-alignment costs slack**: payloads are 16-byte aligned; a stricter
//!   alignment is served from inside a larger block, behind an alias header
//!   that points back at it.
//! - **Limited deallocation**: only the last block can be given back to the
//!   OS.
//! - **No splitting or coalescing**: a reused block keeps its full size.
//! - **Unix-only**: `Sbrk` requires `libc`.
//!
//! ## Safety
//!
//! Pointers passed to `deallocate` and `resize` must come from the same heap;
//! this is not checked.

pub mod align;
mod block;
mod boundary;
mod directory;
mod error;
#[cfg(feature = "override")]
pub mod ffi;
mod heap;
mod locked;

pub use align::ALIGNMENT;
pub use block::HEADER_SIZE;
pub use boundary::{ArenaBoundary, HeapBoundary, Sbrk};
pub use error::AllocError;
pub use heap::Heap;
pub use locked::{BrkAllocator, Locked};
