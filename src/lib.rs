//! # rheap - A Free-List Heap Allocator
//!
//! This crate provides a general-purpose **next-fit free-list allocator** that
//! manages raw memory obtained from a single primitive: one that extends the
//! address space on demand (by default the `sbrk` system call).
//!
//! ## Overview
//!
//! Free memory is kept in a circular list of blocks sorted by address. The
//! list is closed by a size-0 anchor that never holds payload:
//!
//! ```text
//!   Free List:
//!
//!     ┌────────┐     ┌──────────┐     ┌──────────┐     ┌──────────┐
//!   ┌▶│ anchor │────▶│ free (4) │────▶│ free (9) │────▶│ free (2) │──┐
//!   │ │ size 0 │     └──────────┘     └──────────┘     └──────────┘  │
//!   │ └────────┘         low ─────────── address ──────────▶ high    │
//!   └──────────────────────────────────────────────────────────────────┘
//!                              ▲
//!                              └── roaming cursor (next search starts here)
//! ```
//!
//! A request walks the list from the roaming cursor and takes the first block
//! that is large enough. An exact fit is unlinked whole; a larger block gives
//! up its tail and keeps its head in place:
//!
//! ```text
//!   Splitting a free block of 9 units for a 3-unit request:
//!
//!   ┌─────────────────────────────────────┬──────────────────┐
//!   │  free, size 6 (stays on the list)   │ size 3 (handed   │
//!   │                                     │ out)             │
//!   └─────────────────────────────────────┴──────────────────┘
//! ```
//!
//! Released blocks are put back in address order and merged with free
//! neighbours on both sides, so three adjacent blocks can collapse into one.
//!
//! ## Crate Structure
//!
//! ```text
//!   rheap
//!   ├── align      - Unit size, align! macro, byte-to-unit conversion
//!   ├── block      - Block header and header/payload offsets (internal)
//!   ├── error      - HeapError
//!   ├── heap       - Heap: acquire, release and arena growth
//!   ├── space      - AddressSpace trait, Sbrk and Region backends
//!   └── stats      - HeapStats snapshot
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use rheap::Heap;
//!
//! fn main() {
//!     let mut heap = Heap::sbrk();
//!
//!     let ptr = heap.acquire(8).unwrap().as_ptr() as *mut u64;
//!
//!     unsafe {
//!         *ptr = 42;
//!         println!("Value: {}", *ptr);
//!
//!         heap.release(ptr as *mut u8);
//!     }
//! }
//! ```
//!
//! ## How It Works
//!
//! Every block starts with a one-unit header. The payload pointer handed to
//! callers sits exactly one unit after it:
//!
//! ```text
//!   Single Allocation:
//!   ┌───────────────────────┬────────────────────────────────┐
//!   │    Block Header       │         User Data              │
//!   │  ┌─────────────────┐  │                                │
//!   │  │ next: ptr       │  │  ┌──────────────────────────┐  │
//!   │  │ size: N units   │  │  │  (N - 1) units usable    │  │
//!   │  └─────────────────┘  │  └──────────────────────────┘  │
//!   │       1 unit          │                                │
//!   └───────────────────────┴────────────────────────────────┘
//!                           ▲
//!                           └── Pointer returned to user
//! ```
//!
//! When no free block fits, the heap asks its [`AddressSpace`] for at least
//! [`MIN_GROWTH_UNITS`] units, formats the span as one free block and releases
//! it like any other block. If the new span happens to follow the previous
//! one, the two merge.
//!
//! ## Limitations
//!
//! - **Single-threaded only**: no synchronization; `Heap` is neither `Send`
//!   nor `Sync`
//! - **Monotonic growth**: memory is never returned to the address space
//! - **No double-release detection** in release builds
//! - **Unix-only** for the `Sbrk` backend
//!
//! ## Safety
//!
//! Acquiring is safe. Releasing, resizing and querying a block are `unsafe`:
//! the caller must pass a pointer this heap handed out and has not taken back.

pub mod align;
mod block;
mod error;
mod heap;
mod space;
mod stats;

pub use error::HeapError;
pub use heap::{Heap, MIN_GROWTH_UNITS};
pub use space::{AddressSpace, Region, Sbrk, program_break};
pub use stats::HeapStats;
