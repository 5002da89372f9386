//! Element lists over raw, manually managed memory.
//!
//! Two list variants share one contract ([`List`]):
//!
//! - [`FixedList`]: capacity fixed at construction, over caller memory
//!   (borrowed) or a region the list allocates once and frees on drop.
//! - [`UnsafeList`]: owns a region from an explicit [`RegionAllocator`],
//!   grows on demand and can adopt foreign allocations.
//!
//! Elements are plain `Copy` data. Single-writer operations take `&mut self`;
//! a [`ParallelWriter`] appends from many threads into a pre-sized list.

pub mod alloc;
pub mod config;
pub mod fixed_list;
pub mod iter;
pub mod list;
pub mod parallel;
pub mod region;
pub mod reinterpret;
pub mod unsafe_list;

pub use alloc::{AllocError, AllocFailure, Budgeted, Heap, PageAllocator, RegionAllocator};
pub use config::GrowthPolicy;
pub use fixed_list::{FixedList, FixedStorage};
pub use iter::{Iter, IterMut};
pub use list::{List, Storage};
pub use parallel::ParallelWriter;
pub use region::OwnedRegion;
pub use reinterpret::Reinterpreted;
pub use unsafe_list::{GrowableStorage, UnsafeList};

pub use rawlist_common::{Error, ErrorKind, Result};
