//! Traits and definitions used throughout the rawlist crates.
//!
//! This crate provides the allocator seam shared by the element lists and the
//! support crates that supply memory to them. It has no dependencies so that
//! any allocator implementation can depend on it cheaply.
//!
//! # Modules
//!
//! - [`region_allocator`]: The [`RegionAllocator`](region_allocator::RegionAllocator)
//!   trait for sources of raw contiguous memory, and the [`AllocError`](region_allocator::AllocError)
//!   they report.

pub mod region_allocator;
