//! # Pointers that survive relocation
//!
//! This crate provides references that stay valid after the memory containing them is copied,
//! memory-mapped at a different address, or written to a file and loaded back. No fixup pass is
//! needed, because every reference is stored as a byte offset from its own address.
//!
//! ## Examples
//!
//! Duplicate a record that points into itself with [`RelativePointer`]
//!
//! ```
//! use relative_ptr::RelativePointer;
//!
//! #[repr(C)]
//! struct Record {
//!     ptr: RelativePointer<i32>,
//!     data: i32,
//! }
//!
//! let mut record = Record {
//!     ptr: RelativePointer::null(),
//!     data: 42,
//! };
//! record.ptr.set(&raw const record.data);
//!
//! // The bitwise copy points at its own data, not at the original
//! let mut copy = unsafe { std::ptr::read(&record) };
//! // Nothing has exposed the new memory yet
//! let _ = (&raw mut copy).expose_provenance();
//! assert!(copy.ptr == &raw const copy.data);
//!
//! *unsafe { copy.ptr.as_mut() }.unwrap() = 21;
//! assert_eq!(copy.data, 21);
//! assert_eq!(record.data, 42);
//! ```
//!
//! Persist a [`RelativeSpan`] inside a [`Region`] and read it back from a copy
//!
//! ```
//! use relative_ptr::{Region, RelativeSpan};
//!
//! let mut region = Region::zeroed(64);
//! let values = region.slice_mut::<u32>(16, 4).unwrap();
//! values.copy_from_slice(&[1, 2, 3, 4]);
//! let values = values.as_ptr();
//!
//! let slot = unsafe { region.slot_mut::<RelativeSpan<u32>>(0).unwrap() };
//! RelativeSpan::init_raw(slot, values, 4);
//!
//! let copy = Region::from_bytes(region.as_bytes());
//! let span = copy.get::<RelativeSpan<u32>>(0).unwrap();
//! assert_eq!(copy.resolve_span(span).unwrap(), &[1, 2, 3, 4]);
//! ```
//!
//! ## Moves and copies
//!
//! A Rust move is a bitwise copy. Moving a [`RelativePointer`] together with its target is a
//! relocation and keeps it valid, so a struct that points into itself stays correct wherever it
//! is moved. Moving a pointer *away* from its target silently changes what it resolves to. For
//! this reason the types are neither `Clone` nor `Copy`: build them in place with `init` or
//! `emplace`, and copy one into another with `assign`, which resolves the source and re-encodes
//! it relative to the destination.
//!
//! Resolution uses exposed provenance. Memory that a pointer and its target were byte-copied into
//! has to be exposed with `expose_provenance` before it is read through the unsafe accessors.
//! Regions expose their buffers themselves. Run `cargo +nightly miri test` to check code that
//! relocates by hand.
//!
//! ## Features
//!
//! By default, only the `translate` feature is enabled.
//!
//! ### `translate`
//!
//! Enables the `Translate` trait, which computes where a resolved address would be if its
//! region had been placed at a different base.
//!
//! ### `mmap`
//!
//! Use the memmap2 crate to load regions with `Region::from_file_mmap`.

#![warn(missing_docs)]

mod base;
mod error;
mod pointer;
mod region;
mod span;

#[cfg(feature = "translate")]
mod translate;

#[cfg(test)]
pub(crate) mod test;

pub use base::BaseSpan;
pub use error::{Error, Result};
pub use pointer::{RelativePointer, NULL_OFFSET};
pub use region::{Region, REGION_ALIGN};
pub use span::RelativeSpan;

#[cfg(feature = "translate")]
pub use translate::{translate_ptr, Translate};
