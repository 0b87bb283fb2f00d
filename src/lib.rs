#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![deny(deprecated)]

//!
//! snap-interfaces mediates capability grants between confined snaps (plugs)
//! and capability providers (slots).
//!
//! For every formed plug/slot connection an [`Interface`] emits the AppArmor,
//! seccomp and udev policy fragments that enforce exactly that capability,
//! and decides whether the connection may form without explicit consent.
//! Interfaces are looked up by name in a write-once [`Registry`].

// Validated identifiers (snap/app names, revisions, security tags).
pub mod types;

// Plug/slot data model.
pub mod primitives;

pub use primitives::*;

// Error types, including the dispatch fault.
pub mod error;

// Host facts and registry settings supplied by the embedder.
pub mod config;

pub mod metadata;

// The interface contract.
pub mod interface;

pub use interface::Interface;

// Per-backend policy specifications.
pub mod backend;

// Base declaration and connection decisions.
pub mod policy;

// Built-in interface variants.
pub mod builtin;

pub mod registry;

pub use registry::Registry;

// Connection lifecycle and compilation passes.
pub mod connection;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;
