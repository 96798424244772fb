//! Wire-format types for the outbound message pipeline.
//!
//! Hand-written subset of the server schema: only the constructors the
//! dispatch pipeline actually produces or consumes.
//!
//! # Overview
//!
//! | Module        | Contents                                                 |
//! |---------------|----------------------------------------------------------|
//! | [`types`]     | Concrete constructors (bare types) as `struct`s          |
//! | [`enums`]     | Boxed types as `enum`s                                   |
//! | [`functions`] | RPC requests, including their explicit flag bit sets     |
//!
//! Offsets and lengths inside message entities are **UTF-16 code units** —
//! this is part of the server contract, not a presentation detail.

#![deny(unsafe_code)]
#![allow(clippy::large_enum_variant)]

pub mod enums;
pub mod functions;
pub mod types;
