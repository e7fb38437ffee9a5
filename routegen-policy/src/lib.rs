//
// Copyright (c) The Routegen Contributors
//
// SPDX-License-Identifier: MIT
//

//! Policy resolution.
//!
//! Turns the declarative policy document (peers, templates and global
//! settings) into a fully defaulted, validated tree that renderers and the
//! route optimizer consume read-only.

pub mod config;
pub mod debug;
pub mod error;
pub mod global;
pub mod peer;
pub mod resolve;
pub mod schema;

pub use error::Error;
pub use resolve::{Policy, load, resolve};
