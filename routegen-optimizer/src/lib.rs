//
// Copyright (c) The Routegen Contributors
//
// SPDX-License-Identifier: MIT
//

//! Route optimizer.
//!
//! Periodically probes the targets of optimizer-enabled peers, keeps a
//! bounded history per target and lowers the local preference of peers
//! whose measured loss or latency crosses the configured thresholds.

pub mod alert;
pub mod cache;
pub mod debug;
pub mod error;
pub mod optimizer;
pub mod packet;
pub mod probe;
pub mod state;
pub mod target;

pub use optimizer::{ExitReason, Optimizer};
