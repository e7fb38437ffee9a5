//
// Copyright (c) The Routegen Contributors
//
// SPDX-License-Identifier: MIT
//

pub mod community;
pub mod ip;
pub mod task;

pub type Receiver<T> = tokio::sync::mpsc::Receiver<T>;
pub type UnboundedSender<T> = tokio::sync::mpsc::UnboundedSender<T>;
pub type UnboundedReceiver<T> = tokio::sync::mpsc::UnboundedReceiver<T>;
