//
// Copyright (c) The Routegen Contributors
//
// SPDX-License-Identifier: MIT
//

use std::sync::Arc;

use chrono::{DateTime, Utc};
use routegen_policy::global::OptimizerSettings;
use routegen_utils::task::Task;
use serde::Serialize;
use tokio::process::Command;
use tracing::info;

use crate::debug::Debug;
use crate::error::Error;
use crate::state::Health;

// Preference transition of a peer.
#[derive(Clone, Debug, PartialEq)]
#[derive(Serialize)]
pub struct Alert {
    pub peer: String,
    pub previous: Health,
    pub new: Health,
    pub timestamp: DateTime<Utc>,
}

// Receiver of preference transitions.
//
// Called from the control loop, so implementations must not block.
pub trait AlertNotifier: Send + Sync {
    fn notify(&self, alert: &Alert);
}

// Runs an external script for every alert, passing the peer name, the
// previous and new health, and an RFC 3339 timestamp as arguments.
#[derive(Debug)]
pub struct ScriptNotifier {
    script: String,
}

// Reports alerts through the log.
#[derive(Debug, Default)]
pub struct LogNotifier;

// ===== impl ScriptNotifier =====

impl ScriptNotifier {
    pub fn new(script: impl Into<String>) -> ScriptNotifier {
        ScriptNotifier {
            script: script.into(),
        }
    }
}

impl AlertNotifier for ScriptNotifier {
    fn notify(&self, alert: &Alert) {
        let script = self.script.clone();
        let peer = alert.peer.clone();
        let mut command = Command::new(&script);
        command
            .arg(&alert.peer)
            .arg(alert.previous.to_string())
            .arg(alert.new.to_string())
            .arg(alert.timestamp.to_rfc3339());

        let mut task = Task::spawn(async move {
            match command.status().await {
                Ok(status) if status.success() => {
                    Debug::AlertDelivered(&peer, &script).log();
                }
                Ok(status) => Error::AlertScriptStatus(script, status).log(),
                Err(error) => Error::AlertScriptSpawn(script, error).log(),
            }
        });
        task.detach();
    }
}

// ===== impl LogNotifier =====

impl AlertNotifier for LogNotifier {
    fn notify(&self, alert: &Alert) {
        info!(
            peer = %alert.peer,
            previous = %alert.previous,
            new = %alert.new,
            timestamp = %alert.timestamp,
            "peer preference changed"
        );
    }
}

// ===== global functions =====

// Returns the notifier selected by the optimizer settings.
pub fn notifier(settings: &OptimizerSettings) -> Arc<dyn AlertNotifier> {
    match &settings.alert_script {
        Some(script) if !script.is_empty() => {
            Arc::new(ScriptNotifier::new(script.clone()))
        }
        _ => Arc::new(LogNotifier),
    }
}
