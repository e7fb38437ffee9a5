//
// Copyright (c) The Routegen Contributors
//
// SPDX-License-Identifier: MIT
//

use std::collections::BTreeMap;
use std::path::PathBuf;

use routegen_optimizer::state::{PreferenceSnapshot, Preferences};
use routegen_policy::Policy;
use serde::Serialize;
use tracing::{debug, error, info};

// Renderer input: the resolved policy combined with one preference snapshot.
#[derive(Debug, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct View<'a> {
    pub policy: &'a Policy,
    pub preferences: &'a PreferenceSnapshot,
    pub local_pref: BTreeMap<&'a str, u32>,
}

#[derive(Debug)]
pub struct Renderer {
    output: Option<PathBuf>,
    renders: u64,
}

#[derive(Debug)]
pub enum Error {
    Serialize(serde_json::Error),
    Write(PathBuf, std::io::Error),
}

// ===== impl View =====

impl<'a> View<'a> {
    pub fn new(
        policy: &'a Policy,
        preferences: &'a PreferenceSnapshot,
    ) -> View<'a> {
        let local_pref = policy
            .peers
            .iter()
            .map(|(name, peer)| {
                let delta = preferences
                    .get(name)
                    .map(|state| state.local_pref_delta)
                    .unwrap_or(0);
                (name.as_str(), peer.effective_local_pref(delta))
            })
            .collect();

        View {
            policy,
            preferences,
            local_pref,
        }
    }
}

// ===== impl Renderer =====

impl Renderer {
    pub fn new(output: Option<String>) -> Renderer {
        Renderer {
            output: output.map(PathBuf::from),
            renders: 0,
        }
    }

    // Renders the policy against the latest preference snapshot.
    //
    // The snapshot is loaded once, so the whole view reflects a single
    // decision step.
    pub fn render(
        &mut self,
        policy: &Policy,
        preferences: &Preferences,
    ) -> Result<(), Error> {
        let snapshot = preferences.load();
        let view = View::new(policy, &snapshot);
        let data =
            serde_json::to_string_pretty(&view).map_err(Error::Serialize)?;

        match &self.output {
            Some(path) => {
                // Write to a sibling file first so readers never see a
                // truncated view.
                let tmp = path.with_extension("tmp");
                std::fs::write(&tmp, data.as_bytes())
                    .map_err(|error| Error::Write(tmp.clone(), error))?;
                std::fs::rename(&tmp, path)
                    .map_err(|error| Error::Write(path.clone(), error))?;
                debug!(path = %path.display(), "view written");
            }
            None => {
                info!(view = %data, "view rendered");
            }
        }
        self.renders += 1;

        Ok(())
    }

    pub fn renders(&self) -> u64 {
        self.renders
    }
}

// ===== impl Error =====

impl Error {
    pub fn log(&self) {
        match self {
            Error::Serialize(error) => {
                error!(%error, "{}", self);
            }
            Error::Write(path, error) => {
                error!(path = %path.display(), %error, "{}", self);
            }
        }
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Serialize(..) => write!(f, "failed to serialize view"),
            Error::Write(..) => write!(f, "failed to write view"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Serialize(error) => Some(error),
            Error::Write(_, error) => Some(error),
        }
    }
}

// ===== unit tests =====
