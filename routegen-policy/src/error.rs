//
// Copyright (c) The Routegen Contributors
//
// SPDX-License-Identifier: MIT
//

use tracing::error;

use crate::schema::SchemaError;

// Policy resolution errors.
//
// Any of these aborts the whole resolution.
#[derive(Debug)]
pub enum Error {
    // Document errors
    Parse(serde_yaml::Error),
    Schema(SchemaError),
    // Template errors
    TemplateChained { template: String, reference: String },
    TemplateNotFound { peer: String, template: String },
    // Validation errors
    MissingField {
        scope: Scope,
        field: &'static str,
    },
    InvalidCommunity {
        scope: Scope,
        field: &'static str,
        token: String,
    },
    InvalidAddress {
        scope: Scope,
        field: &'static str,
        value: String,
    },
    InvalidEndpoint {
        field: &'static str,
        value: String,
    },
    InvalidValue {
        scope: Scope,
        field: &'static str,
        value: String,
    },
    // System errors
    Hostname(nix::Error),
}

// Location of an offending configuration entry.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Scope {
    Global,
    Peer(String),
    Bfd(String),
    Vrrp(String),
}

// ===== impl Error =====

impl Error {
    pub fn log(&self) {
        match self {
            Error::Parse(error) => {
                error!(error = %error, "{}", self);
            }
            Error::Schema(error) => {
                error!(%error, "{}", self);
            }
            Error::TemplateChained {
                template,
                reference,
            } => {
                error!(%template, %reference, "{}", self);
            }
            Error::TemplateNotFound { peer, template } => {
                error!(%peer, %template, "{}", self);
            }
            Error::MissingField { scope, field } => {
                error!(%scope, %field, "{}", self);
            }
            Error::InvalidCommunity {
                scope,
                field,
                token,
            } => {
                error!(%scope, %field, %token, "{}", self);
            }
            Error::InvalidAddress {
                scope,
                field,
                value,
            }
            | Error::InvalidValue {
                scope,
                field,
                value,
            } => {
                error!(%scope, %field, %value, "{}", self);
            }
            Error::InvalidEndpoint { field, value } => {
                error!(%field, %value, "{}", self);
            }
            Error::Hostname(error) => {
                error!(%error, "{}", self);
            }
        }
    }

    // Returns the scope of the offending entry, if the error has one.
    pub fn scope(&self) -> Option<&Scope> {
        match self {
            Error::MissingField { scope, .. }
            | Error::InvalidCommunity { scope, .. }
            | Error::InvalidAddress { scope, .. }
            | Error::InvalidValue { scope, .. } => Some(scope),
            _ => None,
        }
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Parse(error) => {
                write!(f, "failed to parse policy document: {error}")
            }
            Error::Schema(error) => error.fmt(f),
            Error::TemplateChained {
                template,
                reference,
            } => {
                write!(
                    f,
                    "template {template} references template {reference}, but templates must not reference other templates"
                )
            }
            Error::TemplateNotFound { peer, template } => {
                write!(f, "peer {peer}: template {template} not found")
            }
            Error::MissingField { scope, field } => {
                write!(f, "{scope}: missing required field {field}")
            }
            Error::InvalidCommunity {
                scope,
                field,
                token,
            } => {
                write!(f, "{scope}: invalid community in {field}: {token}")
            }
            Error::InvalidAddress {
                scope,
                field,
                value,
            } => {
                write!(f, "{scope}: invalid address in {field}: {value}")
            }
            Error::InvalidEndpoint { field, value } => {
                write!(f, "invalid {field} {value:?}, format should be host:port")
            }
            Error::InvalidValue {
                scope,
                field,
                value,
            } => {
                write!(f, "{scope}: invalid value for {field}: {value}")
            }
            Error::Hostname(..) => {
                write!(
                    f,
                    "hostname is not defined and the system hostname is unavailable"
                )
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Parse(error) => Some(error),
            Error::Schema(error) => Some(error),
            Error::Hostname(error) => Some(error),
            _ => None,
        }
    }
}

impl From<SchemaError> for Error {
    fn from(error: SchemaError) -> Error {
        Error::Schema(error)
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(error: serde_yaml::Error) -> Error {
        Error::Parse(error)
    }
}

// ===== impl Scope =====

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Scope::Global => write!(f, "global"),
            Scope::Peer(name) => write!(f, "peer {name}"),
            Scope::Bfd(name) => write!(f, "bfd instance {name}"),
            Scope::Vrrp(name) => write!(f, "vrrp instance {name}"),
        }
    }
}
