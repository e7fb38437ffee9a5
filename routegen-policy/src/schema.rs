//
// Copyright (c) The Routegen Contributors
//
// SPDX-License-Identifier: MIT
//

//! Field descriptors for the peer schema.
//!
//! Every peer field is described once: its document key, value kind,
//! default literal and how it is inherited from a template. Template merging,
//! defaulting and the generated documentation all walk the same table.
//! Sections without templates only carry documentation rows.

use std::collections::BTreeMap;

use itertools::Itertools;

// Value kind of a schema field.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FieldKind {
    Str,
    Int,
    Float,
    Bool,
    List,
    Map,
}

// Default declared for a schema field.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FieldDefault {
    // The field stays unset when not configured.
    None,
    // Literal applied when the field is not configured. An empty literal
    // means the schema forgot to declare a default.
    Value(&'static str),
}

// Descriptor of a single schema field of the configuration type `T`.
pub struct FieldDesc<T: 'static> {
    pub key: &'static str,
    pub kind: FieldKind,
    pub default: FieldDefault,
    pub description: &'static str,
    // Returns whether the field is explicitly set.
    pub is_set: fn(&T) -> bool,
    // Copies the field's value from another instance.
    pub copy_from: fn(&mut T, &T),
    // Checks that the declared default is usable for the field's type.
    pub check: fn(&FieldDesc<T>) -> Result<(), SchemaError>,
}

// Documentation row of a configuration option.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct OptionDoc {
    pub key: &'static str,
    pub kind: FieldKind,
    pub default: Option<&'static str>,
    pub description: &'static str,
}

// Errors in the schema definition itself.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum SchemaError {
    MissingDefault {
        field: &'static str,
    },
    InvalidDefault {
        field: &'static str,
        value: &'static str,
    },
    UnsupportedKind {
        field: &'static str,
        kind: FieldKind,
    },
}

// Types that can be stored in a schema field.
pub trait FieldValue: Sized {
    const KIND: FieldKind;

    // Parses a default literal.
    fn parse_literal(literal: &str) -> Option<Self>;
}

// ===== impl FieldKind =====

impl std::fmt::Display for FieldKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldKind::Str => write!(f, "string"),
            FieldKind::Int => write!(f, "int"),
            FieldKind::Float => write!(f, "float"),
            FieldKind::Bool => write!(f, "bool"),
            FieldKind::List => write!(f, "list"),
            FieldKind::Map => write!(f, "map"),
        }
    }
}

// ===== impl FieldDefault =====

impl FieldDefault {
    pub fn literal(&self) -> Option<&'static str> {
        match self {
            FieldDefault::None => None,
            FieldDefault::Value(literal) => Some(literal),
        }
    }
}

// ===== impl FieldDesc =====

impl<T> std::fmt::Debug for FieldDesc<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldDesc")
            .field("key", &self.key)
            .field("kind", &self.kind)
            .field("default", &self.default)
            .finish()
    }
}

impl<T> FieldDesc<T> {
    pub fn doc(&self) -> OptionDoc {
        OptionDoc::new(
            self.key,
            self.kind,
            self.default.literal(),
            self.description,
        )
    }
}

// ===== impl OptionDoc =====

impl OptionDoc {
    pub const fn new(
        key: &'static str,
        kind: FieldKind,
        default: Option<&'static str>,
        description: &'static str,
    ) -> OptionDoc {
        OptionDoc {
            key,
            kind,
            default,
            description,
        }
    }
}

// ===== impl SchemaError =====

impl std::fmt::Display for SchemaError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SchemaError::MissingDefault { field } => {
                write!(f, "schema field {field} has no default value")
            }
            SchemaError::InvalidDefault { field, value } => {
                write!(
                    f,
                    "schema field {field} has an invalid default value: {value}"
                )
            }
            SchemaError::UnsupportedKind { field, kind } => {
                write!(
                    f,
                    "schema field {field} of kind {kind} can't have a default value"
                )
            }
        }
    }
}

impl std::error::Error for SchemaError {}

// ===== impl FieldValue =====

impl FieldValue for String {
    const KIND: FieldKind = FieldKind::Str;

    fn parse_literal(literal: &str) -> Option<String> {
        Some(literal.to_owned())
    }
}

impl FieldValue for bool {
    const KIND: FieldKind = FieldKind::Bool;

    fn parse_literal(literal: &str) -> Option<bool> {
        literal.parse().ok()
    }
}

impl FieldValue for u16 {
    const KIND: FieldKind = FieldKind::Int;

    fn parse_literal(literal: &str) -> Option<u16> {
        literal.parse().ok()
    }
}

impl FieldValue for u32 {
    const KIND: FieldKind = FieldKind::Int;

    fn parse_literal(literal: &str) -> Option<u32> {
        literal.parse().ok()
    }
}

impl<T> FieldValue for Vec<T> {
    const KIND: FieldKind = FieldKind::List;

    fn parse_literal(_literal: &str) -> Option<Vec<T>> {
        None
    }
}

impl<K, V> FieldValue for BTreeMap<K, V> {
    const KIND: FieldKind = FieldKind::Map;

    fn parse_literal(_literal: &str) -> Option<BTreeMap<K, V>> {
        None
    }
}

// ===== macros =====

// Declares the peer schema: the configuration struct where every field is
// optional, the resolved options struct where defaulted fields are concrete,
// and the descriptor table tying both together.
macro_rules! peer_schema {
    (
        defaulted {
            $( $dfield:ident: $dty:ty = ($dkey:literal, $ddefault:literal, $ddesc:literal); )*
        }
        optional {
            $( $ofield:ident: $oty:ty = ($okey:literal, $odesc:literal); )*
        }
    ) => {
        // Peer or template as written in the policy document.
        #[derive(Clone, Debug, Default, Eq, PartialEq)]
        #[derive(Deserialize, Serialize)]
        #[serde(default, deny_unknown_fields)]
        pub struct PeerConfig {
            #[serde(skip_serializing_if = "Option::is_none")]
            pub template: Option<String>,
            $(
                #[serde(rename = $dkey, skip_serializing_if = "Option::is_none")]
                pub $dfield: Option<$dty>,
            )*
            $(
                #[serde(rename = $okey, skip_serializing_if = "Option::is_none")]
                pub $ofield: Option<$oty>,
            )*
        }

        // Peer options after template inheritance and defaulting.
        #[derive(Clone, Debug, Eq, PartialEq)]
        #[derive(Serialize)]
        pub struct PeerOptions {
            $(
                #[serde(rename = $dkey)]
                pub $dfield: $dty,
            )*
            $(
                #[serde(rename = $okey, skip_serializing_if = "Option::is_none")]
                pub $ofield: Option<$oty>,
            )*
        }

        // Descriptors of every peer field except the template reference.
        pub static PEER_FIELDS: &[$crate::schema::FieldDesc<PeerConfig>] = &[
            $(
                $crate::schema::FieldDesc {
                    key: $dkey,
                    kind: <$dty as $crate::schema::FieldValue>::KIND,
                    default: $crate::schema::FieldDefault::Value($ddefault),
                    description: $ddesc,
                    is_set: |config| config.$dfield.is_some(),
                    copy_from: |config, other| {
                        config.$dfield = other.$dfield.clone()
                    },
                    check: |desc| {
                        $crate::schema::default_value::<$dty>(
                            desc.key,
                            desc.default,
                        )
                        .map(|_| ())
                    },
                },
            )*
            $(
                $crate::schema::FieldDesc {
                    key: $okey,
                    kind: <$oty as $crate::schema::FieldValue>::KIND,
                    default: $crate::schema::FieldDefault::None,
                    description: $odesc,
                    is_set: |config| config.$ofield.is_some(),
                    copy_from: |config, other| {
                        config.$ofield = other.$ofield.clone()
                    },
                    check: |_| Ok(()),
                },
            )*
        ];

        impl PeerOptions {
            // Builds the options out of a configuration, applying the
            // declared default of every unset field.
            pub fn from_config(
                config: PeerConfig,
            ) -> Result<PeerOptions, $crate::schema::SchemaError> {
                Ok(PeerOptions {
                    $(
                        $dfield: match config.$dfield {
                            Some(value) => value,
                            None => $crate::schema::default_value::<$dty>(
                                $dkey,
                                $crate::schema::FieldDefault::Value($ddefault),
                            )?
                            .ok_or($crate::schema::SchemaError::MissingDefault {
                                field: $dkey,
                            })?,
                        },
                    )*
                    $( $ofield: config.$ofield, )*
                })
            }
        }
    };
}

pub(crate) use peer_schema;

// ===== global functions =====

// Resolves the declared default of a field into a typed value.
//
// Returns `None` for fields without a default.
pub fn default_value<V: FieldValue>(
    field: &'static str,
    default: FieldDefault,
) -> Result<Option<V>, SchemaError> {
    match default {
        FieldDefault::None => Ok(None),
        FieldDefault::Value("") => Err(SchemaError::MissingDefault { field }),
        FieldDefault::Value(literal) => {
            if matches!(V::KIND, FieldKind::List | FieldKind::Map) {
                return Err(SchemaError::UnsupportedKind {
                    field,
                    kind: V::KIND,
                });
            }
            V::parse_literal(literal).map(Some).ok_or(
                SchemaError::InvalidDefault {
                    field,
                    value: literal,
                },
            )
        }
    }
}

// Checks every descriptor of a schema table.
pub fn check<T>(fields: &[FieldDesc<T>]) -> Result<(), SchemaError> {
    fields.iter().try_for_each(|field| (field.check)(field))
}

// Renders a section of configuration options as Markdown.
pub fn document(
    title: &str,
    options: impl IntoIterator<Item = OptionDoc>,
) -> String {
    let rows = options
        .into_iter()
        .map(|option| {
            format!(
                "| {} | {} | {} | {} |",
                option.key,
                option.kind,
                option.default.unwrap_or_default(),
                option.description
            )
        })
        .join("\n");
    format!(
        "## {title}\n\
         | Option | Type | Default | Description |\n\
         |--------|------|---------|-------------|\n\
         {rows}\n"
    )
}

// ===== unit tests =====
