//! Subrecord schema metadata.
//!
//! Trends never guess at relationships or field types from strings. Every subrecord a
//! trend can be built for is declared here with:
//! - where it hangs (directly off an episode, or off the episode's patient)
//! - the kind of each field (plain scalar, date, or coded-or-free-text pair)
//!
//! The metadata is resolved once when a trend is constructed.

use crate::constants::PATIENT_RELATION;
use crate::{TrendError, TrendResult};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use trendy_types::{Identifier, NonEmptyText};

/// Built-in schema covering the demographics, allergies and diagnosis subrecords.
const OPAL_SCHEMA_YAML: &str = include_str!("../schema/opal.yaml");

/// How a field's value is stored.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    /// A single column holding a plain value.
    Scalar,
    /// A single column holding an ISO-8601 date.
    Date,
    /// Two columns: `<field>_fk` holds the coded lookup name (or null) and
    /// `<field>_ft` holds free text (or the empty string).
    ForeignKeyOrFreeText,
}

/// What a subrecord row points at.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Attachment {
    Episode,
    Patient,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldSchema {
    pub name: Identifier,
    pub title: NonEmptyText,
    pub kind: FieldKind,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SubrecordSchema {
    pub api_name: Identifier,
    /// Relationship name used in lookups; defaults to the api name.
    #[serde(default)]
    pub related_name: Option<Identifier>,
    pub display_name: NonEmptyText,
    pub attachment: Attachment,
    #[serde(default)]
    pub fields: Vec<FieldSchema>,
}

impl SubrecordSchema {
    pub fn related_name(&self) -> &Identifier {
        self.related_name.as_ref().unwrap_or(&self.api_name)
    }

    pub fn is_patient_subrecord(&self) -> bool {
        self.attachment == Attachment::Patient
    }

    /// Looks up a declared field.
    ///
    /// # Errors
    ///
    /// Returns [`TrendError::UnknownField`] if the subrecord has no such field.
    pub fn field(&self, name: &str) -> TrendResult<&FieldSchema> {
        self.fields
            .iter()
            .find(|f| f.name.as_str() == name)
            .ok_or_else(|| TrendError::UnknownField {
                subrecord: self.api_name.to_string(),
                field: name.to_owned(),
            })
    }

    /// The relationship path from an episode to this subrecord, optionally down to a
    /// column, e.g. `patient__allergies__drug_fk`.
    pub fn related_path(&self, column: Option<&str>) -> String {
        let mut path = self.related_name().to_string();
        if let Some(column) = column {
            path = format!("{path}__{column}");
        }
        if self.is_patient_subrecord() {
            format!("{PATIENT_RELATION}__{path}")
        } else {
            path
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SchemaWire {
    subrecords: Vec<SubrecordSchema>,
}

/// The set of subrecords known to the trend layer, keyed by api name.
#[derive(Clone, Debug, Default)]
pub struct Schema {
    subrecords: BTreeMap<String, SubrecordSchema>,
}

impl Schema {
    /// Build a schema from subrecord declarations.
    ///
    /// # Errors
    ///
    /// Returns [`TrendError::InvalidInput`] if two subrecords share an api name or a
    /// subrecord declares the same field twice.
    pub fn new(subrecords: Vec<SubrecordSchema>) -> TrendResult<Self> {
        let mut map = BTreeMap::new();

        for subrecord in subrecords {
            let mut seen = std::collections::BTreeSet::new();
            for field in &subrecord.fields {
                if !seen.insert(field.name.as_str()) {
                    return Err(TrendError::InvalidInput(format!(
                        "field '{}' declared twice on subrecord '{}'",
                        field.name, subrecord.api_name
                    )));
                }
            }

            let key = subrecord.api_name.to_string();
            if map.contains_key(&key) {
                return Err(TrendError::InvalidInput(format!(
                    "subrecord '{key}' declared twice"
                )));
            }
            map.insert(key, subrecord);
        }

        Ok(Self { subrecords: map })
    }

    /// Parse a schema from YAML text.
    pub fn from_yaml_str(yaml_text: &str) -> TrendResult<Self> {
        let wire: SchemaWire =
            serde_yaml::from_str(yaml_text).map_err(TrendError::YamlDeserialization)?;
        Self::new(wire.subrecords)
    }

    /// Load a schema from a YAML file.
    pub fn load(path: &Path) -> TrendResult<Self> {
        let text = std::fs::read_to_string(path).map_err(TrendError::FileRead)?;
        Self::from_yaml_str(&text)
    }

    /// The built-in schema (demographics, allergies, diagnosis).
    pub fn opal_default() -> TrendResult<Self> {
        Self::from_yaml_str(OPAL_SCHEMA_YAML)
    }

    /// Resolves a subrecord by api name.
    ///
    /// # Errors
    ///
    /// Returns [`TrendError::UnknownSubrecord`] if no subrecord has that api name.
    pub fn subrecord(&self, api_name: &str) -> TrendResult<&SubrecordSchema> {
        self.subrecords
            .get(api_name)
            .ok_or_else(|| TrendError::UnknownSubrecord(api_name.to_owned()))
    }

    pub fn subrecords(&self) -> impl Iterator<Item = &SubrecordSchema> {
        self.subrecords.values()
    }
}
