//! In-memory record store adapter.
//!
//! The trend layer only needs a small query surface from the record store: filter,
//! exclude, count, annotate-with-count and group-by-with-count. This module provides it
//! over episodes and subrecord rows loaded from JSON.
//!
//! ## Key Components
//!
//! - **`RecordStore`**: owns episodes and subrecord rows, shared through `Arc`
//! - **`Lookup`**: a typed filter condition evaluated against one row's columns
//! - **`EpisodeSet`**: an immutable, ordered view of episodes; every operation returns
//!   a new set or a scalar
//! - **`SubrecordSet`**: the subrecord rows reachable from an `EpisodeSet`

use crate::schema::{Attachment, SubrecordSchema};
use crate::{TrendError, TrendResult};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::Arc;

pub type RecordId = u64;

/// Read access to a row's named columns.
pub trait Columns {
    fn column(&self, name: &str) -> Option<&Value>;
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct Episode {
    pub id: RecordId,
    pub patient_id: RecordId,
    #[serde(flatten)]
    pub columns: Map<String, Value>,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct SubrecordRow {
    pub id: RecordId,
    #[serde(default)]
    pub episode_id: Option<RecordId>,
    #[serde(default)]
    pub patient_id: Option<RecordId>,
    #[serde(flatten)]
    pub columns: Map<String, Value>,
}

impl Columns for Episode {
    fn column(&self, name: &str) -> Option<&Value> {
        self.columns.get(name)
    }
}

impl Columns for SubrecordRow {
    fn column(&self, name: &str) -> Option<&Value> {
        self.columns.get(name)
    }
}

impl SubrecordRow {
    fn owner(&self, attachment: Attachment) -> Option<RecordId> {
        match attachment {
            Attachment::Episode => self.episode_id,
            Attachment::Patient => self.patient_id,
        }
    }
}

/// Renders a column value the way it is shown in bucket labels. Null has no label.
pub fn value_label(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(true) => Some("True".to_owned()),
        Value::Bool(false) => Some("False".to_owned()),
        other => Some(other.to_string()),
    }
}

fn column_date<R: Columns + ?Sized>(row: &R, column: &str) -> Option<NaiveDate> {
    match row.column(column) {
        Some(Value::String(s)) => s.parse::<NaiveDate>().ok(),
        _ => None,
    }
}

/// A filter condition over a row's columns.
///
/// Missing columns behave like null. Date comparisons against null or unparsable
/// values never match.
#[derive(Clone, Debug, PartialEq)]
pub enum Lookup {
    /// Column is null or missing.
    IsNull(String),
    /// Column renders to exactly this text.
    Equals(String, String),
    /// Column is the empty string; null and missing count as empty.
    IsEmpty(String),
    DateGte(String, NaiveDate),
    DateGt(String, NaiveDate),
    DateLt(String, NaiveDate),
    DateLte(String, NaiveDate),
    And(Vec<Lookup>),
    Not(Box<Lookup>),
}

impl Lookup {
    pub fn and(self, other: Lookup) -> Lookup {
        match self {
            Lookup::And(mut lookups) => {
                lookups.push(other);
                Lookup::And(lookups)
            }
            first => Lookup::And(vec![first, other]),
        }
    }

    pub fn negate(self) -> Lookup {
        Lookup::Not(Box::new(self))
    }

    pub fn matches<R: Columns + ?Sized>(&self, row: &R) -> bool {
        match self {
            Lookup::IsNull(column) => matches!(row.column(column), None | Some(Value::Null)),
            Lookup::Equals(column, expected) => row
                .column(column)
                .and_then(value_label)
                .is_some_and(|label| &label == expected),
            Lookup::IsEmpty(column) => match row.column(column) {
                None | Some(Value::Null) => true,
                Some(Value::String(s)) => s.is_empty(),
                Some(_) => false,
            },
            Lookup::DateGte(column, date) => column_date(row, column).is_some_and(|d| d >= *date),
            Lookup::DateGt(column, date) => column_date(row, column).is_some_and(|d| d > *date),
            Lookup::DateLt(column, date) => column_date(row, column).is_some_and(|d| d < *date),
            Lookup::DateLte(column, date) => column_date(row, column).is_some_and(|d| d <= *date),
            Lookup::And(lookups) => lookups.iter().all(|lookup| lookup.matches(row)),
            Lookup::Not(lookup) => !lookup.matches(row),
        }
    }
}

/// On-disk JSON shape of the store.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RecordStoreWire {
    #[serde(default)]
    episodes: Vec<Episode>,
    #[serde(default)]
    subrecords: BTreeMap<String, Vec<SubrecordRow>>,
}

/// Episodes and subrecord rows, indexed by id.
#[derive(Debug, Default)]
pub struct RecordStore {
    episodes: BTreeMap<RecordId, Episode>,
    subrecords: BTreeMap<String, BTreeMap<RecordId, SubrecordRow>>,
}

impl RecordStore {
    /// Build a store from episodes and subrecord rows keyed by subrecord api name.
    ///
    /// # Errors
    ///
    /// Returns [`TrendError::InvalidInput`] if an episode id or a subrecord row id
    /// (within one subrecord) repeats.
    pub fn new(
        episodes: Vec<Episode>,
        subrecords: BTreeMap<String, Vec<SubrecordRow>>,
    ) -> TrendResult<Self> {
        let mut episode_map = BTreeMap::new();
        for episode in episodes {
            let id = episode.id;
            if episode_map.insert(id, episode).is_some() {
                return Err(TrendError::InvalidInput(format!(
                    "episode id {id} appears more than once"
                )));
            }
        }

        let mut subrecord_map = BTreeMap::new();
        for (api_name, rows) in subrecords {
            let mut row_map = BTreeMap::new();
            for row in rows {
                let id = row.id;
                if row_map.insert(id, row).is_some() {
                    return Err(TrendError::InvalidInput(format!(
                        "{api_name} row id {id} appears more than once"
                    )));
                }
            }
            subrecord_map.insert(api_name, row_map);
        }

        Ok(Self {
            episodes: episode_map,
            subrecords: subrecord_map,
        })
    }

    /// Parse a store from JSON text.
    pub fn from_json_str(json_text: &str) -> TrendResult<Self> {
        let wire: RecordStoreWire =
            serde_json::from_str(json_text).map_err(TrendError::Deserialization)?;
        Self::new(wire.episodes, wire.subrecords)
    }

    /// Load a store from a JSON file.
    pub fn load(path: &Path) -> TrendResult<Self> {
        let text = std::fs::read_to_string(path).map_err(TrendError::FileRead)?;
        Self::from_json_str(&text)
    }

    pub fn episode(&self, id: RecordId) -> Option<&Episode> {
        self.episodes.get(&id)
    }

    fn rows(&self, api_name: &str) -> Option<&BTreeMap<RecordId, SubrecordRow>> {
        self.subrecords.get(api_name)
    }

    /// Rows of `subrecord` grouped by the id they hang off (episode or patient id).
    fn rows_by_owner(&self, subrecord: &SubrecordSchema) -> BTreeMap<RecordId, Vec<&SubrecordRow>> {
        let mut index: BTreeMap<RecordId, Vec<&SubrecordRow>> = BTreeMap::new();
        if let Some(rows) = self.rows(subrecord.api_name.as_str()) {
            for row in rows.values() {
                if let Some(owner) = row.owner(subrecord.attachment) {
                    index.entry(owner).or_default().push(row);
                }
            }
        }
        index
    }
}

fn owner_of(episode: &Episode, attachment: Attachment) -> RecordId {
    match attachment {
        Attachment::Episode => episode.id,
        Attachment::Patient => episode.patient_id,
    }
}

/// An immutable, ordered, duplicate-free set of episodes from one store.
#[derive(Clone)]
pub struct EpisodeSet {
    store: Arc<RecordStore>,
    ids: Vec<RecordId>,
}

impl std::fmt::Debug for EpisodeSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EpisodeSet").field("ids", &self.ids).finish()
    }
}

impl EpisodeSet {
    /// Every episode in the store.
    pub fn all(store: Arc<RecordStore>) -> Self {
        let ids = store.episodes.keys().copied().collect();
        Self { store, ids }
    }

    /// The given episodes; ids the store does not know are dropped.
    pub fn from_ids(store: Arc<RecordStore>, ids: impl IntoIterator<Item = RecordId>) -> Self {
        let ids: BTreeSet<RecordId> = ids
            .into_iter()
            .filter(|id| store.episodes.contains_key(id))
            .collect();
        Self {
            store,
            ids: ids.into_iter().collect(),
        }
    }

    fn narrowed(&self, ids: Vec<RecordId>) -> Self {
        Self {
            store: Arc::clone(&self.store),
            ids,
        }
    }

    pub fn store(&self) -> &Arc<RecordStore> {
        &self.store
    }

    pub fn ids(&self) -> &[RecordId] {
        &self.ids
    }

    pub fn count(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn contains(&self, id: RecordId) -> bool {
        self.ids.binary_search(&id).is_ok()
    }

    pub fn is_subset_of(&self, other: &EpisodeSet) -> bool {
        self.ids.iter().all(|id| other.contains(*id))
    }

    pub fn episodes(&self) -> impl Iterator<Item = &Episode> {
        self.ids.iter().filter_map(|id| self.store.episode(*id))
    }

    /// Episodes whose own columns match `lookup`.
    pub fn filter(&self, lookup: &Lookup) -> Self {
        self.narrowed(
            self.episodes()
                .filter(|episode| lookup.matches(*episode))
                .map(|episode| episode.id)
                .collect(),
        )
    }

    /// Episodes whose own columns do not match `lookup`.
    pub fn exclude(&self, lookup: &Lookup) -> Self {
        self.filter(&lookup.clone().negate())
    }

    /// Episodes with at least one related `subrecord` row matching `lookup`.
    pub fn filter_related(&self, subrecord: &SubrecordSchema, lookup: &Lookup) -> Self {
        let index = self.store.rows_by_owner(subrecord);
        self.narrowed(
            self.episodes()
                .filter(|episode| {
                    index
                        .get(&owner_of(episode, subrecord.attachment))
                        .is_some_and(|rows| rows.iter().any(|row| lookup.matches(*row)))
                })
                .map(|episode| episode.id)
                .collect(),
        )
    }

    /// Number of related `subrecord` rows per episode, in episode order.
    pub fn annotate_count(&self, subrecord: &SubrecordSchema) -> Vec<(RecordId, usize)> {
        let index = self.store.rows_by_owner(subrecord);
        self.episodes()
            .map(|episode| {
                let count = index
                    .get(&owner_of(episode, subrecord.attachment))
                    .map_or(0, Vec::len);
                (episode.id, count)
            })
            .collect()
    }

    /// Episodes with exactly `count` related `subrecord` rows.
    pub fn filter_related_count(&self, subrecord: &SubrecordSchema, count: usize) -> Self {
        self.narrowed(
            self.annotate_count(subrecord)
                .into_iter()
                .filter(|(_, n)| *n == count)
                .map(|(id, _)| id)
                .collect(),
        )
    }

    /// The `subrecord` rows reachable from these episodes. Rows shared by several
    /// episodes of one patient appear once.
    pub fn subrecords(&self, subrecord: &SubrecordSchema) -> SubrecordSet {
        let owners: BTreeSet<RecordId> = self
            .episodes()
            .map(|episode| owner_of(episode, subrecord.attachment))
            .collect();

        let ids: Vec<RecordId> = self
            .store
            .rows(subrecord.api_name.as_str())
            .map(|rows| {
                rows.values()
                    .filter(|row| {
                        row.owner(subrecord.attachment)
                            .is_some_and(|owner| owners.contains(&owner))
                    })
                    .map(|row| row.id)
                    .collect()
            })
            .unwrap_or_default();

        SubrecordSet {
            store: Arc::clone(&self.store),
            api_name: subrecord.api_name.to_string(),
            ids,
        }
    }
}

/// An immutable, ordered set of rows of one subrecord.
#[derive(Clone)]
pub struct SubrecordSet {
    store: Arc<RecordStore>,
    api_name: String,
    ids: Vec<RecordId>,
}

impl std::fmt::Debug for SubrecordSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubrecordSet")
            .field("api_name", &self.api_name)
            .field("ids", &self.ids)
            .finish()
    }
}

impl SubrecordSet {
    pub fn rows(&self) -> impl Iterator<Item = &SubrecordRow> {
        let rows = self.store.rows(&self.api_name);
        self.ids
            .iter()
            .filter_map(move |id| rows.and_then(|rows| rows.get(id)))
    }

    pub fn ids(&self) -> &[RecordId] {
        &self.ids
    }

    pub fn count(&self) -> usize {
        self.ids.len()
    }

    pub fn filter(&self, lookup: &Lookup) -> Self {
        Self {
            store: Arc::clone(&self.store),
            api_name: self.api_name.clone(),
            ids: self
                .rows()
                .filter(|row| lookup.matches(*row))
                .map(|row| row.id)
                .collect(),
        }
    }

    pub fn exclude(&self, lookup: &Lookup) -> Self {
        self.filter(&lookup.clone().negate())
    }

    /// Groups rows by the rendered value of `column` and counts each group.
    ///
    /// Groups appear in the order their first row appears; null values form the `None`
    /// group.
    pub fn group_count(&self, column: &str) -> Vec<(Option<String>, usize)> {
        let mut groups: Vec<(Option<String>, usize)> = Vec::new();

        for row in self.rows() {
            let key = row.column(column).and_then(value_label);
            match groups.iter_mut().find(|(existing, _)| *existing == key) {
                Some((_, count)) => *count += 1,
                None => groups.push((key, 1)),
            }
        }

        groups
    }
}
