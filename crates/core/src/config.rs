//! Trend runtime configuration.
//!
//! Bucket boundaries and the evaluation date are resolved once at process startup and
//! then shared by every trend built from the registry. Request handling never reads the
//! environment or the filesystem for them.

use crate::constants::{DEFAULT_ADMISSION_BOUNDARIES, DEFAULT_AGE_BOUNDARIES};
use crate::{TrendError, TrendResult};
use chrono::NaiveDate;
use serde::Deserialize;
use std::path::Path;

/// A half-open admission date range `[start, end)`; `end == None` is open-ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DateBucket {
    pub start: NaiveDate,
    pub end: Option<NaiveDate>,
}

/// An age band in whole years `[min, max)`; `max == None` is open-ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AgeBand {
    pub min: u32,
    pub max: Option<u32>,
}

/// Trend configuration resolved at startup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TrendConfig {
    admission_boundaries: Vec<NaiveDate>,
    age_boundaries: Vec<u32>,
    today: Option<NaiveDate>,
}

/// On-disk YAML shape of [`TrendConfig`]. Omitted keys fall back to the defaults.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TrendConfigWire {
    #[serde(default)]
    admission_boundaries: Option<Vec<NaiveDate>>,
    #[serde(default)]
    age_boundaries: Option<Vec<u32>>,
    #[serde(default)]
    today: Option<NaiveDate>,
}

impl Default for TrendConfig {
    fn default() -> Self {
        Self {
            admission_boundaries: default_admission_boundaries(),
            age_boundaries: DEFAULT_AGE_BOUNDARIES.to_vec(),
            today: None,
        }
    }
}

impl TrendConfig {
    /// Create a new `TrendConfig`.
    ///
    /// Consecutive boundaries form the buckets; the last boundary opens an unbounded
    /// bucket. `today` pins the date age bands are measured from; `None` means the
    /// local date at evaluation time.
    ///
    /// # Errors
    ///
    /// Returns [`TrendError::InvalidConfig`] if either boundary list is empty or not
    /// strictly ascending.
    pub fn new(
        admission_boundaries: Vec<NaiveDate>,
        age_boundaries: Vec<u32>,
        today: Option<NaiveDate>,
    ) -> TrendResult<Self> {
        validate_ascending("admission_boundaries", &admission_boundaries)?;
        validate_ascending("age_boundaries", &age_boundaries)?;

        Ok(Self {
            admission_boundaries,
            age_boundaries,
            today,
        })
    }

    /// Parse configuration from YAML text.
    pub fn from_yaml_str(yaml_text: &str) -> TrendResult<Self> {
        let wire: TrendConfigWire =
            serde_yaml::from_str(yaml_text).map_err(TrendError::YamlDeserialization)?;
        let defaults = Self::default();

        Self::new(
            wire.admission_boundaries
                .unwrap_or(defaults.admission_boundaries),
            wire.age_boundaries.unwrap_or(defaults.age_boundaries),
            wire.today,
        )
    }

    /// Load configuration from a YAML file.
    pub fn load(path: &Path) -> TrendResult<Self> {
        let text = std::fs::read_to_string(path).map_err(TrendError::FileRead)?;
        Self::from_yaml_str(&text)
    }

    /// Returns a copy pinned to the given evaluation date.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    pub fn admission_buckets(&self) -> Vec<DateBucket> {
        buckets(&self.admission_boundaries)
            .map(|(start, end)| DateBucket { start, end })
            .collect()
    }

    pub fn age_bands(&self) -> Vec<AgeBand> {
        buckets(&self.age_boundaries)
            .map(|(min, max)| AgeBand { min, max })
            .collect()
    }

    /// The date ages are measured from.
    pub fn today(&self) -> NaiveDate {
        self.today
            .unwrap_or_else(|| chrono::Local::now().date_naive())
    }
}

fn default_admission_boundaries() -> Vec<NaiveDate> {
    DEFAULT_ADMISSION_BOUNDARIES
        .iter()
        .filter_map(|&(year, month, day)| NaiveDate::from_ymd_opt(year, month, day))
        .collect()
}

fn buckets<T: Copy>(boundaries: &[T]) -> impl Iterator<Item = (T, Option<T>)> + '_ {
    boundaries
        .iter()
        .enumerate()
        .map(|(i, start)| (*start, boundaries.get(i + 1).copied()))
}

fn validate_ascending<T: PartialOrd + std::fmt::Debug>(name: &str, values: &[T]) -> TrendResult<()> {
    if values.is_empty() {
        return Err(TrendError::InvalidConfig(format!("{name} cannot be empty")));
    }

    if let Some(pair) = values.windows(2).find(|pair| pair[0] >= pair[1]) {
        return Err(TrendError::InvalidConfig(format!(
            "{name} must be strictly ascending, found {:?} before {:?}",
            pair[0], pair[1]
        )));
    }

    Ok(())
}
