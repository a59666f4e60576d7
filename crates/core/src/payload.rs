//! Chart-ready trend output.
//!
//! Serializes to the JSON shape chart front-ends consume:
//! `{"aggregate": [...], "links": {...}, "field": ..., "subrecord": ...}`.

use crate::constants::PERCENTAGE_FRACTION_DECIMALS;
use crate::{TrendError, TrendResult};
use serde::Serialize;
use std::collections::BTreeMap;

/// One value in an aggregate.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Cell {
    Integer(u64),
    Number(f64),
    Text(String),
}

impl From<usize> for Cell {
    fn from(value: usize) -> Self {
        Cell::Integer(value as u64)
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Cell::Number(value)
    }
}

impl From<String> for Cell {
    fn from(value: String) -> Self {
        Cell::Text(value)
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::Text(value.to_owned())
    }
}

impl std::fmt::Display for Cell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Cell::Integer(n) => write!(f, "{n}"),
            Cell::Number(n) => write!(f, "{n}"),
            Cell::Text(s) => write!(f, "{s}"),
        }
    }
}

/// Aggregate data of a chart.
///
/// Pie charts and gauges use `[bucket, value]` pairs. Bar charts use a two-row table:
/// the x-axis row `["x", label, ...]` and one series row `[name, count, ...]`.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Aggregate {
    Pairs(Vec<(Cell, Cell)>),
    Table(Vec<Vec<Cell>>),
}

impl Aggregate {
    /// The bucket labels drill-down links are keyed by.
    pub fn bucket_labels(&self) -> Vec<String> {
        match self {
            Aggregate::Pairs(pairs) => pairs.iter().map(|(bucket, _)| bucket.to_string()).collect(),
            Aggregate::Table(rows) => rows
                .first()
                .map(|x_axis| x_axis.iter().skip(1).map(Cell::to_string).collect())
                .unwrap_or_default(),
        }
    }

    /// The value shown for `bucket`, if present.
    pub fn value_of(&self, bucket: &str) -> Option<&Cell> {
        match self {
            Aggregate::Pairs(pairs) => pairs
                .iter()
                .find(|(label, _)| label.to_string() == bucket)
                .map(|(_, value)| value),
            Aggregate::Table(rows) => {
                let x_axis = rows.first()?;
                let series = rows.get(1)?;
                let column = x_axis.iter().skip(1).position(|label| label.to_string() == bucket)?;
                series.get(column + 1)
            }
        }
    }
}

/// The JSON payload of one trend evaluation.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GraphData {
    pub aggregate: Aggregate,
    /// Bucket label to drill-down link.
    pub links: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subrecord: Option<String>,
}

impl GraphData {
    pub fn new(aggregate: Aggregate, links: BTreeMap<String, String>) -> Self {
        Self {
            aggregate,
            links,
            field: None,
            subrecord: None,
        }
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn with_subrecord(mut self, subrecord: impl Into<String>) -> Self {
        self.subrecord = Some(subrecord.into());
        self
    }
}

/// Result of [`crate::Trend::get_graph_data`]. Gauges also report `total` and `count`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TrendOutput {
    pub graph_vals: GraphData,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
}

impl TrendOutput {
    pub fn chart(graph_vals: GraphData) -> Self {
        Self {
            graph_vals,
            total: None,
            count: None,
        }
    }

    pub fn gauge(graph_vals: GraphData, total: usize, count: usize) -> Self {
        Self {
            graph_vals,
            total: Some(total),
            count: Some(count),
        }
    }

    /// The graph payload as a JSON string.
    pub fn graph_vals_json(&self) -> TrendResult<String> {
        serde_json::to_string(&self.graph_vals).map_err(TrendError::Serialization)
    }
}

/// `count` as a percentage of `total`.
///
/// The fraction is rounded to three decimals from its exact binary value, then scaled,
/// so results carry float noise (`percentage(3, 80)` is `3.6999999999999997`). A zero
/// total gives 0.
pub fn percentage(count: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let fraction = count as f64 / total as f64;
    let rounded = format!("{:.*}", PERCENTAGE_FRACTION_DECIMALS, fraction)
        .parse::<f64>()
        .unwrap_or(fraction);
    rounded * 100.0
}
