//! # Trendy Core
//!
//! Aggregate statistics ("trends") over clinical episode records, rendered as
//! chart-ready data with drill-down links.
//!
//! This crate contains:
//! - Seven trend strategies behind the [`Trend`] trait, looked up through an explicit
//!   [`TrendRegistry`]
//! - The selector codec that names trend instances in query strings
//! - An in-memory record store with the filter/count/group operations trends need
//! - Drill-down replay and dashboard evaluation over an [`EpisodeSet`]
//!
//! **No serving concerns**: HTTP handling, templating and chart drawing belong to the
//! callers. The binaries in this workspace only print JSON.

pub mod config;
pub mod constants;
pub mod dashboard;
pub mod dates;
pub mod drill_down;
pub mod error;
pub mod payload;
pub mod registry;
pub mod schema;
pub mod selector;
pub mod store;
pub mod trend;
pub mod trends;
pub mod visuals;

pub use config::TrendConfig;
pub use dashboard::{render_trend, render_trends, RenderedTrend};
pub use drill_down::{apply_request_filters, AppliedFilter, DrillDown};
pub use error::{TrendError, TrendResult};
pub use payload::{percentage, Aggregate, Cell, GraphData, TrendOutput};
pub use registry::{TrendFactory, TrendKind, TrendRegistry};
pub use schema::{Schema, SubrecordSchema};
pub use selector::{build_link, RequestContext, TrendSelector};
pub use store::{EpisodeSet, Lookup, RecordStore};
pub use trend::{FkFtField, Trend, TrendContext};
pub use visuals::field_pie_chart;
