//! Built-in trend strategies.

mod age;
mod empty_field_gauge;
mod episode_admission;
mod fkft_query;
mod missing_gauge;
mod non_coded_gauge;
mod subrecord_count;

pub use age::AgeBarChart;
pub use empty_field_gauge::EmptyFieldGauge;
pub use episode_admission::EpisodeAdmissionBarChart;
pub use fkft_query::FtFkQueryPieChart;
pub use missing_gauge::MissingGauge;
pub use non_coded_gauge::NonCodedFkAndFtGauge;
pub use subrecord_count::SubrecordCountPieChart;

use crate::payload::{Aggregate, Cell, GraphData, TrendOutput};
use crate::trend::Trend;
use std::collections::BTreeMap;

/// One drill-down link per bucket label.
fn links_for<T: Trend + ?Sized>(trend: &T, labels: &[String]) -> BTreeMap<String, String> {
    labels
        .iter()
        .map(|label| (label.clone(), trend.to_link(label)))
        .collect()
}

/// A bar chart table: the x-axis row then one series row.
fn bar_chart<T: Trend + ?Sized>(
    trend: &T,
    series: &str,
    buckets: Vec<(String, usize)>,
) -> GraphData {
    let labels: Vec<String> = buckets.iter().map(|(label, _)| label.clone()).collect();

    let mut x_axis = vec![Cell::from(crate::constants::X_AXIS_SERIES)];
    x_axis.extend(labels.iter().map(|label| Cell::from(label.as_str())));
    let mut counts = vec![Cell::from(series)];
    counts.extend(buckets.iter().map(|(_, count)| Cell::from(*count)));

    GraphData::new(Aggregate::Table(vec![x_axis, counts]), links_for(trend, &labels))
        .with_subrecord(trend.context().subrecord.api_name.as_str())
}

/// A single-slice gauge keyed by the null sentinel. Field gauges echo their field.
fn gauge<T: Trend + ?Sized>(
    trend: &T,
    total: usize,
    count: usize,
    field: Option<&str>,
) -> TrendOutput {
    let sentinel = crate::constants::NULL_SENTINEL;
    let amount = crate::payload::percentage(count, total);
    let mut graph_vals = GraphData::new(
        Aggregate::Pairs(vec![(Cell::from(sentinel), Cell::from(amount))]),
        links_for(trend, &[sentinel.to_owned()]),
    )
    .with_subrecord(trend.context().subrecord.api_name.as_str());
    if let Some(field) = field {
        graph_vals = graph_vals.with_field(field);
    }
    TrendOutput::gauge(graph_vals, total, count)
}

#[cfg(test)]
pub(crate) mod fixtures {
    use crate::config::TrendConfig;
    use crate::registry::TrendRegistry;
    use crate::schema::Schema;
    use crate::selector::RequestContext;
    use crate::store::{EpisodeSet, RecordStore};
    use crate::trend::Trend;
    use chrono::NaiveDate;
    use std::sync::Arc;

    pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    pub fn episodes(json: &str) -> EpisodeSet {
        let store = RecordStore::from_json_str(json).expect("parse store");
        EpisodeSet::all(Arc::new(store))
    }

    pub fn trend_at(token: &str, path: &str, today: NaiveDate) -> Box<dyn Trend> {
        let schema = Schema::opal_default().expect("schema");
        let config = TrendConfig::default().with_today(today);
        let registry =
            TrendRegistry::builtin(Arc::new(schema), Arc::new(config)).expect("registry");
        registry
            .from_get_param(token, &RequestContext::new(path))
            .expect("build trend")
    }

    pub fn trend(token: &str) -> Box<dyn Trend> {
        trend_at(token, "/trends", date(2024, 5, 1))
    }

    pub fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {expected}, got {actual}"
        );
    }
}
