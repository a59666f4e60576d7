use super::bar_chart;
use crate::config::DateBucket;
use crate::constants::{ADMISSIONS_SERIES, EPISODE_START_COLUMN, OPEN_BUCKET_SUFFIX};
use crate::dates::{date_to_string, split_range, string_to_date};
use crate::payload::TrendOutput;
use crate::registry::TrendKind;
use crate::store::{EpisodeSet, Lookup};
use crate::trend::{display_value, Trend, TrendContext};
use crate::{TrendError, TrendResult};

/// Bar chart of episode admissions per reporting quarter.
#[derive(Debug)]
pub struct EpisodeAdmissionBarChart {
    context: TrendContext,
}

impl EpisodeAdmissionBarChart {
    pub const SLUG: &'static str = "episodeadmissions";
    pub const KIND: TrendKind = TrendKind {
        slug: Self::SLUG,
        display_name: "EpisodeAdmissions",
        factory: Self::build,
    };

    pub fn new(context: TrendContext) -> Self {
        Self { context }
    }

    fn build(context: TrendContext) -> TrendResult<Box<dyn Trend>> {
        Ok(Box::new(Self::new(context)))
    }
}

fn admitted_in(bucket: &DateBucket) -> Lookup {
    let from = Lookup::DateGte(EPISODE_START_COLUMN.to_owned(), bucket.start);
    match bucket.end {
        Some(end) => from.and(Lookup::DateLt(EPISODE_START_COLUMN.to_owned(), end)),
        None => from,
    }
}

fn bucket_label(bucket: &DateBucket) -> String {
    match bucket.end {
        Some(end) => format!("{} - {}", date_to_string(bucket.start), date_to_string(end)),
        None => format!("{} {OPEN_BUCKET_SUFFIX}", date_to_string(bucket.start)),
    }
}

/// Parses `DD/MM/YYYY - DD/MM/YYYY`, `DD/MM/YYYY +` or a bare `DD/MM/YYYY`.
fn parse_bucket(value: &str) -> TrendResult<DateBucket> {
    let bounds = split_range(value)?
        .into_iter()
        .map(string_to_date)
        .collect::<TrendResult<Vec<_>>>()?;

    match bounds.as_slice() {
        [start] => Ok(DateBucket {
            start: *start,
            end: None,
        }),
        [start, end] => Ok(DateBucket {
            start: *start,
            end: Some(*end),
        }),
        _ => Err(TrendError::InvalidValue(format!(
            "'{value}' is not an admission date range"
        ))),
    }
}

impl Trend for EpisodeAdmissionBarChart {
    fn slug(&self) -> &'static str {
        Self::SLUG
    }

    fn context(&self) -> &TrendContext {
        &self.context
    }

    fn get_graph_data(&self, episodes: &EpisodeSet) -> TrendResult<TrendOutput> {
        let buckets: Vec<(String, usize)> = self
            .context
            .config
            .admission_buckets()
            .iter()
            .map(|bucket| (bucket_label(bucket), episodes.filter(&admitted_in(bucket)).count()))
            .collect();

        tracing::debug!(
            "{}: {} quarters over {} episodes",
            self.to_link_key(),
            buckets.len(),
            episodes.count()
        );

        Ok(TrendOutput::chart(bar_chart(self, ADMISSIONS_SERIES, buckets)))
    }

    fn query(&self, value: &str, episodes: &EpisodeSet) -> TrendResult<EpisodeSet> {
        let bucket = parse_bucket(value)?;
        Ok(episodes.filter(&admitted_in(&bucket)))
    }

    fn get_description(&self, value: Option<&str>) -> String {
        format!("Episode admissions for {}", display_value(value))
    }

    fn label(&self) -> String {
        "Episode Admissions".to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trends::fixtures::{date, episodes, trend};
    use serde_json::json;

    const STORE: &str = r#"{
  "episodes": [
    {"id": 1, "patient_id": 1, "start": "2016-06-30"},
    {"id": 2, "patient_id": 2, "start": "2016-07-01"},
    {"id": 3, "patient_id": 3, "start": "2017-06-30"},
    {"id": 4, "patient_id": 4, "start": "2017-07-01"},
    {"id": 5, "patient_id": 5, "start": "2019-01-01"},
    {"id": 6, "patient_id": 6, "start": null}
  ]
}"#;

    #[test]
    fn counts_admissions_per_quarter() {
        let all = episodes(STORE);
        let chart = trend("demographics__episodeadmissions");

        let output = chart.get_graph_data(&all).expect("graph data");
        let value = serde_json::to_value(&output.graph_vals).expect("serialize");

        assert_eq!(
            value["aggregate"],
            json!([
                [
                    "x",
                    "01/07/2016 - 01/10/2016",
                    "01/10/2016 - 01/01/2017",
                    "01/01/2017 - 01/04/2017",
                    "01/04/2017 - 01/07/2017",
                    "01/07/2017 +"
                ],
                ["Admissions", 1, 0, 0, 1, 2]
            ])
        );
        assert_eq!(value["subrecord"], "demographics");
        assert_eq!(
            value["links"]["01/07/2017 +"],
            "/trends?demographics__episodeadmissions=01/07/2017 +"
        );
    }

    #[test]
    fn quarter_boundaries_are_half_open() {
        let all = episodes(STORE);
        let chart = trend("demographics__episodeadmissions");

        let last = chart.query("01/07/2017 +", &all).expect("query");
        assert_eq!(last.ids(), &[4, 5]);

        let previous = chart
            .query("01/04/2017 - 01/07/2017", &all)
            .expect("query");
        assert_eq!(previous.ids(), &[3]);

        assert_eq!(chart.query("01/07/2017", &all).expect("query").ids(), &[4, 5]);
    }

    #[test]
    fn rejects_malformed_values() {
        let all = episodes(STORE);
        let chart = trend("demographics__episodeadmissions");

        for value in [
            "2017-07-01",
            "",
            "01/01/2016 - 01/02/2016 - 01/03/2016",
            "01/07/2016 -",
            "- 01/10/2016",
        ] {
            match chart.query(value, &all) {
                Err(TrendError::InvalidValue(_)) => {}
                other => panic!("expected InvalidValue error for {value:?}, got {other:?}"),
            }
        }
    }

    #[test]
    fn parses_buckets() {
        assert_eq!(
            parse_bucket("01/07/2016 - 01/10/2016").expect("parse"),
            DateBucket {
                start: date(2016, 7, 1),
                end: Some(date(2016, 10, 1)),
            }
        );
    }

    #[test]
    fn labels_and_descriptions() {
        let chart = trend("demographics__episodeadmissions");
        assert_eq!(chart.label(), "Episode Admissions");
        assert_eq!(
            chart.get_description(Some("01/07/2017 +")),
            "Episode admissions for 01/07/2017 +"
        );
    }
}
