use super::bar_chart;
use crate::config::AgeBand;
use crate::constants::{AGE_SERIES, DATE_OF_BIRTH_FIELD, OPEN_BUCKET_SUFFIX};
use crate::dates::{split_range, years_before};
use crate::payload::TrendOutput;
use crate::registry::TrendKind;
use crate::schema::FieldKind;
use crate::store::{EpisodeSet, Lookup};
use crate::trend::{display_value, Trend, TrendContext};
use crate::{TrendError, TrendResult};
use chrono::NaiveDate;

/// Bar chart of episodes by patient age band.
///
/// Each band counts the episodes whose patient falls in it. Ages are measured from the configured evaluation date using the subrecord's
/// date-of-birth column (the selector's field, or `date_of_birth`).
#[derive(Debug)]
pub struct AgeBarChart {
    context: TrendContext,
    birth_column: String,
}

impl AgeBarChart {
    pub const SLUG: &'static str = "age";
    pub const KIND: TrendKind = TrendKind {
        slug: Self::SLUG,
        display_name: "Age",
        factory: Self::build,
    };

    /// # Errors
    ///
    /// Returns [`TrendError::UnknownField`] if the subrecord has no such column, or
    /// [`TrendError::UnsupportedFieldType`] if it is not a date.
    pub fn new(context: TrendContext) -> TrendResult<Self> {
        let name = context
            .field_name
            .as_ref()
            .map_or(DATE_OF_BIRTH_FIELD, |name| name.as_str());
        let field = context.subrecord.field(name)?;
        if field.kind != FieldKind::Date {
            return Err(TrendError::UnsupportedFieldType {
                subrecord: context.subrecord.api_name.to_string(),
                field: field.name.to_string(),
            });
        }

        let birth_column = field.name.to_string();
        Ok(Self {
            context,
            birth_column,
        })
    }

    fn build(context: TrendContext) -> TrendResult<Box<dyn Trend>> {
        Ok(Box::new(Self::new(context)?))
    }

    /// Born at least `min` and, for bounded bands, less than `max` years before `today`.
    fn born_in(&self, band: &AgeBand, today: NaiveDate) -> TrendResult<Lookup> {
        let column = self.birth_column.clone();
        let lookup = Lookup::DateLte(column.clone(), years_before(today, band.min)?);
        Ok(match band.max {
            Some(max) => lookup.and(Lookup::DateGt(column, years_before(today, max)?)),
            None => lookup,
        })
    }
}

fn band_label(band: &AgeBand) -> String {
    match band.max {
        Some(max) => format!("{} - {max}", band.min),
        None => format!("{} {OPEN_BUCKET_SUFFIX}", band.min),
    }
}

/// Parses `N - M`, `N +` or a bare `N`.
fn parse_band(value: &str) -> TrendResult<AgeBand> {
    let invalid = || TrendError::InvalidValue(format!("'{value}' is not an age range"));
    let bounds = split_range(value)?
        .into_iter()
        .map(|part| part.parse::<u32>().map_err(|_| invalid()))
        .collect::<TrendResult<Vec<_>>>()?;

    match bounds.as_slice() {
        [min] => Ok(AgeBand {
            min: *min,
            max: None,
        }),
        [min, max] => Ok(AgeBand {
            min: *min,
            max: Some(*max),
        }),
        _ => Err(invalid()),
    }
}

impl Trend for AgeBarChart {
    fn slug(&self) -> &'static str {
        Self::SLUG
    }

    fn context(&self) -> &TrendContext {
        &self.context
    }

    fn get_graph_data(&self, episodes: &EpisodeSet) -> TrendResult<TrendOutput> {
        let today = self.context.config.today();

        let buckets = self
            .context
            .config
            .age_bands()
            .iter()
            .map(|band| -> TrendResult<(String, usize)> {
                let lookup = self.born_in(band, today)?;
                let matching = episodes.filter_related(&self.context.subrecord, &lookup);
                Ok((band_label(band), matching.count()))
            })
            .collect::<TrendResult<Vec<_>>>()?;

        tracing::debug!(
            "{}: {} age bands over {} episodes as of {today}",
            self.to_link_key(),
            buckets.len(),
            episodes.count()
        );

        Ok(TrendOutput::chart(bar_chart(self, AGE_SERIES, buckets)))
    }

    fn query(&self, value: &str, episodes: &EpisodeSet) -> TrendResult<EpisodeSet> {
        let band = parse_band(value)?;
        let lookup = self.born_in(&band, self.context.config.today())?;
        Ok(episodes.filter_related(&self.context.subrecord, &lookup))
    }

    fn get_description(&self, value: Option<&str>) -> String {
        format!("Age range between {}", display_value(value))
    }

    fn label(&self) -> String {
        "Patient Age".to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::Cell;
    use crate::trends::fixtures::{date, episodes, trend_at};
    use serde_json::json;

    // Ages as of 2024-05-01: 0, exactly 20, 39, 85 and unknown.
    const STORE: &str = r#"{
  "episodes": [
    {"id": 1, "patient_id": 1},
    {"id": 2, "patient_id": 2},
    {"id": 3, "patient_id": 3},
    {"id": 4, "patient_id": 4},
    {"id": 5, "patient_id": 5},
    {"id": 6, "patient_id": 2}
  ],
  "subrecords": {
    "demographics": [
      {"id": 1, "patient_id": 1, "date_of_birth": "2024-05-01"},
      {"id": 2, "patient_id": 2, "date_of_birth": "2004-05-01"},
      {"id": 3, "patient_id": 3, "date_of_birth": "1984-05-02"},
      {"id": 4, "patient_id": 4, "date_of_birth": "1939-01-01"},
      {"id": 5, "patient_id": 5, "date_of_birth": null}
    ]
  }
}"#;

    fn today() -> NaiveDate {
        date(2024, 5, 1)
    }

    #[test]
    fn counts_episodes_per_band() {
        let all = episodes(STORE);
        let chart = trend_at("demographics__age", "/trends", today());

        let output = chart.get_graph_data(&all).expect("graph data");
        let value = serde_json::to_value(&output.graph_vals).expect("serialize");

        // patient 2 has one demographics row but two episodes
        assert_eq!(
            value["aggregate"],
            json!([
                ["x", "0 - 20", "20 - 40", "40 - 60", "60 - 80", "80 +"],
                ["Age", 1, 3, 0, 0, 1]
            ])
        );
        let aggregate = &output.graph_vals.aggregate;
        for bucket in aggregate.bucket_labels() {
            let narrowed = chart.query(&bucket, &all).expect("query");
            assert_eq!(
                aggregate.value_of(&bucket),
                Some(&Cell::from(narrowed.count())),
                "{bucket}"
            );
        }
        assert_eq!(value["subrecord"], "demographics");
        assert_eq!(value["links"]["80 +"], "/trends?demographics__age=80 +");
    }

    #[test]
    fn exact_birthday_moves_up_a_band() {
        let all = episodes(STORE);
        let chart = trend_at("demographics__age", "/trends", today());

        assert_eq!(chart.query("0 - 20", &all).expect("query").ids(), &[1]);
        // patient 2 has two episodes
        assert_eq!(chart.query("20 - 40", &all).expect("query").ids(), &[2, 3, 6]);
        assert_eq!(chart.query("80 +", &all).expect("query").ids(), &[4]);
        assert_eq!(chart.query("80", &all).expect("query").ids(), &[4]);
    }

    #[test]
    fn rejects_non_numeric_ranges() {
        let all = episodes(STORE);
        let chart = trend_at("demographics__age", "/trends", today());
        match chart.query("young", &all) {
            Err(TrendError::InvalidValue(msg)) => assert!(msg.contains("young")),
            other => panic!("expected InvalidValue error, got {other:?}"),
        }
    }

    #[test]
    fn rejects_ranges_with_a_missing_bound() {
        let all = episodes(STORE);
        let chart = trend_at("demographics__age", "/trends", today());
        for value in ["- 5", "-5", "20 -", "20 - +"] {
            match chart.query(value, &all) {
                Err(TrendError::InvalidValue(_)) => {}
                other => panic!("expected InvalidValue error for {value:?}, got {other:?}"),
            }
        }
    }

    #[test]
    fn field_must_be_a_date() {
        let schema = crate::schema::Schema::opal_default().expect("schema");
        let registry = crate::registry::TrendRegistry::builtin(
            std::sync::Arc::new(schema),
            std::sync::Arc::new(crate::config::TrendConfig::default()),
        )
        .expect("registry");
        let request = crate::selector::RequestContext::default();

        match registry.from_get_param("demographics__age__sex", &request) {
            Err(TrendError::UnsupportedFieldType { field, .. }) => assert_eq!(field, "sex"),
            other => panic!("expected UnsupportedFieldType error, got {other:?}"),
        }
        match registry.from_get_param("allergies__age", &request) {
            Err(TrendError::UnknownField { field, .. }) => assert_eq!(field, "date_of_birth"),
            other => panic!("expected UnknownField error, got {other:?}"),
        }
    }

    #[test]
    fn labels() {
        assert_eq!(band_label(&AgeBand { min: 20, max: Some(40) }), "20 - 40");
        assert_eq!(band_label(&AgeBand { min: 80, max: None }), "80 +");
        let chart = trend_at("demographics__age", "/trends", today());
        assert_eq!(chart.label(), "Patient Age");
        assert_eq!(chart.get_description(Some("20 - 40")), "Age range between 20 - 40");
    }
}
