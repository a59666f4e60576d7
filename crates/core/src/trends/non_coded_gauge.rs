use super::gauge;
use crate::payload::TrendOutput;
use crate::registry::TrendKind;
use crate::store::EpisodeSet;
use crate::trend::{FkFtField, Trend, TrendContext};
use crate::TrendResult;

/// Gauge of the subrecord rows where a coded-or-free-text field holds free text only.
#[derive(Debug)]
pub struct NonCodedFkAndFtGauge {
    context: TrendContext,
    field: FkFtField,
}

impl NonCodedFkAndFtGauge {
    pub const SLUG: &'static str = "noncodedfkandftgauge";
    pub const KIND: TrendKind = TrendKind {
        slug: Self::SLUG,
        display_name: "NonCodedFkAndFTGauge",
        factory: Self::build,
    };

    pub fn new(context: TrendContext) -> TrendResult<Self> {
        let field = FkFtField::resolve(&context, Self::SLUG)?;
        Ok(Self { context, field })
    }

    fn build(context: TrendContext) -> TrendResult<Box<dyn Trend>> {
        Ok(Box::new(Self::new(context)?))
    }
}

impl Trend for NonCodedFkAndFtGauge {
    fn slug(&self) -> &'static str {
        Self::SLUG
    }

    fn context(&self) -> &TrendContext {
        &self.context
    }

    fn get_graph_data(&self, episodes: &EpisodeSet) -> TrendResult<TrendOutput> {
        let rows = episodes.subrecords(&self.context.subrecord);
        let total = rows.count();
        let count = if total == 0 {
            0
        } else {
            rows.filter(&self.field.non_coded()).count()
        };

        tracing::debug!("{}: {count} of {total} rows non-coded", self.to_link_key());

        Ok(gauge(self, total, count, Some(self.field.name.as_str())))
    }

    fn query(&self, _value: &str, episodes: &EpisodeSet) -> TrendResult<EpisodeSet> {
        tracing::debug!(
            "{}: filtering episodes on free text in {}",
            self.to_link_key(),
            self.field.relative_ft_field
        );
        Ok(episodes.filter_related(&self.context.subrecord, &self.field.non_coded()))
    }

    fn get_description(&self, _value: Option<&str>) -> String {
        format!(
            "Number of {} with a non-coded {}",
            self.context.subrecord.display_name, self.field.name
        )
    }

    fn label(&self) -> String {
        format!("Non-Coded {}", self.field.title)
    }
}

#[cfg(test)]
mod tests {
    use crate::payload::Cell;
    use crate::trends::fixtures::{assert_close, episodes, trend};

    const STORE: &str = r#"{
  "episodes": [
    {"id": 1, "patient_id": 1},
    {"id": 2, "patient_id": 2},
    {"id": 3, "patient_id": 3}
  ],
  "subrecords": {
    "diagnosis": [
      {"id": 1, "episode_id": 1, "condition_fk": "Asthma", "condition_ft": ""},
      {"id": 2, "episode_id": 2, "condition_fk": null, "condition_ft": "wheeze"},
      {"id": 3, "episode_id": 3, "condition_fk": null, "condition_ft": ""}
    ]
  }
}"#;

    #[test]
    fn counts_free_text_rows() {
        let all = episodes(STORE);
        let chart = trend("diagnosis__noncodedfkandftgauge__condition");

        let output = chart.get_graph_data(&all).expect("graph data");
        assert_eq!(output.total, Some(3));
        assert_eq!(output.count, Some(1));
        match output.graph_vals.aggregate.value_of("None") {
            Some(Cell::Number(pct)) => assert_close(*pct, 33.3),
            other => panic!("expected a percentage, got {other:?}"),
        }
        assert_eq!(output.graph_vals.field.as_deref(), Some("condition"));
        assert_eq!(output.graph_vals.subrecord.as_deref(), Some("diagnosis"));
    }

    #[test]
    fn query_excludes_coded_and_empty_rows() {
        let all = episodes(STORE);
        let chart = trend("diagnosis__noncodedfkandftgauge__condition");
        assert_eq!(chart.query("None", &all).expect("query").ids(), &[2]);
    }

    #[test]
    fn labels_and_descriptions() {
        let chart = trend("diagnosis__noncodedfkandftgauge__condition");
        assert_eq!(chart.label(), "Non-Coded Condition");
        assert_eq!(
            chart.get_description(Some("None")),
            "Number of Diagnosis with a non-coded condition"
        );
    }
}
