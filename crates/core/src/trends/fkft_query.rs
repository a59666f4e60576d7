use super::links_for;
use crate::constants::NULL_SENTINEL;
use crate::payload::{Aggregate, Cell, GraphData, TrendOutput};
use crate::registry::TrendKind;
use crate::store::EpisodeSet;
use crate::trend::{display_value, FkFtField, Trend, TrendContext};
use crate::TrendResult;

/// Pie chart of the coded values of a coded-or-free-text field.
///
/// Values already drilled into on the current request are left out of the chart, so
/// the breakdown shows what else the filtered episodes have.
#[derive(Debug)]
pub struct FtFkQueryPieChart {
    context: TrendContext,
    field: FkFtField,
}

impl FtFkQueryPieChart {
    pub const SLUG: &'static str = "fkftquery";
    pub const KIND: TrendKind = TrendKind {
        slug: Self::SLUG,
        display_name: "FKFTQuery",
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

/// `a`, `a and b`, `a, b and c`.
fn conjunction(values: &[&str]) -> String {
    match values {
        [] => String::new(),
        [only] => (*only).to_owned(),
        [init @ .., last] => format!("{} and {last}", init.join(", ")),
    }
}

impl Trend for FtFkQueryPieChart {
    fn slug(&self) -> &'static str {
        Self::SLUG
    }

    fn context(&self) -> &TrendContext {
        &self.context
    }

    fn get_graph_data(&self, episodes: &EpisodeSet) -> TrendResult<TrendOutput> {
        let mut rows = episodes.subrecords(&self.context.subrecord);
        for previous in self.context.previous_filters(Self::SLUG) {
            rows = rows.exclude(&self.field.coded_as(previous));
        }

        let groups = rows.group_count(&self.field.fk_field);
        tracing::debug!(
            "{}: {} coded values over {} rows",
            self.to_link_key(),
            groups.len(),
            rows.count()
        );

        let buckets: Vec<(String, usize)> = groups
            .into_iter()
            .map(|(name, count)| (name.unwrap_or_else(|| NULL_SENTINEL.to_owned()), count))
            .collect();
        let labels: Vec<String> = buckets.iter().map(|(name, _)| name.clone()).collect();
        let aggregate = buckets
            .into_iter()
            .map(|(name, count)| (Cell::from(name), Cell::from(count)))
            .collect();

        Ok(TrendOutput::chart(GraphData::new(
            Aggregate::Pairs(aggregate),
            links_for(self, &labels),
        )))
    }

    fn query(&self, value: &str, episodes: &EpisodeSet) -> TrendResult<EpisodeSet> {
        tracing::debug!(
            "{}: filtering episodes on {}={value}",
            self.to_link_key(),
            self.field.relative_fk_field
        );
        Ok(episodes.filter_related(&self.context.subrecord, &self.field.coded_as(value)))
    }

    fn get_description(&self, value: Option<&str>) -> String {
        format!("{} is {}", self.field.name, display_value(value))
    }

    fn label(&self) -> String {
        let title = &self.field.title;
        let previous = self.context.previous_filters(Self::SLUG);
        if previous.is_empty() {
            format!("% Breakdown Of {title}")
        } else {
            format!(
                "% Breakdown of {title} where the episode has a {title} of {}",
                conjunction(&previous)
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::conjunction;
    use crate::trends::fixtures::{date, episodes, trend, trend_at};
    use serde_json::json;

    const STORE: &str = r#"{
  "episodes": [
    {"id": 1, "patient_id": 1},
    {"id": 2, "patient_id": 2},
    {"id": 3, "patient_id": 3},
    {"id": 4, "patient_id": 3}
  ],
  "subrecords": {
    "allergies": [
      {"id": 1, "patient_id": 1, "drug_fk": "Penicillin", "drug_ft": ""},
      {"id": 2, "patient_id": 2, "drug_fk": null, "drug_ft": "cats"},
      {"id": 3, "patient_id": 3, "drug_fk": "Penicillin", "drug_ft": ""},
      {"id": 4, "patient_id": 3, "drug_fk": "Aspirin", "drug_ft": ""}
    ]
  }
}"#;

    #[test]
    fn groups_rows_by_coded_value() {
        let all = episodes(STORE);
        let chart = trend("allergies__fkftquery__drug");

        let output = chart.get_graph_data(&all).expect("graph data");
        let value = serde_json::to_value(&output.graph_vals).expect("serialize");

        assert_eq!(
            value["aggregate"],
            json!([["Penicillin", 2], ["None", 1], ["Aspirin", 1]])
        );
        assert_eq!(
            value["links"]["None"],
            "/trends?allergies__fkftquery__drug=None"
        );
    }

    #[test]
    fn query_matches_any_related_row() {
        let all = episodes(STORE);
        let chart = trend("allergies__fkftquery__drug");

        assert_eq!(chart.query("Penicillin", &all).expect("query").ids(), &[1, 3, 4]);
        assert_eq!(chart.query("None", &all).expect("query").ids(), &[2]);
        assert!(chart.query("Ibuprofen", &all).expect("query").is_empty());
    }

    #[test]
    fn previous_filters_are_excluded_and_named() {
        let all = episodes(STORE);
        let path = "/trends?allergies__fkftquery__drug=Penicillin";
        let chart = trend_at("allergies__fkftquery__drug", path, date(2024, 5, 1));

        let narrowed = chart.query("Penicillin", &all).expect("query");
        let output = chart.get_graph_data(&narrowed).expect("graph data");
        let value = serde_json::to_value(&output.graph_vals).expect("serialize");

        assert_eq!(value["aggregate"], json!([["Aspirin", 1]]));
        assert_eq!(
            value["links"]["Aspirin"],
            "/trends?allergies__fkftquery__drug=Penicillin&allergies__fkftquery__drug=Aspirin"
        );
        assert_eq!(
            chart.label(),
            "% Breakdown of Drug where the episode has a Drug of Penicillin"
        );
    }

    #[test]
    fn labels_and_descriptions() {
        let chart = trend("allergies__fkftquery__drug");
        assert_eq!(chart.label(), "% Breakdown Of Drug");
        assert_eq!(chart.get_description(Some("Aspirin")), "drug is Aspirin");
    }

    #[test]
    fn conjunctions() {
        assert_eq!(conjunction(&["a"]), "a");
        assert_eq!(conjunction(&["a", "b"]), "a and b");
        assert_eq!(conjunction(&["a", "b", "c"]), "a, b and c");
    }
}
