//! Ad-hoc pie chart of one subrecord column.

use crate::constants::NULL_SENTINEL;
use crate::payload::{Aggregate, Cell, GraphData};
use crate::schema::SubrecordSchema;
use crate::store::EpisodeSet;
use std::collections::BTreeMap;

/// Counts the subrecord rows of `episodes` by the raw value of `column`.
///
/// Buckets appear in first-seen row order and null values are labelled `None`. The
/// chart has no drill-down links.
pub fn field_pie_chart(
    episodes: &EpisodeSet,
    subrecord: &SubrecordSchema,
    column: &str,
) -> GraphData {
    let aggregate = episodes
        .subrecords(subrecord)
        .group_count(column)
        .into_iter()
        .map(|(value, count)| {
            let label = value.unwrap_or_else(|| NULL_SENTINEL.to_owned());
            (Cell::from(label), Cell::from(count))
        })
        .collect();

    GraphData::new(Aggregate::Pairs(aggregate), BTreeMap::new())
        .with_subrecord(subrecord.api_name.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Schema;
    use crate::store::RecordStore;
    use serde_json::json;
    use std::sync::Arc;

    #[test]
    fn groups_raw_values() {
        let store = RecordStore::from_json_str(
            r#"{
  "episodes": [
    {"id": 1, "patient_id": 1},
    {"id": 2, "patient_id": 2},
    {"id": 3, "patient_id": 3}
  ],
  "subrecords": {
    "allergies": [
      {"id": 1, "patient_id": 1, "provisional": true},
      {"id": 2, "patient_id": 2, "provisional": false},
      {"id": 3, "patient_id": 3, "provisional": true},
      {"id": 4, "patient_id": 3, "provisional": null},
      {"id": 5, "patient_id": 9, "provisional": true}
    ]
  }
}"#,
        )
        .expect("store");
        let schema = Schema::opal_default().expect("schema");
        let allergies = schema.subrecord("allergies").expect("allergies");
        let all = EpisodeSet::all(Arc::new(store));

        let data = field_pie_chart(&all, allergies, "provisional");
        let value = serde_json::to_value(&data).expect("serialize");
        assert_eq!(
            value,
            json!({
                "aggregate": [["True", 2], ["False", 1], ["None", 1]],
                "links": {},
                "subrecord": "allergies"
            })
        );
    }
}
