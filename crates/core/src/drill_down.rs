//! Applying the trend filters a request carries.
//!
//! Following drill-down links leaves `selector=value` pairs on the request. Replaying
//! them in order narrows an episode collection to what the user has clicked into.

use crate::constants::SELECTOR_SEPARATOR;
use crate::registry::TrendRegistry;
use crate::selector::RequestContext;
use crate::store::EpisodeSet;
use crate::TrendResult;
use serde::Serialize;

/// One filter taken from the request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AppliedFilter {
    pub key: String,
    pub value: String,
    pub description: String,
}

#[derive(Clone, Debug)]
pub struct DrillDown {
    pub episodes: EpisodeSet,
    pub applied: Vec<AppliedFilter>,
}

impl DrillDown {
    pub fn descriptions(&self) -> Vec<&str> {
        self.applied
            .iter()
            .map(|filter| filter.description.as_str())
            .collect()
    }
}

/// Narrows `episodes` by every trend filter on `request`, key by key in request order.
///
/// Query keys that are not selector-shaped (no `__`) are skipped.
///
/// # Errors
///
/// A selector-shaped key that is malformed or names an unregistered slug is an error,
/// as is any value its trend cannot parse.
pub fn apply_request_filters(
    registry: &TrendRegistry,
    request: &RequestContext,
    episodes: &EpisodeSet,
) -> TrendResult<DrillDown> {
    let mut narrowed = episodes.clone();
    let mut applied = Vec::new();

    for key in request.keys() {
        if key.split(SELECTOR_SEPARATOR).count() < 2 {
            tracing::warn!("ignoring non-trend query parameter '{}'", key);
            continue;
        }

        let trend = registry.from_get_param(key, request)?;
        for value in request.get_list(key) {
            let before = narrowed.count();
            narrowed = trend.query(value, &narrowed)?;
            tracing::info!(
                "applied {}={}: {} -> {} episodes",
                key,
                value,
                before,
                narrowed.count()
            );

            applied.push(AppliedFilter {
                key: key.to_owned(),
                value: value.to_owned(),
                description: trend.get_description(Some(value)),
            });
        }
    }

    Ok(DrillDown {
        episodes: narrowed,
        applied,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TrendConfig;
    use crate::schema::Schema;
    use crate::store::RecordStore;
    use crate::TrendError;
    use std::sync::Arc;

    const STORE: &str = r#"{
  "episodes": [
    {"id": 1, "patient_id": 1, "start": "2016-08-01"},
    {"id": 2, "patient_id": 2, "start": "2016-08-01"},
    {"id": 3, "patient_id": 3, "start": "2017-08-01"},
    {"id": 4, "patient_id": 4, "start": "2017-08-01"}
  ],
  "subrecords": {
    "allergies": [
      {"id": 1, "patient_id": 1, "drug_fk": "Penicillin", "drug_ft": ""},
      {"id": 2, "patient_id": 1, "drug_fk": "Aspirin", "drug_ft": ""},
      {"id": 3, "patient_id": 2, "drug_fk": "Penicillin", "drug_ft": ""},
      {"id": 4, "patient_id": 3, "drug_fk": "Penicillin", "drug_ft": ""}
    ]
  }
}"#;

    fn setup() -> (TrendRegistry, EpisodeSet) {
        let schema = Schema::opal_default().expect("schema");
        let registry = TrendRegistry::builtin(Arc::new(schema), Arc::new(TrendConfig::default()))
            .expect("registry");
        let store = RecordStore::from_json_str(STORE).expect("store");
        (registry, EpisodeSet::all(Arc::new(store)))
    }

    #[test]
    fn repeated_values_form_a_conjunction() {
        let (registry, all) = setup();
        let request = RequestContext::new(
            "/t?allergies__fkftquery__drug=Penicillin&allergies__fkftquery__drug=Aspirin",
        );

        let drill = apply_request_filters(&registry, &request, &all).expect("apply");
        assert_eq!(drill.episodes.ids(), &[1]);
        assert_eq!(
            drill.descriptions(),
            vec!["drug is Penicillin", "drug is Aspirin"]
        );
    }

    #[test]
    fn filters_from_different_trends_combine() {
        let (registry, all) = setup();
        let request = RequestContext::new(
            "/t?page=2&allergies__fkftquery__drug=Penicillin&demographics__episodeadmissions=01/07/2017 +",
        );

        let drill = apply_request_filters(&registry, &request, &all).expect("apply");
        assert_eq!(drill.episodes.ids(), &[3]);
        assert_eq!(drill.applied.len(), 2);
        assert_eq!(drill.applied[1].key, "demographics__episodeadmissions");
        assert!(drill.episodes.is_subset_of(&all));
    }

    #[test]
    fn no_filters_keeps_everything() {
        let (registry, all) = setup();
        let drill =
            apply_request_filters(&registry, &RequestContext::new("/t"), &all).expect("apply");
        assert_eq!(drill.episodes.ids(), all.ids());
        assert!(drill.applied.is_empty());
    }

    #[test]
    fn unknown_trend_keys_are_errors() {
        let (registry, all) = setup();
        let request = RequestContext::new("/t?allergies__sparkline=1");
        match apply_request_filters(&registry, &request, &all) {
            Err(TrendError::UnknownTrendKind(slug)) => assert_eq!(slug, "sparkline"),
            other => panic!("expected UnknownTrendKind error, got {other:?}"),
        }
    }

    #[test]
    fn bad_values_are_errors() {
        let (registry, all) = setup();
        let request = RequestContext::new("/t?allergies__subrecord_count=many");
        let err = apply_request_filters(&registry, &request, &all).expect_err("should fail");
        assert!(matches!(err, TrendError::InvalidValue(_)));
    }
}
