//! The trend strategy interface.
//!
//! A trend buckets an [`EpisodeSet`] along one dimension, emits chart data with
//! drill-down links, and can narrow a set back down to the episodes of one bucket.
//! Everything a trend needs about its subrecord and field is resolved into a
//! [`TrendContext`] before it is built.

use crate::config::TrendConfig;
use crate::constants::{FK_SUFFIX, FT_SUFFIX, NULL_SENTINEL};
use crate::payload::TrendOutput;
use crate::schema::{FieldKind, FieldSchema, Schema, SubrecordSchema};
use crate::selector::{encode, RequestContext, TrendSelector};
use crate::store::{EpisodeSet, Lookup};
use crate::{TrendError, TrendResult};
use std::sync::Arc;
use trendy_types::{Identifier, NonEmptyText};

/// Everything a trend is built from.
#[derive(Clone, Debug)]
pub struct TrendContext {
    pub subrecord: SubrecordSchema,
    pub field_name: Option<Identifier>,
    pub request: RequestContext,
    pub config: Arc<TrendConfig>,
}

impl TrendContext {
    /// Resolves the selector's subrecord against `schema`.
    ///
    /// # Errors
    ///
    /// Returns [`TrendError::UnknownSubrecord`] if the schema does not declare it.
    pub fn new(
        schema: &Schema,
        selector: &TrendSelector,
        request: RequestContext,
        config: Arc<TrendConfig>,
    ) -> TrendResult<Self> {
        let subrecord = schema.subrecord(selector.subrecord_api_name.as_str())?.clone();
        Ok(Self {
            subrecord,
            field_name: selector.field_name.clone(),
            request,
            config,
        })
    }

    /// The field this trend was asked for.
    ///
    /// # Errors
    ///
    /// Returns [`TrendError::MissingFieldName`] if none was given, or
    /// [`TrendError::UnknownField`] if the subrecord does not declare it.
    pub fn require_field(&self, slug: &str) -> TrendResult<&FieldSchema> {
        let name = self
            .field_name
            .as_ref()
            .ok_or_else(|| TrendError::MissingFieldName {
                slug: slug.to_owned(),
            })?;
        self.subrecord.field(name.as_str())
    }

    pub fn link_key(&self, slug: &str) -> String {
        encode(
            self.subrecord.api_name.as_str(),
            slug,
            self.field_name.as_ref().map(Identifier::as_str),
        )
    }

    /// Values already drilled into for this trend on the current request.
    pub fn previous_filters(&self, slug: &str) -> Vec<&str> {
        self.request.get_list(&self.link_key(slug))
    }
}

/// A trend strategy.
pub trait Trend: Send + Sync + std::fmt::Debug {
    /// Registry key of the strategy.
    fn slug(&self) -> &'static str;

    fn context(&self) -> &TrendContext;

    /// Buckets `episodes` and builds chart data with one drill-down link per bucket.
    fn get_graph_data(&self, episodes: &EpisodeSet) -> TrendResult<TrendOutput>;

    /// The episodes of `episodes` that fall into bucket `value`.
    fn query(&self, value: &str, episodes: &EpisodeSet) -> TrendResult<EpisodeSet>;

    /// Caption for one bucket value.
    fn get_description(&self, value: Option<&str>) -> String;

    /// Title of the whole chart.
    fn label(&self) -> String;

    fn to_link_key(&self) -> String {
        self.context().link_key(self.slug())
    }

    /// The current request path with `to_link_key()=value` appended.
    fn to_link(&self, value: &str) -> String {
        let link = format!("{}={value}", self.to_link_key());
        self.context().request.append_to_request(&link)
    }
}

/// Renders an optional description value; a missing value reads as the null sentinel.
pub(crate) fn display_value(value: Option<&str>) -> &str {
    value.unwrap_or(NULL_SENTINEL)
}

/// Column names of a coded-or-free-text field.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FkFtField {
    pub name: Identifier,
    pub title: NonEmptyText,
    /// `<field>_fk` on the subrecord row.
    pub fk_field: String,
    /// `<field>_ft` on the subrecord row.
    pub ft_field: String,
    /// `[patient__]<subrecord>__<field>_fk`, the path from an episode.
    ///
    /// Descriptive only: lookups run against the row columns through
    /// [`EpisodeSet::filter_related`](crate::store::EpisodeSet::filter_related), which
    /// follows the same hop. Query traces name the filter by this path.
    pub relative_fk_field: String,
    /// `[patient__]<subrecord>__<field>_ft`, the path from an episode.
    pub relative_ft_field: String,
}

impl FkFtField {
    /// Resolves the context's field.
    ///
    /// # Errors
    ///
    /// Returns [`TrendError::MissingFieldName`] or [`TrendError::UnknownField`] as
    /// [`TrendContext::require_field`] does, and [`TrendError::UnsupportedFieldType`]
    /// if the field is not a coded-or-free-text pair.
    pub fn resolve(context: &TrendContext, slug: &str) -> TrendResult<Self> {
        let field = context.require_field(slug)?;
        if field.kind != FieldKind::ForeignKeyOrFreeText {
            return Err(TrendError::UnsupportedFieldType {
                subrecord: context.subrecord.api_name.to_string(),
                field: field.name.to_string(),
            });
        }

        let fk_field = format!("{}{FK_SUFFIX}", field.name);
        let ft_field = format!("{}{FT_SUFFIX}", field.name);
        Ok(Self {
            name: field.name.clone(),
            title: field.title.clone(),
            relative_fk_field: context.subrecord.related_path(Some(&fk_field)),
            relative_ft_field: context.subrecord.related_path(Some(&ft_field)),
            fk_field,
            ft_field,
        })
    }

    /// Rows whose coded value is `value`; the null sentinel selects rows with no code.
    pub fn coded_as(&self, value: &str) -> Lookup {
        if value == NULL_SENTINEL {
            Lookup::IsNull(self.fk_field.clone())
        } else {
            Lookup::Equals(self.fk_field.clone(), value.to_owned())
        }
    }

    /// Neither coded nor free text.
    pub fn empty(&self) -> Lookup {
        Lookup::IsNull(self.fk_field.clone()).and(Lookup::IsEmpty(self.ft_field.clone()))
    }

    /// Free text only.
    pub fn non_coded(&self) -> Lookup {
        Lookup::IsNull(self.fk_field.clone())
            .and(Lookup::IsEmpty(self.ft_field.clone()).negate())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(token: &str, path: &str) -> TrendContext {
        let schema = Schema::opal_default().expect("schema");
        let selector = TrendSelector::decode(token).expect("selector");
        TrendContext::new(
            &schema,
            &selector,
            RequestContext::new(path),
            Arc::new(TrendConfig::default()),
        )
        .expect("context")
    }

    #[test]
    fn fk_ft_columns_for_patient_subrecord() {
        let ctx = context("allergies__fkftquery__drug", "/t");
        let field = FkFtField::resolve(&ctx, "fkftquery").expect("resolve");

        assert_eq!(field.fk_field, "drug_fk");
        assert_eq!(field.ft_field, "drug_ft");
        assert_eq!(field.relative_fk_field, "patient__allergies__drug_fk");
        assert_eq!(field.relative_ft_field, "patient__allergies__drug_ft");
        assert_eq!(field.title.as_str(), "Drug");
    }

    #[test]
    fn fk_ft_columns_for_episode_subrecord() {
        let ctx = context("diagnosis__fkftquery__condition", "/t");
        let field = FkFtField::resolve(&ctx, "fkftquery").expect("resolve");
        assert_eq!(field.relative_fk_field, "diagnosis__condition_fk");
    }

    #[test]
    fn missing_field_name() {
        let ctx = context("allergies__fkftquery", "/t");
        match FkFtField::resolve(&ctx, "fkftquery") {
            Err(TrendError::MissingFieldName { slug }) => assert_eq!(slug, "fkftquery"),
            other => panic!("expected MissingFieldName error, got {other:?}"),
        }
    }

    #[test]
    fn scalar_field_is_unsupported() {
        let ctx = context("demographics__fkftquery__hospital_number", "/t");
        match FkFtField::resolve(&ctx, "fkftquery") {
            Err(TrendError::UnsupportedFieldType { subrecord, field }) => {
                assert_eq!(subrecord, "demographics");
                assert_eq!(field, "hospital_number");
            }
            other => panic!("expected UnsupportedFieldType error, got {other:?}"),
        }
    }

    #[test]
    fn unknown_subrecord_fails_context() {
        let schema = Schema::opal_default().expect("schema");
        let selector = TrendSelector::decode("microbiology__missinggauge").expect("selector");
        let err = TrendContext::new(
            &schema,
            &selector,
            RequestContext::default(),
            Arc::new(TrendConfig::default()),
        )
        .expect_err("should fail");
        assert!(matches!(err, TrendError::UnknownSubrecord(_)));
    }

    #[test]
    fn previous_filters_use_own_key() {
        let ctx = context(
            "allergies__fkftquery__drug",
            "/t?allergies__fkftquery__drug=A&other=1&allergies__fkftquery__drug=B",
        );
        assert_eq!(ctx.previous_filters("fkftquery"), vec!["A", "B"]);
    }
}
