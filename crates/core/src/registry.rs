//! Slug to strategy lookup.
//!
//! The registry is built explicitly (usually with [`TrendRegistry::builtin`]) and
//! passed to whatever needs to turn selectors into trends. There is no global table.

use crate::config::TrendConfig;
use crate::schema::Schema;
use crate::selector::{RequestContext, TrendSelector};
use crate::trend::{Trend, TrendContext};
use crate::trends::{
    AgeBarChart, EmptyFieldGauge, EpisodeAdmissionBarChart, FtFkQueryPieChart, MissingGauge,
    NonCodedFkAndFtGauge, SubrecordCountPieChart,
};
use crate::{TrendError, TrendResult};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Builds a strategy from its resolved context.
pub type TrendFactory = fn(TrendContext) -> TrendResult<Box<dyn Trend>>;

/// A registered strategy.
#[derive(Clone, Copy, Debug)]
pub struct TrendKind {
    pub slug: &'static str,
    pub display_name: &'static str,
    pub factory: TrendFactory,
}

#[derive(Clone, Debug)]
pub struct TrendRegistry {
    schema: Arc<Schema>,
    config: Arc<TrendConfig>,
    kinds: BTreeMap<&'static str, TrendKind>,
}

impl TrendRegistry {
    /// An empty registry resolving subrecords against `schema`.
    pub fn new(schema: Arc<Schema>, config: Arc<TrendConfig>) -> Self {
        Self {
            schema,
            config,
            kinds: BTreeMap::new(),
        }
    }

    /// A registry with every built-in strategy.
    pub fn builtin(schema: Arc<Schema>, config: Arc<TrendConfig>) -> TrendResult<Self> {
        let mut registry = Self::new(schema, config);
        registry.register(SubrecordCountPieChart::KIND)?;
        registry.register(FtFkQueryPieChart::KIND)?;
        registry.register(EpisodeAdmissionBarChart::KIND)?;
        registry.register(AgeBarChart::KIND)?;
        registry.register(EmptyFieldGauge::KIND)?;
        registry.register(NonCodedFkAndFtGauge::KIND)?;
        registry.register(MissingGauge::KIND)?;
        Ok(registry)
    }

    /// Adds a strategy.
    ///
    /// # Errors
    ///
    /// Returns [`TrendError::DuplicateTrendKind`] if the slug is already registered.
    pub fn register(&mut self, kind: TrendKind) -> TrendResult<()> {
        if self.kinds.contains_key(kind.slug) {
            return Err(TrendError::DuplicateTrendKind(kind.slug.to_owned()));
        }
        self.kinds.insert(kind.slug, kind);
        Ok(())
    }

    pub fn get(&self, slug: &str) -> Option<&TrendKind> {
        self.kinds.get(slug)
    }

    pub fn slugs(&self) -> Vec<&'static str> {
        self.kinds.keys().copied().collect()
    }

    pub fn kinds(&self) -> impl Iterator<Item = &TrendKind> {
        self.kinds.values()
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn config(&self) -> &Arc<TrendConfig> {
        &self.config
    }

    /// Decodes a selector token and checks its slug is registered.
    ///
    /// # Errors
    ///
    /// Returns [`TrendError::MalformedSelector`] or [`TrendError::UnknownTrendKind`].
    pub fn decode(&self, token: &str) -> TrendResult<TrendSelector> {
        let selector = TrendSelector::decode(token)?;
        if self.get(selector.slug.as_str()).is_none() {
            return Err(TrendError::UnknownTrendKind(selector.slug.to_string()));
        }
        Ok(selector)
    }

    /// Builds the trend named by `selector` for `request`.
    pub fn build(
        &self,
        selector: &TrendSelector,
        request: &RequestContext,
    ) -> TrendResult<Box<dyn Trend>> {
        let kind = self
            .get(selector.slug.as_str())
            .ok_or_else(|| TrendError::UnknownTrendKind(selector.slug.to_string()))?;
        let context = TrendContext::new(
            &self.schema,
            selector,
            request.clone(),
            Arc::clone(&self.config),
        )?;
        (kind.factory)(context)
    }

    /// Decodes `token` and builds its trend.
    pub fn from_get_param(
        &self,
        token: &str,
        request: &RequestContext,
    ) -> TrendResult<Box<dyn Trend>> {
        let selector = self.decode(token)?;
        self.build(&selector, request)
    }
}
