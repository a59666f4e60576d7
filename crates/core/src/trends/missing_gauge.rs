use super::gauge;
use crate::payload::TrendOutput;
use crate::registry::TrendKind;
use crate::store::EpisodeSet;
use crate::trend::{Trend, TrendContext};
use crate::TrendResult;

/// Gauge of the episodes that have no rows of a subrecord at all.
#[derive(Debug)]
pub struct MissingGauge {
    context: TrendContext,
}

impl MissingGauge {
    pub const SLUG: &'static str = "missinggauge";
    pub const KIND: TrendKind = TrendKind {
        slug: Self::SLUG,
        display_name: "MissingGauge",
        factory: Self::build,
    };

    pub fn new(context: TrendContext) -> Self {
        Self { context }
    }

    fn build(context: TrendContext) -> TrendResult<Box<dyn Trend>> {
        Ok(Box::new(Self::new(context)))
    }
}

impl Trend for MissingGauge {
    fn slug(&self) -> &'static str {
        Self::SLUG
    }

    fn context(&self) -> &TrendContext {
        &self.context
    }

    fn get_graph_data(&self, episodes: &EpisodeSet) -> TrendResult<TrendOutput> {
        let total = episodes.count();
        let count = if total == 0 {
            0
        } else {
            episodes
                .filter_related_count(&self.context.subrecord, 0)
                .count()
        };

        tracing::debug!("{}: {count} of {total} episodes missing", self.to_link_key());

        Ok(gauge(self, total, count, None))
    }

    fn query(&self, _value: &str, episodes: &EpisodeSet) -> TrendResult<EpisodeSet> {
        Ok(episodes.filter_related_count(&self.context.subrecord, 0))
    }

    fn get_description(&self, _value: Option<&str>) -> String {
        format!(
            "Number of episodes without a {}",
            self.context.subrecord.display_name
        )
    }

    fn label(&self) -> String {
        format!("Episodes Without {}", self.context.subrecord.display_name)
    }
}
