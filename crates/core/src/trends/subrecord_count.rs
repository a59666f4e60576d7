use super::links_for;
use crate::payload::{Aggregate, Cell, GraphData, TrendOutput};
use crate::registry::TrendKind;
use crate::store::EpisodeSet;
use crate::trend::{display_value, Trend, TrendContext};
use crate::{TrendError, TrendResult};
use std::collections::BTreeMap;

/// Pie chart of how many episodes have 0, 1, 2, ... rows of a subrecord.
#[derive(Debug)]
pub struct SubrecordCountPieChart {
    context: TrendContext,
}

impl SubrecordCountPieChart {
    pub const SLUG: &'static str = "subrecord_count";
    pub const KIND: TrendKind = TrendKind {
        slug: Self::SLUG,
        display_name: "Subrecord count",
        factory: Self::build,
    };

    pub fn new(context: TrendContext) -> Self {
        Self { context }
    }

    fn build(context: TrendContext) -> TrendResult<Box<dyn Trend>> {
        Ok(Box::new(Self::new(context)))
    }
}

impl Trend for SubrecordCountPieChart {
    fn slug(&self) -> &'static str {
        Self::SLUG
    }

    fn context(&self) -> &TrendContext {
        &self.context
    }

    fn get_graph_data(&self, episodes: &EpisodeSet) -> TrendResult<TrendOutput> {
        let mut histogram: BTreeMap<usize, usize> = BTreeMap::new();
        for (_, count) in episodes.annotate_count(&self.context.subrecord) {
            *histogram.entry(count).or_default() += 1;
        }

        tracing::debug!(
            "{}: {} count buckets over {} episodes",
            self.to_link_key(),
            histogram.len(),
            episodes.count()
        );

        let labels: Vec<String> = histogram.keys().map(usize::to_string).collect();
        let aggregate = histogram
            .into_iter()
            .map(|(count, episodes)| (Cell::from(count), Cell::from(episodes)))
            .collect();

        Ok(TrendOutput::chart(GraphData::new(
            Aggregate::Pairs(aggregate),
            links_for(self, &labels),
        )))
    }

    fn query(&self, value: &str, episodes: &EpisodeSet) -> TrendResult<EpisodeSet> {
        let count: usize = value.trim().parse().map_err(|_| {
            TrendError::InvalidValue(format!("'{value}' is not a subrecord count"))
        })?;
        Ok(episodes.filter_related_count(&self.context.subrecord, count))
    }

    fn get_description(&self, value: Option<&str>) -> String {
        let description = format!(
            "Episodes with {} {}",
            display_value(value),
            self.context.subrecord.display_name
        );
        if value == Some("1") {
            description
        } else {
            format!("{description}s")
        }
    }

    fn label(&self) -> String {
        format!(
            "Number Of {} Per Episode",
            self.context.subrecord.display_name
        )
    }
}
