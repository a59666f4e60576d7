//! Evaluating a list of trends against one episode collection.

use crate::payload::TrendOutput;
use crate::registry::TrendRegistry;
use crate::selector::RequestContext;
use crate::store::EpisodeSet;
use crate::TrendResult;
use serde::Serialize;

/// One evaluated trend, ready to hand to a chart.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RenderedTrend {
    pub key: String,
    pub label: String,
    pub output: TrendOutput,
}

/// Builds and evaluates the trend named by `token`.
pub fn render_trend(
    registry: &TrendRegistry,
    request: &RequestContext,
    episodes: &EpisodeSet,
    token: &str,
) -> TrendResult<RenderedTrend> {
    let trend = registry.from_get_param(token, request)?;
    let output = trend.get_graph_data(episodes)?;
    Ok(RenderedTrend {
        key: trend.to_link_key(),
        label: trend.label(),
        output,
    })
}

/// Evaluates every token in order. The first failure aborts the whole dashboard.
pub fn render_trends<S: AsRef<str>>(
    registry: &TrendRegistry,
    request: &RequestContext,
    episodes: &EpisodeSet,
    tokens: &[S],
) -> TrendResult<Vec<RenderedTrend>> {
    tokens
        .iter()
        .map(|token| render_trend(registry, request, episodes, token.as_ref()))
        .collect()
}
