use super::gauge;
use crate::payload::TrendOutput;
use crate::registry::TrendKind;
use crate::store::EpisodeSet;
use crate::trend::{FkFtField, Trend, TrendContext};
use crate::TrendResult;

/// Gauge of the subrecord rows where a coded-or-free-text field is blank.
#[derive(Debug)]
pub struct EmptyFieldGauge {
    context: TrendContext,
    field: FkFtField,
}

impl EmptyFieldGauge {
    pub const SLUG: &'static str = "emptyfieldgauge";
    pub const KIND: TrendKind = TrendKind {
        slug: Self::SLUG,
        display_name: "EmptyFieldGauge",
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

impl Trend for EmptyFieldGauge {
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
            rows.filter(&self.field.empty()).count()
        };

        tracing::debug!("{}: {count} of {total} rows empty", self.to_link_key());

        Ok(gauge(self, total, count, Some(self.field.name.as_str())))
    }

    /// Every bucket of the gauge means "blank", so `value` is not consulted.
    fn query(&self, _value: &str, episodes: &EpisodeSet) -> TrendResult<EpisodeSet> {
        Ok(episodes.filter_related(&self.context.subrecord, &self.field.empty()))
    }

    fn get_description(&self, _value: Option<&str>) -> String {
        format!("{} has not been filled in", self.field.name)
    }

    fn label(&self) -> String {
        format!("{} Not Filled In", self.field.title)
    }
}
