use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use strum_macros::Display;

/// Window covered by a portfolio chart.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, Default, Display, Deserialize, Eq, PartialEq, Serialize)]
pub enum DisplaySpan {
    #[default]
    #[serde(rename = "month")]
    #[strum(serialize = "month")]
    Month,
    #[serde(rename = "3month")]
    #[strum(serialize = "3month")]
    ThreeMonths,
    #[serde(rename = "year")]
    #[strum(serialize = "year")]
    Year,
}

/// Portfolio value chart for one account.
///
/// The chart service describes presentation as much as data, so only the plotted lines
/// are typed. Everything else is kept as raw JSON in `extra`.
#[non_exhaustive]
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct PortfolioHistory {
    #[serde(default)]
    pub title: Option<Value>,
    #[serde(default)]
    pub lines: Vec<ChartLine>,
    #[serde(default)]
    pub page_direction: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PortfolioHistory {
    /// Every plotted point, line by line and segment by segment.
    pub fn points(&self) -> impl Iterator<Item = &ChartPoint> {
        self.lines
            .iter()
            .flat_map(|line| &line.segments)
            .flat_map(|segment| &segment.points)
    }
}

#[non_exhaustive]
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct ChartLine {
    #[serde(default)]
    pub segments: Vec<ChartSegment>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[non_exhaustive]
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct ChartSegment {
    #[serde(default)]
    pub points: Vec<ChartPoint>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One point of a chart. `x` is the position along the span and `y` the plotted value;
/// the labels shown for it live in `cursor_data`.
#[non_exhaustive]
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct ChartPoint {
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub cursor_data: Option<Value>,
}
