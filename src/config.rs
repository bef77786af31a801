//! Settings the run reads while answering queries
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// Which saved time a live time is compared against
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumIter, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CompareMethod {
    /// Segment times of the saved run
    #[default]
    BestOverallRun,
    /// Best time ever achieved on each segment
    SumOfBestSegments,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComparisonConfig {
    pub method: CompareMethod,
    /// Share of the total compared time used to scale a comparison graph
    pub compare_percent: f64,
}

impl ComparisonConfig {
    pub const DEFAULT_COMPARE_PERCENT: f64 = 100.0;

    pub fn new(method: CompareMethod, compare_percent: f64) -> Self {
        Self {
            method,
            compare_percent,
        }
    }
}

impl Default for ComparisonConfig {
    fn default() -> Self {
        Self {
            method: CompareMethod::default(),
            compare_percent: Self::DEFAULT_COMPARE_PERCENT,
        }
    }
}
