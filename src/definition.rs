//! Persisted shape of a run
//!
//! A definition holds what survives between attempts: names, icons, saved run
//! times and best segment times. Everything about the current attempt lives in
//! the [`Run`](crate::run::Run) session and is rebuilt on load.
use crate::time::Time;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunDefinition {
    pub name: String,
    /// Timer pauses after each split
    #[serde(default)]
    pub segmented: bool,
    #[serde(default)]
    pub segments: Vec<SegmentDefinition>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentDefinition {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    /// Segment time of the saved run
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_time: Option<Time>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub best_time: Option<Time>,
}

impl RunDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            segmented: false,
            segments: vec![],
        }
    }

    /// Definition with one segment per name and no saved times
    pub fn with_split_names(name: impl Into<String>, split_names: &[String]) -> Self {
        Self {
            name: name.into(),
            segmented: false,
            segments: split_names
                .iter()
                .map(|n| SegmentDefinition {
                    name: n.clone(),
                    icon: None,
                    run_time: None,
                    best_time: None,
                })
                .collect(),
        }
    }
}
