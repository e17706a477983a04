//! Record/replay mode selection

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which handler composition a test run uses
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrafficMode {
    /// Call the live service and archive every interaction.
    /// Needs a real token.
    Record,

    /// Serve exclusively from archived interactions; a miss fails.
    /// Never touches the network.
    #[default]
    Replay,
}

impl TrafficMode {
    /// Does this mode perform network I/O?
    pub fn is_live(&self) -> bool {
        matches!(self, TrafficMode::Record)
    }
}

impl fmt::Display for TrafficMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrafficMode::Record => f.write_str("record"),
            TrafficMode::Replay => f.write_str("replay"),
        }
    }
}

impl FromStr for TrafficMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "record" => Ok(TrafficMode::Record),
            "replay" => Ok(TrafficMode::Replay),
            other => Err(anyhow::anyhow!(
                "Unknown traffic mode '{}', expected 'record' or 'replay'",
                other
            )),
        }
    }
}
