use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Only plain HTTP servers are considered when deriving cluster health.
pub const ACCESS_TYPES: &[&str] = &["http_plain"];

/// Load-balancer view of the servers, keyed by access type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServersState {
    #[serde(rename = "UP", default)]
    pub up: HashMap<String, Vec<String>>,
    #[serde(rename = "DOWN", default)]
    pub down: HashMap<String, Vec<String>>,
    #[serde(rename = "MAINT", default)]
    pub maint: HashMap<String, Vec<String>>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ClusterHealth {
    pub some_down: bool,
    pub some_maint: bool,
    pub all_down: bool,
}

impl ClusterHealth {
    pub fn from_servers_state(state: &ServersState) -> Self {
        let collect = |by_type: &HashMap<String, Vec<String>>| -> usize {
            ACCESS_TYPES
                .iter()
                .filter_map(|access_type| by_type.get(*access_type))
                .map(Vec::len)
                .sum()
        };
        let (up, down, maint) = (collect(&state.up), collect(&state.down), collect(&state.maint));

        let mut health = ClusterHealth::default();
        if up + down + maint == 0 {
            return health;
        }
        if up == 0 && maint == 0 {
            health.all_down = true;
        } else {
            health.some_down = down > 0;
            health.some_maint = maint > 0;
        }
        health
    }
}

/// What the cluster chooser renders for each known cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClusterSummary {
    pub id: String,
    pub name: String,
    #[serde(flatten)]
    pub health: ClusterHealth,
}

impl ClusterSummary {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            health: ClusterHealth::default(),
        }
    }

    pub fn with_servers_state(mut self, state: &ServersState) -> Self {
        self.health = ClusterHealth::from_servers_state(state);
        self
    }
}
