//! Graph snapshot handed to the rendering layer

use crate::error::{EdgeEndpoint, GraphError, Result};
use crate::model::{FieldMap, FieldType, Observation};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

/// Where the renderer should put a node
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Placement {
    /// Time on the x axis, `cy` on the vertical axis
    Timeline { t: DateTime<Utc>, cy: f64 },
    /// User-pinned canvas coordinates
    Manual { x: f64, y: f64 },
    /// Vertical hint only; the renderer's layout picks x
    Floating { cy: f64 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObsNode {
    pub uuid: Uuid,
    pub severity: u8,
    pub r: f64,
    #[serde(flatten)]
    pub placement: Placement,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldNode {
    pub uuid: Uuid,
    /// Position in the emitted field node list
    pub index: usize,
    pub label: String,
    pub field_type: FieldType,
    pub count: u32,
    pub r: f64,
    #[serde(flatten)]
    pub placement: Placement,
}

/// Link between an observation node and a field node, by uuid only
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    pub uuid: Uuid,
    pub obs_node_uuid: Uuid,
    pub field_node_uuid: Uuid,
}

impl Edge {
    /// The edge uuid is derived from both endpoints so it survives rebuilds.
    pub fn between(obs_node_uuid: Uuid, field_node_uuid: Uuid) -> Self {
        Self {
            uuid: Uuid::new_v5(&obs_node_uuid, field_node_uuid.as_bytes()),
            obs_node_uuid,
            field_node_uuid,
        }
    }
}

/// State carried from one build cycle to the next
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphState {
    pub observations: Vec<Observation>,
    pub fields: FieldMap,
}

impl GraphState {
    pub fn new(observations: Vec<Observation>, fields: FieldMap) -> Self {
        Self { observations, fields }
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn observation(&self, uuid: Uuid) -> Option<&Observation> {
        self.observations.iter().find(|o| o.uuid == uuid)
    }

    pub fn last_start_date(&self) -> Option<DateTime<Utc>> {
        self.observations.last().map(|o| o.start_date)
    }
}

/// Complete output of one build: state plus the derived node and edge lists
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphSnapshot {
    #[serde(flatten)]
    pub state: GraphState,
    pub obs_nodes: Vec<ObsNode>,
    pub field_nodes: Vec<FieldNode>,
    pub edges: Vec<Edge>,
}

impl GraphSnapshot {
    /// Every edge endpoint must resolve to a node of this same snapshot
    pub fn verify_integrity(&self) -> Result<()> {
        let obs: HashSet<Uuid> = self.obs_nodes.iter().map(|n| n.uuid).collect();
        let fields: HashSet<Uuid> = self.field_nodes.iter().map(|n| n.uuid).collect();

        for edge in &self.edges {
            if !obs.contains(&edge.obs_node_uuid) {
                return Err(GraphError::DanglingEdge {
                    edge: edge.uuid,
                    endpoint: EdgeEndpoint::Observation,
                    node: edge.obs_node_uuid,
                });
            }
            if !fields.contains(&edge.field_node_uuid) {
                return Err(GraphError::DanglingEdge {
                    edge: edge.uuid,
                    endpoint: EdgeEndpoint::Field,
                    node: edge.field_node_uuid,
                });
            }
        }
        Ok(())
    }

    pub fn field_node(&self, label: &str) -> Option<&FieldNode> {
        self.field_nodes.iter().find(|n| n.label == label)
    }

    pub fn edges_to(&self, field_node_uuid: Uuid) -> impl Iterator<Item = &Edge> + '_ {
        self.edges
            .iter()
            .filter(move |e| e.field_node_uuid == field_node_uuid)
    }

    pub fn summary(&self) -> SnapshotSummary {
        SnapshotSummary {
            observations: self.state.observations.len(),
            fields: self.state.fields.len(),
            field_nodes: self.field_nodes.len(),
            pinned_fields: self.state.fields.pinned_count(),
            edges: self.edges.len(),
        }
    }
}

/// Counts describing a snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotSummary {
    pub observations: usize,
    pub fields: usize,
    pub field_nodes: usize,
    pub pinned_fields: usize,
    pub edges: usize,
}

impl std::fmt::Display for SnapshotSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} observations, {} fields ({} visible, {} pinned), {} edges",
            self.observations, self.fields, self.field_nodes, self.pinned_fields, self.edges
        )
    }
}
