//! # Graph Builder
//!
//! Turns prior state plus a batch of new observations into a [`GraphSnapshot`].
//! Field nodes are emitted for fields whose cumulative count exceeds the
//! significance threshold, or that carry a manual pin. Edges only link fields
//! past the threshold.

use crate::aggregator::FieldAggregator;
use crate::config::{EngineConfig, FieldLayout, ObsRadius};
use crate::generator::{GenerateOptions, ObservationGenerator};
use obsgraph_core::{
    Edge, Field, FieldMap, FieldNode, GraphError, GraphSnapshot, GraphState, ObsNode, Observation,
    Placement, Position, RandomSource,
};
use std::collections::HashMap;
use tracing::debug;
use uuid::Uuid;

/// Builds snapshots from state
#[derive(Debug, Clone)]
pub struct GraphBuilder {
    config: EngineConfig,
    generator: ObservationGenerator,
}

impl GraphBuilder {
    pub fn new(config: EngineConfig) -> Self {
        let generator = ObservationGenerator::new(&config);
        Self { config, generator }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Generate `new_count` observations after `prior`, fold them into the
    /// prior field map and project the result. `prior` is left as it was.
    pub fn build<R: RandomSource + ?Sized>(
        &self,
        rng: &mut R,
        prior: &GraphState,
        new_count: usize,
        options: GenerateOptions,
    ) -> Result<GraphSnapshot, GraphError> {
        let new = self
            .generator
            .append_batch(rng, new_count, options, &prior.observations)?;
        let fields = FieldAggregator::aggregate(rng, &prior.fields, &new)?;

        let mut observations = Vec::with_capacity(prior.observations.len() + new.len());
        observations.extend_from_slice(&prior.observations);
        observations.extend(new);

        self.project(GraphState::new(observations, fields))
    }

    /// Derive node and edge lists from `state`
    pub fn project(&self, state: GraphState) -> Result<GraphSnapshot, GraphError> {
        for observation in &state.observations {
            observation.validate()?;
        }

        let mut field_nodes = Vec::new();
        // Only fields past the threshold are linked; pins alone give a node without edges
        let mut linked: HashMap<&str, Uuid> = HashMap::new();

        for field in &state.fields {
            let significant = field.count > self.config.significance_threshold;
            if !significant && !field.is_custom() {
                continue;
            }
            let node = self.field_node(field, field_nodes.len());
            if significant {
                linked.insert(field.label.as_str(), node.uuid);
            }
            field_nodes.push(node);
        }

        let obs_nodes: Vec<ObsNode> = state
            .observations
            .iter()
            .map(|o| self.obs_node(o))
            .collect();

        let mut edges = Vec::new();
        for observation in &state.observations {
            for (_, value) in observation.distinct_values() {
                if let Some(&field_node_uuid) = linked.get(value) {
                    edges.push(Edge::between(observation.uuid, field_node_uuid));
                }
            }
        }

        let snapshot = GraphSnapshot {
            state,
            obs_nodes,
            field_nodes,
            edges,
        };
        snapshot.verify_integrity()?;

        debug!(summary = %snapshot.summary(), "projected graph");
        Ok(snapshot)
    }

    /// Pin every field referenced by `observation` around `(x, y)`.
    ///
    /// Each axis gets an independent offset of up to half the configured jitter.
    pub fn pin<R: RandomSource + ?Sized>(
        &self,
        rng: &mut R,
        fields: &FieldMap,
        observation: &Observation,
        x: f64,
        y: f64,
    ) -> Result<FieldMap, GraphError> {
        let jitter = self.config.layout.pin_jitter;
        let mut pinned = fields.clone();

        for (_, value) in observation.distinct_values() {
            let field = pinned.get_mut(value).ok_or_else(|| GraphError::UnknownField {
                observation: observation.uuid,
                label: value.to_string(),
            })?;
            let dx = (rng.next_f64() - 0.5) * jitter;
            let dy = (rng.next_f64() - 0.5) * jitter;
            field.pin = Some(Position { x: x + dx, y: y + dy });
        }

        debug!(observation = %observation.uuid, "pinned observation fields");
        Ok(pinned)
    }

    /// Damped weight of a field's highest severities
    fn field_weight(&self, field: &Field) -> f64 {
        let sum = field.top_severity_sum(self.config.top_severity_count);
        f64::from(sum).powf(self.config.severity_exponent)
    }

    fn field_node(&self, field: &Field, index: usize) -> FieldNode {
        let weight = self.field_weight(field);
        let placement = match (field.pin, self.config.layout.field_layout) {
            (Some(Position { x, y }), _) => Placement::Manual { x, y },
            (None, FieldLayout::Timeline) => Placement::Timeline {
                t: field.last_seen,
                cy: 10.0 + weight * 1.8,
            },
            (None, FieldLayout::AxisFree) => Placement::Floating {
                cy: 20.0 + field.angle,
            },
        };

        FieldNode {
            uuid: field.uuid,
            index,
            label: field.label.clone(),
            field_type: field.field_type,
            count: field.count,
            r: weight + 3.0,
            placement,
        }
    }

    fn obs_node(&self, observation: &Observation) -> ObsNode {
        let severity = f64::from(observation.severity);
        let r = match self.config.layout.obs_radius {
            ObsRadius::Damped => severity.powf(self.config.severity_exponent) + 3.0,
            ObsRadius::SquareRoot => (severity * 20.0).sqrt(),
        };

        ObsNode {
            uuid: observation.uuid,
            severity: observation.severity,
            r,
            placement: Placement::Timeline {
                t: observation.start_date,
                cy: severity,
            },
        }
    }
}

impl Default for GraphBuilder {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use obsgraph_core::{FieldSlot, RngSource, SequenceSource};

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn obs(n: u128, severity: u8, source_ip: &str, username: &str) -> Observation {
        Observation::new(Uuid::from_u128(n), start() + Duration::minutes(n as i64), severity)
            .with_slot(FieldSlot::SourceIp, source_ip)
            .with_slot(FieldSlot::DestIp, format!("192.168.1.{}", n))
            .with_slot(FieldSlot::Username, username)
    }

    fn state(observations: Vec<Observation>) -> GraphState {
        let mut rng = RngSource::seeded(42);
        let fields = FieldAggregator::aggregate(&mut rng, &FieldMap::new(), &observations).unwrap();
        GraphState::new(observations, fields)
    }

    #[test]
    fn test_recurring_source_ip_becomes_a_node() {
        let severities = [1, 7, 3, 9, 2];
        let observations: Vec<Observation> = severities
            .iter()
            .enumerate()
            .map(|(i, &s)| obs(i as u128 + 1, s, "10.0.0.1", &format!("user{}", i)))
            .collect();

        let snapshot = GraphBuilder::default().project(state(observations)).unwrap();

        assert_eq!(snapshot.field_nodes.len(), 1);
        let node = snapshot.field_node("10.0.0.1").unwrap();
        assert_eq!(node.count, 5);
        assert_eq!(node.index, 0);
        assert_eq!(snapshot.state.fields.get("10.0.0.1").unwrap().severity, 9);
        assert_eq!(snapshot.edges_to(node.uuid).count(), 5);
        assert_eq!(snapshot.edges.len(), 5);
        assert_eq!(snapshot.obs_nodes.len(), 5);
    }

    #[test]
    fn test_field_weight_uses_top_four_severities() {
        let severities = [1, 7, 3, 9, 2];
        let observations: Vec<Observation> = severities
            .iter()
            .enumerate()
            .map(|(i, &s)| obs(i as u128 + 1, s, "10.0.0.1", "root"))
            .collect();

        let snapshot = GraphBuilder::default().project(state(observations)).unwrap();
        let node = snapshot.field_node("10.0.0.1").unwrap();
        let weight = 21f64.powf(0.7);

        assert!((node.r - (weight + 3.0)).abs() < 1e-9);
        match node.placement {
            Placement::Timeline { t, cy } => {
                assert_eq!(t, start() + Duration::minutes(5));
                assert!((cy - (10.0 + weight * 1.8)).abs() < 1e-9);
            }
            other => panic!("unexpected placement {:?}", other),
        }
    }

    #[test]
    fn test_threshold_is_exclusive() {
        let observations: Vec<Observation> = (1..=4)
            .map(|n| obs(n, 5, "10.0.0.1", "root"))
            .collect();

        let snapshot = GraphBuilder::default().project(state(observations)).unwrap();

        assert_eq!(snapshot.state.fields.get("10.0.0.1").unwrap().count, 4);
        assert!(snapshot.field_nodes.is_empty());
        assert!(snapshot.edges.is_empty());
    }

    #[test]
    fn test_pinned_field_below_threshold_is_shown() {
        let builder = GraphBuilder::default();
        let observations = vec![
            obs(1, 3, "10.0.0.1", "alice"),
            obs(2, 4, "10.0.0.1", "bob"),
        ];
        let state = state(observations);
        assert_eq!(state.fields.get("10.0.0.1").unwrap().count, 2);

        // u = 0.5 puts the jitter at zero
        let mut rng = SequenceSource::constant(0.5);
        let fields = builder
            .pin(&mut rng, &state.fields, &state.observations[0], 120.0, 80.0)
            .unwrap();
        let snapshot = builder
            .project(GraphState::new(state.observations.clone(), fields))
            .unwrap();

        let node = snapshot.field_node("10.0.0.1").unwrap();
        assert_eq!(node.placement, Placement::Manual { x: 120.0, y: 80.0 });
        // alice, 10.0.0.1 and 192.168.1.1 are pinned; bob is not
        assert_eq!(snapshot.field_nodes.len(), 3);
        assert!(snapshot.field_node("bob").is_none());
        assert_eq!(snapshot.summary().pinned_fields, 3);
        // a pin shows the node but does not link it below the threshold
        assert_eq!(snapshot.edges_to(node.uuid).count(), 0);
        assert!(snapshot.edges.is_empty());
        assert!(snapshot.verify_integrity().is_ok());
    }

    #[test]
    fn test_pinned_field_past_threshold_keeps_its_edges() {
        let builder = GraphBuilder::default();
        let observations: Vec<Observation> = (1..=5)
            .map(|n| obs(n, 2, "10.0.0.1", &format!("user{}", n)))
            .collect();
        let state = state(observations);

        let mut rng = SequenceSource::constant(0.5);
        let fields = builder
            .pin(&mut rng, &state.fields, &state.observations[0], 0.0, 0.0)
            .unwrap();
        let snapshot = builder
            .project(GraphState::new(state.observations.clone(), fields))
            .unwrap();

        let ip = snapshot.field_node("10.0.0.1").unwrap();
        let user = snapshot.field_node("user1").unwrap();
        assert_eq!(ip.placement, Placement::Manual { x: 0.0, y: 0.0 });
        assert_eq!(snapshot.edges_to(ip.uuid).count(), 5);
        assert_eq!(snapshot.edges_to(user.uuid).count(), 0);
        assert_eq!(snapshot.edges.len(), 5);
    }

    #[test]
    fn test_project_rejects_out_of_range_severity() {
        let mut state = state(vec![obs(1, 3, "10.0.0.1", "alice")]);
        state.observations[0].severity = 255;

        assert_eq!(
            GraphBuilder::default().project(state),
            Err(GraphError::SeverityOutOfRange(255))
        );
    }

    #[test]
    fn test_pin_jitter_is_bounded() {
        let builder = GraphBuilder::default();
        let state = state(vec![obs(1, 3, "10.0.0.1", "alice")]);

        let mut rng = SequenceSource::new(vec![0.0, 0.999]);
        let fields = builder
            .pin(&mut rng, &state.fields, &state.observations[0], 0.0, 0.0)
            .unwrap();

        for field in &fields {
            let pin = field.pin.unwrap();
            assert!(pin.x >= -50.0 && pin.x < 50.0);
            assert!(pin.y >= -50.0 && pin.y < 50.0);
        }
        assert!(state.fields.iter().all(|f| f.pin.is_none()));
    }

    #[test]
    fn test_pin_rejects_unknown_values() {
        let builder = GraphBuilder::default();
        let state = state(vec![obs(1, 3, "10.0.0.1", "alice")]);
        let stranger = obs(9, 1, "172.16.0.1", "mallory");

        let result = builder.pin(&mut RngSource::seeded(1), &state.fields, &stranger, 0.0, 0.0);
        assert_eq!(
            result,
            Err(GraphError::UnknownField {
                observation: stranger.uuid,
                label: "172.16.0.1".to_string(),
            })
        );
    }

    #[test]
    fn test_axis_free_and_square_root_variants() {
        let mut config = EngineConfig::default();
        config.layout.field_layout = FieldLayout::AxisFree;
        config.layout.obs_radius = ObsRadius::SquareRoot;
        config.significance_threshold = 0;
        let builder = GraphBuilder::new(config);

        let snapshot = builder.project(state(vec![obs(1, 5, "10.0.0.1", "root")])).unwrap();

        let heights: Vec<f64> = snapshot
            .field_nodes
            .iter()
            .map(|n| match n.placement {
                Placement::Floating { cy } => cy,
                other => panic!("unexpected placement {:?}", other),
            })
            .collect();
        assert_eq!(heights, vec![20.0, 20.0 + 1.0 / 6.0, 20.0 + 2.0 / 6.0]);
        assert!((snapshot.obs_nodes[0].r - 100f64.sqrt()).abs() < 1e-9);
    }

    #[test]
    fn test_observation_nodes_sit_on_severity_axis() {
        let snapshot = GraphBuilder::default()
            .project(state(vec![obs(1, 0, "10.0.0.1", "root"), obs(2, 8, "10.0.0.2", "root")]))
            .unwrap();

        assert_eq!(snapshot.obs_nodes[0].r, 3.0);
        assert!((snapshot.obs_nodes[1].r - (8f64.powf(0.7) + 3.0)).abs() < 1e-9);
        assert_eq!(
            snapshot.obs_nodes[1].placement,
            Placement::Timeline { t: start() + Duration::minutes(2), cy: 8.0 }
        );
    }

    #[test]
    fn test_fresh_build_has_independent_values() {
        let builder = GraphBuilder::default();
        let mut rng = RngSource::seeded(21);

        let snapshot = builder
            .build(&mut rng, &GraphState::default(), 5, GenerateOptions::fresh())
            .unwrap();

        assert_eq!(snapshot.state.observations.len(), 5);
        assert!(snapshot.field_nodes.is_empty());
        assert!(snapshot.edges.is_empty());
        for field in &snapshot.state.fields {
            let referencing = snapshot
                .state
                .observations
                .iter()
                .filter(|o| o.distinct_values().iter().any(|(_, v)| *v == field.label))
                .count();
            assert_eq!(field.count as usize, referencing);
        }
    }

    #[test]
    fn test_build_extends_prior_state() {
        let builder = GraphBuilder::default();
        let mut rng = RngSource::seeded(22);
        let first = builder
            .build(&mut rng, &GraphState::default(), 10, GenerateOptions::fresh())
            .unwrap();

        let second = builder
            .build(&mut rng, &first.state, 10, GenerateOptions::with_reuse(0.8))
            .unwrap();

        assert_eq!(first.state.observations.len(), 10);
        assert_eq!(second.state.observations.len(), 20);
        assert_eq!(second.state.observations[..10], first.state.observations[..]);
        for field in &first.state.fields {
            let later = second.state.fields.get(&field.label).unwrap();
            assert_eq!(later.uuid, field.uuid);
            assert!(later.count >= field.count);
        }
        assert!(second.verify_integrity().is_ok());
    }
}
