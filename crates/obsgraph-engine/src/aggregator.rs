//! Field aggregation
//!
//! Scans observations slot by slot (in [`FieldSlot::ALL`] order) and folds every
//! distinct value into a [`FieldMap`] entry. A value repeated across slots of the
//! same observation counts once for that observation.

use obsgraph_core::{Field, FieldMap, FieldSlot, FieldType, GraphError, Observation, RandomSource};
use std::collections::HashMap;

/// Builds and extends field maps
#[derive(Debug, Clone, Copy, Default)]
pub struct FieldAggregator;

impl FieldAggregator {
    /// Fold `observations` into a copy of `prior`.
    ///
    /// Each observation must be applied exactly once across calls; feeding the
    /// same observation twice counts it twice.
    pub fn aggregate<R: RandomSource + ?Sized>(
        rng: &mut R,
        prior: &FieldMap,
        observations: &[Observation],
    ) -> Result<FieldMap, GraphError> {
        let mut fields = prior.clone();
        Self::extend(rng, &mut fields, observations)?;
        Ok(fields)
    }

    pub fn extend<R: RandomSource + ?Sized>(
        rng: &mut R,
        fields: &mut FieldMap,
        observations: &[Observation],
    ) -> Result<(), GraphError> {
        for observation in observations {
            Self::absorb(rng, fields, observation)?;
        }
        Ok(())
    }

    /// Apply a single observation. The angle counter restarts at zero for
    /// every observation and only advances when a new field is created.
    pub fn absorb<R: RandomSource + ?Sized>(
        rng: &mut R,
        fields: &mut FieldMap,
        observation: &Observation,
    ) -> Result<(), GraphError> {
        let mut created = 0usize;
        for (slot, value) in observation.distinct_values() {
            match fields.get_mut(value) {
                Some(field) => field.record(observation),
                None => {
                    let angle = created as f64 / FieldSlot::COUNT as f64;
                    let field = Field::first_seen(rng.uuid(), slot.field_type(), value, observation, angle);
                    fields.insert(field)?;
                    created += 1;
                }
            }
        }
        Ok(())
    }
}

/// A known value the generator may draw again
#[derive(Debug, Clone, PartialEq)]
pub struct PoolEntry {
    pub label: String,
    /// Running maximum severity of the value
    pub severity: u8,
}

/// Per-type pools of known IP and username values, in first-seen order
#[derive(Debug, Clone, Default)]
pub struct FieldPools {
    ips: Vec<PoolEntry>,
    usernames: Vec<PoolEntry>,
    /// Label -> type it was first seen as, and its position in that type's pool
    known: HashMap<String, (FieldType, Option<usize>)>,
}

impl FieldPools {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_observations(observations: &[Observation]) -> Self {
        let mut pools = Self::new();
        for observation in observations {
            pools.absorb(observation);
        }
        pools
    }

    /// Track the values of one more observation, mirroring the aggregator's scan
    pub fn absorb(&mut self, observation: &Observation) {
        for (slot, value) in observation.distinct_values() {
            match self.known.get(value) {
                Some(&(field_type, Some(at))) => {
                    if let Some(entry) = self.pool_mut(field_type).and_then(|pool| pool.get_mut(at)) {
                        entry.severity = entry.severity.max(observation.severity);
                    }
                }
                Some(&(_, None)) => {}
                None => self.register(value, slot.field_type(), observation.severity),
            }
        }
    }

    fn register(&mut self, label: &str, field_type: FieldType, severity: u8) {
        let position = self.pool_mut(field_type).map(|pool| {
            pool.push(PoolEntry {
                label: label.to_string(),
                severity,
            });
            pool.len() - 1
        });
        self.known.insert(label.to_string(), (field_type, position));
    }

    fn pool_mut(&mut self, field_type: FieldType) -> Option<&mut Vec<PoolEntry>> {
        match field_type {
            FieldType::Ip => Some(&mut self.ips),
            FieldType::Username => Some(&mut self.usernames),
            _ => None,
        }
    }

    /// Pool for a type; empty for types that are never reused
    pub fn pool(&self, field_type: FieldType) -> &[PoolEntry] {
        match field_type {
            FieldType::Ip => &self.ips,
            FieldType::Username => &self.usernames,
            _ => &[],
        }
    }

    /// Draw a known value of `field_type`, `None` when the pool is empty.
    ///
    /// With `prefer_floor`, entries at or above that severity are drawn from
    /// when any exist.
    pub fn draw<R: RandomSource + ?Sized>(
        &self,
        rng: &mut R,
        field_type: FieldType,
        prefer_floor: Option<u8>,
    ) -> Option<&str> {
        let pool = self.pool(field_type);
        if let Some(floor) = prefer_floor {
            let severe: Vec<&PoolEntry> = pool.iter().filter(|e| e.severity >= floor).collect();
            if let Some(&entry) = rng.pick(&severe) {
                return Some(entry.label.as_str());
            }
        }
        rng.pick(pool).map(|entry| entry.label.as_str())
    }
}
