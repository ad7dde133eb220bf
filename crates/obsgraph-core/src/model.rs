//! Observation and field data models

use crate::error::{GraphError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Highest severity an observation can carry
pub const MAX_SEVERITY: u8 = 10;

/// Category of an identity-bearing value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldType {
    Ip,
    Domain,
    Username,
    FileHash,
    FileName,
    Url,
    Email,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Ip => "ip",
            FieldType::Domain => "domain",
            FieldType::Username => "username",
            FieldType::FileHash => "fileHash",
            FieldType::FileName => "fileName",
            FieldType::Url => "url",
            FieldType::Email => "email",
        }
    }
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A typed slot of an observation that may carry a field value.
///
/// [`FieldSlot::ALL`] fixes the scan order used by aggregation, angle
/// assignment and edge construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldSlot {
    SourceIp,
    DestIp,
    Username,
    Domain,
    Url,
    Email,
}

impl FieldSlot {
    pub const ALL: [FieldSlot; 6] = [
        FieldSlot::SourceIp,
        FieldSlot::DestIp,
        FieldSlot::Username,
        FieldSlot::Domain,
        FieldSlot::Url,
        FieldSlot::Email,
    ];

    pub const COUNT: usize = Self::ALL.len();

    /// Wire name of the slot
    pub fn name(self) -> &'static str {
        match self {
            FieldSlot::SourceIp => "sourceIp",
            FieldSlot::DestIp => "destIp",
            FieldSlot::Username => "username",
            FieldSlot::Domain => "domain",
            FieldSlot::Url => "url",
            FieldSlot::Email => "email",
        }
    }

    pub fn field_type(self) -> FieldType {
        match self {
            FieldSlot::SourceIp | FieldSlot::DestIp => FieldType::Ip,
            FieldSlot::Username => FieldType::Username,
            FieldSlot::Domain => FieldType::Domain,
            FieldSlot::Url => FieldType::Url,
            FieldSlot::Email => FieldType::Email,
        }
    }
}

impl std::fmt::Display for FieldSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A synthetic security event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Observation {
    pub uuid: Uuid,
    pub start_date: DateTime<Utc>,
    pub severity: u8,
    #[serde(default)]
    pub source_ip: String,
    #[serde(default)]
    pub dest_ip: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub domain: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub email: String,
}

impl Observation {
    /// Observation with every slot empty
    pub fn new(uuid: Uuid, start_date: DateTime<Utc>, severity: u8) -> Self {
        Self {
            uuid,
            start_date,
            severity,
            source_ip: String::new(),
            dest_ip: String::new(),
            username: String::new(),
            domain: String::new(),
            url: String::new(),
            email: String::new(),
        }
    }

    pub fn with_slot(mut self, slot: FieldSlot, value: impl Into<String>) -> Self {
        self.set_slot(slot, value);
        self
    }

    pub fn set_slot(&mut self, slot: FieldSlot, value: impl Into<String>) {
        *self.slot_mut(slot) = value.into();
    }

    /// Raw slot content; empty when the slot carries no value
    pub fn slot(&self, slot: FieldSlot) -> &str {
        match slot {
            FieldSlot::SourceIp => &self.source_ip,
            FieldSlot::DestIp => &self.dest_ip,
            FieldSlot::Username => &self.username,
            FieldSlot::Domain => &self.domain,
            FieldSlot::Url => &self.url,
            FieldSlot::Email => &self.email,
        }
    }

    fn slot_mut(&mut self, slot: FieldSlot) -> &mut String {
        match slot {
            FieldSlot::SourceIp => &mut self.source_ip,
            FieldSlot::DestIp => &mut self.dest_ip,
            FieldSlot::Username => &mut self.username,
            FieldSlot::Domain => &mut self.domain,
            FieldSlot::Url => &mut self.url,
            FieldSlot::Email => &mut self.email,
        }
    }

    pub fn slot_value(&self, slot: FieldSlot) -> Option<&str> {
        let value = self.slot(slot);
        if value.is_empty() {
            None
        } else {
            Some(value)
        }
    }

    /// Non-empty slots in scan order
    pub fn slot_values(&self) -> impl Iterator<Item = (FieldSlot, &str)> + '_ {
        FieldSlot::ALL
            .into_iter()
            .filter_map(move |slot| self.slot_value(slot).map(|value| (slot, value)))
    }

    /// Non-empty slots in scan order, keeping only the first slot of a repeated value
    pub fn distinct_values(&self) -> Vec<(FieldSlot, &str)> {
        let mut values: Vec<(FieldSlot, &str)> = Vec::with_capacity(FieldSlot::COUNT);
        for (slot, value) in self.slot_values() {
            if !values.iter().any(|(_, seen)| *seen == value) {
                values.push((slot, value));
            }
        }
        values
    }

    pub fn validate(&self) -> Result<()> {
        if self.severity > MAX_SEVERITY {
            return Err(GraphError::SeverityOutOfRange(self.severity));
        }
        Ok(())
    }
}

/// Manually pinned canvas position
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

/// Aggregate statistics for one distinct field value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Field {
    pub uuid: Uuid,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    pub label: String,
    pub count: u32,
    /// Running maximum over contributing observations
    pub severity: u8,
    /// Contributing severities, highest first
    pub severities: Vec<u8>,
    pub first_observed_date: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    pub angle: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pin: Option<Position>,
}

impl Field {
    /// Field created by the first observation that carries `label`
    pub fn first_seen(
        uuid: Uuid,
        field_type: FieldType,
        label: impl Into<String>,
        observation: &Observation,
        angle: f64,
    ) -> Self {
        Self {
            uuid,
            field_type,
            label: label.into(),
            count: 1,
            severity: observation.severity,
            severities: vec![observation.severity],
            first_observed_date: observation.start_date,
            last_seen: observation.start_date,
            angle,
            pin: None,
        }
    }

    /// Account for one more observation carrying this value
    pub fn record(&mut self, observation: &Observation) {
        self.count += 1;
        self.severity = self.severity.max(observation.severity);
        let at = self
            .severities
            .partition_point(|&existing| existing >= observation.severity);
        self.severities.insert(at, observation.severity);
        self.last_seen = observation.start_date;
    }

    /// Pinned fields bypass the significance threshold
    pub fn is_custom(&self) -> bool {
        self.pin.is_some()
    }

    pub fn top_severity_sum(&self, n: usize) -> u32 {
        self.severities.iter().take(n).map(|&s| u32::from(s)).sum()
    }
}

/// Insertion-ordered map from field label to its aggregate
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(into = "Vec<Field>", try_from = "Vec<Field>")]
pub struct FieldMap {
    fields: Vec<Field>,
    index: HashMap<String, usize>,
}

impl FieldMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn get(&self, label: &str) -> Option<&Field> {
        self.index.get(label).map(|&i| &self.fields[i])
    }

    pub fn get_mut(&mut self, label: &str) -> Option<&mut Field> {
        match self.index.get(label) {
            Some(&i) => self.fields.get_mut(i),
            None => None,
        }
    }

    /// Add a field that has not been seen before
    pub fn insert(&mut self, field: Field) -> Result<()> {
        if self.index.contains_key(&field.label) {
            return Err(GraphError::DuplicateField(field.label));
        }
        self.index.insert(field.label.clone(), self.fields.len());
        self.fields.push(field);
        Ok(())
    }

    /// Fields in first-seen order
    pub fn iter(&self) -> std::slice::Iter<'_, Field> {
        self.fields.iter()
    }

    pub fn pinned_count(&self) -> usize {
        self.fields.iter().filter(|f| f.is_custom()).count()
    }
}

impl<'a> IntoIterator for &'a FieldMap {
    type Item = &'a Field;
    type IntoIter = std::slice::Iter<'a, Field>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl From<FieldMap> for Vec<Field> {
    fn from(map: FieldMap) -> Self {
        map.fields
    }
}

impl TryFrom<Vec<Field>> for FieldMap {
    type Error = GraphError;

    fn try_from(fields: Vec<Field>) -> Result<Self> {
        let mut map = FieldMap::new();
        for field in fields {
            map.insert(field)?;
        }
        Ok(map)
    }
}
