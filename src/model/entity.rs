//! Entities extracted from scripts by the analysis service

use super::ids::{EntityId, ProjectId, ScriptId};
use super::timestamp;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

/// Kind of extracted entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    Character,
    Location,
    Event,
}

impl EntityType {
    pub const ALL: [EntityType; 3] = [Self::Character, Self::Location, Self::Event];

    /// Wire name, as used in the `type` query parameter
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Character => "character",
            Self::Location => "location",
            Self::Event => "event",
        }
    }
}

impl std::fmt::Display for EntityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown entity type '{0}' (expected character, location or event)")]
pub struct ParseEntityTypeError(String);

impl FromStr for EntityType {
    type Err = ParseEntityTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "character" => Ok(Self::Character),
            "location" => Ok(Self::Location),
            "event" => Ok(Self::Event),
            other => Err(ParseEntityTypeError(other.to_string())),
        }
    }
}

/// An extracted character, location, or event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: EntityId,
    pub project_id: ProjectId,
    /// Script the entity was extracted from, when the backend reports it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script_id: Option<ScriptId>,
    #[serde(rename = "type")]
    pub entity_type: EntityType,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Open attribute bag; no fixed schema
    #[serde(default)]
    pub attributes: BTreeMap<String, serde_json::Value>,
    #[serde(
        default,
        with = "timestamp::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<DateTime<Utc>>,
}

impl Entity {
    /// Look up a single attribute
    pub fn attribute(&self, key: &str) -> Option<&serde_json::Value> {
        self.attributes.get(key)
    }
}
