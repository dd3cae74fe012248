//! Project: the container that owns scripts and extracted entities

use super::ids::ProjectId;
use super::timestamp;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A writing project as returned by the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "timestamp")]
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn project_accepts_null_description() {
        let json = r#"{
            "id": "p1",
            "title": "The Long Road",
            "description": null,
            "created_at": "2024-01-01T00:00:00",
            "updated_at": "2024-01-02T00:00:00"
        }"#;
        let project: Project = serde_json::from_str(json).unwrap();
        assert_eq!(project.title, "The Long Road");
        assert!(project.description.is_none());
    }
}
