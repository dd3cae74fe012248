//! Script documents and the editable draft of one

use super::ids::{ProjectId, ScriptId};
use super::timestamp;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A persisted script document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Script {
    pub id: ScriptId,
    pub project_id: ProjectId,
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "timestamp")]
    pub updated_at: DateTime<Utc>,
}

impl Script {
    /// The editable part of this script
    pub fn draft(&self) -> Draft {
        Draft::new(self.title.clone(), self.content.clone())
    }
}

/// Body of an update request. Absent fields are left untouched server-side.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScriptUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl From<&Draft> for ScriptUpdate {
    fn from(draft: &Draft) -> Self {
        Self {
            title: Some(draft.title.clone()),
            content: Some(draft.content.clone()),
        }
    }
}

/// Title and content of a script, as held by an editing session
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Draft {
    pub title: String,
    pub content: String,
}

impl Draft {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
        }
    }

    /// Character and word counts of the content
    pub fn stats(&self) -> TextStats {
        TextStats {
            characters: self.content.chars().count(),
            words: self.content.split_whitespace().count(),
        }
    }
}

/// Size of a draft's content
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TextStats {
    pub characters: usize,
    pub words: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn script_reads_backend_payload() {
        let json = r#"{
            "id": "s1",
            "project_id": "p1",
            "title": "A",
            "content": "Chapter 1",
            "created_at": "2024-05-01T09:00:00.000000",
            "updated_at": "2024-05-01T09:30:00.000000"
        }"#;
        let script: Script = serde_json::from_str(json).unwrap();
        assert_eq!(script.id.as_str(), "s1");
        assert_eq!(script.draft(), Draft::new("A", "Chapter 1"));
    }

    #[test]
    fn update_omits_absent_fields() {
        let update = ScriptUpdate {
            title: Some("New title".into()),
            content: None,
        };
        let json = serde_json::to_value(&update).unwrap();
        assert_eq!(json, serde_json::json!({ "title": "New title" }));
    }

    #[test]
    fn stats_count_characters_and_words() {
        let draft = Draft::new("t", "  Once upon\na time  ");
        let stats = draft.stats();
        assert_eq!(stats.words, 4);
        assert_eq!(stats.characters, 20);
        assert_eq!(Draft::default().stats(), TextStats::default());
    }
}
