//! Free-form questions about a project, answered from its scripts

use serde::{Deserialize, Serialize};

/// Body of an ask request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionRequest {
    pub question: String,
}

impl QuestionRequest {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
        }
    }
}

/// Answer to a project question
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionResponse {
    /// The question as the service understood it
    pub question: String,
    pub answer: String,
    /// Script passages the answer was drawn from
    #[serde(default)]
    pub source_chunks: Vec<String>,
}
