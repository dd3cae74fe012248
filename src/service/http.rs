//! REST client for the backend API
//!
//! Every route lives under one base URL (`/api` on the backend). Status-code
//! handling is centralized in [`check_response`] so the trait impls stay
//! focused on building requests.

use super::traits::{
    AnalysisService, EntityStore, ProjectStore, ScriptStore, ServiceError, ServiceResult,
};
use crate::model::{
    Entity, EntityId, EntityType, Project, ProjectId, QuestionRequest, QuestionResponse, Script,
    ScriptId, ScriptUpdate, SubmitResponse, TaskId, TaskStatusResponse,
};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

/// Where the backend listens by default
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000/api";

/// HTTP implementation of every service trait
#[derive(Debug, Clone)]
pub struct HttpService {
    http: reqwest::Client,
    base_url: String,
}

impl HttpService {
    /// Create a client for `base_url` with a per-request timeout.
    pub fn new(base_url: impl Into<String>, request_timeout: Duration) -> ServiceResult<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("scribe/", env!("CARGO_PKG_VERSION")))
            .timeout(request_timeout)
            .build()
            .map_err(|e| ServiceError::Transport(e.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Join percent-encoded path segments onto the base URL
    fn url(&self, segments: &[&str]) -> String {
        let mut url = self.base_url.clone();
        for segment in segments {
            url.push('/');
            url.push_str(&urlencoding::encode(segment));
        }
        url
    }

    async fn send<T: DeserializeOwned>(&self, request: reqwest::RequestBuilder) -> ServiceResult<T> {
        let resp = request.send().await.map_err(map_transport)?;
        let resp = check_response(resp).await?;
        resp.json::<T>().await.map_err(map_transport)
    }

    async fn get<T: DeserializeOwned>(&self, url: String) -> ServiceResult<T> {
        debug!(%url, "GET");
        self.send(self.http.get(url)).await
    }
}

fn map_transport(err: reqwest::Error) -> ServiceError {
    if err.is_timeout() {
        ServiceError::Timeout
    } else if err.is_decode() {
        ServiceError::Decode(err.to_string())
    } else {
        ServiceError::Transport(err.to_string())
    }
}

/// Map non-success statuses to [`ServiceError`].
///
/// FastAPI reports failures as `{"detail": ...}`; the detail is used as the
/// message when present, the raw body otherwise.
pub(crate) async fn check_response(resp: reqwest::Response) -> ServiceResult<reqwest::Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    let message = error_detail(&body);
    if status == reqwest::StatusCode::NOT_FOUND {
        return Err(ServiceError::NotFound(message));
    }
    Err(ServiceError::Api {
        status: status.as_u16(),
        message,
    })
}

fn error_detail(body: &str) -> String {
    match serde_json::from_str::<serde_json::Value>(body) {
        Ok(serde_json::Value::Object(map)) => match map.get("detail") {
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => body.to_string(),
        },
        _ => body.to_string(),
    }
}

#[async_trait]
impl ProjectStore for HttpService {
    async fn list_projects(&self) -> ServiceResult<Vec<Project>> {
        self.get(self.url(&["projects"])).await
    }

    async fn get_project(&self, id: &ProjectId) -> ServiceResult<Project> {
        self.get(self.url(&["projects", id.as_str()])).await
    }

    async fn ask_question(
        &self,
        project_id: &ProjectId,
        question: &QuestionRequest,
    ) -> ServiceResult<QuestionResponse> {
        let url = self.url(&["projects", project_id.as_str(), "question"]);
        debug!(%url, "POST");
        self.send(self.http.post(url).json(question)).await
    }
}

#[async_trait]
impl ScriptStore for HttpService {
    async fn get_script(&self, id: &ScriptId) -> ServiceResult<Script> {
        self.get(self.url(&["scripts", id.as_str()])).await
    }

    async fn list_scripts(&self, project_id: &ProjectId) -> ServiceResult<Vec<Script>> {
        self.get(self.url(&["projects", project_id.as_str(), "scripts"]))
            .await
    }

    async fn update_script(&self, id: &ScriptId, update: &ScriptUpdate) -> ServiceResult<Script> {
        let url = self.url(&["scripts", id.as_str()]);
        debug!(%url, "PUT");
        self.send(self.http.put(url).json(update)).await
    }
}

#[async_trait]
impl AnalysisService for HttpService {
    async fn submit(&self, script_id: &ScriptId) -> ServiceResult<SubmitResponse> {
        let url = self.url(&["scripts", script_id.as_str(), "analyze"]);
        debug!(%url, "POST");
        self.send(self.http.post(url)).await
    }

    async fn task_status(&self, task_id: &TaskId) -> ServiceResult<TaskStatusResponse> {
        self.get(self.url(&["tasks", task_id.as_str(), "status"]))
            .await
    }
}

#[async_trait]
impl EntityStore for HttpService {
    async fn list_entities(
        &self,
        project_id: &ProjectId,
        entity_type: Option<EntityType>,
    ) -> ServiceResult<Vec<Entity>> {
        let url = self.url(&["projects", project_id.as_str(), "entities"]);
        debug!(%url, ?entity_type, "GET");
        let mut request = self.http.get(url);
        if let Some(kind) = entity_type {
            request = request.query(&[("type", kind.as_str())]);
        }
        self.send(request).await
    }

    async fn get_entity(&self, id: &EntityId) -> ServiceResult<Entity> {
        self.get(self.url(&["entities", id.as_str()])).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> HttpService {
        HttpService::new("http://localhost:8000/api/", Duration::from_secs(10)).unwrap()
    }

    fn response(status: u16, body: &str) -> reqwest::Response {
        reqwest::Response::from(
            ::http::Response::builder()
                .status(status)
                .body(body.to_string())
                .unwrap(),
        )
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        assert_eq!(service().base_url(), DEFAULT_BASE_URL);
    }

    #[test]
    fn url_joins_and_encodes_segments() {
        let svc = service();
        assert_eq!(
            svc.url(&["tasks", "t1", "status"]),
            "http://localhost:8000/api/tasks/t1/status"
        );
        assert_eq!(
            svc.url(&["tasks", "a/b c", "status"]),
            "http://localhost:8000/api/tasks/a%2Fb%20c/status"
        );
    }

    #[tokio::test]
    async fn success_passes_through() {
        let resp = check_response(response(200, "{}")).await;
        assert!(resp.is_ok());
    }

    #[tokio::test]
    async fn not_found_uses_fastapi_detail() {
        let err = check_response(response(404, r#"{"detail": "Script s9 not found"}"#))
            .await
            .unwrap_err();
        assert_eq!(err, ServiceError::NotFound("Script s9 not found".into()));
    }

    #[tokio::test]
    async fn question_for_unknown_project_is_not_found() {
        let err = check_response(response(404, r#"{"detail": "Project not found"}"#))
            .await
            .unwrap_err();
        assert_eq!(err, ServiceError::NotFound("Project not found".into()));
    }

    #[tokio::test]
    async fn question_answer_decodes_from_response_body() {
        let resp = check_response(response(
            200,
            r#"{"question": "Who is Mara?", "answer": "The keeper.", "source_chunks": []}"#,
        ))
        .await
        .unwrap();
        let answer: QuestionResponse = resp.json().await.unwrap();
        assert_eq!(answer.answer, "The keeper.");
    }

    #[test]
    fn question_route_is_under_the_project() {
        assert_eq!(
            service().url(&["projects", "p1", "question"]),
            "http://localhost:8000/api/projects/p1/question"
        );
    }

    #[tokio::test]
    async fn validation_failure_maps_to_api_error() {
        let err = check_response(response(422, r#"{"detail": [{"msg": "too short"}]}"#))
            .await
            .unwrap_err();
        assert!(err.is_validation());
        match err {
            ServiceError::Api { status, message } => {
                assert_eq!(status, 422);
                assert!(message.contains("too short"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn non_json_error_body_is_kept_verbatim() {
        let err = check_response(response(502, "Bad Gateway")).await.unwrap_err();
        assert_eq!(
            err,
            ServiceError::Api {
                status: 502,
                message: "Bad Gateway".into()
            }
        );
    }
}
