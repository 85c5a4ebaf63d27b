//! Study-session backend over REST.
//!
//! `POST {base}/sessoes` stores a session and answers `{ "id": .., "message": .. }`.
//! `GET {base}/sessoes` lists sessions newest first.

use std::time::Duration;

use reqwest::Client;
use serde_json::Value;
use tracing::debug;
use url::Url;

use super::record::StudySessionRecord;
use super::traits::SessionRecorder;
use crate::error::{ApiError, Result};
use crate::storage::ApiConfig;

pub struct ApiSessionRecorder {
    base_url: Url,
    http_client: Client,
}

impl ApiSessionRecorder {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let mut base = Url::parse(base_url).map_err(|e| ApiError::InvalidUrl {
            url: base_url.to_string(),
            message: e.to_string(),
        })?;
        // Url::join replaces the last segment unless the path ends with '/'.
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let http_client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base,
            http_client,
        })
    }

    /// Build from configuration. Fails with `NotConfigured` when the backend
    /// is disabled.
    pub fn from_config(config: &ApiConfig) -> Result<Self, ApiError> {
        if !config.enabled {
            return Err(ApiError::NotConfigured);
        }
        Self::new(&config.base_url, config.timeout())
    }

    fn sessions_url(&self) -> Result<Url, ApiError> {
        self.base_url
            .join("sessoes")
            .map_err(|e| ApiError::InvalidUrl {
                url: self.base_url.to_string(),
                message: e.to_string(),
            })
    }

    pub async fn post_session(&self, session: &StudySessionRecord) -> Result<i64, ApiError> {
        let url = self.sessions_url()?;
        debug!(%url, discipline_id = %session.discipline_id, "posting study session");

        let resp = self.http_client.post(url).json(session).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ApiError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body: Value = resp.json().await?;
        body.get("id")
            .and_then(Value::as_i64)
            .ok_or_else(|| ApiError::UnexpectedResponse(format!("missing session id in {body}")))
    }

    /// Raw session list as returned by the backend, newest first.
    pub async fn list_sessions(&self) -> Result<Vec<Value>, ApiError> {
        let url = self.sessions_url()?;
        let resp = self.http_client.get(url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ApiError::Status {
                status: status.as_u16(),
                body,
            });
        }

        match resp.json::<Value>().await? {
            Value::Array(items) => Ok(items),
            other => Err(ApiError::UnexpectedResponse(format!(
                "expected a session list, got {other}"
            ))),
        }
    }
}

impl SessionRecorder for ApiSessionRecorder {
    fn name(&self) -> &str {
        "api"
    }

    async fn record(&self, session: &StudySessionRecord) -> Result<i64> {
        Ok(self.post_session(session).await?)
    }

    async fn last_discipline(&self) -> Result<Option<String>> {
        let sessions = self.list_sessions().await?;
        // The backend may hand ids back as numbers or strings.
        let discipline = sessions
            .first()
            .and_then(|s| s.get("disciplina_id"))
            .and_then(|id| match id {
                Value::String(s) if !s.is_empty() => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            });
        Ok(discipline)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use mockito::Matcher;
    use serde_json::json;

    fn record() -> StudySessionRecord {
        let end = Utc.with_ymd_and_hms(2025, 3, 14, 10, 30, 0).unwrap();
        StudySessionRecord::from_completion("21002", Some("Matrices".into()), 1500, end)
    }

    #[tokio::test]
    async fn posts_session_in_backend_format() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/sessoes")
            .match_body(Matcher::PartialJson(json!({
                "disciplina_id": "21002",
                "data": "2025-03-14",
                "hora_inicio": "10:05",
                "hora_fim": "10:30",
                "duracao_minutos": 25,
                "topico": "Matrices",
                "concluido": true,
            })))
            .with_status(201)
            .with_body(r#"{"id": 42, "message": "created"}"#)
            .create_async()
            .await;

        let recorder =
            ApiSessionRecorder::new(&format!("{}/api", server.url()), Duration::from_secs(5))
                .unwrap();
        let id = recorder.record(&record()).await.unwrap();
        assert_eq!(id, 42);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/sessoes")
            .with_status(500)
            .with_body("database unavailable")
            .create_async()
            .await;

        let recorder =
            ApiSessionRecorder::new(&format!("{}/api/", server.url()), Duration::from_secs(5))
                .unwrap();
        match recorder.post_session(&record()).await {
            Err(ApiError::Status { status, body }) => {
                assert_eq!(status, 500);
                assert_eq!(body, "database unavailable");
            }
            other => panic!("expected status error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_id_is_unexpected() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/sessoes")
            .with_status(201)
            .with_body(r#"{"message": "created"}"#)
            .create_async()
            .await;

        let recorder =
            ApiSessionRecorder::new(&format!("{}/api", server.url()), Duration::from_secs(5))
                .unwrap();
        assert!(matches!(
            recorder.post_session(&record()).await,
            Err(ApiError::UnexpectedResponse(_))
        ));
    }

    #[tokio::test]
    async fn last_discipline_reads_newest_session() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/sessoes")
            .with_status(200)
            .with_body(r#"[{"disciplina_id": 21078}, {"disciplina_id": "21002"}]"#)
            .create_async()
            .await;

        let recorder =
            ApiSessionRecorder::new(&format!("{}/api", server.url()), Duration::from_secs(5))
                .unwrap();
        assert_eq!(
            recorder.last_discipline().await.unwrap().as_deref(),
            Some("21078")
        );
    }

    #[tokio::test]
    async fn last_discipline_of_empty_list_is_none() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/sessoes")
            .with_status(200)
            .with_body("[]")
            .create_async()
            .await;

        let recorder =
            ApiSessionRecorder::new(&format!("{}/api", server.url()), Duration::from_secs(5))
                .unwrap();
        assert!(recorder.last_discipline().await.unwrap().is_none());
    }

    #[test]
    fn from_config_requires_enabled() {
        let config = ApiConfig::default();
        assert!(matches!(
            ApiSessionRecorder::from_config(&config),
            Err(ApiError::NotConfigured)
        ));
    }

    #[test]
    fn rejects_invalid_base_url() {
        assert!(matches!(
            ApiSessionRecorder::new("not a url", Duration::from_secs(1)),
            Err(ApiError::InvalidUrl { .. })
        ));
    }
}
