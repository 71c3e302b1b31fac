//! HTTP implementation of the remote collaborator interface

use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Value;

use super::remote::{RemoteApi, RemoteError, RemoteResult};
use crate::models::{DefectType, EntityKind, Product, ServerId, Workstation};

/// REST client for the inspection server
#[derive(Clone)]
pub struct HttpRemote {
    base: String,
    client: reqwest::Client,
}

impl HttpRemote {
    /// Create a client for the given API base URL
    pub fn new(endpoint: impl Into<String>) -> RemoteResult<Self> {
        let base = normalize_endpoint(endpoint.into())?;
        Ok(Self {
            base,
            client: reqwest::Client::builder().build()?,
        })
    }

    fn url(&self, entity: EntityKind) -> String {
        format!("{}/{}", self.base, entity.collection())
    }

    async fn check(response: reqwest::Response) -> RemoteResult<reqwest::Response> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Err(RemoteError::Api(parse_api_error(status, &body)))
    }

    /// Fetch the product catalog
    pub async fn fetch_products(&self) -> RemoteResult<Vec<Product>> {
        let response = self
            .client
            .get(format!("{}/products", self.base))
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    /// Fetch the workstation catalog
    pub async fn fetch_workstations(&self) -> RemoteResult<Vec<Workstation>> {
        let response = self
            .client
            .get(format!("{}/workstations", self.base))
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    /// Fetch the defect-type catalog
    pub async fn fetch_defect_types(&self) -> RemoteResult<Vec<DefectType>> {
        let response = self
            .client
            .get(format!("{}/defect-types", self.base))
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }
}

#[derive(Debug, Deserialize)]
struct CreatedResponse {
    id: Option<ServerId>,
}

impl RemoteApi for HttpRemote {
    async fn create(&self, entity: EntityKind, payload: &Value) -> RemoteResult<ServerId> {
        let response = self
            .client
            .post(self.url(entity))
            .json(payload)
            .send()
            .await?;
        let created = Self::check(response)
            .await?
            .json::<CreatedResponse>()
            .await?;
        created.id.ok_or_else(|| {
            RemoteError::InvalidPayload("create response did not include an id".to_string())
        })
    }

    async fn update(
        &self,
        entity: EntityKind,
        server_id: ServerId,
        payload: &Value,
    ) -> RemoteResult<()> {
        let response = self
            .client
            .patch(format!("{}/{server_id}", self.url(entity)))
            .json(payload)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn delete(&self, entity: EntityKind, server_id: ServerId) -> RemoteResult<()> {
        let response = self
            .client
            .delete(format!("{}/{server_id}", self.url(entity)))
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: Option<String>,
    message: Option<String>,
}

fn parse_api_error(status: StatusCode, body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<ApiErrorBody>(body) {
        if let Some(message) = payload.message.or(payload.error) {
            return format!("{} ({})", message.trim(), status.as_u16());
        }
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        format!("{} ({})", trimmed, status.as_u16())
    }
}

fn normalize_endpoint(raw: String) -> RemoteResult<String> {
    let endpoint = raw.trim();
    if endpoint.is_empty() {
        return Err(RemoteError::InvalidConfiguration(
            "endpoint must not be empty".to_string(),
        ));
    }
    if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
        Ok(endpoint.trim_end_matches('/').to_string())
    } else {
        Err(RemoteError::InvalidConfiguration(
            "endpoint must include http:// or https://".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_endpoint_rejects_invalid_values() {
        assert!(normalize_endpoint(String::new()).is_err());
        assert!(normalize_endpoint("  ".to_string()).is_err());
        assert!(normalize_endpoint("api.example.com".to_string()).is_err());
    }

    #[test]
    fn normalize_endpoint_trims_trailing_slash() {
        let endpoint = normalize_endpoint("https://qa.example.com/api/".to_string()).unwrap();
        assert_eq!(endpoint, "https://qa.example.com/api");
    }

    #[test]
    fn parse_api_error_prefers_structured_message() {
        let message = parse_api_error(
            StatusCode::UNPROCESSABLE_ENTITY,
            r#"{"message": "seq already taken"}"#,
        );
        assert_eq!(message, "seq already taken (422)");

        let fallback = parse_api_error(StatusCode::BAD_GATEWAY, "");
        assert_eq!(fallback, "HTTP 502");

        let raw = parse_api_error(StatusCode::INTERNAL_SERVER_ERROR, "boom");
        assert_eq!(raw, "boom (500)");
    }

    #[test]
    fn entity_urls_follow_collections() {
        let remote = HttpRemote::new("https://qa.example.com/api/").unwrap();
        assert_eq!(
            remote.url(EntityKind::Session),
            "https://qa.example.com/api/sessions"
        );
        assert_eq!(
            remote.url(EntityKind::Defect),
            "https://qa.example.com/api/defects"
        );
    }
}
