//! HTTP implementation of the configuration loader and IdP resolver.

use async_trait::async_trait;
use reqwest::{StatusCode, header::ACCEPT};
use serde::Deserialize;
use url::Url;

use super::{ClientError, ConfigurationLoader, IdentityProviderResolver};
use crate::{config::ClientConfig, selection::SsoConfiguration, validation::endpoint_url};

/// Longest error body kept in [`ClientError::Status`].
const MAX_ERROR_BODY: usize = 512;

#[derive(Debug, Deserialize)]
struct ResolutionResponse {
    #[serde(default, alias = "identityProvider")]
    identity_provider: Option<String>,
}

/// Talks to the SSO endpoints of one server.
#[derive(Debug, Clone)]
pub struct SsoClient {
    http: reqwest::Client,
    base_url: Url,
    configuration_url: Url,
    resolution_url: Url,
}

impl SsoClient {
    /// Build a client with its own connection pool, using the configured
    /// timeout and user agent.
    pub fn new(base_url: Url, config: &ClientConfig) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .user_agent(config.user_agent.clone())
            .build()?;
        Self::with_http_client(http, base_url, config)
    }

    /// Build a client on top of an existing `reqwest::Client`.
    pub fn with_http_client(
        http: reqwest::Client,
        base_url: Url,
        config: &ClientConfig,
    ) -> Result<Self, ClientError> {
        let configuration_url = endpoint_url(&base_url, &config.configuration_path)?;
        let resolution_url = endpoint_url(&base_url, &config.resolution_path)?;
        Ok(Self {
            http,
            base_url,
            configuration_url,
            resolution_url,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn configuration_url(&self) -> &Url {
        &self.configuration_url
    }

    pub fn resolution_url(&self) -> &Url {
        &self.resolution_url
    }
}

/// Read the body of a successful response, or turn the status into an error.
async fn read_success(response: reqwest::Response) -> Result<String, ClientError> {
    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        let body = if body.len() > MAX_ERROR_BODY {
            format!("{}...", &body[..body.floor_char_boundary(MAX_ERROR_BODY)])
        } else {
            body
        };
        return Err(ClientError::Status { status, body });
    }
    Ok(body)
}

#[async_trait]
impl ConfigurationLoader for SsoClient {
    #[tracing::instrument(name = "sso.load_configuration", skip(self), fields(url = %self.configuration_url))]
    async fn load_configuration(&self) -> Result<SsoConfiguration, ClientError> {
        let response = self
            .http
            .get(self.configuration_url.clone())
            .header(ACCEPT, "application/json")
            .send()
            .await?;

        let body = read_success(response).await?;
        let config: SsoConfiguration =
            serde_json::from_str(&body).map_err(|e| ClientError::Decode(e.to_string()))?;

        tracing::debug!(schema = %config.selection_schema, "Fetched SSO configuration");
        Ok(config)
    }
}

#[async_trait]
impl IdentityProviderResolver for SsoClient {
    // The email stays out of the span: it is personal data.
    #[tracing::instrument(
        name = "sso.resolve_identity_provider",
        skip(self, email),
        fields(url = %self.resolution_url, has_email = email.is_some())
    )]
    async fn resolve_identity_provider(
        &self,
        email: Option<&str>,
    ) -> Result<Option<String>, ClientError> {
        let mut request = self
            .http
            .get(self.resolution_url.clone())
            .header(ACCEPT, "application/json");
        if let Some(email) = email {
            request = request.query(&[("email", email)]);
        }

        let response = request.send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            tracing::debug!("Server has no identity provider for this request");
            return Ok(None);
        }

        let body = read_success(response).await?;
        let parsed: ResolutionResponse =
            serde_json::from_str(&body).map_err(|e| ClientError::Decode(e.to_string()))?;

        Ok(parsed
            .identity_provider
            .filter(|idp| !idp.trim().is_empty()))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{method, path, query_param, query_param_is_missing},
    };

    use super::*;
    use crate::{selection::SelectionSchema, validation::validate_base_url};

    async fn client_for(server: &MockServer) -> SsoClient {
        let base = validate_base_url(&format!("{}/api", server.uri()), true).unwrap();
        SsoClient::new(base, &ClientConfig::default()).unwrap()
    }

    #[tokio::test]
    async fn test_load_configuration() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/auth/sso/config/"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"selection_schema": "lowest_weight"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let config = client.load_configuration().await.unwrap();
        assert_eq!(config.selection_schema, SelectionSchema::Automatic);
    }

    #[tokio::test]
    async fn test_load_configuration_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/auth/sso/config/"))
            .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let err = client.load_configuration().await.unwrap_err();
        match err {
            ClientError::Status { status, body } => {
                assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
                assert_eq!(body, "maintenance");
            }
            other => panic!("expected status error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_load_configuration_bad_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/auth/sso/config/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"schema": "email"})))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        assert!(matches!(
            client.load_configuration().await,
            Err(ClientError::Decode(_))
        ));
    }

    #[tokio::test]
    async fn test_resolve_with_email() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/auth/sso/select-idp/"))
            .and(query_param("email", "user+tag@example.com"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"identity_provider": "okta-1"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let idp = client
            .resolve_identity_provider(Some("user+tag@example.com"))
            .await
            .unwrap();
        assert_eq!(idp.as_deref(), Some("okta-1"));
    }

    #[tokio::test]
    async fn test_resolve_without_email() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/auth/sso/select-idp/"))
            .and(query_param_is_missing("email"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"identityProvider": "azure"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let idp = client.resolve_identity_provider(None).await.unwrap();
        assert_eq!(idp.as_deref(), Some("azure"));
    }

    #[tokio::test]
    async fn test_resolve_null_and_not_found_are_no_match() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/auth/sso/select-idp/"))
            .and(query_param("email", "nobody@example.com"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"identity_provider": null})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/auth/sso/select-idp/"))
            .and(query_param("email", "ghost@example.com"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        assert_eq!(
            client
                .resolve_identity_provider(Some("nobody@example.com"))
                .await
                .unwrap(),
            None
        );
        assert_eq!(
            client
                .resolve_identity_provider(Some("ghost@example.com"))
                .await
                .unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn test_resolve_server_error_truncates_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/auth/sso/select-idp/"))
            .respond_with(ResponseTemplate::new(500).set_body_string("x".repeat(2000)))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        match client.resolve_identity_provider(None).await.unwrap_err() {
            ClientError::Status { status, body } => {
                assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
                assert_eq!(body.len(), MAX_ERROR_BODY + 3);
            }
            other => panic!("expected status error, got {other:?}"),
        }
    }

    #[test]
    fn test_custom_paths() {
        let base = validate_base_url("https://example.com/api", false).unwrap();
        let config = ClientConfig {
            configuration_path: "/server/sso-config".into(),
            resolution_path: "/server/sso-select".into(),
            ..Default::default()
        };
        let client = SsoClient::new(base, &config).unwrap();
        assert_eq!(
            client.configuration_url.as_str(),
            "https://example.com/api/server/sso-config"
        );
        assert_eq!(
            client.resolution_url.as_str(),
            "https://example.com/api/server/sso-select"
        );
    }
}
