use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use super::error::ApiError;
use super::signer;

pub const DEFAULT_DOMAIN: &str = "tencentcloudapi.com";
pub const DEFAULT_PROTOCOL: &str = "https";

/// TencentCloud API v3 client
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    http_client: reqwest::Client,
    config: ClientConfig,
    retry_config: RetryConfig,
}

#[derive(Clone)]
pub struct Credential {
    pub secret_id: String,
    pub secret_key: String,
    pub token: Option<String>,
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("secret_id", &self.secret_id)
            .field("secret_key", &"***")
            .field("token", &self.token.as_ref().map(|_| "***"))
            .finish()
    }
}

#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub credential: Credential,
    pub region: String,
    pub protocol: String,
    pub domain: String,
    /// Replaces `{protocol}://{service}.{domain}` for every service
    pub endpoint: Option<String>,
}

impl ClientConfig {
    pub fn new(credential: Credential, region: impl Into<String>) -> Self {
        Self {
            credential,
            region: region.into(),
            protocol: DEFAULT_PROTOCOL.to_string(),
            domain: DEFAULT_DOMAIN.to_string(),
            endpoint: None,
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    fn validate(&self) -> Result<(), ApiError> {
        if self.credential.secret_id.is_empty() || self.credential.secret_key.is_empty() {
            return Err(ApiError::InvalidConfig(
                "secret_id and secret_key must not be empty".to_string(),
            ));
        }
        match self.protocol.to_ascii_lowercase().as_str() {
            "https" | "http" => Ok(()),
            other => Err(ApiError::InvalidConfig(format!(
                "protocol must be HTTPS or HTTP, got {}",
                other
            ))),
        }
    }

    /// Base URL for one service, without a trailing slash
    pub fn service_url(&self, service: &str) -> String {
        match &self.endpoint {
            Some(endpoint) => endpoint.trim_end_matches('/').to_string(),
            None => format!(
                "{}://{}.{}",
                self.protocol.to_ascii_lowercase(),
                service,
                self.domain
            ),
        }
    }
}

#[derive(Clone)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub timeout_seconds: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff_ms: 100,
            max_backoff_ms: 10000,
            timeout_seconds: 30,
        }
    }
}

#[derive(Deserialize)]
struct ResponseEnvelope {
    #[serde(rename = "Response")]
    response: serde_json::Value,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ErrorBody {
    code: String,
    #[serde(default)]
    message: String,
}

fn build_http_client(retry_config: &RetryConfig) -> Result<reqwest::Client, ApiError> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(retry_config.timeout_seconds))
        .connect_timeout(Duration::from_secs(10))
        .pool_idle_timeout(Duration::from_secs(90))
        .pool_max_idle_per_host(10)
        .tcp_keepalive(Duration::from_secs(30))
        .build()
        .map_err(ApiError::RequestError)
}

impl Client {
    /// Create a new API client with default retry configuration
    pub fn new(config: ClientConfig) -> Result<Self, ApiError> {
        Self::with_config(config, RetryConfig::default())
    }

    /// Create a new API client with custom retry configuration
    pub fn with_config(config: ClientConfig, retry_config: RetryConfig) -> Result<Self, ApiError> {
        config.validate()?;
        let http_client = build_http_client(&retry_config)?;

        Ok(Self {
            inner: Arc::new(ClientInner {
                http_client,
                config,
                retry_config,
            }),
        })
    }

    pub fn region(&self) -> &str {
        &self.inner.config.region
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// TSE (microservice engine) API operations
    pub fn tse(&self) -> crate::api::tse::TseApi<'_> {
        crate::api::tse::TseApi::new(self)
    }

    /// VPC API operations (elastic IPs)
    pub fn vpc(&self) -> crate::api::vpc::VpcApi<'_> {
        crate::api::vpc::VpcApi::new(self)
    }

    /// CAM API operations
    pub fn cam(&self) -> crate::api::cam::CamApi<'_> {
        crate::api::cam::CamApi::new(self)
    }

    /// TEM API operations
    pub fn tem(&self) -> crate::api::tem::TemApi<'_> {
        crate::api::tem::TemApi::new(self)
    }

    /// Tag API operations
    pub fn tag(&self) -> crate::api::tag::TagApi<'_> {
        crate::api::tag::TagApi::new(self)
    }

    /// Invoke one API action and decode the `Response` object into `T`
    pub async fn call<B, T>(
        &self,
        service: &str,
        version: &str,
        action: &str,
        body: &B,
    ) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let payload = serde_json::to_vec(body)
            .map_err(|e| ApiError::ParseError(format!("Failed to encode request: {}", e)))?;
        let base_url = self.inner.config.service_url(service);
        let host = host_header(&base_url)?;
        let url = format!("{}/", base_url);

        tracing::debug!("api[{}] request to {}: {}", action, url, String::from_utf8_lossy(&payload));

        self.execute_with_retry(
            || async {
                let timestamp = chrono::Utc::now().timestamp();
                let credential = &self.inner.config.credential;
                let authorization = signer::authorization(
                    &credential.secret_id,
                    &credential.secret_key,
                    service,
                    &host,
                    &payload,
                    timestamp,
                )?;

                let mut request = self
                    .inner
                    .http_client
                    .post(&url)
                    .header(reqwest::header::CONTENT_TYPE, signer::CONTENT_TYPE)
                    .header(reqwest::header::HOST, &host)
                    .header(reqwest::header::AUTHORIZATION, authorization)
                    .header("X-TC-Action", action)
                    .header("X-TC-Version", version)
                    .header("X-TC-Timestamp", timestamp.to_string())
                    .header("X-TC-Language", "en-US");

                if !self.inner.config.region.is_empty() {
                    request = request.header("X-TC-Region", &self.inner.config.region);
                }
                if let Some(token) = &credential.token {
                    request = request.header("X-TC-Token", token);
                }

                request
                    .body(payload.clone())
                    .send()
                    .await
                    .map_err(ApiError::RequestError)
            },
            action,
        )
        .await
    }

    /// Execute request with retry logic
    async fn execute_with_retry<F, Fut, T>(&self, request_fn: F, action: &str) -> Result<T, ApiError>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<reqwest::Response, ApiError>>,
        T: DeserializeOwned,
    {
        let mut attempt = 0;
        let mut last_error = None;

        while attempt <= self.inner.retry_config.max_retries {
            if attempt > 0 {
                let backoff = std::cmp::min(
                    self.inner.retry_config.initial_backoff_ms * (2_u64.pow(attempt - 1)),
                    self.inner.retry_config.max_backoff_ms,
                );
                tracing::debug!(
                    "Retrying api[{}] after {}ms (attempt {})",
                    action,
                    backoff,
                    attempt
                );
                tokio::time::sleep(Duration::from_millis(backoff)).await;
            }

            match request_fn().await {
                Ok(response) => {
                    let status = response.status();

                    if status == reqwest::StatusCode::UNAUTHORIZED
                        || status == reqwest::StatusCode::FORBIDDEN
                    {
                        let text = response.text().await.unwrap_or_default();
                        return Err(ApiError::AuthError(format!("HTTP {}: {}", status.as_u16(), text)));
                    }

                    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                        last_error = Some(ApiError::RateLimited);
                    } else if status.is_server_error() {
                        last_error = Some(ApiError::ServiceUnavailable);
                    } else if status.is_success() {
                        match self.parse_success_response(response, action).await {
                            Ok(data) => return Ok(data),
                            Err(e) if e.is_retryable() => {
                                tracing::warn!("api[{}] failed with retryable error: {}", action, e);
                                last_error = Some(e);
                            }
                            Err(e) => return Err(e),
                        }
                    } else {
                        return self.handle_error_response(response).await;
                    }
                }
                Err(ApiError::RequestError(e)) => {
                    if e.is_timeout() {
                        last_error =
                            Some(ApiError::Timeout(self.inner.retry_config.timeout_seconds));
                    } else if e.is_connect() {
                        last_error = Some(ApiError::ServiceUnavailable);
                    } else {
                        return Err(ApiError::RequestError(e));
                    }
                }
                Err(e) => return Err(e),
            }

            attempt += 1;
        }

        Err(last_error.unwrap_or(ApiError::ServiceUnavailable))
    }

    /// Unwrap the `Response` envelope, turning an `Error` member into `ApiError::Api`
    async fn parse_success_response<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
        action: &str,
    ) -> Result<T, ApiError> {
        let text = response.text().await?;
        let mut envelope: ResponseEnvelope = serde_json::from_str(&text).map_err(|e| {
            tracing::error!("Failed to deserialize response: {}, body: {}", e, text);
            ApiError::ParseError(format!("Failed to parse response: {}", e))
        })?;

        let request_id = envelope
            .response
            .get("RequestId")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();

        if let Some(error) = envelope.response.get_mut("Error").map(serde_json::Value::take) {
            let error: ErrorBody = serde_json::from_value(error)
                .map_err(|e| ApiError::ParseError(format!("Malformed error body: {}", e)))?;
            tracing::error!(
                "api[{}] fail, request id [{}], code [{}], reason [{}]",
                action,
                request_id,
                error.code,
                error.message
            );
            if ApiError::is_auth_code(&error.code) {
                return Err(ApiError::AuthError(format!("{}: {}", error.code, error.message)));
            }
            return Err(ApiError::Api {
                code: error.code,
                message: error.message,
                request_id,
            });
        }

        tracing::debug!("api[{}] success, request id [{}]", action, request_id);

        serde_json::from_value(envelope.response).map_err(|e| {
            tracing::error!("Failed to deserialize response: {}, body: {}", e, text);
            ApiError::ParseError(format!("Failed to parse response: {}", e))
        })
    }

    /// Handle error response
    async fn handle_error_response<T>(&self, response: reqwest::Response) -> Result<T, ApiError> {
        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());

        Err(ApiError::HttpError {
            status,
            message: text,
        })
    }
}

/// `Host` value for signing: host plus any explicit port
fn host_header(base_url: &str) -> Result<String, ApiError> {
    let url = url::Url::parse(base_url)
        .map_err(|e| ApiError::InvalidConfig(format!("invalid endpoint {}: {}", base_url, e)))?;
    let host = url
        .host_str()
        .ok_or_else(|| ApiError::InvalidConfig(format!("endpoint {} has no host", base_url)))?;

    Ok(match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_helpers::create_test_client;
    use mockito::{Matcher, Server};
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "PascalCase")]
    struct EchoResponse {
        instance_id: String,
        request_id: String,
    }

    #[test]
    fn retry_config_defaults() {
        let config = RetryConfig::default();
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.initial_backoff_ms, 100);
        assert_eq!(config.max_backoff_ms, 10000);
        assert_eq!(config.timeout_seconds, 30);
    }

    #[test]
    fn service_url_uses_domain_or_endpoint() {
        let credential = Credential {
            secret_id: "id".to_string(),
            secret_key: "key".to_string(),
            token: None,
        };
        let config = ClientConfig::new(credential, "ap-guangzhou");
        assert_eq!(config.service_url("tse"), "https://tse.tencentcloudapi.com");

        let config = config.with_endpoint("http://127.0.0.1:8080/");
        assert_eq!(config.service_url("tse"), "http://127.0.0.1:8080");
        assert_eq!(host_header(&config.service_url("vpc")).unwrap(), "127.0.0.1:8080");
    }

    #[test]
    fn client_rejects_empty_credentials() {
        let credential = Credential {
            secret_id: String::new(),
            secret_key: "key".to_string(),
            token: None,
        };
        let result = Client::new(ClientConfig::new(credential, "ap-guangzhou"));
        assert!(matches!(result, Err(ApiError::InvalidConfig(_))));
    }

    #[test]
    fn credential_debug_hides_secrets() {
        let credential = Credential {
            secret_id: "AKID".to_string(),
            secret_key: "very-secret".to_string(),
            token: Some("tok".to_string()),
        };
        let printed = format!("{:?}", credential);
        assert!(printed.contains("AKID"));
        assert!(!printed.contains("very-secret"));
        assert!(!printed.contains("tok\""));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn call_signs_and_decodes_response() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/")
            .match_header("x-tc-action", "DescribeThing")
            .match_header("x-tc-version", "2020-12-07")
            .match_header("x-tc-region", "ap-guangzhou")
            .match_header("x-tc-language", "en-US")
            .match_header(
                "authorization",
                Matcher::Regex(
                    r"^TC3-HMAC-SHA256 Credential=AKIDtest/\d{4}-\d{2}-\d{2}/tse/tc3_request, SignedHeaders=content-type;host, Signature=[0-9a-f]{64}$"
                        .to_string(),
                ),
            )
            .match_body(Matcher::Json(json!({"InstanceId": "ins-1"})))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"Response":{"InstanceId":"ins-1","RequestId":"req-1"}}"#)
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        let response: EchoResponse = client
            .call("tse", "2020-12-07", "DescribeThing", &json!({"InstanceId": "ins-1"}))
            .await
            .unwrap();

        assert_eq!(response.instance_id, "ins-1");
        assert_eq!(response.request_id, "req-1");
        mock.assert_async().await;
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn error_envelope_becomes_api_error() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/")
            .with_status(200)
            .with_body(
                r#"{"Response":{"Error":{"Code":"InvalidParameter","Message":"bad name"},"RequestId":"req-2"}}"#,
            )
            .expect(1)
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        let result: Result<serde_json::Value, _> =
            client.call("tse", "2020-12-07", "CreateEngine", &json!({})).await;

        match result {
            Err(ApiError::Api {
                code,
                message,
                request_id,
            }) => {
                assert_eq!(code, "InvalidParameter");
                assert_eq!(message, "bad name");
                assert_eq!(request_id, "req-2");
            }
            other => panic!("unexpected result: {:?}", other),
        }
        mock.assert_async().await;
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn request_limit_exceeded_is_retried() {
        let mut server = Server::new_async().await;
        let limited = server
            .mock("POST", "/")
            .with_status(200)
            .with_body(
                r#"{"Response":{"Error":{"Code":"RequestLimitExceeded","Message":"slow down"},"RequestId":"req-3"}}"#,
            )
            .expect(2)
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        let result: Result<serde_json::Value, _> =
            client.call("vpc", "2017-03-12", "DescribeAddresses", &json!({})).await;

        // 1 retry configured by the test client
        let err = result.unwrap_err();
        assert_eq!(err.code(), Some("RequestLimitExceeded"));
        limited.assert_async().await;
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn server_errors_are_retried_then_reported() {
        let mut server = Server::new_async().await;
        let failing = server
            .mock("POST", "/")
            .with_status(503)
            .expect(2)
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        let result: Result<serde_json::Value, _> =
            client.call("vpc", "2017-03-12", "DescribeAddresses", &json!({})).await;

        assert!(matches!(result, Err(ApiError::ServiceUnavailable)));
        failing.assert_async().await;
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn invalid_parameter_is_not_retried() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/")
            .with_status(200)
            .with_body(
                r#"{"Response":{"Error":{"Code":"InvalidParameter","Message":"no"},"RequestId":"req-5"}}"#,
            )
            .expect(1)
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        let result: Result<serde_json::Value, _> =
            client.call("cam", "2019-01-16", "GetRole", &json!({})).await;

        assert!(result.is_err());
        mock.assert_async().await;
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn auth_failures_map_to_auth_error() {
        let mut server = Server::new_async().await;
        let _unauthorized = server
            .mock("POST", "/")
            .match_header("x-tc-action", "GetRole")
            .with_status(401)
            .with_body("unauthorized")
            .create_async()
            .await;
        let _signature = server
            .mock("POST", "/")
            .match_header("x-tc-action", "DeleteRole")
            .with_status(200)
            .with_body(
                r#"{"Response":{"Error":{"Code":"AuthFailure.SignatureFailure","Message":"bad signature"},"RequestId":"req-6"}}"#,
            )
            .create_async()
            .await;

        let client = create_test_client(&server.url());

        let result: Result<serde_json::Value, _> =
            client.call("cam", "2019-01-16", "GetRole", &json!({})).await;
        assert!(matches!(result, Err(ApiError::AuthError(_))));

        let result: Result<serde_json::Value, _> =
            client.call("cam", "2019-01-16", "DeleteRole", &json!({})).await;
        match result {
            Err(ApiError::AuthError(message)) => assert!(message.contains("SignatureFailure")),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn client_error_status_is_http_error() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("POST", "/")
            .with_status(404)
            .with_body("no such route")
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        let result: Result<serde_json::Value, _> =
            client.call("tse", "2020-12-07", "DescribeThing", &json!({})).await;

        match result {
            Err(ApiError::HttpError { status, message }) => {
                assert_eq!(status, 404);
                assert_eq!(message, "no such route");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn security_token_is_sent() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/")
            .match_header("x-tc-token", "session-token")
            .with_status(200)
            .with_body(r#"{"Response":{"RequestId":"req-7"}}"#)
            .create_async()
            .await;

        let credential = Credential {
            secret_id: "AKIDtest".to_string(),
            secret_key: "secret".to_string(),
            token: Some("session-token".to_string()),
        };
        let client = Client::new(
            ClientConfig::new(credential, "ap-guangzhou").with_endpoint(server.url()),
        )
        .unwrap();

        let result: Result<serde_json::Value, _> =
            client.call("tag", "2018-08-13", "ModifyResourceTags", &json!({})).await;
        assert!(result.is_ok());
        mock.assert_async().await;
    }
}
