//! Stock reqwest-backed implementation of the host's outbound-fetch
//! proxy.
//!
//! Embedding hosts can delegate `HostServices::proxy_http` to an
//! [`HttpBridge`] instead of wiring their own client. Plugins never see
//! this type; they only observe the [`ProxyResponse`] shape.

use crate::error::HostError;
use crate::models::{ProxyRequest, ProxyResponse};
use reqwest::Method;
use std::collections::HashMap;
use std::time::Duration;

/// Executes proxied plugin HTTP requests over a shared reqwest client.
#[derive(Debug, Clone)]
pub struct HttpBridge {
    client: reqwest::Client,
}

impl HttpBridge {
    /// Build a bridge with the given per-request timeout.
    pub fn new(timeout: Duration) -> Result<Self, HostError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("auricle-plugin-sdk/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }

    /// Execute one proxied request.
    ///
    /// Unknown HTTP method strings fail with [`HostError::Service`];
    /// transport failures map through [`HostError::Http`]. Non-2xx
    /// statuses are not errors, they are reported in the response.
    pub async fn execute(&self, request: ProxyRequest) -> Result<ProxyResponse, HostError> {
        let method = Method::from_bytes(request.method.as_bytes())
            .map_err(|_| HostError::service(format!("invalid HTTP method: {}", request.method)))?;

        let mut builder = self.client.request(method, &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        tracing::debug!(url = %request.url, method = %request.method, "proxying plugin fetch");
        let response = builder.send().await?;
        let status = response.status().as_u16();
        let headers: HashMap<String, String> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.to_string(), v.to_string()))
            })
            .collect();
        let body = response.text().await?;

        Ok(ProxyResponse {
            status,
            headers,
            body,
        })
    }
}

impl Default for HttpBridge {
    fn default() -> Self {
        Self::new(Duration::from_secs(30)).expect("default reqwest client")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn executes_get_with_headers() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .and(header("x-api-key", "k1"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"hits":1}"#))
            .mount(&server)
            .await;

        let bridge = HttpBridge::default();
        let mut request = ProxyRequest::get(format!("{}/search", server.uri()));
        request
            .headers
            .insert("x-api-key".to_string(), "k1".to_string());

        let response = bridge.execute(request).await.unwrap();
        assert!(response.ok());
        assert_eq!(response.body, r#"{"hits":1}"#);
    }

    #[tokio::test]
    async fn non_2xx_status_is_not_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404).set_body_string("missing"))
            .mount(&server)
            .await;

        let bridge = HttpBridge::default();
        let response = bridge
            .execute(ProxyRequest::get(server.uri()))
            .await
            .unwrap();
        assert!(!response.ok());
        assert_eq!(response.status, 404);
    }

    #[tokio::test]
    async fn invalid_method_is_rejected() {
        let bridge = HttpBridge::default();
        let request = ProxyRequest {
            url: "http://localhost/".to_string(),
            method: "GE T".to_string(),
            headers: HashMap::new(),
            body: None,
        };
        assert!(matches!(
            bridge.execute(request).await,
            Err(HostError::Service { .. })
        ));
    }
}
