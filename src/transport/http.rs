//! HTTP transport backed by reqwest.

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, USER_AGENT};
use std::time::Duration;
use tokio::time::timeout;

use crate::transport::{OutboundRequest, Transport, TransportError, TransportResponse};

/// Shared HTTP client sending the client identifier and
/// `Accept: application/json` on every request.
#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    client_id: String,
}

impl HttpTransport {
    pub fn new(client_id: &str) -> Result<Self, TransportError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(client_id)
                .map_err(|e| TransportError::InvalidRequest(format!("client id: {}", e)))?,
        );
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| TransportError::Connect(e.to_string()))?;

        Ok(Self {
            client,
            client_id: client_id.to_string(),
        })
    }

    async fn execute(&self, request: OutboundRequest) -> Result<TransportResponse, TransportError> {
        let mut builder = self.client.get(request.url.clone());
        for (name, value) in &request.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| TransportError::InvalidRequest(format!("header '{}': {}", name, e)))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| TransportError::InvalidRequest(format!("header value: {}", e)))?;
            builder = builder.header(name, value);
        }

        let limit = request.timeout;
        let exchange = async {
            let response = builder
                .send()
                .await
                .map_err(|e| map_reqwest_error(e, limit))?;
            let status = response.status().as_u16();
            let bytes = response
                .bytes()
                .await
                .map_err(|e| TransportError::Body(e.to_string()))?;
            Ok::<_, TransportError>(TransportResponse {
                status,
                body: decode_body(&bytes),
            })
        };

        match timeout(limit, exchange).await {
            Ok(result) => result,
            Err(_) => Err(TransportError::Timeout(limit)),
        }
    }
}

/// Payloads are text. Bytes that are not UTF-8 are replaced rather than
/// failing the attempt; the charset header is ignored.
fn decode_body(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(e) => {
            tracing::debug!(valid_up_to = e.valid_up_to(), len = bytes.len(), "Response body is not UTF-8");
            String::from_utf8_lossy(bytes).into_owned()
        }
    }
}

fn map_reqwest_error(err: reqwest::Error, limit: Duration) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout(limit)
    } else if err.is_builder() {
        TransportError::InvalidRequest(err.to_string())
    } else {
        TransportError::Connect(err.to_string())
    }
}

impl Transport for HttpTransport {
    fn get(
        &self,
        request: OutboundRequest,
    ) -> BoxFuture<'_, Result<TransportResponse, TransportError>> {
        self.execute(request).boxed()
    }
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport")
            .field("client_id", &self.client_id)
            .finish()
    }
}
