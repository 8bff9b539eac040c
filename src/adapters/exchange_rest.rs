//! REST exchange gateway.
//!
//! Submits orders with `POST {base}/orders` and folds every HTTP answer into a
//! `PlacementOutcome`. Only a 4xx refusal of the order itself counts as a
//! rejection. Auth and routing failures, and anything that leaves the result
//! unknown, are transport errors.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine};
use chrono::Utc;
use hmac::{Hmac, Mac};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::{Client, Method, StatusCode};
use serde_json::Value;
use sha2::Sha256;
use std::time::Duration;
use tracing::{debug, warn};
use zeroize::Zeroizing;

use crate::config::ExchangeConfig;
use crate::error::{QuikTradeError, Result};
use crate::exchange::{ExchangeGateway, PlacementOutcome, PlacementRequest};

const ORDERS_PATH: &str = "/orders";

type HmacSha256 = Hmac<Sha256>;

struct ApiCredentials {
    key: String,
    secret: Zeroizing<String>,
}

pub struct RestExchangeGateway {
    http: Client,
    base_url: String,
    credentials: Option<ApiCredentials>,
}

impl RestExchangeGateway {
    pub fn new(config: &ExchangeConfig) -> Result<Self> {
        let base_url = config.rest_url.trim_end_matches('/').to_string();

        let http = Client::builder()
            .user_agent("quiktrade-gateway/0.1")
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| QuikTradeError::Internal(format!("failed to build HTTP client: {}", e)))?;

        let credentials = match (&config.api_key, &config.api_secret) {
            (Some(key), Some(secret)) => Some(ApiCredentials {
                key: key.clone(),
                secret: Zeroizing::new(secret.clone()),
            }),
            (None, None) => None,
            _ => {
                return Err(QuikTradeError::Auth(
                    "exchange.api_key and exchange.api_secret must be set together".to_string(),
                ))
            }
        };

        Ok(Self {
            http,
            base_url,
            credentials,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn auth_headers(&self, method: &Method, path: &str, body: &str) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        let Some(credentials) = &self.credentials else {
            return Ok(headers);
        };

        let timestamp = Utc::now().timestamp_millis().to_string();
        let signature = sign_request(&credentials.secret, &timestamp, method, path, body)?;

        headers.insert(
            HeaderName::from_static("x-api-key"),
            HeaderValue::from_str(&credentials.key)
                .map_err(|e| QuikTradeError::Auth(format!("invalid API key header: {}", e)))?,
        );
        headers.insert(
            HeaderName::from_static("x-api-signature"),
            HeaderValue::from_str(&signature)
                .map_err(|e| QuikTradeError::Auth(format!("invalid signature header: {}", e)))?,
        );
        headers.insert(
            HeaderName::from_static("x-api-timestamp"),
            HeaderValue::from_str(&timestamp)
                .map_err(|e| QuikTradeError::Auth(format!("invalid timestamp header: {}", e)))?,
        );

        Ok(headers)
    }

    async fn post_order(&self, request: &PlacementRequest) -> Result<(StatusCode, String)> {
        let body = serde_json::to_string(request)?;
        let headers = self.auth_headers(&Method::POST, ORDERS_PATH, &body)?;

        let resp = self
            .http
            .post(format!("{}{}", self.base_url, ORDERS_PATH))
            .headers(headers)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;

        let status = resp.status();
        let text = resp.text().await?;
        Ok((status, text))
    }
}

/// Base64 HMAC-SHA256 over `timestamp + METHOD + path + body`
pub fn sign_request(
    secret: &str,
    timestamp: &str,
    method: &Method,
    path: &str,
    body: &str,
) -> Result<String> {
    let payload = format!(
        "{}{}{}{}",
        timestamp,
        method.as_str().to_uppercase(),
        path,
        body
    );

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| QuikTradeError::Auth(format!("invalid API secret: {}", e)))?;
    mac.update(payload.as_bytes());
    Ok(BASE64_STANDARD.encode(mac.finalize().into_bytes()))
}

/// Client errors raised before the exchange looked at the order itself:
/// credentials, routing, or request framing. Retrying cannot fix these, and
/// they must not be counted as order rejections.
fn is_environment_failure(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::UNAUTHORIZED
            | StatusCode::FORBIDDEN
            | StatusCode::NOT_FOUND
            | StatusCode::METHOD_NOT_ALLOWED
            | StatusCode::NOT_ACCEPTABLE
            | StatusCode::PROXY_AUTHENTICATION_REQUIRED
            | StatusCode::GONE
            | StatusCode::LENGTH_REQUIRED
            | StatusCode::PAYLOAD_TOO_LARGE
            | StatusCode::URI_TOO_LONG
            | StatusCode::UNSUPPORTED_MEDIA_TYPE
            | StatusCode::UPGRADE_REQUIRED
            | StatusCode::REQUEST_HEADER_FIELDS_TOO_LARGE
    )
}

fn pick_str<'a>(root: &'a Value, keys: &[&str]) -> Option<&'a str> {
    keys.iter().find_map(|key| root.get(*key).and_then(|v| v.as_str()))
}

/// Map an HTTP answer from the exchange to a placement outcome.
pub fn classify_response(status: StatusCode, body: &str) -> PlacementOutcome {
    let json: Option<Value> = serde_json::from_str(body).ok();

    if status.is_success() {
        let Some(json) = json else {
            if body.trim().is_empty() {
                return PlacementOutcome::Placed {
                    exchange_order_id: None,
                };
            }
            return PlacementOutcome::TransportError {
                cause: format!("unparsable success response ({}): {}", status, body),
            };
        };
        return PlacementOutcome::Placed {
            exchange_order_id: pick_str(&json, &["order_id", "orderId", "id"])
                .map(str::to_string),
        };
    }

    // Duplicate client_order_id: the exchange already holds this order.
    if status == StatusCode::CONFLICT {
        return PlacementOutcome::Placed {
            exchange_order_id: json
                .as_ref()
                .and_then(|j| pick_str(j, &["order_id", "orderId", "id"]))
                .map(str::to_string),
        };
    }

    if status == StatusCode::TOO_MANY_REQUESTS
        || status == StatusCode::REQUEST_TIMEOUT
        || is_environment_failure(status)
        || status.is_server_error()
        || !status.is_client_error()
    {
        return PlacementOutcome::TransportError {
            cause: format!("exchange responded {}: {}", status, body.trim()),
        };
    }

    let reason = json
        .as_ref()
        .and_then(|j| pick_str(j, &["message", "reason", "error"]))
        .map(str::to_string)
        .unwrap_or_else(|| {
            if body.trim().is_empty() {
                status.to_string()
            } else {
                body.trim().to_string()
            }
        });

    PlacementOutcome::Rejected { reason }
}

#[async_trait]
impl ExchangeGateway for RestExchangeGateway {
    fn name(&self) -> &'static str {
        "rest"
    }

    fn is_dry_run(&self) -> bool {
        false
    }

    async fn submit(&self, request: &PlacementRequest) -> PlacementOutcome {
        match self.post_order(request).await {
            Ok((status, body)) => {
                let outcome = classify_response(status, &body);
                debug!(
                    "Order {} submission answered {} -> {}",
                    request.client_order_id,
                    status,
                    outcome.as_str()
                );
                outcome
            }
            Err(e) => {
                warn!(
                    "Order {} submission failed before an answer: {}",
                    request.client_order_id, e
                );
                PlacementOutcome::TransportError {
                    cause: e.to_string(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_extracts_exchange_id() {
        let outcome = classify_response(StatusCode::CREATED, r#"{"order_id":"ex-42"}"#);
        assert_eq!(
            outcome,
            PlacementOutcome::Placed {
                exchange_order_id: Some("ex-42".into())
            }
        );
    }

    #[test]
    fn empty_success_is_placed() {
        assert_eq!(
            classify_response(StatusCode::OK, ""),
            PlacementOutcome::Placed {
                exchange_order_id: None
            }
        );
    }

    #[test]
    fn garbage_success_is_transport_error() {
        assert!(matches!(
            classify_response(StatusCode::OK, "<html>proxy</html>"),
            PlacementOutcome::TransportError { .. }
        ));
    }

    #[test]
    fn conflict_means_already_placed() {
        assert!(matches!(
            classify_response(StatusCode::CONFLICT, r#"{"message":"duplicate"}"#),
            PlacementOutcome::Placed { .. }
        ));
    }

    #[test]
    fn client_error_is_rejection_with_reason() {
        assert_eq!(
            classify_response(
                StatusCode::UNPROCESSABLE_ENTITY,
                r#"{"message":"Invalid order placement"}"#
            ),
            PlacementOutcome::Rejected {
                reason: "Invalid order placement".into()
            }
        );
        assert_eq!(
            classify_response(StatusCode::BAD_REQUEST, "market closed"),
            PlacementOutcome::Rejected {
                reason: "market closed".into()
            }
        );
    }

    #[test]
    fn rate_limit_and_server_errors_are_transport_errors() {
        for status in [
            StatusCode::TOO_MANY_REQUESTS,
            StatusCode::REQUEST_TIMEOUT,
            StatusCode::UNAUTHORIZED,
            StatusCode::FORBIDDEN,
            StatusCode::NOT_FOUND,
            StatusCode::METHOD_NOT_ALLOWED,
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            StatusCode::BAD_GATEWAY,
            StatusCode::SERVICE_UNAVAILABLE,
        ] {
            assert!(matches!(
                classify_response(status, ""),
                PlacementOutcome::TransportError { .. }
            ));
        }
    }

    #[test]
    fn revoked_credentials_are_not_rejections() {
        assert_eq!(
            classify_response(StatusCode::UNAUTHORIZED, r#"{"message":"invalid api key"}"#),
            PlacementOutcome::TransportError {
                cause: r#"exchange responded 401 Unauthorized: {"message":"invalid api key"}"#
                    .into()
            }
        );
    }

    #[test]
    fn signature_is_deterministic() {
        let a = sign_request("secret", "1700000000000", &Method::POST, "/orders", "{}").unwrap();
        let b = sign_request("secret", "1700000000000", &Method::POST, "/orders", "{}").unwrap();
        let c = sign_request("other", "1700000000000", &Method::POST, "/orders", "{}").unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn mismatched_credentials_rejected() {
        let config = ExchangeConfig {
            rest_url: "http://localhost:9000/".into(),
            timeout_ms: 1000,
            dry_run: false,
            api_key: Some("key".into()),
            api_secret: None,
        };
        assert!(RestExchangeGateway::new(&config).is_err());
    }

    #[test]
    fn base_url_is_trimmed() {
        let config = ExchangeConfig {
            rest_url: "http://localhost:9000/".into(),
            timeout_ms: 1000,
            dry_run: false,
            api_key: None,
            api_secret: None,
        };
        let gateway = RestExchangeGateway::new(&config).unwrap();
        assert_eq!(gateway.base_url(), "http://localhost:9000");
    }
}
