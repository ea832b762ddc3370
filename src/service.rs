//! Action-keyed request/response boundary between the UI surface and the
//! core flows
//!
//! Requests always settle into a terminal response; errors become messages
//! or error fields, never propagated failures.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::session::{CookieTransfer, Prober};

/// Incoming request, keyed by an `action` discriminator on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum Request {
    #[serde(rename_all = "camelCase")]
    CopyAndPaste {
        domain: String,
        #[serde(default)]
        minimal: bool,
    },
    #[serde(rename_all = "camelCase")]
    CheckSessionStatus { url: String },
}

/// Terminal response for a request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Response {
    #[serde(rename_all = "camelCase")]
    Check {
        success: bool,
        status: u16,
        response_time: u64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    Copy { message: String },
}

/// Dispatches requests onto the transfer and probe flows.
pub struct Service {
    transfer: CookieTransfer,
    prober: Arc<dyn Prober>,
}

impl Service {
    pub fn new(transfer: CookieTransfer, prober: Arc<dyn Prober>) -> Self {
        Self { transfer, prober }
    }

    pub async fn handle(&self, request: Request) -> Response {
        match request {
            Request::CopyAndPaste { domain, minimal } => {
                tracing::info!(%domain, minimal, "copying cookies");
                let outcome = if minimal {
                    self.transfer.transfer_minimal(&domain).await
                } else {
                    self.transfer.transfer(&domain).await
                };
                let message = match outcome {
                    Ok(outcome) => outcome.message(),
                    Err(err) => format!("Failed to copy cookies from {domain}: {err}"),
                };
                Response::Copy { message }
            }
            Request::CheckSessionStatus { url } => {
                tracing::info!(%url, "checking session status");
                let response = self.prober.probe(&url).await;
                Response::Check {
                    success: response.success,
                    status: response.http_status,
                    response_time: response.response_time_ms,
                    error: response.error,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BridgeConfig;
    use crate::core::ProbeResponse;
    use crate::store::MemoryCookieStore;
    use async_trait::async_trait;

    struct FixedProber(ProbeResponse);

    #[async_trait]
    impl Prober for FixedProber {
        async fn probe(&self, _url: &str) -> ProbeResponse {
            self.0.clone()
        }
    }

    fn service(prober: ProbeResponse) -> Service {
        let store = Arc::new(MemoryCookieStore::new());
        let config = Arc::new(BridgeConfig::default());
        Service::new(
            CookieTransfer::new(store, config),
            Arc::new(FixedProber(prober)),
        )
    }

    #[test]
    fn requests_parse_from_action_keyed_json() {
        let request: Request = serde_json::from_str(
            r#"{"action": "copyAndPaste", "domain": "https://uchebnik-test.mos.ru"}"#,
        )
        .unwrap();
        assert!(matches!(request, Request::CopyAndPaste { minimal: false, .. }));

        let request: Request = serde_json::from_str(
            r#"{"action": "checkSessionStatus", "url": "https://school-dev.mos.ru/v3/userinfo"}"#,
        )
        .unwrap();
        assert!(matches!(request, Request::CheckSessionStatus { .. }));
    }

    #[test]
    fn check_response_serializes_camel_case() {
        let response = Response::Check {
            success: false,
            status: 408,
            response_time: 5000,
            error: Some("Timeout".to_string()),
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["responseTime"], 5000);
        assert_eq!(json["error"], "Timeout");
    }

    #[tokio::test]
    async fn check_request_returns_probe_outcome() {
        let svc = service(ProbeResponse::completed(200, 150));
        let response = svc
            .handle(Request::CheckSessionStatus {
                url: "https://uchebnik-dev.mos.ru/user-details/api/user".to_string(),
            })
            .await;
        match response {
            Response::Check {
                success, status, ..
            } => {
                assert!(success);
                assert_eq!(status, 200);
            }
            other => panic!("unexpected response: {other:?}"),
        }
    }

    #[tokio::test]
    async fn copy_request_always_yields_a_message() {
        let svc = service(ProbeResponse::completed(200, 1));
        let response = svc
            .handle(Request::CopyAndPaste {
                domain: "https://uchebnik-test.mos.ru".to_string(),
                minimal: false,
            })
            .await;
        match response {
            Response::Copy { message } => assert_eq!(message, "No cookies to copy"),
            other => panic!("unexpected response: {other:?}"),
        }
    }
}
