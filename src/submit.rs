use futures::future::BoxFuture;
use serde_json::Value;
use std::time::Duration;

use crate::config::SubmitConfig;
use crate::import::{ImportError, ImportReceipt, ImportRecord, ImportSubmitter};

const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Posts confirmed records as a JSON array to the host backend
#[derive(Debug, Clone)]
pub struct HttpSubmitter {
    client: reqwest::Client,
    config: SubmitConfig,
}

impl HttpSubmitter {
    pub fn new(config: SubmitConfig) -> Result<Self, ImportError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| ImportError::config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &SubmitConfig {
        &self.config
    }

    async fn post_records(&self, records: &[ImportRecord]) -> Result<ImportReceipt, String> {
        let url = self.config.submit_url();
        tracing::debug!("import submit: POST {} ({} records)", url, records.len());

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(records)
            .send()
            .await
            .map_err(|e| format!("Failed to reach server: {}", e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| format!("Failed to read server response: {}", e))?;

        if !status.is_success() {
            tracing::warn!("import submit: {} returned {}", url, status);
            return Err(error_message(status.as_u16(), &body));
        }

        Ok(parse_receipt(records.len(), &body))
    }

    async fn get_refresh(&self) {
        let Some(url) = self.config.refresh_url() else {
            return;
        };

        // Refresh failures do not undo a completed import
        match self.client.get(&url).send().await {
            Ok(response) if response.status().is_success() => {
                tracing::debug!("import refresh: GET {} ok", url);
            }
            Ok(response) => {
                tracing::warn!("import refresh: {} returned {}", url, response.status());
            }
            Err(e) => {
                tracing::warn!("import refresh: {} failed: {}", url, e);
            }
        }
    }
}

impl ImportSubmitter for HttpSubmitter {
    fn submit<'a>(&'a self, records: &'a [ImportRecord]) -> BoxFuture<'a, Result<ImportReceipt, String>> {
        Box::pin(self.post_records(records))
    }

    fn refresh(&self) -> BoxFuture<'_, ()> {
        Box::pin(self.get_refresh())
    }
}

/// Message for a rejected submission: the body's `message` or `error`
/// field, else the raw body, else the status code
pub fn error_message(status: u16, body: &str) -> String {
    if let Ok(json) = serde_json::from_str::<Value>(body) {
        for field in ["message", "error"] {
            if let Some(message) = json.get(field).and_then(Value::as_str) {
                if !message.trim().is_empty() {
                    return message.to_string();
                }
            }
        }
    }

    let body = body.trim();
    if body.is_empty() {
        format!("Import failed with status {}", status)
    } else {
        body.to_string()
    }
}

/// Receipt from an optional `{success_count, failed_count, message}` body
pub fn parse_receipt(submitted: usize, body: &str) -> ImportReceipt {
    let mut receipt = ImportReceipt::submitted(submitted);

    let Ok(json) = serde_json::from_str::<Value>(body) else {
        return receipt;
    };

    receipt.succeeded = json
        .get("success_count")
        .and_then(Value::as_u64)
        .map(|n| n as usize);
    receipt.failed = json
        .get("failed_count")
        .and_then(Value::as_u64)
        .map(|n| n as usize);
    receipt.message = json
        .get("message")
        .and_then(Value::as_str)
        .map(String::from);

    receipt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_message_prefers_message_field() {
        assert_eq!(
            error_message(400, r#"{"message":"ISBN 123 already exists","error":"conflict"}"#),
            "ISBN 123 already exists"
        );
        assert_eq!(error_message(500, r#"{"error":"Database unavailable"}"#), "Database unavailable");
    }

    #[test]
    fn test_error_message_falls_back() {
        assert_eq!(error_message(502, "Bad Gateway"), "Bad Gateway");
        assert_eq!(error_message(500, "  "), "Import failed with status 500");
        assert_eq!(error_message(400, r#"{"detail":"x"}"#), r#"{"detail":"x"}"#);
    }

    #[test]
    fn test_parse_receipt() {
        let receipt = parse_receipt(5, r#"{"success_count":4,"failed_count":1,"message":"4 books added"}"#);
        assert_eq!(receipt.submitted, 5);
        assert_eq!(receipt.succeeded, Some(4));
        assert_eq!(receipt.failed, Some(1));
        assert_eq!(receipt.message.as_deref(), Some("4 books added"));

        let receipt = parse_receipt(2, "OK");
        assert_eq!(receipt, ImportReceipt::submitted(2));
    }

    #[test]
    fn test_new_uses_config_urls() {
        let submitter = HttpSubmitter::new(
            SubmitConfig::new("/api/books/bulk").with_refresh("/api/books"),
        )
        .unwrap();
        assert_eq!(submitter.config().submit_url(), "http://localhost:5000/api/books/bulk");
        assert_eq!(
            submitter.config().refresh_url().as_deref(),
            Some("http://localhost:5000/api/books")
        );
    }

    #[tokio::test]
    async fn test_unreachable_server_is_submit_error() {
        // Nothing listens on the discard port
        let submitter = HttpSubmitter::new(
            SubmitConfig::new("/bulk").with_base_url("http://127.0.0.1:9"),
        )
        .unwrap();
        let err = submitter.submit(&[ImportRecord::new()]).await.unwrap_err();
        assert!(err.starts_with("Failed to reach server"));
    }
}
