//! Outbound invoice notification

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, error, instrument};
use uuid::Uuid;

use crate::BillingError;

/// Upper bound on one email function call
pub const DEFAULT_EMAIL_TIMEOUT: Duration = Duration::from_secs(10);

/// Request to email a document to a client
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvoiceNotification {
    pub to: String,
    pub name: String,
    pub document_type: String,
    pub document_id: Uuid,
}

impl InvoiceNotification {
    /// Notification for a newly generated invoice
    pub fn invoice(to: impl Into<String>, name: impl Into<String>, invoice_id: Uuid) -> Self {
        Self {
            to: to.into(),
            name: name.into(),
            document_type: "invoice".to_string(),
            document_id: invoice_id,
        }
    }
}

/// Sends invoice notifications
#[async_trait]
pub trait InvoiceNotifier: Send + Sync {
    /// Send one notification
    async fn send_invoice(&self, notification: &InvoiceNotification) -> Result<(), BillingError>;
}

/// Posts notifications to the email-sending function
#[derive(Clone)]
pub struct HttpEmailSender {
    client: Client,
    url: String,
    api_key: Option<String>,
}

impl HttpEmailSender {
    /// Create a sender for the given function URL with [`DEFAULT_EMAIL_TIMEOUT`]
    pub fn new(url: impl Into<String>, api_key: Option<String>) -> Result<Self, BillingError> {
        Self::with_timeout(url, api_key, DEFAULT_EMAIL_TIMEOUT)
    }

    /// Create a sender whose requests give up after `timeout`
    pub fn with_timeout(
        url: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, BillingError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BillingError::Notification(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            url: url.into(),
            api_key,
        })
    }
}

#[async_trait]
impl InvoiceNotifier for HttpEmailSender {
    #[instrument(skip(self, notification), fields(document_id = %notification.document_id))]
    async fn send_invoice(&self, notification: &InvoiceNotification) -> Result<(), BillingError> {
        let mut request = self.client.post(&self.url).json(notification);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| {
            error!(error = %e, "Email function request failed");
            BillingError::Notification(e.to_string())
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!(status = %status, body = %body, "Email function error");
            return Err(BillingError::Notification(format!(
                "email function returned {status}"
            )));
        }

        debug!("Invoice email sent");
        Ok(())
    }
}
