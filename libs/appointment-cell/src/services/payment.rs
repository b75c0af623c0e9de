use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use tracing::{debug, error, info};
use uuid::Uuid;

use shared_config::AppConfig;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum PaymentError {
    #[error("Payment gateway is not configured")]
    NotConfigured,

    #[error("Payment gateway rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Payment gateway unreachable: {0}")]
    Transport(String),

    #[error("Unexpected payment gateway response: {0}")]
    Decode(String),
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CheckoutRequest {
    pub appointment_id: Uuid,
    pub patient_id: Uuid,
    pub professional_id: Uuid,
    pub description: String,
    pub amount_cents: i64,
    pub platform_fee_cents: i64,
    pub professional_amount_cents: i64,
    pub currency: String,
    pub success_url: String,
    pub cancel_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CheckoutSession {
    pub checkout_url: String,
    pub payment_reference: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Refund {
    pub refund_id: String,
    pub payment_reference: String,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_checkout(&self, request: &CheckoutRequest) -> Result<CheckoutSession, PaymentError>;

    async fn refund(&self, payment_reference: &str) -> Result<Refund, PaymentError>;
}

/// Platform share and professional share of `amount_cents`. The platform share rounds down.
pub fn split_amount(amount_cents: i64, platform_fee_percent: u8) -> (i64, i64) {
    let percent = i64::from(platform_fee_percent.min(100));
    let platform = amount_cents * percent / 100;
    (platform, amount_cents - platform)
}

// ==============================================================================
// HTTP GATEWAY
// ==============================================================================

/// JSON gateway client: `POST {base}/v1/checkout/sessions` and `POST {base}/v1/refunds`.
pub struct HttpPaymentGateway {
    client: Client,
    base_url: String,
    api_key: String,
}

impl HttpPaymentGateway {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.payment_gateway_url.trim_end_matches('/').to_string(),
            api_key: config.payment_gateway_api_key.clone(),
        }
    }

    async fn post<T>(&self, path: &str, body: serde_json::Value) -> Result<T, PaymentError>
    where
        T: for<'de> Deserialize<'de>,
    {
        if self.base_url.is_empty() || self.api_key.is_empty() {
            return Err(PaymentError::NotConfigured);
        }

        let url = format!("{}{}", self.base_url, path);
        debug!("Calling payment gateway {}", url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| PaymentError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            error!("Payment gateway returned {}: {}", status, message);
            return Err(PaymentError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| PaymentError::Decode(e.to_string()))
    }
}

#[derive(Debug, Deserialize)]
struct GatewayCheckout {
    id: String,
    url: String,
}

#[derive(Debug, Deserialize)]
struct GatewayRefund {
    id: String,
}

#[async_trait]
impl PaymentGateway for HttpPaymentGateway {
    async fn create_checkout(&self, request: &CheckoutRequest) -> Result<CheckoutSession, PaymentError> {
        let body = json!({
            "mode": "payment",
            "currency": request.currency,
            "amount": request.amount_cents,
            "description": request.description,
            "application_fee_amount": request.platform_fee_cents,
            "transfer_amount": request.professional_amount_cents,
            "success_url": request.success_url,
            "cancel_url": request.cancel_url,
            "metadata": {
                "appointment_id": request.appointment_id,
                "patient_id": request.patient_id,
                "professional_id": request.professional_id
            }
        });

        let session: GatewayCheckout = self.post("/v1/checkout/sessions", body).await?;
        info!("Checkout {} opened for appointment {}", session.id, request.appointment_id);

        Ok(CheckoutSession {
            checkout_url: session.url,
            payment_reference: session.id,
        })
    }

    async fn refund(&self, payment_reference: &str) -> Result<Refund, PaymentError> {
        let refund: GatewayRefund = self
            .post("/v1/refunds", json!({ "payment_reference": payment_reference }))
            .await?;
        info!("Refund {} issued for {}", refund.id, payment_reference);

        Ok(Refund {
            refund_id: refund.id,
            payment_reference: payment_reference.to_string(),
        })
    }
}

// ==============================================================================
// SANDBOX GATEWAY
// ==============================================================================

/// Local gateway for the in-memory backend. Checkouts point back at the frontend.
pub struct SandboxPaymentGateway {
    frontend_url: String,
    refunds: AtomicU64,
}

impl SandboxPaymentGateway {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            frontend_url: config.frontend_url.trim_end_matches('/').to_string(),
            refunds: AtomicU64::new(0),
        }
    }

    pub fn refund_count(&self) -> u64 {
        self.refunds.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PaymentGateway for SandboxPaymentGateway {
    async fn create_checkout(&self, request: &CheckoutRequest) -> Result<CheckoutSession, PaymentError> {
        let reference = format!("sandbox_{}", Uuid::new_v4().simple());
        Ok(CheckoutSession {
            checkout_url: format!("{}/pagamento/sandbox?ref={}&appointment={}", self.frontend_url, reference, request.appointment_id),
            payment_reference: reference,
        })
    }

    async fn refund(&self, payment_reference: &str) -> Result<Refund, PaymentError> {
        let n = self.refunds.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(Refund {
            refund_id: format!("sandbox_refund_{}", n),
            payment_reference: payment_reference.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_gives_platform_twenty_percent() {
        assert_eq!(split_amount(15000, 20), (3000, 12000));
        assert_eq!(split_amount(999, 20), (199, 800));
        assert_eq!(split_amount(1000, 0), (0, 1000));
        assert_eq!(split_amount(1000, 150), (1000, 0));
    }
}
