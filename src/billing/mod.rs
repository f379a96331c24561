//! Subscription billing through an external payment processor.
//!
//! The processor is reached over blocking HTTP; handlers call it from
//! `tokio::task::spawn_blocking`.

pub mod stripe;

pub use stripe::StripeClient;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BillingError {
    #[error("Billing is not configured")]
    NotConfigured,

    #[error("Cannot reach payment processor: {0}")]
    Http(String),

    #[error("Payment processor returned error (status {status}): {body}")]
    Processor { status: u16, body: String },

    #[error("Malformed payment processor response: {0}")]
    ResponseParsing(String),
}

/// What a hosted checkout is opened for.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutRequest {
    pub price_id: String,
    /// Reuse the processor-side customer when the patient already has one.
    pub customer_id: Option<String>,
    pub customer_email: Option<String>,
    /// `{CHECKOUT_SESSION_ID}` is substituted by the processor.
    pub success_url: String,
    pub cancel_url: String,
    /// Our user id, echoed back by the processor for reconciliation.
    pub client_reference_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortalSession {
    pub url: String,
}

/// Outcome of a checkout, as reported by the processor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckoutStatus {
    /// `open`, `complete` or `expired`.
    pub status: String,
    pub customer_email: Option<String>,
    pub customer_id: Option<String>,
    /// The user id the checkout was opened for.
    pub client_reference_id: Option<String>,
}

/// Payment processor operations used by the portal.
pub trait PaymentProcessor: Send + Sync {
    fn create_checkout_session(
        &self,
        request: &CheckoutRequest,
    ) -> Result<CheckoutSession, BillingError>;

    fn create_portal_session(
        &self,
        customer_id: &str,
        return_url: &str,
    ) -> Result<PortalSession, BillingError>;

    fn retrieve_checkout_session(&self, session_id: &str) -> Result<CheckoutStatus, BillingError>;
}

/// A configured processor plus the subscription price sold through it.
#[derive(Clone)]
pub struct Billing {
    pub processor: Arc<dyn PaymentProcessor>,
    pub price_id: String,
}

/// In-process processor for tests. Checkouts complete immediately for a
/// fixed customer and report the user of the latest checkout request.
#[cfg(test)]
pub struct MockPaymentProcessor {
    pub customer_id: String,
    pub requests: std::sync::Mutex<Vec<CheckoutRequest>>,
}

#[cfg(test)]
impl MockPaymentProcessor {
    pub fn new(customer_id: &str) -> Self {
        Self {
            customer_id: customer_id.to_string(),
            requests: std::sync::Mutex::new(Vec::new()),
        }
    }
}

#[cfg(test)]
impl PaymentProcessor for MockPaymentProcessor {
    fn create_checkout_session(
        &self,
        request: &CheckoutRequest,
    ) -> Result<CheckoutSession, BillingError> {
        self.requests.lock().unwrap().push(request.clone());
        Ok(CheckoutSession {
            id: "cs_test_1".into(),
            url: "https://checkout.example.com/cs_test_1".into(),
        })
    }

    fn create_portal_session(
        &self,
        customer_id: &str,
        return_url: &str,
    ) -> Result<PortalSession, BillingError> {
        Ok(PortalSession {
            url: format!("https://billing.example.com/{customer_id}?return={return_url}"),
        })
    }

    fn retrieve_checkout_session(&self, session_id: &str) -> Result<CheckoutStatus, BillingError> {
        if session_id != "cs_test_1" {
            return Err(BillingError::Processor {
                status: 404,
                body: "No such checkout.session".into(),
            });
        }
        let requests = self.requests.lock().unwrap();
        let last = requests.last();
        Ok(CheckoutStatus {
            status: "complete".into(),
            customer_email: last.and_then(|r| r.customer_email.clone()),
            customer_id: Some(self.customer_id.clone()),
            client_reference_id: last.map(|r| r.client_reference_id.clone()),
        })
    }
}
