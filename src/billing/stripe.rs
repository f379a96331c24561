use std::time::Duration;

use serde::Deserialize;

use super::{
    BillingError, CheckoutRequest, CheckoutSession, CheckoutStatus, PaymentProcessor, PortalSession,
};

const STRIPE_API_BASE: &str = "https://api.stripe.com/v1";
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Stripe REST client. Requests are form-encoded and authenticated with
/// the secret key as a bearer token.
pub struct StripeClient {
    base_url: String,
    secret_key: String,
    client: reqwest::blocking::Client,
}

impl StripeClient {
    pub fn new(secret_key: &str) -> Result<Self, BillingError> {
        Self::with_base_url(STRIPE_API_BASE, secret_key)
    }

    /// Point at another API root, e.g. a local stripe-mock.
    pub fn with_base_url(base_url: &str, secret_key: &str) -> Result<Self, BillingError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| BillingError::Http(e.to_string()))?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            secret_key: secret_key.to_string(),
            client,
        })
    }

    fn send<T: for<'de> Deserialize<'de>>(
        &self,
        request: reqwest::blocking::RequestBuilder,
    ) -> Result<T, BillingError> {
        let response = request
            .bearer_auth(&self.secret_key)
            .send()
            .map_err(|e| {
                if e.is_timeout() {
                    BillingError::Http(format!("Request timed out after {REQUEST_TIMEOUT_SECS}s"))
                } else {
                    BillingError::Http(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(BillingError::Processor {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json()
            .map_err(|e| BillingError::ResponseParsing(e.to_string()))
    }
}

/// Form fields for a subscription checkout.
fn checkout_form(request: &CheckoutRequest) -> Vec<(&'static str, String)> {
    let mut form = vec![
        ("mode", "subscription".to_string()),
        ("line_items[0][price]", request.price_id.clone()),
        ("line_items[0][quantity]", "1".to_string()),
        ("success_url", request.success_url.clone()),
        ("cancel_url", request.cancel_url.clone()),
        ("client_reference_id", request.client_reference_id.clone()),
    ];
    // Stripe rejects `customer` and `customer_email` together.
    match (&request.customer_id, &request.customer_email) {
        (Some(customer), _) => form.push(("customer", customer.clone())),
        (None, Some(email)) => form.push(("customer_email", email.clone())),
        (None, None) => {}
    }
    form
}

#[derive(Deserialize)]
struct StripeCheckoutSession {
    id: String,
    url: Option<String>,
    status: Option<String>,
    customer: Option<String>,
    customer_email: Option<String>,
    customer_details: Option<StripeCustomerDetails>,
    client_reference_id: Option<String>,
}

#[derive(Deserialize)]
struct StripeCustomerDetails {
    email: Option<String>,
}

#[derive(Deserialize)]
struct StripePortalSession {
    url: String,
}

impl PaymentProcessor for StripeClient {
    fn create_checkout_session(
        &self,
        request: &CheckoutRequest,
    ) -> Result<CheckoutSession, BillingError> {
        let url = format!("{}/checkout/sessions", self.base_url);
        let session: StripeCheckoutSession =
            self.send(self.client.post(&url).form(&checkout_form(request)))?;
        let checkout_url = session.url.ok_or_else(|| {
            BillingError::ResponseParsing("checkout session without url".into())
        })?;
        tracing::info!(session_id = %session.id, "Checkout session created");
        Ok(CheckoutSession {
            id: session.id,
            url: checkout_url,
        })
    }

    fn create_portal_session(
        &self,
        customer_id: &str,
        return_url: &str,
    ) -> Result<PortalSession, BillingError> {
        let url = format!("{}/billing_portal/sessions", self.base_url);
        let form = [("customer", customer_id), ("return_url", return_url)];
        let session: StripePortalSession = self.send(self.client.post(&url).form(&form))?;
        Ok(PortalSession { url: session.url })
    }

    fn retrieve_checkout_session(&self, session_id: &str) -> Result<CheckoutStatus, BillingError> {
        let url = format!("{}/checkout/sessions/{session_id}", self.base_url);
        let session: StripeCheckoutSession = self.send(self.client.get(&url))?;
        let customer_email = session
            .customer_details
            .and_then(|d| d.email)
            .or(session.customer_email);
        Ok(CheckoutStatus {
            status: session.status.unwrap_or_else(|| "open".into()),
            customer_email,
            customer_id: session.customer,
            client_reference_id: session.client_reference_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> CheckoutRequest {
        CheckoutRequest {
            price_id: "price_abc".into(),
            customer_id: None,
            customer_email: Some("ada@example.com".into()),
            success_url: "https://portal.example.com/checkout/success?session_id={CHECKOUT_SESSION_ID}"
                .into(),
            cancel_url: "https://portal.example.com/dashboard".into(),
            client_reference_id: "user-1".into(),
        }
    }

    fn field<'a>(form: &'a [(&'static str, String)], key: &str) -> Option<&'a str> {
        form.iter().find(|(k, _)| *k == key).map(|(_, v)| v.as_str())
    }

    #[test]
    fn checkout_form_is_subscription_of_one() {
        let form = checkout_form(&request());
        assert_eq!(field(&form, "mode"), Some("subscription"));
        assert_eq!(field(&form, "line_items[0][price]"), Some("price_abc"));
        assert_eq!(field(&form, "line_items[0][quantity]"), Some("1"));
        assert_eq!(field(&form, "customer_email"), Some("ada@example.com"));
        assert_eq!(field(&form, "customer"), None);
    }

    #[test]
    fn known_customer_replaces_email() {
        let mut req = request();
        req.customer_id = Some("cus_123".into());
        let form = checkout_form(&req);
        assert_eq!(field(&form, "customer"), Some("cus_123"));
        assert_eq!(field(&form, "customer_email"), None);
    }

    #[test]
    fn parses_completed_session() {
        let json = r#"{
            "id": "cs_test_1",
            "url": null,
            "status": "complete",
            "customer": "cus_123",
            "customer_email": null,
            "customer_details": {"email": "ada@example.com"},
            "client_reference_id": "user-1"
        }"#;
        let session: StripeCheckoutSession = serde_json::from_str(json).unwrap();
        assert_eq!(session.status.as_deref(), Some("complete"));
        assert_eq!(session.client_reference_id.as_deref(), Some("user-1"));
        assert_eq!(session.customer_details.unwrap().email.as_deref(), Some("ada@example.com"));
    }

    #[test]
    fn unreachable_processor_is_http_error() {
        let client = StripeClient::with_base_url("http://127.0.0.1:1", "sk_test").unwrap();
        let err = client.retrieve_checkout_session("cs_test_1").unwrap_err();
        assert!(matches!(err, BillingError::Http(_)), "got {err:?}");
    }
}
