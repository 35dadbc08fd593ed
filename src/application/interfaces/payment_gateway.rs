use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;

pub const CHECKOUT_SESSION_COMPLETED: &str = "checkout.session.completed";
pub const CHECKOUT_SESSION_ASYNC_PAYMENT_SUCCEEDED: &str =
    "checkout.session.async_payment_succeeded";

/// A one-off hosted checkout for a single line item priced inline.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutSessionRequest {
    pub customer_email: String,
    pub product_name: String,
    pub amount_minor: i32,
    pub currency: String,
    pub success_url: String,
    pub cancel_url: String,
    pub metadata: HashMap<String, String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreatedCheckoutSession {
    pub session_id: String,
    pub url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckoutPaymentStatus {
    Paid,
    Unpaid,
}

impl CheckoutPaymentStatus {
    /// Anything other than `paid` (including `no_payment_required`) grants nothing.
    pub fn from_provider(value: &str) -> Self {
        match value {
            "paid" => CheckoutPaymentStatus::Paid,
            _ => CheckoutPaymentStatus::Unpaid,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutSessionStatus {
    pub session_id: String,
    pub payment_status: CheckoutPaymentStatus,
    pub payment_intent_id: Option<String>,
    pub metadata: HashMap<String, String>,
}

impl CheckoutSessionStatus {
    pub fn is_paid(&self) -> bool {
        self.payment_status == CheckoutPaymentStatus::Paid
    }
}

/// A webhook event whose signature has been verified.
#[derive(Debug, Clone, PartialEq)]
pub struct WebhookEvent {
    pub event_id: Option<String>,
    pub event_type: String,
    pub checkout_session_id: Option<String>,
}

impl WebhookEvent {
    pub fn settles_checkout(&self) -> bool {
        matches!(
            self.event_type.as_str(),
            CHECKOUT_SESSION_COMPLETED | CHECKOUT_SESSION_ASYNC_PAYMENT_SUCCEEDED
        )
    }
}

#[async_trait]
#[automock]
pub trait PaymentGateway {
    async fn create_checkout_session(
        &self,
        request: CheckoutSessionRequest,
    ) -> Result<CreatedCheckoutSession>;
    async fn retrieve_checkout_session(&self, session_id: String) -> Result<CheckoutSessionStatus>;
    /// Fails unless the signature header matches the payload and is recent.
    fn verify_webhook(&self, payload: Vec<u8>, signature_header: String) -> Result<WebhookEvent>;
}
