use std::collections::HashMap;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use hmac::{Hmac, Mac};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::Deserialize;
use sha2::Sha256;
use tracing::error;
use url::Url;

use crate::application::interfaces::payment_gateway::{
    CheckoutPaymentStatus, CheckoutSessionRequest, CheckoutSessionStatus, CreatedCheckoutSession,
    PaymentGateway, WebhookEvent,
};

type HmacSha256 = Hmac<Sha256>;

pub const STRIPE_API_BASE: &str = "https://api.stripe.com/v1";

/// Signed webhooks older than this are rejected as replays.
pub const WEBHOOK_TOLERANCE_SECONDS: i64 = 300;

/// Minimal Stripe client built on reqwest.
pub struct StripeClient {
    http: reqwest::Client,
    api_base: String,
    secret_key: String,
    webhook_secret: String,
}

#[derive(Debug, Deserialize)]
struct StripeEvent {
    id: Option<String>,
    #[serde(rename = "type")]
    type_: String,
    data: StripeEventData,
}

#[derive(Debug, Deserialize)]
struct StripeEventData {
    object: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct StripeCheckoutSession {
    id: String,
    url: Option<String>,
    payment_status: Option<String>,
    payment_intent: Option<String>,
    #[serde(default)]
    metadata: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct StripeErrorEnvelope {
    error: StripeErrorDetails,
}

#[derive(Debug, Deserialize)]
struct StripeErrorDetails {
    #[serde(rename = "type")]
    type_: Option<String>,
    code: Option<String>,
    message: Option<String>,
    param: Option<String>,
}

impl StripeClient {
    pub fn new(secret_key: String, webhook_secret: String) -> Self {
        Self::with_api_base(STRIPE_API_BASE.to_string(), secret_key, webhook_secret)
    }

    pub fn with_api_base(api_base: String, secret_key: String, webhook_secret: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_base: api_base.trim_end_matches('/').to_string(),
            secret_key,
            webhook_secret,
        }
    }

    async fn ensure_success(resp: reqwest::Response, context: &str) -> Result<reqwest::Response> {
        if resp.status().is_success() {
            return Ok(resp);
        }

        let status = resp.status();
        let request_id = resp
            .headers()
            .get("request-id")
            .or_else(|| resp.headers().get("stripe-request-id"))
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_string());

        let body = match resp.text().await {
            Ok(text) if !text.is_empty() => text,
            Ok(_) => "<empty response body>".to_string(),
            Err(err) => format!("<failed to read response body: {err}>"),
        };

        let (stripe_error_type, stripe_error_code, stripe_error_param, stripe_error_message) =
            match serde_json::from_str::<StripeErrorEnvelope>(&body) {
                Ok(envelope) => {
                    let details = envelope.error;
                    (details.type_, details.code, details.param, details.message)
                }
                Err(_) => (None, None, None, None),
            };

        error!(
            status = %status,
            stripe_request_id = ?request_id,
            stripe_error_type = ?stripe_error_type,
            stripe_error_code = ?stripe_error_code,
            stripe_error_param = ?stripe_error_param,
            stripe_error_message = ?stripe_error_message,
            response_body = %body,
            context = %context,
            "stripe api request failed"
        );

        anyhow::bail!(
            "Stripe API request failed: {} (status {}, request_id={:?})",
            context,
            status,
            request_id
        );
    }

    fn checkout_form(request: &CheckoutSessionRequest) -> Vec<(String, String)> {
        // https://stripe.com/docs/api/checkout/sessions/create
        let mut body: Vec<(String, String)> = vec![
            ("mode".to_string(), "payment".to_string()),
            ("payment_method_types[0]".to_string(), "card".to_string()),
            ("customer_email".to_string(), request.customer_email.clone()),
            (
                "line_items[0][price_data][currency]".to_string(),
                request.currency.to_lowercase(),
            ),
            (
                "line_items[0][price_data][product_data][name]".to_string(),
                request.product_name.clone(),
            ),
            (
                "line_items[0][price_data][unit_amount]".to_string(),
                request.amount_minor.to_string(),
            ),
            ("line_items[0][quantity]".to_string(), "1".to_string()),
            ("success_url".to_string(), request.success_url.clone()),
            ("cancel_url".to_string(), request.cancel_url.clone()),
        ];

        let mut metadata: Vec<_> = request.metadata.iter().collect();
        metadata.sort();
        for (key, value) in metadata {
            body.push((format!("metadata[{}]", key), value.clone()));
        }

        body
    }

    /// Checks `t=...,v1=...` against the payload at `now_unix`.
    /// https://stripe.com/docs/webhooks/signatures
    fn verify_signature_at(
        &self,
        payload: &[u8],
        signature_header: &str,
        now_unix: i64,
    ) -> Result<()> {
        let mut timestamp: Option<&str> = None;
        let mut signatures: Vec<&str> = Vec::new();

        for part in signature_header.split(',') {
            let part = part.trim();
            if let Some(rest) = part.strip_prefix("t=") {
                timestamp = Some(rest);
            } else if let Some(rest) = part.strip_prefix("v1=") {
                signatures.push(rest);
            }
        }

        let timestamp =
            timestamp.ok_or_else(|| anyhow::anyhow!("missing timestamp in stripe-signature"))?;
        if signatures.is_empty() {
            anyhow::bail!("missing v1 in stripe-signature");
        }

        let signed_at: i64 = timestamp
            .parse()
            .context("invalid timestamp in stripe-signature")?;
        if (now_unix - signed_at).abs() > WEBHOOK_TOLERANCE_SECONDS {
            anyhow::bail!("webhook timestamp outside tolerance");
        }

        let mut mac = HmacSha256::new_from_slice(self.webhook_secret.as_bytes())?;
        mac.update(timestamp.as_bytes());
        mac.update(b".");
        mac.update(payload);

        let matched = signatures.iter().any(|signature| {
            hex::decode(signature)
                .map(|provided| mac.clone().verify_slice(&provided).is_ok())
                .unwrap_or(false)
        });
        if !matched {
            anyhow::bail!("invalid webhook signature");
        }

        Ok(())
    }

    fn checkout_session_url(&self, session_id: &str) -> Result<Url> {
        let mut url = Url::parse(&self.api_base).context("invalid stripe api base")?;
        url.path_segments_mut()
            .map_err(|_| anyhow::anyhow!("stripe api base cannot carry a path"))?
            .pop_if_empty()
            .extend(["checkout", "sessions", session_id]);
        Ok(url)
    }

    fn parse_event(payload: &[u8]) -> Result<WebhookEvent> {
        let event: StripeEvent =
            serde_json::from_slice(payload).context("failed to parse stripe event")?;

        let checkout_session_id = if event.type_.starts_with("checkout.session.") {
            event
                .data
                .object
                .get("id")
                .and_then(|id| id.as_str())
                .map(|id| id.to_string())
        } else {
            None
        };

        Ok(WebhookEvent {
            event_id: event.id,
            event_type: event.type_,
            checkout_session_id,
        })
    }
}

#[async_trait]
impl PaymentGateway for StripeClient {
    async fn create_checkout_session(
        &self,
        request: CheckoutSessionRequest,
    ) -> Result<CreatedCheckoutSession> {
        let body = Self::checkout_form(&request);

        let resp = self
            .http
            .post(format!("{}/checkout/sessions", self.api_base))
            .header(AUTHORIZATION, format!("Bearer {}", self.secret_key))
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .form(&body)
            .send()
            .await?;
        let resp = Self::ensure_success(resp, "create checkout session").await?;

        let parsed: StripeCheckoutSession = resp.json().await?;
        let url = parsed
            .url
            .ok_or_else(|| anyhow::anyhow!("Stripe Checkout session URL is missing"))?;

        Ok(CreatedCheckoutSession {
            session_id: parsed.id,
            url,
        })
    }

    async fn retrieve_checkout_session(&self, session_id: String) -> Result<CheckoutSessionStatus> {
        // https://stripe.com/docs/api/checkout/sessions/retrieve
        let resp = self
            .http
            .get(self.checkout_session_url(&session_id)?)
            .header(AUTHORIZATION, format!("Bearer {}", self.secret_key))
            .send()
            .await?;
        let resp = Self::ensure_success(resp, "retrieve checkout session").await?;

        let parsed: StripeCheckoutSession = resp.json().await?;
        let payment_status = parsed
            .payment_status
            .as_deref()
            .map(CheckoutPaymentStatus::from_provider)
            .unwrap_or(CheckoutPaymentStatus::Unpaid);

        Ok(CheckoutSessionStatus {
            session_id: parsed.id,
            payment_status,
            payment_intent_id: parsed.payment_intent,
            metadata: parsed.metadata,
        })
    }

    fn verify_webhook(&self, payload: Vec<u8>, signature_header: String) -> Result<WebhookEvent> {
        self.verify_signature_at(&payload, &signature_header, Utc::now().timestamp())?;
        Self::parse_event(&payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_test123secret456";

    fn client() -> StripeClient {
        StripeClient::new("sk_test_123".to_string(), SECRET.to_string())
    }

    fn compute_stripe_signature(payload: &[u8], secret: &str, timestamp: &str) -> String {
        let mut mac =
            HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
        mac.update(timestamp.as_bytes());
        mac.update(b".");
        mac.update(payload);
        hex::encode(mac.finalize().into_bytes())
    }

    fn signed_header(payload: &[u8], secret: &str, timestamp: i64) -> String {
        let timestamp = timestamp.to_string();
        let signature = compute_stripe_signature(payload, secret, &timestamp);
        format!("t={},v1={}", timestamp, signature)
    }

    fn field<'a>(form: &'a [(String, String)], key: &str) -> Option<&'a str> {
        form.iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    const COMPLETED_EVENT: &[u8] = br#"{"id":"evt_1","type":"checkout.session.completed","data":{"object":{"id":"cs_test_abc","object":"checkout.session","payment_status":"paid"}}}"#;

    #[test]
    fn valid_signature_yields_checkout_event() {
        let header = signed_header(COMPLETED_EVENT, SECRET, Utc::now().timestamp());

        let event = client()
            .verify_webhook(COMPLETED_EVENT.to_vec(), header)
            .expect("valid signature should be accepted");

        assert_eq!(event.event_id.as_deref(), Some("evt_1"));
        assert_eq!(event.event_type, "checkout.session.completed");
        assert_eq!(event.checkout_session_id.as_deref(), Some("cs_test_abc"));
        assert!(event.settles_checkout());
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let header = signed_header(COMPLETED_EVENT, "wrong_secret", Utc::now().timestamp());

        let result = client().verify_webhook(COMPLETED_EVENT.to_vec(), header);

        assert!(result.is_err());
    }

    #[test]
    fn tampered_payload_is_rejected() {
        let header = signed_header(COMPLETED_EVENT, SECRET, Utc::now().timestamp());
        let tampered = br#"{"id":"evt_1","type":"checkout.session.completed","data":{"object":{"id":"cs_other"}}}"#;

        let result = client().verify_webhook(tampered.to_vec(), header);

        assert!(result.is_err());
    }

    #[test]
    fn signature_covers_raw_payload_bytes() {
        let now = Utc::now().timestamp();
        let payload: &[u8] = b"{\"id\":\"evt_\xff\"}";
        let header = signed_header(payload, SECRET, now);

        assert!(client().verify_signature_at(payload, &header, now).is_ok());

        let lossy = String::from_utf8_lossy(payload).into_owned();
        let lossy_header = signed_header(lossy.as_bytes(), SECRET, now);
        assert!(
            client()
                .verify_signature_at(payload, &lossy_header, now)
                .is_err()
        );
    }

    #[test]
    fn session_id_is_encoded_into_a_single_path_segment() {
        let url = client()
            .checkout_session_url("cs_test/../customers?limit=1")
            .unwrap();

        assert!(
            url.as_str()
                .starts_with("https://api.stripe.com/v1/checkout/sessions/cs_test%2F")
        );
        assert!(url.query().is_none());
        assert_eq!(url.path_segments().map(|s| s.count()), Some(4));
    }

    #[test]
    fn stale_timestamp_is_rejected() {
        let now = Utc::now().timestamp();
        let header = signed_header(COMPLETED_EVENT, SECRET, now - 600);

        let result = client().verify_signature_at(COMPLETED_EVENT, &header, now);

        assert!(result.is_err());
    }

    #[test]
    fn timestamp_within_tolerance_is_accepted() {
        let now = Utc::now().timestamp();
        let header = signed_header(COMPLETED_EVENT, SECRET, now - 120);

        let result = client().verify_signature_at(COMPLETED_EVENT, &header, now);

        assert!(result.is_ok());
    }

    #[test]
    fn any_matching_v1_signature_is_accepted() {
        let now = Utc::now().timestamp();
        let valid = compute_stripe_signature(COMPLETED_EVENT, SECRET, &now.to_string());
        let header = format!("t={},v1=deadbeef,v1={}", now, valid);

        let result = client().verify_signature_at(COMPLETED_EVENT, &header, now);

        assert!(result.is_ok());
    }

    #[test]
    fn malformed_headers_are_rejected() {
        let now = Utc::now().timestamp();
        let client = client();

        assert!(client.verify_signature_at(COMPLETED_EVENT, "", now).is_err());
        assert!(client.verify_signature_at(COMPLETED_EVENT, "v1=abc", now).is_err());
        assert!(client.verify_signature_at(COMPLETED_EVENT, &format!("t={now}"), now).is_err());
        assert!(client.verify_signature_at(COMPLETED_EVENT, "t=yesterday,v1=abc", now).is_err());
        assert!(
            client
                .verify_signature_at(COMPLETED_EVENT, &format!("t={now},v1=not-hex"), now)
                .is_err()
        );
    }

    #[test]
    fn non_checkout_events_carry_no_session_id() {
        let payload = br#"{"id":"evt_2","type":"invoice.paid","data":{"object":{"id":"in_123"}}}"#;
        let header = signed_header(payload, SECRET, Utc::now().timestamp());

        let event = client()
            .verify_webhook(payload.to_vec(), header)
            .expect("valid signature should be accepted");

        assert_eq!(event.event_type, "invoice.paid");
        assert_eq!(event.checkout_session_id, None);
        assert!(!event.settles_checkout());
    }

    #[test]
    fn checkout_form_prices_the_single_line_item_inline() {
        let request = CheckoutSessionRequest {
            customer_email: "ada@example.com".to_string(),
            product_name: "Rust for Beginners".to_string(),
            amount_minor: 4999,
            currency: "USD".to_string(),
            success_url: "https://academy.test/success".to_string(),
            cancel_url: "https://academy.test/cancel".to_string(),
            metadata: HashMap::from([
                ("user_id".to_string(), "u-1".to_string()),
                ("course_id".to_string(), "c-1".to_string()),
            ]),
        };

        let form = StripeClient::checkout_form(&request);
        let get = |key: &str| field(&form, key);

        assert_eq!(get("mode"), Some("payment"));
        assert_eq!(get("line_items[0][price_data][currency]"), Some("usd"));
        assert_eq!(get("line_items[0][price_data][unit_amount]"), Some("4999"));
        assert_eq!(get("line_items[0][quantity]"), Some("1"));
        assert_eq!(get("customer_email"), Some("ada@example.com"));
        assert_eq!(get("metadata[course_id]"), Some("c-1"));
        assert_eq!(get("metadata[user_id]"), Some("u-1"));
    }
}
