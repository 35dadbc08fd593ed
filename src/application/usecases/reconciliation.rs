use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::{
    application::interfaces::payment_gateway::PaymentGateway,
    domain::{
        repositories::payments::PaymentRepository,
        value_objects::reconciliation::{ReconcileOutcome, SettlePaidSession, WebhookAckDto},
    },
};

#[derive(Debug, Error)]
pub enum ReconciliationError {
    #[error("session_id is required")]
    MissingSessionId,
    #[error("invalid webhook: {0}")]
    InvalidWebhook(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ReconciliationError {
    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            ReconciliationError::MissingSessionId | ReconciliationError::InvalidWebhook(_) => {
                StatusCode::BAD_REQUEST
            }
            ReconciliationError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

pub type UseCaseResult<T> = std::result::Result<T, ReconciliationError>;

/// Turns a processor-side payment confirmation into local entitlements, at most once per session.
pub struct ReconciliationUseCase<P, G>
where
    P: PaymentRepository + Send + Sync + 'static,
    G: PaymentGateway + Send + Sync + 'static,
{
    payment_repo: Arc<P>,
    payment_gateway: Arc<G>,
}

impl<P, G> ReconciliationUseCase<P, G>
where
    P: PaymentRepository + Send + Sync + 'static,
    G: PaymentGateway + Send + Sync + 'static,
{
    pub fn new(payment_repo: Arc<P>, payment_gateway: Arc<G>) -> Self {
        Self {
            payment_repo,
            payment_gateway,
        }
    }

    pub async fn reconcile_session(&self, session_id: String) -> UseCaseResult<ReconcileOutcome> {
        let session_id = session_id.trim().to_string();
        if session_id.is_empty() {
            return Err(ReconciliationError::MissingSessionId);
        }

        info!(%session_id, "reconciliation: reconciling checkout session");

        let session = self
            .payment_gateway
            .retrieve_checkout_session(session_id.clone())
            .await
            .map_err(|err| {
                error!(
                    %session_id,
                    stripe_error = ?err,
                    "reconciliation: failed to retrieve checkout session"
                );
                ReconciliationError::Internal(err)
            })?;

        if !session.is_paid() {
            warn!(
                %session_id,
                payment_status = ?session.payment_status,
                "reconciliation: session is not paid"
            );
            return Ok(ReconcileOutcome::NotPaid { session_id });
        }

        let outcome = self
            .payment_repo
            .settle_paid_session(SettlePaidSession {
                session_id: session_id.clone(),
                provider_payment_id: session.payment_intent_id,
                now: Utc::now(),
            })
            .await
            .map_err(|err| {
                error!(
                    %session_id,
                    db_error = ?err,
                    "reconciliation: settlement transaction failed"
                );
                ReconciliationError::Internal(err)
            })?;

        match &outcome {
            ReconcileOutcome::Granted {
                payment_id,
                entitlement,
            } => info!(
                %session_id,
                %payment_id,
                entitlement = ?entitlement,
                "reconciliation: entitlement granted"
            ),
            ReconcileOutcome::AlreadySettled { payment_id, status } => info!(
                %session_id,
                %payment_id,
                %status,
                "reconciliation: payment already settled"
            ),
            ReconcileOutcome::PaymentNotFound { .. } => warn!(
                %session_id,
                "reconciliation: no local payment for session"
            ),
            ReconcileOutcome::NotPaid { .. } => {}
        }

        Ok(outcome)
    }

    pub async fn handle_webhook(
        &self,
        payload: Vec<u8>,
        signature_header: Option<String>,
    ) -> UseCaseResult<WebhookAckDto> {
        let signature_header = signature_header.ok_or_else(|| {
            warn!("reconciliation: webhook without signature header");
            ReconciliationError::InvalidWebhook("missing signature header".to_string())
        })?;

        let event = self
            .payment_gateway
            .verify_webhook(payload, signature_header)
            .map_err(|err| {
                warn!(error = ?err, "reconciliation: webhook verification failed");
                ReconciliationError::InvalidWebhook(err.to_string())
            })?;

        if !event.settles_checkout() {
            debug!(
                event_type = %event.event_type,
                event_id = ?event.event_id,
                "reconciliation: ignoring webhook event"
            );
            return Ok(WebhookAckDto {
                received: true,
                event_type: event.event_type,
                outcome: None,
            });
        }

        let session_id = event.checkout_session_id.clone().ok_or_else(|| {
            ReconciliationError::InvalidWebhook("event carries no checkout session".to_string())
        })?;

        info!(
            event_type = %event.event_type,
            event_id = ?event.event_id,
            %session_id,
            "reconciliation: webhook reports checkout session"
        );

        let outcome = self.reconcile_session(session_id).await?;

        Ok(WebhookAckDto {
            received: true,
            event_type: event.event_type,
            outcome: Some(outcome),
        })
    }
}
