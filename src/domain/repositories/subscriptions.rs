use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockall::automock;
use uuid::Uuid;

use crate::domain::entities::subscriptions::SubscriptionEntity;

#[async_trait]
#[automock]
pub trait SubscriptionRepository {
    /// Latest subscription with status `active` and `ends_at > now`.
    async fn find_active(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<SubscriptionEntity>>;
    /// Newest first.
    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<SubscriptionEntity>>;
}
