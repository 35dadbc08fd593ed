use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use uuid::Uuid;

use crate::domain::entities::users::{InsertUserEntity, UpdateUserEntity, UserEntity};

#[async_trait]
#[automock]
pub trait UserRepository {
    async fn find_by_email(&self, email: String) -> Result<Option<UserEntity>>;
    async fn find_by_id(&self, user_id: Uuid) -> Result<Option<UserEntity>>;
    async fn create(&self, insert_user_entity: InsertUserEntity) -> Result<UserEntity>;
    async fn update(
        &self,
        user_id: Uuid,
        update_user_entity: UpdateUserEntity,
    ) -> Result<UserEntity>;
}
