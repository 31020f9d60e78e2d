use anyhow::Context as _;
use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, DatabaseTransaction,
    EntityTrait, QueryFilter, QuerySelect, TransactionTrait,
};
use uuid::Uuid;

use tutor_auth_schema::{settings, users, verification_codes};

use crate::domain::repository::{SettingsRepository, UserRepository, VerificationCodeRepository};
use crate::domain::types::{CodePurpose, CodeStatus, PortalUser, VerificationCode};
use crate::error::AuthServiceError;

// ── User repository ───────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbUserRepository {
    pub db: DatabaseConnection,
}

impl UserRepository for DbUserRepository {
    async fn find_by_email(&self, email: &str) -> Result<Option<PortalUser>, AuthServiceError> {
        let model = users::Entity::find()
            .filter(users::Column::Email.eq(email))
            .one(&self.db)
            .await
            .context("find user by email")?;
        model.map(user_from_model).transpose()
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<PortalUser>, AuthServiceError> {
        let model = users::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .context("find user by id")?;
        model.map(user_from_model).transpose()
    }

    async fn find_by_link_token(
        &self,
        token: &str,
    ) -> Result<Option<PortalUser>, AuthServiceError> {
        let model = users::Entity::find()
            .filter(users::Column::TelegramLinkToken.eq(token))
            .one(&self.db)
            .await
            .context("find user by telegram link token")?;
        model.map(user_from_model).transpose()
    }

    async fn link_telegram_chat(&self, user_id: Uuid, chat_id: i64) -> Result<(), AuthServiceError> {
        users::ActiveModel {
            id: Set(user_id),
            telegram_chat_id: Set(Some(chat_id)),
            telegram_link_token: Set(None),
            ..Default::default()
        }
        .update(&self.db)
        .await
        .context("link telegram chat")?;
        Ok(())
    }
}

fn user_from_model(model: users::Model) -> Result<PortalUser, AuthServiceError> {
    let role = u8::try_from(model.role)
        .with_context(|| format!("user {} has out-of-range role {}", model.id, model.role))?;
    Ok(PortalUser {
        id: model.id,
        email: model.email,
        role,
        telegram_chat_id: model.telegram_chat_id,
    })
}

// ── VerificationCode repository ───────────────────────────────────────────────

#[derive(Clone)]
pub struct DbVerificationCodeRepository {
    pub db: DatabaseConnection,
}

impl VerificationCodeRepository for DbVerificationCodeRepository {
    async fn supersede_and_insert(&self, code: &VerificationCode) -> Result<(), AuthServiceError> {
        self.db
            .transaction::<_, (), sea_orm::DbErr>(|txn| {
                let code = code.clone();
                Box::pin(async move {
                    lock_user(txn, code.user_id).await?;
                    supersede_active(txn, code.user_id, code.purpose).await?;
                    insert_code(txn, &code).await?;
                    Ok(())
                })
            })
            .await
            .context("issue verification code")?;
        Ok(())
    }

    async fn consume(
        &self,
        user_id: Uuid,
        purpose: CodePurpose,
        code: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, AuthServiceError> {
        // Compare-and-swap: the WHERE clause is the whole validation, so two
        // concurrent callers cannot both see rows_affected == 1.
        let result = verification_codes::Entity::update_many()
            .col_expr(
                verification_codes::Column::Status,
                Expr::value(CodeStatus::Used.as_str()),
            )
            .col_expr(verification_codes::Column::UsedAt, Expr::value(now))
            .filter(verification_codes::Column::UserId.eq(user_id))
            .filter(verification_codes::Column::Purpose.eq(purpose.as_str()))
            .filter(verification_codes::Column::Code.eq(code))
            .filter(verification_codes::Column::Status.eq(CodeStatus::Active.as_str()))
            .filter(verification_codes::Column::ExpiresAt.gte(now))
            .exec(&self.db)
            .await
            .context("consume verification code")?;
        Ok(result.rows_affected == 1)
    }

    async fn invalidate(
        &self,
        user_id: Uuid,
        purpose: CodePurpose,
        now: DateTime<Utc>,
    ) -> Result<u64, AuthServiceError> {
        let result = verification_codes::Entity::update_many()
            .col_expr(
                verification_codes::Column::Status,
                Expr::value(CodeStatus::Used.as_str()),
            )
            .col_expr(verification_codes::Column::UsedAt, Expr::value(now))
            .filter(verification_codes::Column::UserId.eq(user_id))
            .filter(verification_codes::Column::Purpose.eq(purpose.as_str()))
            .filter(verification_codes::Column::Status.eq(CodeStatus::Active.as_str()))
            .exec(&self.db)
            .await
            .context("invalidate verification codes")?;
        Ok(result.rows_affected)
    }
}

/// `SELECT ... FOR UPDATE` on the owner serializes concurrent issues for the
/// same user, so each one sees the code the previous one inserted.
async fn lock_user(txn: &DatabaseTransaction, user_id: Uuid) -> Result<(), sea_orm::DbErr> {
    users::Entity::find_by_id(user_id)
        .lock_exclusive()
        .one(txn)
        .await?;
    Ok(())
}

async fn supersede_active(
    txn: &DatabaseTransaction,
    user_id: Uuid,
    purpose: CodePurpose,
) -> Result<(), sea_orm::DbErr> {
    verification_codes::Entity::update_many()
        .col_expr(
            verification_codes::Column::Status,
            Expr::value(CodeStatus::Superseded.as_str()),
        )
        .filter(verification_codes::Column::UserId.eq(user_id))
        .filter(verification_codes::Column::Purpose.eq(purpose.as_str()))
        .filter(verification_codes::Column::Status.eq(CodeStatus::Active.as_str()))
        .exec(txn)
        .await?;
    Ok(())
}

async fn insert_code(
    txn: &DatabaseTransaction,
    code: &VerificationCode,
) -> Result<(), sea_orm::DbErr> {
    verification_codes::ActiveModel {
        id: Set(code.id),
        user_id: Set(code.user_id),
        purpose: Set(code.purpose.as_str().to_owned()),
        code: Set(code.code.clone()),
        status: Set(code.status.as_str().to_owned()),
        issued_at: Set(code.issued_at),
        expires_at: Set(code.expires_at),
        used_at: Set(code.used_at),
    }
    .insert(txn)
    .await?;
    Ok(())
}

// ── Settings repository ───────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbSettingsRepository {
    pub db: DatabaseConnection,
}

impl SettingsRepository for DbSettingsRepository {
    async fn get(&self, key: &str) -> Result<Option<String>, AuthServiceError> {
        let model = settings::Entity::find_by_id(key.to_owned())
            .one(&self.db)
            .await
            .with_context(|| format!("read setting {key}"))?;
        Ok(model.map(|m| m.value))
    }
}
