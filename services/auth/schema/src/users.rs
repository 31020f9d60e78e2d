use sea_orm::entity::prelude::*;

/// Portal user as seen by the auth service: login identity, role and the
/// Telegram chat that receives verification codes.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub email: String,
    pub role: i16,
    pub telegram_chat_id: Option<i64>,
    /// One-shot token the user sends to the bot as `/start <token>`.
    #[sea_orm(unique)]
    pub telegram_link_token: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::verification_codes::Entity")]
    VerificationCodes,
}

impl Related<super::verification_codes::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::VerificationCodes.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
