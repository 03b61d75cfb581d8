use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "licenses")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Uppercase hex key, immutable once generated.
    #[sea_orm(unique)]
    pub key_code: String,

    /// 0 means unlimited.
    pub allowed_uses: i32,

    pub uses: i32,

    /// Binding identity (device fingerprint or email). Set at most once by
    /// the normal validation flow; admin writes are unconditional.
    pub hwid: Option<String>,

    /// When true, a non-null hwid must match exactly on every validation.
    pub hwid_locked: bool,

    /// RFC 3339 UTC timestamp; None = lifetime.
    pub expiry: Option<String>,

    pub banned: bool,

    pub user_id: Option<i32>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Users,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Users.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
