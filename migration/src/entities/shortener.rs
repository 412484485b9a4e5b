use sea_orm::entity::prelude::*;

/// One URL ↔ digest mapping. Rows are insert-only.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "shortener")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false, column_type = "Text")]
    pub url: String,
    #[sea_orm(column_type = "Text", unique)]
    pub digest: String,
    pub date: DateTimeUtc,
    /// NULL is read as `false`
    pub collide: Option<bool>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
