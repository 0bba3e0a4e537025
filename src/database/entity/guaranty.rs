//! 保修记录表，`guaranty_serial` 唯一，重复导入时跳过

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "guaranties")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(column_type = "String(StringLen::N(150))")]
    pub product_serial_number: String,
    #[sea_orm(column_type = "String(StringLen::N(200))", unique)]
    pub guaranty_serial: String,
    #[sea_orm(column_type = "String(StringLen::N(200))")]
    pub product_name: String,
    pub guaranty_days: i32,
    #[sea_orm(column_type = "String(StringLen::N(100))")]
    pub produced_at: String,
    pub created_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
