//! 购物车汇总表，`total_quantity` 与 `total_price` 只由过期监听器写入

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "carts")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub user_id: i32,
    pub total_quantity: Option<i32>,
    #[sea_orm(column_type = "Decimal(Some((20, 3)))", nullable)]
    pub total_price: Option<Decimal>,
    pub created_at: ChronoDateTimeUtc,
    pub modified_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::cart_product::Entity")]
    CartProduct,
}

impl Related<super::cart_product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CartProduct.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
