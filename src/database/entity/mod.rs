//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! SeaORM 实体定义

pub mod cart;
pub mod cart_product;
pub mod guaranty;
