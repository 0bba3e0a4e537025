//! 单元测试共用的辅助函数

use crate::database;
use rust_xlsxwriter::Workbook;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};

/// 创建已建表的内存SQLite连接
pub(crate) async fn memory_db() -> DatabaseConnection {
    let mut opt = ConnectOptions::new("sqlite::memory:".to_string());
    opt.max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);
    let db = Database::connect(opt).await.expect("sqlite connect");
    database::migrate(&db).await.expect("migrate");
    db
}

/// 导入表格中的一行
pub(crate) struct SheetRow {
    pub product_serial_number: String,
    pub guaranty_serial: String,
    pub product_name: String,
    pub guaranty_days: i32,
    pub produced_at: String,
}

impl SheetRow {
    pub(crate) fn new(
        product_serial_number: &str,
        guaranty_serial: &str,
        product_name: &str,
        guaranty_days: i32,
        produced_at: &str,
    ) -> Self {
        Self {
            product_serial_number: product_serial_number.to_string(),
            guaranty_serial: guaranty_serial.to_string(),
            product_name: product_name.to_string(),
            guaranty_days,
            produced_at: produced_at.to_string(),
        }
    }
}

pub(crate) fn sample_row(n: usize) -> SheetRow {
    SheetRow::new(
        &format!("SN-{}", n),
        &format!("GW-{}", n),
        "Widget",
        365,
        "2024-01-01 10:00 ق.ظ",
    )
}

/// 生成带表头的xlsx文件内容
pub(crate) fn workbook_bytes(rows: &[SheetRow]) -> Vec<u8> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    let header = [
        "product_serial_number",
        "guaranty_serial",
        "product_name",
        "guaranty_days",
        "produced_at",
    ];
    for (col, title) in header.iter().enumerate() {
        sheet.write_string(0, col as u16, *title).unwrap();
    }
    for (i, row) in rows.iter().enumerate() {
        let r = (i + 1) as u32;
        sheet.write_string(r, 0, &row.product_serial_number).unwrap();
        sheet.write_string(r, 1, &row.guaranty_serial).unwrap();
        sheet.write_string(r, 2, &row.product_name).unwrap();
        sheet.write_number(r, 3, row.guaranty_days).unwrap();
        sheet.write_string(r, 4, &row.produced_at).unwrap();
    }
    workbook.save_to_buffer().unwrap()
}
