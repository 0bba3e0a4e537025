//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! 该模块负责解析保修导入表格。
//!
//! 只读取第一个工作表，首行为表头。数据行按列位置映射：
//! 产品序列号、保修序列号、产品名称、保修天数、生产日期。

use super::{
    strip_meridiem, GuarantyError, GuarantyRow, MAX_GUARANTY_SERIAL_LEN, MAX_PRODUCED_AT_LEN,
    MAX_PRODUCT_NAME_LEN, MAX_PRODUCT_SERIAL_LEN,
};
use calamine::{open_workbook_auto_from_rs, Data, Reader};
use std::io::Cursor;
use tracing::{debug, warn};

static EMPTY_CELL: Data = Data::Empty;

/// 被拒绝的数据行
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedRow {
    /// 表格中的行号（从1开始，表头为第1行）
    pub row: usize,
    pub reason: String,
}

/// 表格解析结果
#[derive(Debug, Default)]
pub struct ParsedSheet {
    pub rows: Vec<GuarantyRow>,
    pub rejected: Vec<RejectedRow>,
}

/// 解析表格内容
///
/// 格式由文件内容判断，支持 xlsx/xlsm/xlsb/xls/ods。单行数据不合法时记录到
/// `rejected` 并继续，只有整个文件无法读取时才返回错误。
pub fn parse_workbook(bytes: &[u8]) -> Result<ParsedSheet, GuarantyError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| GuarantyError::Spreadsheet("workbook has no worksheet".to_string()))??;

    let mut parsed = ParsedSheet::default();
    for (index, cells) in range.rows().enumerate().skip(1) {
        let row_number = index + 1;
        if cells.iter().all(|c| matches!(c, Data::Empty)) {
            continue;
        }
        match parse_row(cells) {
            Ok(row) => parsed.rows.push(row),
            Err(reason) => {
                warn!("Rejected spreadsheet row {}: {}", row_number, reason);
                parsed.rejected.push(RejectedRow {
                    row: row_number,
                    reason,
                });
            }
        }
    }
    debug!(
        "Parsed {} rows, rejected {}",
        parsed.rows.len(),
        parsed.rejected.len()
    );
    Ok(parsed)
}

fn parse_row(cells: &[Data]) -> Result<GuarantyRow, String> {
    let cell = |i: usize| cells.get(i).unwrap_or(&EMPTY_CELL);

    let product_serial_number =
        text_field(cell(0), "product_serial_number", MAX_PRODUCT_SERIAL_LEN)?;
    let guaranty_serial = text_field(cell(1), "guaranty_serial", MAX_GUARANTY_SERIAL_LEN)?;
    let product_name = text_field(cell(2), "product_name", MAX_PRODUCT_NAME_LEN)?;
    let guaranty_days = cell_days(cell(3))?;

    let produced_at = strip_meridiem(&cell_text(cell(4)));
    if produced_at.chars().count() > MAX_PRODUCED_AT_LEN {
        return Err(format!("produced_at exceeds {} characters", MAX_PRODUCED_AT_LEN));
    }

    Ok(GuarantyRow {
        product_serial_number,
        guaranty_serial,
        product_name,
        guaranty_days,
        produced_at,
    })
}

fn text_field(cell: &Data, name: &str, max_len: usize) -> Result<String, String> {
    let value = cell_text(cell);
    if value.is_empty() {
        return Err(format!("{} is empty", name));
    }
    if value.chars().count() > max_len {
        return Err(format!("{} exceeds {} characters", name, max_len));
    }
    Ok(value)
}

/// 单元格的文本形式
///
/// 整数值的浮点数不带小数部分，序列号列常被表格软件存成数字
fn cell_text(cell: &Data) -> String {
    match cell {
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => s.trim().to_string(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        Data::Float(f) => f.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => dt
            .as_datetime()
            .map(|d| d.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| dt.as_f64().to_string()),
        Data::Error(_) | Data::Empty => String::new(),
    }
}

fn cell_days(cell: &Data) -> Result<i32, String> {
    let days = match cell {
        Data::Int(i) => *i,
        Data::Float(f) if f.fract() == 0.0 => *f as i64,
        Data::String(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| format!("guaranty_days is not an integer: {:?}", s))?,
        other => return Err(format!("guaranty_days is not an integer: {:?}", other)),
    };
    if days < 1 {
        return Err(format!("guaranty_days must be at least 1, got {}", days));
    }
    i32::try_from(days).map_err(|_| format!("guaranty_days out of range: {}", days))
}
