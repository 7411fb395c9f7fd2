use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde_json::{json, Value};
use sqlx::mysql::MySqlRow;
use sqlx::postgres::PgRow;
use sqlx::{Column, Row as _, TypeInfo};

use crate::models::query::Row;

// 按数据库原生类型名转换, 保持列顺序
pub fn pg_row_to_json(row: &PgRow) -> Row {
    let mut map = Row::new();

    for col in row.columns() {
        let idx = col.ordinal();
        let type_name = col.type_info().name();

        let val = match type_name {
            "INT2" => json!(row.try_get::<Option<i16>, _>(idx).unwrap_or(None)),
            "INT4" => json!(row.try_get::<Option<i32>, _>(idx).unwrap_or(None)),
            "INT8" => json!(row.try_get::<Option<i64>, _>(idx).unwrap_or(None)),
            "FLOAT4" => json!(row.try_get::<Option<f32>, _>(idx).unwrap_or(None)),
            "FLOAT8" => json!(row.try_get::<Option<f64>, _>(idx).unwrap_or(None)),
            "NUMERIC" => {
                // 金额保持精度, 转为字符串
                let v: Option<rust_decimal::Decimal> = row.try_get(idx).unwrap_or(None);
                json!(v.map(|d| d.to_string()))
            }
            "BOOL" => json!(row.try_get::<Option<bool>, _>(idx).unwrap_or(None)),
            "DATE" => json!(row
                .try_get::<Option<NaiveDate>, _>(idx)
                .unwrap_or(None)
                .map(|d| d.to_string())),
            "TIME" => json!(row
                .try_get::<Option<NaiveTime>, _>(idx)
                .unwrap_or(None)
                .map(|t| t.to_string())),
            "TIMESTAMP" => json!(row
                .try_get::<Option<NaiveDateTime>, _>(idx)
                .unwrap_or(None)
                .map(|dt| dt.to_string())),
            "TIMESTAMPTZ" => json!(row
                .try_get::<Option<DateTime<Utc>>, _>(idx)
                .unwrap_or(None)
                .map(|dt| dt.to_rfc3339())),
            "JSON" | "JSONB" => row
                .try_get::<Option<Value>, _>(idx)
                .unwrap_or(None)
                .unwrap_or(Value::Null),
            // TEXT / VARCHAR / BPCHAR / NAME 以及未知类型
            _ => json!(row.try_get::<Option<String>, _>(idx).unwrap_or(None)),
        };
        map.insert(col.name().to_string(), val);
    }

    map
}

pub fn mysql_row_to_json(row: &MySqlRow) -> Row {
    let mut map = Row::new();

    for col in row.columns() {
        let idx = col.ordinal();
        let type_name = col.type_info().name(); // 如 "INT", "DECIMAL", "VARCHAR", "DATE"

        let val = match type_name {
            "BOOLEAN" => json!(row.try_get::<Option<bool>, _>(idx).unwrap_or(None)),
            "TINYINT" => json!(row.try_get::<Option<i8>, _>(idx).unwrap_or(None)),
            "SMALLINT" => json!(row.try_get::<Option<i16>, _>(idx).unwrap_or(None)),
            "INT" | "MEDIUMINT" => json!(row.try_get::<Option<i32>, _>(idx).unwrap_or(None)),
            "BIGINT" => json!(row.try_get::<Option<i64>, _>(idx).unwrap_or(None)),
            "TINYINT UNSIGNED" => json!(row.try_get::<Option<u8>, _>(idx).unwrap_or(None)),
            "SMALLINT UNSIGNED" => json!(row.try_get::<Option<u16>, _>(idx).unwrap_or(None)),
            "INT UNSIGNED" | "MEDIUMINT UNSIGNED" => {
                json!(row.try_get::<Option<u32>, _>(idx).unwrap_or(None))
            }
            "BIGINT UNSIGNED" => json!(row.try_get::<Option<u64>, _>(idx).unwrap_or(None)),
            "FLOAT" => json!(row.try_get::<Option<f32>, _>(idx).unwrap_or(None)),
            "DOUBLE" => json!(row.try_get::<Option<f64>, _>(idx).unwrap_or(None)),
            "DECIMAL" => {
                let v: Option<rust_decimal::Decimal> = row.try_get(idx).unwrap_or(None);
                json!(v.map(|d| d.to_string()))
            }
            "DATE" => json!(row
                .try_get::<Option<NaiveDate>, _>(idx)
                .unwrap_or(None)
                .map(|d| d.to_string())),
            "TIME" => json!(row
                .try_get::<Option<NaiveTime>, _>(idx)
                .unwrap_or(None)
                .map(|t| t.to_string())),
            "DATETIME" => json!(row
                .try_get::<Option<NaiveDateTime>, _>(idx)
                .unwrap_or(None)
                .map(|dt| dt.to_string())),
            "TIMESTAMP" => json!(row
                .try_get::<Option<DateTime<Utc>>, _>(idx)
                .unwrap_or(None)
                .map(|dt| dt.to_rfc3339())),
            "JSON" => row
                .try_get::<Option<Value>, _>(idx)
                .unwrap_or(None)
                .unwrap_or(Value::Null),
            _ => {
                // CHAR / VARCHAR / TEXT 等; 二进制排序规则的文本列按 UTF-8 宽松解码
                match row.try_get::<Option<String>, _>(idx) {
                    Ok(v) => json!(v),
                    Err(_) => json!(row
                        .try_get::<Option<Vec<u8>>, _>(idx)
                        .unwrap_or(None)
                        .map(|b| String::from_utf8_lossy(&b).into_owned())),
                }
            }
        };

        map.insert(col.name().to_string(), val);
    }

    map
}
