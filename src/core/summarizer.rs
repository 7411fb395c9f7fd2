use serde_json::Value;
use tracing::debug;

use crate::core::prompts;
use crate::infra::llm::{LlmError, Prompt, TextGenerator};
use crate::models::context::MapPoint;
use crate::models::query::{MutationOutcome, ResultSet, Row};

pub const ID_FIELD: &str = "_id";

/// 每行拼成 `key: value, ...`, 跳过标识字段, 行之间换行
pub fn flatten_rows(rows: &[Row], id_field: &str) -> String {
    rows.iter()
        .map(|row| {
            row.iter()
                .filter(|(k, _)| k.as_str() != id_field)
                .map(|(k, v)| format!("{}: {}", k, render_value(v)))
                .collect::<Vec<_>>()
                .join(", ")
        })
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn flatten_outcome(outcome: &MutationOutcome) -> String {
    let mut line = format!(
        "operation: {}, status: {:?}, affected: {}",
        outcome.operation, outcome.status, outcome.affected_count
    );
    if let Some(id) = &outcome.inserted_id {
        line.push_str(&format!(", inserted_id: {}", id));
    }
    line.push_str(&format!(", message: {}", outcome.message));
    line
}

/// 发送给模型的结果文本; 行数超过 `row_limit` 的部分不发送
pub fn flatten_result(result: &ResultSet, row_limit: usize) -> String {
    match result {
        ResultSet::Rows { rows } => flatten_rows(&rows[..rows.len().min(row_limit)], ID_FIELD),
        ResultSet::Mutation(outcome) => flatten_outcome(outcome),
        ResultSet::Error { .. } => String::new(),
    }
}

/// 结果为空时不调用模型, 返回 `None`
pub async fn summarize(
    generator: &dyn TextGenerator,
    question: &str,
    result: &ResultSet,
    lookup: bool,
    row_limit: usize,
) -> Result<Option<String>, LlmError> {
    let flattened = flatten_result(result, row_limit);
    if flattened.trim().is_empty() {
        debug!("结果为空, 跳过总结");
        return Ok(None);
    }
    let prompt = Prompt::user(prompts::summary_prompt(question, &flattened, lookup));
    let text = generator.generate(&prompt).await?;
    Ok(Some(text.trim().to_string()).filter(|s| !s.is_empty()))
}

/// 提取可在地图上展示的坐标, 无法转成浮点数的行被跳过
pub fn extract_map_points(rows: &[Row]) -> Vec<MapPoint> {
    rows.iter()
        .filter_map(|row| {
            let lat = as_f64(row.get("latitude")?)?;
            let lon = as_f64(row.get("longitude")?)?;
            Some(MapPoint { lat, lon })
        })
        .collect()
}

fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
