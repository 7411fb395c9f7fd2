//! 自然语言到查询语句的合成.
//!
//! 模型输出是信任边界: SQL 原样交给执行器, 文档查询只做形状识别,
//! 不做语义校验.

use serde_json::Value;
use std::path::Path;
use tracing::{debug, warn};

use crate::core::prompts;
use crate::infra::llm::{LlmError, Prompt, TextGenerator};
use crate::models::query::{DocumentQuery, MutationRequest};

pub const SAMPLES_UNAVAILABLE: &str = "Sample questions unavailable";

pub async fn synthesize_sql(generator: &dyn TextGenerator, question: &str) -> Result<String, LlmError> {
    let prompt = Prompt::with_system(prompts::SQL_SYSTEM_PROMPT, question);
    let sql = generator.generate(&prompt).await?.trim().to_string();
    debug!("生成 SQL: {}", sql);
    Ok(sql)
}

pub async fn synthesize_document_query(
    generator: &dyn TextGenerator,
    question: &str,
    sample_hints: &str,
) -> DocumentQuery {
    let prompt = Prompt::user(prompts::document_prompt(question, sample_hints));
    match generator.generate(&prompt).await {
        Ok(text) => {
            debug!("生成文档查询: {}", text.trim());
            parse_document_query(&text)
        }
        Err(e) => {
            warn!("文档查询合成失败: {}", e);
            DocumentQuery::Invalid {
                raw: String::new(),
                reason: e.to_string(),
            }
        }
    }
}

/// 识别模型输出的形状: 数组为聚合管道, 带 `operation` 的对象为写操作
pub fn parse_document_query(text: &str) -> DocumentQuery {
    let raw = text.trim();
    let invalid = |reason: String| DocumentQuery::Invalid {
        raw: raw.to_string(),
        reason,
    };

    let body = strip_markdown(raw);
    let value = match first_json_value(body) {
        Ok(v) => v,
        Err(reason) => return invalid(reason),
    };

    let is_mutation = value.as_object().is_some_and(|m| m.contains_key("operation"));
    match value {
        Value::Array(stages) => DocumentQuery::Pipeline { stages },
        value if is_mutation => match serde_json::from_value::<MutationRequest>(value) {
            Ok(m) => DocumentQuery::Mutation(m),
            Err(e) => invalid(format!("unrecognized mutation: {}", e)),
        },
        _ => invalid("expected a pipeline array or an object with an \"operation\" field".to_string()),
    }
}

/// 依次尝试每个 `{` / `[` 位置, 取第一个能解析出的 JSON 值, 忽略其后的说明文字
fn first_json_value(body: &str) -> Result<Value, String> {
    let mut last_error = None;
    for (start, _) in body.match_indices(['{', '[']) {
        let mut stream = serde_json::Deserializer::from_str(&body[start..]).into_iter::<Value>();
        match stream.next() {
            Some(Ok(value)) => return Ok(value),
            Some(Err(e)) => last_error = Some(format!("invalid JSON: {}", e)),
            None => {}
        }
    }
    Err(last_error.unwrap_or_else(|| "no JSON object or array found".to_string()))
}

/// 去掉 ```json ... ``` 之类的代码块包裹
fn strip_markdown(text: &str) -> &str {
    let text = text.trim();
    if let Some(rest) = text.strip_prefix("```") {
        let start = rest.find('\n').map(|i| i + 1).unwrap_or(rest.len());
        let inner = &rest[start..];
        let end = inner.rfind("```").unwrap_or(inner.len());
        return inner[..end].trim();
    }
    text
}

/// 读取示例问答; 文件不可读时退回占位文本
pub fn load_sample_hints(path: &Path) -> String {
    match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) => {
            warn!("示例文件 {} 不可读: {}", path.display(), e);
            SAMPLES_UNAVAILABLE.to_string()
        }
    }
}
