//! 单元测试用的替身实现.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Mutex;

use crate::infra::db_document::DocumentStore;
use crate::infra::db_relational::RelationalStore;
use crate::infra::llm::{LlmError, Prompt, TextGenerator};
use crate::models::query::Row;

/// 按顺序返回预设回答; 回答耗尽后返回错误
pub struct FakeGenerator {
    replies: Mutex<VecDeque<String>>,
    prompts: Mutex<Vec<Prompt>>,
}

impl FakeGenerator {
    pub fn new(replies: Vec<&str>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().map(String::from).collect()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self::new(Vec::new())
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    pub fn prompts(&self) -> Vec<Prompt> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextGenerator for FakeGenerator {
    async fn generate(&self, prompt: &Prompt) -> Result<String, LlmError> {
        self.prompts.lock().unwrap().push(prompt.clone());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| LlmError::Status {
                status: 503,
                body: "no scripted reply".into(),
            })
    }

    fn model_name(&self) -> &str {
        "fake"
    }
}

pub fn row(value: Value) -> Row {
    match value {
        Value::Object(map) => map,
        other => panic!("expected object, got {other}"),
    }
}

#[derive(Default)]
pub struct FakeRelational {
    pub rows: Vec<Row>,
    pub fail_with: Option<String>,
    pub affected: u64,
    pub reads: Mutex<Vec<String>>,
    pub writes: Mutex<Vec<String>>,
}

#[async_trait]
impl RelationalStore for FakeRelational {
    async fn read(&self, sql: &str) -> anyhow::Result<Vec<Row>> {
        self.reads.lock().unwrap().push(sql.to_string());
        match &self.fail_with {
            Some(msg) => anyhow::bail!("{}", msg),
            None => Ok(self.rows.clone()),
        }
    }

    async fn write(&self, sql: &str) -> anyhow::Result<u64> {
        self.writes.lock().unwrap().push(sql.to_string());
        match &self.fail_with {
            Some(msg) => anyhow::bail!("{}", msg),
            None => Ok(self.affected),
        }
    }
}

/// 记录每次调用的 (操作, 集合, 参数)
#[derive(Default)]
pub struct FakeDocuments {
    pub rows: Vec<Row>,
    pub fail_with: Option<String>,
    pub calls: Mutex<Vec<(String, String, Value)>>,
}

impl FakeDocuments {
    pub fn calls(&self) -> Vec<(String, String, Value)> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, op: &str, collection: &str, payload: Value) -> anyhow::Result<()> {
        self.calls
            .lock()
            .unwrap()
            .push((op.to_string(), collection.to_string(), payload));
        match &self.fail_with {
            Some(msg) => anyhow::bail!("{}", msg),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl DocumentStore for FakeDocuments {
    async fn aggregate(&self, collection: &str, pipeline: Vec<Value>) -> anyhow::Result<Vec<Row>> {
        self.record("aggregate", collection, Value::Array(pipeline))?;
        Ok(self.rows.clone())
    }

    async fn insert_one(&self, collection: &str, document: Value) -> anyhow::Result<String> {
        self.record("insert_one", collection, document)?;
        Ok("665f1c2a9b1e8a0012345678".to_string())
    }

    async fn update_one(&self, collection: &str, filter: Value, update: Value) -> anyhow::Result<u64> {
        self.record("update_one", collection, serde_json::json!([filter, update]))?;
        Ok(1)
    }

    async fn delete_one(&self, collection: &str, filter: Value) -> anyhow::Result<u64> {
        self.record("delete_one", collection, filter)?;
        Ok(1)
    }
}
