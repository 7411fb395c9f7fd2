use anyhow::Context;
use async_trait::async_trait;
use futures_util::TryStreamExt;
use mongodb::bson::{Bson, Document};
use mongodb::{Client, Database};
use serde_json::Value;
use tracing::debug;

use crate::config::DocumentConfig;
use crate::models::query::Row;

/// 文档数据源; 集合名由调用方决定
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn aggregate(&self, collection: &str, pipeline: Vec<Value>) -> anyhow::Result<Vec<Row>>;

    /// 返回新文档的 `_id` 文本
    async fn insert_one(&self, collection: &str, document: Value) -> anyhow::Result<String>;

    async fn update_one(&self, collection: &str, filter: Value, update: Value) -> anyhow::Result<u64>;

    async fn delete_one(&self, collection: &str, filter: Value) -> anyhow::Result<u64>;
}

/// 进程启动时构建一次, 通过参数显式传入执行器
pub struct MongoStore {
    db: Database,
}

impl MongoStore {
    pub async fn connect(config: &DocumentConfig) -> anyhow::Result<Self> {
        let client = Client::with_uri_str(&config.uri)
            .await
            .with_context(|| "Failed to create MongoDB client")?;
        Ok(Self {
            db: client.database(&config.database),
        })
    }
}

#[async_trait]
impl DocumentStore for MongoStore {
    async fn aggregate(&self, collection: &str, pipeline: Vec<Value>) -> anyhow::Result<Vec<Row>> {
        let stages = pipeline
            .iter()
            .map(to_document)
            .collect::<anyhow::Result<Vec<Document>>>()?;
        let cursor = self
            .db
            .collection::<Document>(collection)
            .aggregate(stages)
            .await?;
        let docs: Vec<Document> = cursor.try_collect().await?;
        debug!("集合 {} 聚合返回 {} 个文档", collection, docs.len());
        Ok(docs.into_iter().map(document_to_row).collect())
    }

    async fn insert_one(&self, collection: &str, document: Value) -> anyhow::Result<String> {
        let doc = to_document(&document)?;
        let result = self.db.collection::<Document>(collection).insert_one(doc).await?;
        Ok(bson_id_to_string(&result.inserted_id))
    }

    async fn update_one(&self, collection: &str, filter: Value, update: Value) -> anyhow::Result<u64> {
        let result = self
            .db
            .collection::<Document>(collection)
            .update_one(to_document(&filter)?, to_document(&update)?)
            .await?;
        Ok(result.modified_count)
    }

    async fn delete_one(&self, collection: &str, filter: Value) -> anyhow::Result<u64> {
        let result = self
            .db
            .collection::<Document>(collection)
            .delete_one(to_document(&filter)?)
            .await?;
        Ok(result.deleted_count)
    }
}

/// JSON 对象转 BSON 文档; 支持扩展 JSON (如 `{"$oid": ...}`)
pub fn to_document(value: &Value) -> anyhow::Result<Document> {
    match Bson::try_from(value.clone()).context("Invalid extended JSON")? {
        Bson::Document(doc) => Ok(doc),
        other => anyhow::bail!("Expected a JSON object, got {}", other),
    }
}

/// 文档转结果行, ObjectId 形式的 `_id` 转为十六进制字符串
pub fn document_to_row(mut doc: Document) -> Row {
    if let Ok(oid) = doc.get_object_id("_id") {
        doc.insert("_id", oid.to_hex());
    }
    match Bson::Document(doc).into_relaxed_extjson() {
        Value::Object(map) => map,
        _ => Row::new(),
    }
}

fn bson_id_to_string(id: &Bson) -> String {
    match id {
        Bson::ObjectId(oid) => oid.to_hex(),
        Bson::String(s) => s.clone(),
        other => other.to_string(),
    }
}
