use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// 一行关系型结果或一个文档, 字段顺序与数据源一致
pub type Row = Map<String, Value>;

/// 用户在界面上显式指定的查询模式
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ModeOverride {
    #[serde(alias = "sql", alias = "restaurant")]
    Relational,
    #[serde(alias = "mongo", alias = "mongodb", alias = "housing")]
    Document,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BackendChoice {
    Relational,
    Document,
    Ambiguous,
    Unknown,
}

impl From<ModeOverride> for BackendChoice {
    fn from(mode: ModeOverride) -> Self {
        match mode {
            ModeOverride::Relational => BackendChoice::Relational,
            ModeOverride::Document => BackendChoice::Document,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum MutationOp {
    #[serde(rename = "insertOne")]
    InsertOne,
    #[serde(rename = "insertMany")]
    InsertMany,
    #[serde(rename = "updateOne")]
    UpdateOne,
    #[serde(rename = "updateMany")]
    UpdateMany,
    #[serde(rename = "deleteOne")]
    DeleteOne,
    #[serde(rename = "deleteMany")]
    DeleteMany,
}

impl MutationOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            MutationOp::InsertOne => "insertOne",
            MutationOp::InsertMany => "insertMany",
            MutationOp::UpdateOne => "updateOne",
            MutationOp::UpdateMany => "updateMany",
            MutationOp::DeleteOne => "deleteOne",
            MutationOp::DeleteMany => "deleteMany",
        }
    }
}

/// 单条增删改描述, 由文档查询合成器产出
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct MutationRequest {
    pub operation: MutationOp,
    /// 目标集合, 缺省时落到主集合
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub documents: Option<Vec<Value>>,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum DocumentQuery {
    Pipeline { stages: Vec<Value> },
    Mutation(MutationRequest),
    /// 无法识别的输出, 保留原文用于展示
    Invalid { raw: String, reason: String },
}

impl DocumentQuery {
    pub fn has_lookup(&self) -> bool {
        match self {
            DocumentQuery::Pipeline { stages } => stages
                .iter()
                .any(|s| s.as_object().is_some_and(|o| o.contains_key("$lookup"))),
            _ => false,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MutationStatus {
    Applied,
    /// 语法合法但未实现的操作, 属于警告而非错误
    Unsupported,
    Failed,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct MutationOutcome {
    pub operation: String,
    pub status: MutationStatus,
    pub affected_count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inserted_id: Option<String>,
    pub message: String,
}

impl MutationOutcome {
    pub fn applied(operation: impl Into<String>, affected_count: u64, message: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            status: MutationStatus::Applied,
            affected_count,
            inserted_id: None,
            message: message.into(),
        }
    }

    pub fn failed(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            status: MutationStatus::Failed,
            affected_count: 0,
            inserted_id: None,
            message: message.into(),
        }
    }

    pub fn unsupported(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            status: MutationStatus::Unsupported,
            affected_count: 0,
            inserted_id: None,
            message: message.into(),
        }
    }
}

/// 执行器的统一输出; 所有失败都以数据形式返回
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResultSet {
    Rows { rows: Vec<Row> },
    Mutation(MutationOutcome),
    Error { message: String },
}

impl ResultSet {
    pub fn rows(rows: Vec<Row>) -> Self {
        ResultSet::Rows { rows }
    }

    pub fn error(message: impl Into<String>) -> Self {
        ResultSet::Error {
            message: message.into(),
        }
    }

    pub fn as_rows(&self) -> Option<&[Row]> {
        match self {
            ResultSet::Rows { rows } => Some(rows),
            _ => None,
        }
    }
}
