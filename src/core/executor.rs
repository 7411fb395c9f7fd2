//! 查询执行: 把合成结果交给对应的数据源, 所有失败都转成 [`ResultSet`] 数据.

use regex::Regex;
use serde_json::{json, Value};
use std::sync::LazyLock;
use tracing::{info, warn};

use crate::infra::db_document::DocumentStore;
use crate::infra::db_relational::RelationalStore;
use crate::models::query::{DocumentQuery, MutationOp, MutationOutcome, MutationRequest, ResultSet};

/// 文档库中允许作为写入目标的集合
pub const KNOWN_COLLECTIONS: &[&str] = &["listing", "review", "host"];

static IMAGE_TERMS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(image|photo|picture|pic)s?\b").unwrap());

// ============ SQL ============

/// 纯文本判断, 不解析语句: `SELECT ... INTO` 也会被当作读
pub fn is_read_statement(sql: &str) -> bool {
    sql.trim().to_lowercase().starts_with("select")
}

pub async fn execute_sql(store: &dyn RelationalStore, sql: &str) -> ResultSet {
    if is_read_statement(sql) {
        execute_read(store, sql).await
    } else {
        execute_write(store, sql).await
    }
}

pub async fn execute_read(store: &dyn RelationalStore, sql: &str) -> ResultSet {
    match store.read(sql).await {
        Ok(rows) => {
            info!("SQL 查询返回 {} 行", rows.len());
            ResultSet::rows(rows)
        }
        Err(e) => {
            warn!("SQL 查询失败: {:#}", e);
            ResultSet::error(format!("Error: {:#}", e))
        }
    }
}

pub async fn execute_write(store: &dyn RelationalStore, sql: &str) -> ResultSet {
    let operation = leading_keyword(sql);
    match store.write(sql).await {
        Ok(affected) => {
            info!("SQL 写入成功: {} 影响 {} 行", operation, affected);
            ResultSet::Mutation(MutationOutcome::applied(
                operation,
                affected,
                "Query executed successfully.",
            ))
        }
        Err(e) => {
            warn!("SQL 写入失败: {:#}", e);
            ResultSet::Mutation(MutationOutcome::failed(
                operation,
                format!("Error executing query: {:#}", e),
            ))
        }
    }
}

fn leading_keyword(sql: &str) -> String {
    sql.split_whitespace()
        .next()
        .map(|w| w.trim_end_matches(';').to_uppercase())
        .unwrap_or_default()
}

// ============ 文档库 ============

#[derive(Debug, Clone)]
pub struct DocumentOptions {
    pub primary_collection: String,
    /// 为 true 时向 `$project` 阶段补充 `picture_url`
    pub include_pictures: bool,
}

impl DocumentOptions {
    pub fn new(primary_collection: impl Into<String>) -> Self {
        Self {
            primary_collection: primary_collection.into(),
            include_pictures: false,
        }
    }

    /// 仅在需要详细结果且问题提到图片时补充图片字段
    pub fn for_question(primary_collection: impl Into<String>, question: &str, show_details: bool) -> Self {
        Self {
            primary_collection: primary_collection.into(),
            include_pictures: show_details && mentions_images(question),
        }
    }
}

pub fn mentions_images(question: &str) -> bool {
    IMAGE_TERMS.is_match(question)
}

pub async fn execute_document_query(
    store: &dyn DocumentStore,
    query: DocumentQuery,
    options: &DocumentOptions,
) -> ResultSet {
    match query {
        DocumentQuery::Invalid { raw, reason } => {
            // 不触达数据库, 原文带回用于诊断
            ResultSet::error(format!("Unrecognized query format ({}). Raw response: {}", reason, raw))
        }
        DocumentQuery::Pipeline { mut stages } => {
            if options.include_pictures {
                inject_picture_url(&mut stages);
            }
            match store.aggregate(&options.primary_collection, stages).await {
                Ok(rows) => {
                    info!("聚合返回 {} 个文档", rows.len());
                    ResultSet::rows(rows)
                }
                Err(e) => {
                    warn!("聚合失败: {:#}", e);
                    ResultSet::error(format!("Failed to process query: {:#}", e))
                }
            }
        }
        DocumentQuery::Mutation(request) => execute_mutation(store, request, options).await,
    }
}

async fn execute_mutation(
    store: &dyn DocumentStore,
    request: MutationRequest,
    options: &DocumentOptions,
) -> ResultSet {
    let op = request.operation;
    let collection = match resolve_collection(request.collection.as_deref(), options) {
        Ok(c) => c,
        Err(message) => return ResultSet::error(message),
    };

    let result = match op {
        MutationOp::InsertOne => match request.document {
            Some(doc) => store.insert_one(&collection, doc).await.map(|id| {
                let mut outcome = MutationOutcome::applied(op.as_str(), 1, format!("Inserted: {}", id));
                outcome.inserted_id = Some(id);
                outcome
            }),
            None => return missing_field(op, "document"),
        },
        MutationOp::UpdateOne => match (request.filter, request.update) {
            (Some(filter), Some(update)) => store
                .update_one(&collection, filter, update)
                .await
                .map(|n| MutationOutcome::applied(op.as_str(), n, format!("Updated: {} document(s)", n))),
            (None, _) => return missing_field(op, "filter"),
            (_, None) => return missing_field(op, "update"),
        },
        MutationOp::DeleteOne => match request.filter {
            Some(filter) => store
                .delete_one(&collection, filter)
                .await
                .map(|n| MutationOutcome::applied(op.as_str(), n, format!("Deleted: {} document(s)", n))),
            None => return missing_field(op, "filter"),
        },
        MutationOp::InsertMany | MutationOp::UpdateMany | MutationOp::DeleteMany => {
            warn!("不支持的写操作: {}", op.as_str());
            return ResultSet::Mutation(MutationOutcome::unsupported(
                op.as_str(),
                format!("Operation {} is not supported", op.as_str()),
            ));
        }
    };

    match result {
        Ok(outcome) => {
            info!("集合 {} 执行 {} 完成, 影响 {} 个文档", collection, op.as_str(), outcome.affected_count);
            ResultSet::Mutation(outcome)
        }
        Err(e) => {
            warn!("写操作 {} 失败: {:#}", op.as_str(), e);
            ResultSet::error(format!("Failed to process query: {:#}", e))
        }
    }
}

fn resolve_collection(requested: Option<&str>, options: &DocumentOptions) -> Result<String, String> {
    match requested.map(str::trim) {
        None | Some("") => Ok(options.primary_collection.clone()),
        Some(name) if name == options.primary_collection || KNOWN_COLLECTIONS.contains(&name) => {
            Ok(name.to_string())
        }
        Some(name) => Err(format!("Unknown collection: {}", name)),
    }
}

fn missing_field(op: MutationOp, field: &str) -> ResultSet {
    ResultSet::error(format!("Failed to process query: {} requires \"{}\"", op.as_str(), field))
}

/// 只修改包含式投影; 排除式投影混入包含字段会被数据库拒绝
fn inject_picture_url(stages: &mut [Value]) {
    for stage in stages.iter_mut() {
        let Some(project) = stage.get_mut("$project").and_then(Value::as_object_mut) else {
            continue;
        };
        let exclusion = project
            .iter()
            .any(|(k, v)| k != "_id" && (v == &json!(0) || v == &json!(false)));
        if !exclusion {
            project.insert("picture_url".to_string(), json!(1));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::synth::parse_document_query;
    use crate::models::query::MutationStatus;
    use crate::testing::{row, FakeDocuments, FakeRelational};

    #[test]
    fn test_read_dispatch_is_textual() {
        assert!(is_read_statement("   Select * from x"));
        assert!(is_read_statement("SELECT a INTO b FROM c"));
        assert!(!is_read_statement("delete from x"));
        assert!(!is_read_statement("  WITH t AS (SELECT 1) SELECT * FROM t"));
    }

    #[tokio::test]
    async fn test_execute_sql_read() {
        let store = FakeRelational {
            rows: vec![row(json!({"item_name": "Salad", "price_usd": 8.5}))],
            ..Default::default()
        };
        let result = execute_sql(&store, "   Select * from menu").await;
        assert_eq!(result.as_rows().unwrap().len(), 1);
        assert_eq!(store.reads.lock().unwrap().len(), 1);
        assert!(store.writes.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_execute_sql_read_failure_is_error() {
        let store = FakeRelational {
            fail_with: Some("Table 'chatbot.menus' doesn't exist".into()),
            ..Default::default()
        };
        match execute_sql(&store, "SELECT * FROM menus").await {
            ResultSet::Error { message } => assert!(message.contains("doesn't exist")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_execute_sql_write() {
        let store = FakeRelational {
            affected: 2,
            ..Default::default()
        };
        match execute_sql(&store, "delete from reviews where rating < 2").await {
            ResultSet::Mutation(outcome) => {
                assert_eq!(outcome.operation, "DELETE");
                assert_eq!(outcome.status, MutationStatus::Applied);
                assert_eq!(outcome.affected_count, 2);
                assert_eq!(outcome.message, "Query executed successfully.");
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(store.writes.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_execute_sql_write_failure_is_reported() {
        let store = FakeRelational {
            fail_with: Some("syntax error".into()),
            ..Default::default()
        };
        match execute_sql(&store, "UPDTE restaurant SET x = 1").await {
            ResultSet::Mutation(outcome) => {
                assert_eq!(outcome.status, MutationStatus::Failed);
                assert!(outcome.message.starts_with("Error executing query:"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_insert_many_is_unsupported_and_store_untouched() {
        let store = FakeDocuments::default();
        let query = parse_document_query(r#"{"operation": "insertMany", "documents": [{"a": 1}]}"#);
        assert!(matches!(query, DocumentQuery::Mutation(_)));
        match execute_document_query(&store, query, &DocumentOptions::new("listing")).await {
            ResultSet::Mutation(outcome) => {
                assert_eq!(outcome.status, MutationStatus::Unsupported);
                assert_eq!(outcome.operation, "insertMany");
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(store.calls().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_query_never_reaches_store() {
        let store = FakeDocuments::default();
        let query = parse_document_query("Sorry, I can only help with housing data.");
        match execute_document_query(&store, query, &DocumentOptions::new("listing")).await {
            ResultSet::Error { message } => {
                assert!(message.contains("Sorry, I can only help with housing data."))
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(store.calls().is_empty());
    }

    #[tokio::test]
    async fn test_pipeline_runs_against_primary_collection() {
        let store = FakeDocuments {
            rows: vec![row(json!({"title": "Loft"}))],
            ..Default::default()
        };
        let query = parse_document_query(
            r#"[{"$lookup": {"from": "host", "localField": "host_id", "foreignField": "host_id", "as": "h"}}]"#,
        );
        let result = execute_document_query(&store, query, &DocumentOptions::new("listing")).await;
        assert_eq!(result.as_rows().unwrap().len(), 1);
        let calls = store.calls();
        assert_eq!(calls[0].0, "aggregate");
        assert_eq!(calls[0].1, "listing");
    }

    #[tokio::test]
    async fn test_picture_url_injected_only_when_requested() {
        let store = FakeDocuments::default();
        let stages = r#"[{"$match": {}}, {"$project": {"title": 1}}, {"$project": {"body": 0}}]"#;

        let opts = DocumentOptions::for_question("listing", "show photos of lofts", true);
        execute_document_query(&store, parse_document_query(stages), &opts).await;
        let opts = DocumentOptions::for_question("listing", "show photos of lofts", false);
        execute_document_query(&store, parse_document_query(stages), &opts).await;

        let calls = store.calls();
        assert_eq!(calls[0].2[1], json!({"$project": {"title": 1, "picture_url": 1}}));
        assert_eq!(calls[0].2[2], json!({"$project": {"body": 0}}));
        assert_eq!(calls[1].2[1], json!({"$project": {"title": 1}}));
    }

    #[tokio::test]
    async fn test_mutations_dispatch_and_route_collection() {
        let store = FakeDocuments::default();
        let opts = DocumentOptions::new("listing");

        let insert = parse_document_query(r#"{"operation": "insertOne", "document": {"title": "New"}}"#);
        match execute_document_query(&store, insert, &opts).await {
            ResultSet::Mutation(o) => {
                assert_eq!(o.status, MutationStatus::Applied);
                assert_eq!(o.inserted_id.as_deref(), Some("665f1c2a9b1e8a0012345678"));
                assert!(o.message.starts_with("Inserted:"));
            }
            other => panic!("unexpected {:?}", other),
        }

        let update = parse_document_query(
            r#"{"operation": "updateOne", "collection": "host", "filter": {"host_id": 7}, "update": {"$set": {"host_name": "Ann"}}}"#,
        );
        execute_document_query(&store, update, &opts).await;

        let delete = parse_document_query(r#"{"operation": "deleteOne", "filter": {"cityname": "Washington"}}"#);
        execute_document_query(&store, delete, &opts).await;

        let calls = store.calls();
        assert_eq!((calls[0].0.as_str(), calls[0].1.as_str()), ("insert_one", "listing"));
        assert_eq!((calls[1].0.as_str(), calls[1].1.as_str()), ("update_one", "host"));
        assert_eq!((calls[2].0.as_str(), calls[2].1.as_str()), ("delete_one", "listing"));
    }

    #[tokio::test]
    async fn test_missing_payload_and_unknown_collection_are_errors() {
        let store = FakeDocuments::default();
        let opts = DocumentOptions::new("listing");
        let q = parse_document_query(r#"{"operation": "deleteOne"}"#);
        assert!(matches!(execute_document_query(&store, q, &opts).await, ResultSet::Error { .. }));
        let q = parse_document_query(r#"{"operation": "deleteOne", "collection": "users", "filter": {}}"#);
        match execute_document_query(&store, q, &opts).await {
            ResultSet::Error { message } => assert!(message.contains("Unknown collection: users")),
            other => panic!("unexpected {:?}", other),
        }
        assert!(store.calls().is_empty());
    }

    #[tokio::test]
    async fn test_driver_error_is_converted() {
        let store = FakeDocuments {
            fail_with: Some("connection refused".into()),
            ..Default::default()
        };
        let q = parse_document_query(r#"[{"$match": {}}]"#);
        match execute_document_query(&store, q, &DocumentOptions::new("listing")).await {
            ResultSet::Error { message } => assert!(message.contains("connection refused")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_mentions_images() {
        assert!(mentions_images("Show me PICTURES of apartments"));
        assert!(mentions_images("any photo?"));
        assert!(!mentions_images("pictorial history"));
        assert!(!mentions_images("cheap listings"));
    }
}
