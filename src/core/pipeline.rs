use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::core::classifier::BackendClassifier;
use crate::core::executor::{execute_document_query, execute_sql, DocumentOptions};
use crate::core::summarizer::{extract_map_points, summarize};
use crate::core::synth::{synthesize_document_query, synthesize_sql};
use crate::infra::db_document::DocumentStore;
use crate::infra::db_relational::RelationalStore;
use crate::infra::llm::TextGenerator;
use crate::models::context::{ChatAnswer, ChatRequest};
use crate::models::query::{BackendChoice, DocumentQuery, ResultSet};

pub const AMBIGUOUS_NOTICE: &str = "Your question refers to both data sources. Please split it.";
pub const UNKNOWN_NOTICE: &str = "Couldn't detect backend. Please rephrase.";
pub const NO_DATA_NOTICE: &str = "No data returned.";

/// 外部协作者, 进程启动时构建一次
pub struct Collaborators {
    pub llm: Arc<dyn TextGenerator>,
    pub sql_llm: Arc<dyn TextGenerator>,
    pub relational: Arc<dyn RelationalStore>,
    pub documents: Arc<dyn DocumentStore>,
}

/// 分类 -> 合成 -> 执行 -> 总结. 不持有可变状态, 失败都写进 [`ChatAnswer`].
pub struct QueryRouter {
    classifier: BackendClassifier,
    collaborators: Collaborators,
    primary_collection: String,
    sample_hints: String,
    summary_row_limit: usize,
}

impl QueryRouter {
    pub fn new(
        classifier: BackendClassifier,
        collaborators: Collaborators,
        primary_collection: impl Into<String>,
        sample_hints: impl Into<String>,
        summary_row_limit: usize,
    ) -> Self {
        Self {
            classifier,
            collaborators,
            primary_collection: primary_collection.into(),
            sample_hints: sample_hints.into(),
            summary_row_limit,
        }
    }

    #[instrument(skip_all, fields(request_id = %request_id, question = %request.question))]
    pub async fn answer_with_id(&self, request_id: Uuid, request: &ChatRequest) -> ChatAnswer {
        let question = request.question.trim();
        let backend = self
            .classifier
            .classify(self.collaborators.llm.as_ref(), question, request.mode)
            .await;
        info!("识别后端: {:?}", backend);

        let mut answer = ChatAnswer::new(request_id, question, backend);
        let lookup = match backend {
            BackendChoice::Relational => self.run_relational(question, &mut answer).await,
            BackendChoice::Document => self.run_document(question, request.show_details, &mut answer).await,
            BackendChoice::Ambiguous => {
                answer.notices.push(AMBIGUOUS_NOTICE.to_string());
                return answer;
            }
            BackendChoice::Unknown => {
                answer.notices.push(UNKNOWN_NOTICE.to_string());
                return answer;
            }
        };

        let Some(result) = answer.result.as_ref() else {
            return answer;
        };
        match result {
            ResultSet::Rows { rows } if rows.is_empty() => {
                answer.notices.push(NO_DATA_NOTICE.to_string());
                return answer;
            }
            ResultSet::Rows { rows } => answer.map_points = extract_map_points(rows),
            ResultSet::Mutation(outcome) => answer.notices.push(outcome.message.clone()),
            ResultSet::Error { message } => {
                answer.notices.push(message.clone());
                return answer;
            }
        }

        match summarize(
            self.collaborators.llm.as_ref(),
            question,
            result,
            lookup,
            self.summary_row_limit,
        )
        .await
        {
            Ok(summary) => answer.summary = summary,
            Err(e) => {
                warn!("结果总结失败: {}", e);
                answer.notices.push(format!("Summary unavailable: {}", e));
            }
        }
        answer
    }

    pub async fn answer(&self, request: &ChatRequest) -> ChatAnswer {
        self.answer_with_id(Uuid::new_v4(), request).await
    }

    async fn run_relational(&self, question: &str, answer: &mut ChatAnswer) -> bool {
        match synthesize_sql(self.collaborators.sql_llm.as_ref(), question).await {
            Ok(sql) => {
                let result = execute_sql(self.collaborators.relational.as_ref(), &sql).await;
                answer.query_text = Some(sql);
                answer.result = Some(result);
            }
            Err(e) => {
                warn!("SQL 合成失败: {}", e);
                answer.result = Some(ResultSet::error(format!("Failed to generate SQL: {}", e)));
            }
        }
        false
    }

    async fn run_document(&self, question: &str, show_details: bool, answer: &mut ChatAnswer) -> bool {
        let query =
            synthesize_document_query(self.collaborators.llm.as_ref(), question, &self.sample_hints).await;
        let lookup = query.has_lookup();
        answer.query_text = match &query {
            DocumentQuery::Invalid { raw, .. } if raw.is_empty() => None,
            DocumentQuery::Invalid { raw, .. } => Some(raw.clone()),
            DocumentQuery::Pipeline { stages } => serde_json::to_string_pretty(stages).ok(),
            DocumentQuery::Mutation(m) => serde_json::to_string_pretty(m).ok(),
        };
        let options = DocumentOptions::for_question(&self.primary_collection, question, show_details);
        let result = execute_document_query(self.collaborators.documents.as_ref(), query, &options).await;
        answer.result = Some(result);
        lookup
    }
}
