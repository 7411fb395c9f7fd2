use tracing::{debug, info, warn};

use crate::config::ClassifierConfig;
use crate::core::prompts;
use crate::infra::llm::{Prompt, TextGenerator};
use crate::models::query::{BackendChoice, ModeOverride};

/// 关键词匹配结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeywordMatch {
    Relational,
    Document,
    Both,
    Neither,
}

pub struct BackendClassifier {
    config: ClassifierConfig,
}

impl BackendClassifier {
    pub fn new(config: ClassifierConfig) -> Self {
        Self { config }
    }

    /// 子串匹配: "restaurants" 命中 "restaurant", "reviews" 同时命中 "review"
    pub fn match_keywords(&self, question: &str) -> KeywordMatch {
        let lowered = question.to_lowercase();
        let hit = |words: &[String]| words.iter().any(|w| lowered.contains(w.as_str()));
        match (
            hit(&self.config.relational_keywords),
            hit(&self.config.document_keywords),
        ) {
            (true, false) => KeywordMatch::Relational,
            (false, true) => KeywordMatch::Document,
            (true, true) => KeywordMatch::Both,
            (false, false) => KeywordMatch::Neither,
        }
    }

    /// 显式模式优先; 其次关键词; 无法判定时至多调用一次模型. 不返回错误.
    pub async fn classify(
        &self,
        generator: &dyn TextGenerator,
        question: &str,
        mode: Option<ModeOverride>,
    ) -> BackendChoice {
        if let Some(mode) = mode {
            debug!("使用用户指定模式: {:?}", mode);
            return mode.into();
        }

        let matched = self.match_keywords(question);
        debug!("关键词匹配结果: {:?}", matched);
        let prompt = match matched {
            KeywordMatch::Relational => return BackendChoice::Relational,
            KeywordMatch::Document => return BackendChoice::Document,
            KeywordMatch::Both if !self.config.model_fallback => return BackendChoice::Ambiguous,
            KeywordMatch::Neither if !self.config.model_fallback => return BackendChoice::Unknown,
            KeywordMatch::Both => prompts::both_matched_prompt(question),
            KeywordMatch::Neither => prompts::none_matched_prompt(question),
        };

        let choice = disambiguate(generator, prompt).await;
        info!("模型消歧结果: {:?}", choice);
        choice
    }
}

async fn disambiguate(generator: &dyn TextGenerator, prompt: String) -> BackendChoice {
    match generator.generate(&Prompt::user(prompt)).await {
        Ok(answer) => parse_backend_answer(&answer),
        Err(e) => {
            warn!("后端消歧调用失败: {}", e);
            BackendChoice::Unknown
        }
    }
}

pub fn parse_backend_answer(answer: &str) -> BackendChoice {
    let answer = answer.trim().to_lowercase();
    if ["mongo", "nosql", "document"].iter().any(|k| answer.contains(k)) {
        BackendChoice::Document
    } else {
        BackendChoice::Relational
    }
}
