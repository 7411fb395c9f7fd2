//! 进程级配置: 从环境变量 (可选 `.env`) 读取并校验.
//!
//! 解析通过 [`AppConfig::from_lookup`] 进行, 测试时可传入任意查找函数,
//! 不必修改进程环境.

use anyhow::{bail, Context, Result};
use std::net::SocketAddr;
use std::path::PathBuf;

/// 子串匹配下文档库的 "review" 也会命中 "reviews", 所以单独出现 "reviews"
/// 的问题总会进入模型消歧, 不会直接判为关系库
pub const DEFAULT_RELATIONAL_KEYWORDS: &[&str] =
    &["restaurant", "menu", "reviews", "vegetarian", "cuisine"];
pub const DEFAULT_DOCUMENT_KEYWORDS: &[&str] =
    &["listing", "review", "housing", "apartment", "host", "rental"];

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server_addr: SocketAddr,
    pub llm: LlmConfig,
    /// SQL 合成可单独指定模型, 未配置时与 `llm` 相同
    pub sql_llm: LlmConfig,
    pub relational: RelationalConfig,
    pub document: DocumentConfig,
    pub classifier: ClassifierConfig,
    pub summary_row_limit: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmProvider {
    OpenAi,
    Gemini,
}

impl LlmProvider {
    fn parse(raw: &str) -> Result<Self> {
        match raw.trim().to_lowercase().as_str() {
            "openai" => Ok(LlmProvider::OpenAi),
            "gemini" | "google" => Ok(LlmProvider::Gemini),
            other => bail!("Unknown LLM provider: '{}'. Must be openai or gemini.", other),
        }
    }

    fn default_model(&self) -> &'static str {
        match self {
            LlmProvider::OpenAi => "gpt-4o-mini",
            LlmProvider::Gemini => "gemini-2.0-flash",
        }
    }

    fn default_base_url(&self) -> &'static str {
        match self {
            LlmProvider::OpenAi => "https://api.openai.com/v1",
            LlmProvider::Gemini => "https://generativelanguage.googleapis.com/v1beta",
        }
    }

    fn key_var(&self) -> &'static str {
        match self {
            LlmProvider::OpenAi => "OPENAI_API_KEY",
            LlmProvider::Gemini => "GOOGLE_API_KEY",
        }
    }

    fn base_url_var(&self) -> &'static str {
        match self {
            LlmProvider::OpenAi => "OPENAI_BASE_URL",
            LlmProvider::Gemini => "GEMINI_BASE_URL",
        }
    }
}

#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub provider: LlmProvider,
    pub model: String,
    pub api_key: String,
    pub base_url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlDialect {
    MySql,
    Postgres,
}

impl SqlDialect {
    fn parse(raw: &str) -> Result<Self> {
        match raw.trim().to_lowercase().as_str() {
            "mysql" => Ok(SqlDialect::MySql),
            "postgres" | "postgresql" => Ok(SqlDialect::Postgres),
            other => bail!("Unsupported DB type: '{}'. Must be mysql or postgres.", other),
        }
    }

    pub fn default_port(&self) -> u16 {
        match self {
            SqlDialect::MySql => 3306,
            SqlDialect::Postgres => 5432,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RelationalConfig {
    pub dialect: SqlDialect,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
}

#[derive(Debug, Clone)]
pub struct DocumentConfig {
    pub uri: String,
    pub database: String,
    /// 聚合与缺省写入所针对的主集合
    pub primary_collection: String,
    pub samples_path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    pub relational_keywords: Vec<String>,
    pub document_keywords: Vec<String>,
    /// 关键词无法判定时是否调用大模型消歧
    pub model_fallback: bool,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            relational_keywords: DEFAULT_RELATIONAL_KEYWORDS.iter().map(|s| s.to_string()).collect(),
            document_keywords: DEFAULT_DOCUMENT_KEYWORDS.iter().map(|s| s.to_string()).collect(),
            model_fallback: true,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let server_addr: SocketAddr = get("SERVER_ADDR")
            .unwrap_or_else(|| "0.0.0.0:3000".to_string())
            .parse()
            .context("SERVER_ADDR must be a socket address")?;

        let timeout_secs = parse_number(get("LLM_TIMEOUT_SECS"), 60, "LLM_TIMEOUT_SECS")?;
        if timeout_secs == 0 {
            bail!("LLM_TIMEOUT_SECS must be > 0");
        }

        let provider = LlmProvider::parse(&get("LLM_PROVIDER").unwrap_or_else(|| "openai".into()))?;
        let llm = llm_config(&get, provider, get("LLM_MODEL"), timeout_secs)?;

        let sql_llm = match get("SQL_LLM_PROVIDER") {
            Some(raw) => {
                let sql_provider = LlmProvider::parse(&raw)?;
                llm_config(&get, sql_provider, get("SQL_LLM_MODEL"), timeout_secs)?
            }
            None => match get("SQL_LLM_MODEL") {
                Some(model) => LlmConfig { model, ..llm.clone() },
                None => llm.clone(),
            },
        };

        let dialect = SqlDialect::parse(&get("DB_DIALECT").unwrap_or_else(|| "mysql".into()))?;
        let port = parse_number(get("DB_PORT"), dialect.default_port() as u64, "DB_PORT")?;
        let port = u16::try_from(port).context("DB_PORT out of range")?;
        let relational = RelationalConfig {
            dialect,
            host: get("DB_HOST").unwrap_or_else(|| "localhost".into()),
            port,
            user: get("DB_USER").unwrap_or_else(|| "root".into()),
            // 空密码合法, 不走 get 的空值过滤
            password: lookup("DB_PASSWORD").unwrap_or_default(),
            database: get("DB_NAME").unwrap_or_else(|| "chatbot".into()),
        };

        let document = DocumentConfig {
            uri: get("MONGODB_URI").unwrap_or_else(|| "mongodb://localhost:27017".into()),
            database: get("MONGODB_DATABASE").unwrap_or_else(|| "house".into()),
            primary_collection: get("MONGODB_COLLECTION").unwrap_or_else(|| "listing".into()),
            samples_path: PathBuf::from(
                get("DOCUMENT_SAMPLES_PATH").unwrap_or_else(|| "sample.txt".into()),
            ),
        };

        let defaults = ClassifierConfig::default();
        let classifier = ClassifierConfig {
            relational_keywords: get("RELATIONAL_KEYWORDS")
                .map(|v| split_keywords(&v))
                .unwrap_or(defaults.relational_keywords),
            document_keywords: get("DOCUMENT_KEYWORDS")
                .map(|v| split_keywords(&v))
                .unwrap_or(defaults.document_keywords),
            model_fallback: parse_bool(get("CLASSIFIER_MODEL_FALLBACK"), true, "CLASSIFIER_MODEL_FALLBACK")?,
        };
        if classifier.relational_keywords.is_empty() || classifier.document_keywords.is_empty() {
            bail!("RELATIONAL_KEYWORDS and DOCUMENT_KEYWORDS must each contain at least one keyword");
        }

        let summary_row_limit = parse_number(get("SUMMARY_ROW_LIMIT"), 10, "SUMMARY_ROW_LIMIT")? as usize;
        if summary_row_limit == 0 {
            bail!("SUMMARY_ROW_LIMIT must be >= 1");
        }

        Ok(Self {
            server_addr,
            llm,
            sql_llm,
            relational,
            document,
            classifier,
            summary_row_limit,
        })
    }
}

fn llm_config<G>(get: &G, provider: LlmProvider, model: Option<String>, timeout_secs: u64) -> Result<LlmConfig>
where
    G: Fn(&str) -> Option<String>,
{
    let api_key = get(provider.key_var())
        .with_context(|| format!("{} environment variable not set", provider.key_var()))?;
    Ok(LlmConfig {
        provider,
        model: model.unwrap_or_else(|| provider.default_model().to_string()),
        api_key,
        base_url: get(provider.base_url_var())
            .unwrap_or_else(|| provider.default_base_url().to_string())
            .trim_end_matches('/')
            .to_string(),
        timeout_secs,
    })
}

fn split_keywords(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|k| k.trim().to_lowercase())
        .filter(|k| !k.is_empty())
        .collect()
}

fn parse_number(raw: Option<String>, default: u64, key: &str) -> Result<u64> {
    match raw {
        Some(v) => v
            .trim()
            .parse()
            .with_context(|| format!("{} must be a non-negative integer, got '{}'", key, v)),
        None => Ok(default),
    }
}

fn parse_bool(raw: Option<String>, default: bool, key: &str) -> Result<bool> {
    match raw.as_deref().map(|v| v.trim().to_lowercase()) {
        None => Ok(default),
        Some(v) => match v.as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => bail!("{} must be a boolean, got '{}'", key, v),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_with_openai_key() {
        let cfg = AppConfig::from_lookup(lookup_from(&[("OPENAI_API_KEY", "sk-test")])).unwrap();
        assert_eq!(cfg.server_addr.port(), 3000);
        assert_eq!(cfg.llm.provider, LlmProvider::OpenAi);
        assert_eq!(cfg.llm.model, "gpt-4o-mini");
        assert_eq!(cfg.sql_llm.model, cfg.llm.model);
        assert_eq!(cfg.relational.dialect, SqlDialect::MySql);
        assert_eq!(cfg.relational.port, 3306);
        assert_eq!(cfg.relational.database, "chatbot");
        assert_eq!(cfg.document.database, "house");
        assert_eq!(cfg.document.primary_collection, "listing");
        assert_eq!(cfg.summary_row_limit, 10);
        assert!(cfg.classifier.model_fallback);
        assert!(cfg.classifier.relational_keywords.contains(&"menu".to_string()));
    }

    #[test]
    fn test_missing_api_key_is_rejected() {
        let err = AppConfig::from_lookup(lookup_from(&[])).unwrap_err();
        assert!(err.to_string().contains("OPENAI_API_KEY"));
    }

    #[test]
    fn test_sql_model_can_use_other_provider() {
        let cfg = AppConfig::from_lookup(lookup_from(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("GOOGLE_API_KEY", "g-test"),
            ("SQL_LLM_PROVIDER", "gemini"),
        ]))
        .unwrap();
        assert_eq!(cfg.llm.provider, LlmProvider::OpenAi);
        assert_eq!(cfg.sql_llm.provider, LlmProvider::Gemini);
        assert_eq!(cfg.sql_llm.model, "gemini-2.0-flash");
        assert_eq!(cfg.sql_llm.api_key, "g-test");
    }

    #[test]
    fn test_keyword_lists_are_normalized() {
        let cfg = AppConfig::from_lookup(lookup_from(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("RELATIONAL_KEYWORDS", " Menu, DISH ,, "),
            ("CLASSIFIER_MODEL_FALLBACK", "off"),
        ]))
        .unwrap();
        assert_eq!(cfg.classifier.relational_keywords, vec!["menu", "dish"]);
        assert!(!cfg.classifier.model_fallback);
    }

    #[test]
    fn test_postgres_dialect_port_default() {
        let cfg = AppConfig::from_lookup(lookup_from(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("DB_DIALECT", "postgresql"),
        ]))
        .unwrap();
        assert_eq!(cfg.relational.dialect, SqlDialect::Postgres);
        assert_eq!(cfg.relational.port, 5432);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert!(AppConfig::from_lookup(lookup_from(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("SUMMARY_ROW_LIMIT", "0"),
        ]))
        .is_err());
        assert!(AppConfig::from_lookup(lookup_from(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("DB_DIALECT", "oracle"),
        ]))
        .is_err());
        assert!(AppConfig::from_lookup(lookup_from(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("LLM_PROVIDER", "bard"),
        ]))
        .is_err());
    }
}
