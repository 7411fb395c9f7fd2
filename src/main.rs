use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use nl_router::ax_state::AppState;
use nl_router::config::AppConfig;
use nl_router::core::classifier::BackendClassifier;
use nl_router::core::pipeline::{Collaborators, QueryRouter};
use nl_router::core::synth::load_sample_hints;
use nl_router::create_router;
use nl_router::infra::db_document::MongoStore;
use nl_router::infra::db_relational::SqlxStore;
use nl_router::infra::llm::create_generator;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = AppConfig::from_env()?;

    let llm = create_generator(&config.llm)?;
    let sql_llm = create_generator(&config.sql_llm)?;
    info!("模型: 通用 {} / SQL {}", llm.model_name(), sql_llm.model_name());

    let relational = Arc::new(SqlxStore::new(config.relational.clone()));
    let documents = Arc::new(MongoStore::connect(&config.document).await?);
    let sample_hints = load_sample_hints(&config.document.samples_path);

    let router = QueryRouter::new(
        BackendClassifier::new(config.classifier.clone()),
        Collaborators {
            llm,
            sql_llm,
            relational,
            documents,
        },
        config.document.primary_collection.clone(),
        sample_hints,
        config.summary_row_limit,
    );
    let state = Arc::new(AppState { router });
    let app = create_router(state);

    info!("🚀 NL Router 运行在 http://{}", config.server_addr);
    let listener = tokio::net::TcpListener::bind(config.server_addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
