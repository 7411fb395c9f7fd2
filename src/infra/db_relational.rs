use async_trait::async_trait;
use std::future::Future;
use sqlx::mysql::{MySqlConnectOptions, MySqlConnection};
use sqlx::postgres::{PgConnectOptions, PgConnection};
use sqlx::{ConnectOptions, Connection, Executor};
use tracing::{debug, warn};

use crate::config::{RelationalConfig, SqlDialect};
use crate::infra::utils::{mysql_row_to_json, pg_row_to_json};
use crate::models::query::Row;

/// 关系型数据源; 每次调用独立建连, 不共享连接状态
#[async_trait]
pub trait RelationalStore: Send + Sync {
    async fn read(&self, sql: &str) -> anyhow::Result<Vec<Row>>;

    /// 执行写语句 (自动提交), 返回影响行数
    async fn write(&self, sql: &str) -> anyhow::Result<u64>;
}

pub struct SqlxStore {
    config: RelationalConfig,
}

impl SqlxStore {
    pub fn new(config: RelationalConfig) -> Self {
        Self { config }
    }

    fn mysql_options(&self) -> MySqlConnectOptions {
        MySqlConnectOptions::new()
            .host(&self.config.host)
            .port(self.config.port)
            .username(&self.config.user)
            .password(&self.config.password)
            .database(&self.config.database)
    }

    fn pg_options(&self) -> PgConnectOptions {
        PgConnectOptions::new()
            .host(&self.config.host)
            .port(self.config.port)
            .username(&self.config.user)
            .password(&self.config.password)
            .database(&self.config.database)
    }
}

// 语句由模型生成, 走非预编译路径 (SHOW / DESCRIBE 等无法 prepare)
#[async_trait]
impl RelationalStore for SqlxStore {
    async fn read(&self, sql: &str) -> anyhow::Result<Vec<Row>> {
        match self.config.dialect {
            SqlDialect::MySql => {
                let mut conn: MySqlConnection = self.mysql_options().connect().await?;
                let rows = conn.fetch_all(sql).await;
                let rows = finish(rows, conn.close()).await?;
                debug!("MySQL 返回 {} 行", rows.len());
                Ok(rows.iter().map(mysql_row_to_json).collect())
            }
            SqlDialect::Postgres => {
                let mut conn: PgConnection = self.pg_options().connect().await?;
                let rows = conn.fetch_all(sql).await;
                let rows = finish(rows, conn.close()).await?;
                debug!("Postgres 返回 {} 行", rows.len());
                Ok(rows.iter().map(pg_row_to_json).collect())
            }
        }
    }

    async fn write(&self, sql: &str) -> anyhow::Result<u64> {
        match self.config.dialect {
            SqlDialect::MySql => {
                let mut conn: MySqlConnection = self.mysql_options().connect().await?;
                let result = conn.execute(sql).await;
                Ok(finish(result, conn.close()).await?.rows_affected())
            }
            SqlDialect::Postgres => {
                let mut conn: PgConnection = self.pg_options().connect().await?;
                let result = conn.execute(sql).await;
                Ok(finish(result, conn.close()).await?.rows_affected())
            }
        }
    }
}

/// 语句结果以执行为准; 关闭失败只记录, 不覆盖已提交的写入或驱动错误
async fn finish<T>(
    result: Result<T, sqlx::Error>,
    close: impl Future<Output = Result<(), sqlx::Error>>,
) -> Result<T, sqlx::Error> {
    if let Err(e) = close.await {
        warn!("关闭数据库连接失败: {}", e);
    }
    result
}
