//! # SendingBehaviorRepository
//!
//! 現在の送信ビヘイビアを保持するリポジトリ。
//!
//! `sending_behavior` テーブルは `id = 1` の 1 行だけを持つ。
//! 履歴は残さず、書き込みは常に upsert で上書きする。

use async_trait::async_trait;
use mailer_domain::sending_behavior::SendingBehavior;
use sqlx::PgPool;

use crate::error::InfraError;

/// 送信ビヘイビアリポジトリトレイト
#[async_trait]
pub trait SendingBehaviorRepository: Send + Sync {
    /// 現在の送信ビヘイビアを取得する
    ///
    /// # 戻り値
    ///
    /// - `Ok(Some(behavior))`: 記録が存在する場合
    /// - `Ok(None)`: 一度も設定されていない場合
    /// - `Err(_)`: データベースエラー、または保存値が未知のビヘイビア
    async fn get(&self) -> Result<Option<SendingBehavior>, InfraError>;

    /// 送信ビヘイビアを上書き保存する
    async fn set(&self, behavior: SendingBehavior) -> Result<(), InfraError>;
}

/// PostgreSQL 実装の SendingBehaviorRepository
#[derive(Debug, Clone)]
pub struct PostgresSendingBehaviorRepository {
    pool: PgPool,
}

impl PostgresSendingBehaviorRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SendingBehaviorRepository for PostgresSendingBehaviorRepository {
    async fn get(&self) -> Result<Option<SendingBehavior>, InfraError> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT strategy FROM sending_behavior WHERE id = 1")
                .fetch_optional(&self.pool)
                .await?;

        let Some((strategy,)) = row else {
            return Ok(None);
        };

        strategy
            .parse::<SendingBehavior>()
            .map(Some)
            .map_err(|_| InfraError::unexpected(format!("未知の送信ビヘイビア: {strategy}")))
    }

    #[tracing::instrument(skip(self), level = "debug")]
    async fn set(&self, behavior: SendingBehavior) -> Result<(), InfraError> {
        let strategy: &'static str = behavior.into();

        sqlx::query(
            r#"
            INSERT INTO sending_behavior (id, strategy, updated_at)
            VALUES (1, $1, now())
            ON CONFLICT (id) DO UPDATE
            SET strategy = EXCLUDED.strategy, updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(strategy)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
