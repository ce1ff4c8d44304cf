//! # 送信ビヘイビアハンドラ
//!
//! ## エンドポイント
//!
//! - `GET /emails/behavior` - 現在の送信ビヘイビア
//! - `PATCH /emails/behavior` - 送信ビヘイビアの変更
//!
//! 未知の `strategy` は JSON のデシリアライズで拒否される。

use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use mailer_domain::sending_behavior::SendingBehavior;
use mailer_shared::ApiResponse;
use serde::{Deserialize, Serialize};

use crate::{error::MailerError, usecase::behavior::BehaviorUseCaseImpl};

/// 送信ビヘイビア API の共有状態
pub struct BehaviorState {
    pub usecase: BehaviorUseCaseImpl,
}

/// 送信ビヘイビアのリクエスト・レスポンス
#[derive(Debug, Serialize, Deserialize)]
pub struct BehaviorDto {
    pub strategy: SendingBehavior,
}

/// GET /emails/behavior
pub async fn get_behavior(
    State(state): State<Arc<BehaviorState>>,
) -> Result<impl IntoResponse, MailerError> {
    let strategy = state.usecase.get().await?;

    Ok((StatusCode::OK, Json(ApiResponse::new(BehaviorDto { strategy }))))
}

/// PATCH /emails/behavior
pub async fn update_behavior(
    State(state): State<Arc<BehaviorState>>,
    Json(req): Json<BehaviorDto>,
) -> Result<impl IntoResponse, MailerError> {
    let strategy = state.usecase.set(req.strategy).await?;

    Ok((StatusCode::OK, Json(ApiResponse::new(BehaviorDto { strategy }))))
}
