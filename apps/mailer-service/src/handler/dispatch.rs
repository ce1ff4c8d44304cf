//! # 配信ハンドラ
//!
//! ## エンドポイント
//!
//! - `POST /emails/send-emails` - 配信を受け付ける（202 Accepted）
//!
//! レスポンスは受付の通知のみで、受信者ごとの送信結果は含まない。
//! 送信結果は構造化ログ（`event.category = "dispatch"`）で確認する。

use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use mailer_domain::{sending_behavior::SendingBehavior, template::FillValues};
use mailer_shared::ApiResponse;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::MailerError,
    usecase::dispatch::{DispatchEngine, DispatchRequest},
};

/// 配信 API の共有状態
pub struct DispatchState {
    pub engine: DispatchEngine,
}

/// 配信リクエスト
#[derive(Debug, Deserialize)]
pub struct SendEmailsRequest {
    /// 省略時は割引クーポン
    #[serde(default = "default_email_template")]
    pub email_template:       String,
    pub subject:              String,
    #[serde(default)]
    pub template_fill_values: FillValues,
    #[serde(default = "default_count")]
    pub count:                i64,
}

fn default_email_template() -> String {
    "discount_cupom".to_string()
}

fn default_count() -> i64 {
    1
}

/// 配信受付レスポンス
#[derive(Debug, Serialize)]
pub struct SendEmailsResponse {
    pub message:     String,
    pub dispatch_id: Uuid,
    pub behavior:    SendingBehavior,
    pub candidates:  usize,
    pub submitted:   usize,
}

/// POST /emails/send-emails
///
/// 全送信を投入した時点で 202 を返す。送信の完了は待たない。
pub async fn send_emails(
    State(state): State<Arc<DispatchState>>,
    Json(req): Json<SendEmailsRequest>,
) -> Result<impl IntoResponse, MailerError> {
    let handle = state
        .engine
        .dispatch(DispatchRequest {
            template_id: req.email_template,
            subject:     req.subject,
            fill_values: req.template_fill_values,
            count:       req.count,
        })
        .await?;

    // completion は待たずに破棄する。送信と結果のログ出力は監督タスクが継続する
    let accepted = handle.accepted;
    let response = ApiResponse::new(SendEmailsResponse {
        message:     "Emails are being sent in background".to_string(),
        dispatch_id: *accepted.dispatch_id.as_uuid(),
        behavior:    accepted.behavior,
        candidates:  accepted.candidates,
        submitted:   accepted.submitted,
    });

    Ok((StatusCode::ACCEPTED, Json(response)))
}
