//! # Mailer Service エラー定義
//!
//! サービス固有のエラーと、HTTP レスポンス（RFC 9457 Problem Details）への変換を定義する。
//!
//! ## HTTP ステータスの対応
//!
//! | エラー | HTTP ステータス |
//! |-------|----------------|
//! | 未知のテンプレート・差し込み値不正・リクエスト不正・バリデーション | 400 |
//! | リソースなし | 404 |
//! | 一意制約の重複 | 409 |
//! | ビヘイビアストア・顧客ディレクトリに接続できない | 503 |
//! | その他 | 500（詳細は返さない） |

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use mailer_domain::DomainError;
use mailer_infra::InfraError;
use mailer_shared::ErrorResponse;
use thiserror::Error;

use crate::usecase::dispatch::DispatchError;

/// Mailer Service で発生するエラー
#[derive(Debug, Error)]
pub enum MailerError {
    /// 配信リクエストの拒否・失敗
    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    /// リソースが見つからない
    #[error("リソースが見つかりません: {0}")]
    NotFound(String),

    /// 不正なリクエスト
    #[error("不正なリクエスト: {0}")]
    BadRequest(String),

    /// 入力値の検証失敗
    #[error("バリデーションエラー: {0}")]
    Validation(String),

    /// 競合（メールアドレス・CPF の重複）
    #[error("競合が発生しました: {0}")]
    Conflict(String),

    /// 依存ストアが利用できない
    #[error("サービスを利用できません: {0}")]
    ServiceUnavailable(String),

    /// データベースエラー
    #[error("データベースエラー: {0}")]
    Database(#[from] InfraError),

    /// 内部エラー
    #[error("内部エラー: {0}")]
    Internal(String),
}

impl From<DomainError> for MailerError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Validation(msg) => Self::Validation(msg),
            DomainError::NotFound { entity_type, id } => {
                Self::NotFound(format!("{entity_type} が見つかりません: {id}"))
            }
            DomainError::Conflict(msg) => Self::Conflict(msg),
        }
    }
}

impl MailerError {
    fn to_error_response(&self) -> ErrorResponse {
        match self {
            Self::Dispatch(e) => match e {
                DispatchError::UnknownTemplate(_) => {
                    ErrorResponse::new("unknown-template", "Unknown Template", 400, e.to_string())
                }
                DispatchError::InvalidFillValues(_) => ErrorResponse::validation_error(e.to_string()),
                DispatchError::InvalidRequest(_) => ErrorResponse::bad_request(e.to_string()),
                DispatchError::BehaviorStoreUnavailable(_)
                | DispatchError::RecipientQueryFailed(_) => {
                    tracing::error!(error = %e, "配信に必要なストアへのアクセスに失敗");
                    ErrorResponse::service_unavailable(e.to_string())
                }
                DispatchError::Render(_) => {
                    tracing::error!(error = %e, "メッセージのレンダリングに失敗");
                    ErrorResponse::internal_error()
                }
            },
            Self::NotFound(msg) => ErrorResponse::not_found(msg.clone()),
            Self::BadRequest(msg) => ErrorResponse::bad_request(msg.clone()),
            Self::Validation(msg) => ErrorResponse::validation_error(msg.clone()),
            Self::Conflict(msg) => ErrorResponse::conflict(msg.clone()),
            Self::ServiceUnavailable(msg) => {
                tracing::error!("サービス利用不可: {}", msg);
                ErrorResponse::service_unavailable(msg.clone())
            }
            Self::Database(e) => {
                tracing::error!(error = %e, span_trace = %e.span_trace(), "データベースエラー");
                ErrorResponse::internal_error()
            }
            Self::Internal(msg) => {
                tracing::error!("内部エラー: {}", msg);
                ErrorResponse::internal_error()
            }
        }
    }
}

impl IntoResponse for MailerError {
    fn into_response(self) -> Response {
        let body = self.to_error_response();
        let status =
            StatusCode::from_u16(body.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use mailer_domain::DomainError;
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(
        MailerError::Dispatch(DispatchError::UnknownTemplate("welcome".to_string())),
        StatusCode::BAD_REQUEST
    )]
    #[case(
        MailerError::Dispatch(DispatchError::InvalidFillValues(DomainError::Validation("x".to_string()))),
        StatusCode::BAD_REQUEST
    )]
    #[case(
        MailerError::Dispatch(DispatchError::InvalidRequest("count".to_string())),
        StatusCode::BAD_REQUEST
    )]
    #[case(
        MailerError::Dispatch(DispatchError::BehaviorStoreUnavailable(InfraError::unexpected("down"))),
        StatusCode::SERVICE_UNAVAILABLE
    )]
    #[case(
        MailerError::Dispatch(DispatchError::RecipientQueryFailed(InfraError::unexpected("down"))),
        StatusCode::SERVICE_UNAVAILABLE
    )]
    #[case(MailerError::NotFound("x".to_string()), StatusCode::NOT_FOUND)]
    #[case(MailerError::Conflict("x".to_string()), StatusCode::CONFLICT)]
    #[case(MailerError::Validation("x".to_string()), StatusCode::BAD_REQUEST)]
    #[case(MailerError::Database(InfraError::unexpected("x")), StatusCode::INTERNAL_SERVER_ERROR)]
    fn test_エラーごとのhttpステータス(#[case] error: MailerError, #[case] expected: StatusCode) {
        let response = error.into_response();

        assert_eq!(response.status(), expected);
    }

    #[test]
    fn test_内部エラーの詳細はレスポンスに含めない() {
        let body = MailerError::Internal("秘密の接続文字列".to_string()).to_error_response();

        assert_eq!(body.detail, "内部エラーが発生しました");
    }

    #[test]
    fn test_ドメインエラーの変換() {
        let not_found: MailerError = DomainError::NotFound {
            entity_type: "Customer",
            id:          "abc".to_string(),
        }
        .into();

        assert!(matches!(not_found, MailerError::NotFound(msg) if msg.contains("abc")));
    }
}
