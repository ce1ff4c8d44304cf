//! # メール
//!
//! レンダリング済みメッセージと、受信者ごとの送信単位、送信エラーを定義する。
//!
//! 1 回の配信ではメッセージを 1 度だけレンダリングし、
//! 全受信者の [`OutboundEmail`] で `Arc` 共有する。

use std::sync::Arc;

use thiserror::Error;

use crate::template::TemplateId;

/// メール送信エラー
#[derive(Debug, Error)]
pub enum MailError {
    /// 宛先・送信元アドレスが不正
    #[error("メールアドレスが不正です: {0}")]
    InvalidAddress(String),

    /// MIME メッセージの組み立てに失敗
    #[error("メッセージの構築に失敗: {0}")]
    MessageBuild(String),

    /// トランスポートでの送信に失敗
    #[error("メール送信に失敗: {0}")]
    SendFailed(String),
}

/// 本文に埋め込むインライン画像
///
/// HTML 本文からは `cid:{content_id}` で参照する。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineImage {
    pub content_id:   String,
    pub file_name:    String,
    pub content_type: String,
    pub data:         Vec<u8>,
}

/// レンダリング済みメッセージ（全受信者で共通）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedMessage {
    pub template_id:  TemplateId,
    pub subject:      String,
    pub html_body:    String,
    pub text_body:    String,
    /// ヘッダー画像が読み込めなかった場合は `None`
    pub inline_image: Option<InlineImage>,
}

/// 受信者 1 人分の送信単位
#[derive(Debug, Clone)]
pub struct OutboundEmail {
    /// 送信先メールアドレス
    pub to:      String,
    pub message: Arc<RenderedMessage>,
}

impl OutboundEmail {
    pub fn new(to: impl Into<String>, message: Arc<RenderedMessage>) -> Self {
        Self {
            to: to.into(),
            message,
        }
    }

    pub fn subject(&self) -> &str {
        &self.message.subject
    }
}
