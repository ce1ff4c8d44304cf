//! Noop メール送信実装
//!
//! メールを実際に送信せず、ログ出力のみ行う。
//! ローカル開発や送信無効化時に使用する。

use async_trait::async_trait;
use mailer_domain::mail::{MailError, OutboundEmail};

use super::MailTransport;

/// Noop メール送信（ログ出力のみ）
#[derive(Debug, Clone)]
pub struct NoopMailTransport;

#[async_trait]
impl MailTransport for NoopMailTransport {
    async fn send(&self, email: &OutboundEmail) -> Result<(), MailError> {
        tracing::info!(
            to = %email.to,
            subject = %email.subject(),
            template = %email.message.template_id,
            "Noop: メール送信をスキップ"
        );
        Ok(())
    }
}
