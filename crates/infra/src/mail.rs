//! # メール送信
//!
//! レンダリング済みメッセージを 1 人の宛先へ届けるトランスポート。
//!
//! ## 設計方針
//!
//! - **trait による抽象化**: [`MailTransport`] で送信手段を抽象化する
//! - **2 つの実装**: SMTP（lettre）、Noop（ログ出力のみ）
//! - **環境変数切替**: `MAIL_BACKEND` でランタイム選択
//! - **境界で失敗を閉じる**: トランスポート内部のエラーはすべて [`MailError`] に変換し、
//!   パニックや外部クレートのエラー型を呼び出し側に漏らさない
//! - **タイムアウトはトランスポートの責務**: 1 件の送信時間の上限は各実装が保証する

mod noop;
mod smtp;

use async_trait::async_trait;
use mailer_domain::mail::{MailError, OutboundEmail};
pub use noop::NoopMailTransport;
pub use smtp::{SmtpConfig, SmtpCredentials, SmtpMailTransport};

/// メール送信トレイト
///
/// `Ok(())` は送信成功、`Err` は送信失敗とその原因を表す。
#[async_trait]
pub trait MailTransport: Send + Sync {
    /// 1 通のメールを送信する
    async fn send(&self, email: &OutboundEmail) -> Result<(), MailError>;
}
