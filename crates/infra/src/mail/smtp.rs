//! SMTP メール送信実装
//!
//! lettre の `AsyncSmtpTransport` を使用してメールを送信する。
//! 開発環境では Mailpit（ローカル SMTP サーバー）に接続する。
//!
//! ## MIME 構造
//!
//! ```text
//! multipart/related
//! ├── multipart/alternative
//! │   ├── text/plain
//! │   └── text/html        (<img src="cid:promo_header">)
//! └── image/png | image/jpeg (Content-ID: <promo_header>, inline)
//! ```
//!
//! ヘッダー画像がない場合は `multipart/alternative` のみを送る。

use std::time::Duration;

use async_trait::async_trait;
use lettre::{
    Address,
    AsyncSmtpTransport,
    AsyncTransport,
    Tokio1Executor,
    message::{Attachment, Mailbox, Message, MultiPart, SinglePart, header::ContentType},
    transport::smtp::authentication::Credentials,
};
use mailer_domain::mail::{MailError, OutboundEmail};

use super::MailTransport;

/// SMTP 認証情報
#[derive(Debug, Clone)]
pub struct SmtpCredentials {
    pub username: String,
    pub password: String,
}

/// SMTP 接続設定
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    /// SMTP サーバーのホスト名（例: "localhost"）
    pub host:         String,
    /// SMTP サーバーのポート番号（例: 1025 for Mailpit）
    pub port:         u16,
    pub credentials:  Option<SmtpCredentials>,
    /// 1 通あたりの送信タイムアウト
    pub timeout:      Duration,
    /// 送信元メールアドレス
    pub from_address: String,
    /// 送信元の表示名
    pub from_name:    Option<String>,
}

/// SMTP メール送信
///
/// `lettre::AsyncSmtpTransport<Tokio1Executor>` をラップする。
pub struct SmtpMailTransport {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from:      Mailbox,
}

impl SmtpMailTransport {
    /// 新しい SMTP 送信インスタンスを作成
    ///
    /// # エラー
    ///
    /// 送信元アドレスが不正な場合は `MailError::InvalidAddress` を返す。
    pub fn new(config: SmtpConfig) -> Result<Self, MailError> {
        let address: Address = config.from_address.parse().map_err(|e| {
            MailError::InvalidAddress(format!("送信元アドレス不正: {}: {e}", config.from_address))
        })?;

        // builder_dangerous: TLS なしで接続（Mailpit 等のローカル SMTP 向け）
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host)
            .port(config.port)
            .timeout(Some(config.timeout));
        if let Some(credentials) = config.credentials {
            builder = builder.credentials(Credentials::new(
                credentials.username,
                credentials.password,
            ));
        }

        Ok(Self {
            transport: builder.build(),
            from:      Mailbox::new(config.from_name, address),
        })
    }

    pub(crate) fn build_message(&self, email: &OutboundEmail) -> Result<Message, MailError> {
        let to: Mailbox = email
            .to
            .parse()
            .map_err(|e| MailError::InvalidAddress(format!("宛先アドレス不正: {e}")))?;
        let rendered = &email.message;

        let alternative = MultiPart::alternative()
            .singlepart(
                SinglePart::builder()
                    .header(ContentType::TEXT_PLAIN)
                    .body(rendered.text_body.clone()),
            )
            .singlepart(
                SinglePart::builder()
                    .header(ContentType::TEXT_HTML)
                    .body(rendered.html_body.clone()),
            );

        let body = match &rendered.inline_image {
            Some(image) => {
                let content_type = ContentType::parse(&image.content_type).map_err(|e| {
                    MailError::MessageBuild(format!(
                        "画像の Content-Type 不正: {}: {e}",
                        image.content_type
                    ))
                })?;
                MultiPart::related().multipart(alternative).singlepart(
                    Attachment::new_inline(image.content_id.clone())
                        .body(image.data.clone(), content_type),
                )
            }
            None => alternative,
        };

        Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(email.subject())
            .multipart(body)
            .map_err(|e| MailError::MessageBuild(format!("メッセージ構築失敗: {e}")))
    }
}

#[async_trait]
impl MailTransport for SmtpMailTransport {
    async fn send(&self, email: &OutboundEmail) -> Result<(), MailError> {
        let message = self.build_message(email)?;

        self.transport
            .send(message)
            .await
            .map_err(|e| MailError::SendFailed(format!("SMTP 送信失敗: {e}")))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use mailer_domain::{
        mail::{InlineImage, RenderedMessage},
        template::TemplateId,
    };
    use rstest::{fixture, rstest};

    use super::*;

    #[fixture]
    fn config() -> SmtpConfig {
        SmtpConfig {
            host:         "localhost".to_string(),
            port:         1025,
            credentials:  None,
            timeout:      Duration::from_secs(10),
            from_address: "noreply@mailer.example.com".to_string(),
            from_name:    Some("Mailer".to_string()),
        }
    }

    fn rendered(inline_image: Option<InlineImage>) -> Arc<RenderedMessage> {
        Arc::new(RenderedMessage {
            template_id: TemplateId::DiscountCoupon,
            subject: "春のクーポン".to_string(),
            html_body: r#"<img src="cid:promo_header"><p>15%</p>"#.to_string(),
            text_body: "15%".to_string(),
            inline_image,
        })
    }

    #[test]
    fn test_トレイトはsendとsyncを実装している() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SmtpMailTransport>();
    }

    #[rstest]
    fn test_送信元アドレスが不正なら作成できない(mut config: SmtpConfig) {
        config.from_address = "not-an-address".to_string();

        assert!(matches!(
            SmtpMailTransport::new(config),
            Err(MailError::InvalidAddress(_))
        ));
    }

    #[rstest]
    fn test_宛先アドレスが不正ならinvalid_address(config: SmtpConfig) {
        let sut = SmtpMailTransport::new(config).unwrap();
        let email = OutboundEmail::new("broken@", rendered(None));

        assert!(matches!(
            sut.build_message(&email),
            Err(MailError::InvalidAddress(_))
        ));
    }

    #[rstest]
    fn test_インライン画像はcontent_id付きで添付される(config: SmtpConfig) {
        let sut = SmtpMailTransport::new(config).unwrap();
        let image = InlineImage {
            content_id:   "promo_header".to_string(),
            file_name:    "header.png".to_string(),
            content_type: "image/png".to_string(),
            data:         vec![0x89, 0x50, 0x4e, 0x47],
        };
        let email = OutboundEmail::new("maria@example.com", rendered(Some(image)));

        let message = sut.build_message(&email).unwrap();
        let formatted = String::from_utf8_lossy(&message.formatted()).into_owned();

        assert!(formatted.contains("multipart/related"));
        assert!(formatted.contains("Content-ID: <promo_header>"));
        assert!(formatted.contains("image/png"));
    }

    #[rstest]
    fn test_画像がなければalternativeのみ(config: SmtpConfig) {
        let sut = SmtpMailTransport::new(config).unwrap();
        let email = OutboundEmail::new("maria@example.com", rendered(None));

        let message = sut.build_message(&email).unwrap();
        let formatted = String::from_utf8_lossy(&message.formatted()).into_owned();

        assert!(formatted.contains("multipart/alternative"));
        assert!(!formatted.contains("multipart/related"));
        assert!(formatted.contains("To: maria@example.com"));
    }
}
