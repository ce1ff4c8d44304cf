//! # テンプレートレンダラー
//!
//! tera テンプレートエンジンで配信メールを HTML/plaintext 両形式で生成する。
//!
//! ## 設計方針
//!
//! - **`include_str!` によるコンパイル時埋め込み**: テンプレートはバイナリに埋め込まれる
//! - **受信者に依存しない**: 1 回の配信でレンダリングは 1 度だけ行い、全受信者で共有する
//! - **装飾用画像の欠落は致命的でない**: ヘッダー画像が読めなければ、画像なしの本文で続行する

use std::path::{Path, PathBuf};

use mailer_domain::{
    mail::{InlineImage, RenderedMessage},
    template::{DiscountCouponFill, RenderError, TemplateFill},
};
use mailer_shared::event_log::error as log_error;
use tera::{Context, Tera};

/// 日付の表示形式（dd/mm/YYYY）
const DATE_FORMAT: &str = "%d/%m/%Y";

/// テンプレートレンダラー
///
/// tera テンプレートエンジンをラップし、検証済みの差し込み値から
/// [`RenderedMessage`] を生成する。
pub struct TemplateRenderer {
    engine:    Tera,
    asset_dir: PathBuf,
}

impl TemplateRenderer {
    /// HTML 本文からヘッダー画像を参照する Content-ID
    pub const HEADER_CONTENT_ID: &'static str = "promo_header";

    /// 新しいレンダラーインスタンスを作成
    ///
    /// `include_str!` で埋め込んだテンプレートを tera に登録する。
    /// `asset_dir` はテンプレート画像を探すディレクトリ。
    pub fn new(asset_dir: impl Into<PathBuf>) -> Result<Self, RenderError> {
        Self::with_templates(
            asset_dir,
            vec![
                (
                    "discount_coupon.html",
                    include_str!("../../../templates/discount_coupon.html"),
                ),
                (
                    "discount_coupon.txt",
                    include_str!("../../../templates/discount_coupon.txt"),
                ),
            ],
        )
    }

    /// 任意のテンプレート本文で作成する
    ///
    /// テンプレート名は `{template_id}.html` / `{template_id}.txt`。
    pub fn with_templates(
        asset_dir: impl Into<PathBuf>,
        templates: Vec<(&str, &str)>,
    ) -> Result<Self, RenderError> {
        let mut engine = Tera::default();

        engine
            .add_raw_templates(templates)
            .map_err(|e| RenderError::Registration(e.to_string()))?;

        Ok(Self {
            engine,
            asset_dir: asset_dir.into(),
        })
    }

    pub fn asset_dir(&self) -> &Path {
        &self.asset_dir
    }

    /// 差し込み値からメッセージを生成する
    ///
    /// ヘッダー画像が見つからない場合はエラーログを出力し、画像なしで生成する。
    /// エラーになるのはテンプレート本文自体の不備（未定義の変数参照など）だけ。
    pub async fn render(
        &self,
        fill: &TemplateFill,
        subject: &str,
    ) -> Result<RenderedMessage, RenderError> {
        match fill {
            TemplateFill::DiscountCoupon(coupon) => {
                let inline_image = self.load_header_image(coupon).await;
                let context = discount_coupon_context(coupon, inline_image.is_some());
                let template_name: &'static str = fill.template_id().into();

                let html_body = self
                    .engine
                    .render(&format!("{template_name}.html"), &context)
                    .map_err(|e| RenderError::Render(e.to_string()))?;
                let text_body = self
                    .engine
                    .render(&format!("{template_name}.txt"), &context)
                    .map_err(|e| RenderError::Render(e.to_string()))?;

                Ok(RenderedMessage {
                    template_id: fill.template_id(),
                    subject: subject.to_string(),
                    html_body,
                    text_body,
                    inline_image,
                })
            }
        }
    }

    async fn load_header_image(&self, coupon: &DiscountCouponFill) -> Option<InlineImage> {
        let path = self.asset_dir.join(coupon.image_name());

        match tokio::fs::read(&path).await {
            Ok(data) => Some(InlineImage {
                content_id: Self::HEADER_CONTENT_ID.to_string(),
                file_name: coupon.image_name().to_string(),
                content_type: coupon.image_content_type().to_string(),
                data,
            }),
            Err(e) => {
                tracing::error!(
                    error.category = log_error::category::INFRASTRUCTURE,
                    error.kind = log_error::kind::TEMPLATE_ASSET,
                    error = %e,
                    path = %path.display(),
                    "ヘッダー画像が見つかりません。画像なしで送信します (RenderDegraded)"
                );
                None
            }
        }
    }
}

fn discount_coupon_context(coupon: &DiscountCouponFill, has_header_image: bool) -> Context {
    let mut context = Context::new();
    context.insert("coupon_code", coupon.coupon_code());
    context.insert("discount_value", &format!("{}%", coupon.discount_value()));
    context.insert(
        "start_date",
        &coupon.valid_dates_start().format(DATE_FORMAT).to_string(),
    );
    context.insert(
        "end_date",
        &coupon.valid_dates_end().format(DATE_FORMAT).to_string(),
    );
    context.insert("has_header_image", &has_header_image);
    context.insert("header_content_id", TemplateRenderer::HEADER_CONTENT_ID);
    context
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use mailer_domain::template::TemplateId;
    use pretty_assertions::assert_eq;

    use super::*;

    fn asset_dir() -> PathBuf {
        PathBuf::from(concat!(env!("CARGO_MANIFEST_DIR"), "/assets/templates"))
    }

    fn coupon(image_name: &str) -> TemplateFill {
        TemplateFill::DiscountCoupon(
            DiscountCouponFill::new(
                image_name,
                15,
                "SPRING<15>",
                NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
                NaiveDate::from_ymd_opt(2026, 3, 31).unwrap(),
            )
            .unwrap(),
        )
    }

    #[tokio::test]
    async fn test_割引クーポンをhtmlとテキストで生成する() {
        let sut = TemplateRenderer::new(asset_dir()).unwrap();

        let message = sut
            .render(
                &coupon(DiscountCouponFill::DEFAULT_HEADER_IMAGE),
                "Seu cupom chegou",
            )
            .await
            .unwrap();

        assert_eq!(message.template_id, TemplateId::DiscountCoupon);
        assert_eq!(message.subject, "Seu cupom chegou");
        assert!(message.text_body.contains("Seu código: SPRING<15>"));
        assert!(message.text_body.contains("15%"));
        assert!(message.text_body.contains("01/03/2026 e 31/03/2026"));
        assert!(message.html_body.contains("01/03/2026 e 31/03/2026"));
        assert!(message.html_body.contains("<strong>15%</strong>"));
    }

    #[tokio::test]
    async fn test_htmlではクーポンコードがエスケープされる() {
        let sut = TemplateRenderer::new(asset_dir()).unwrap();

        let message = sut
            .render(&coupon(DiscountCouponFill::DEFAULT_HEADER_IMAGE), "件名")
            .await
            .unwrap();

        assert!(message.html_body.contains("SPRING&lt;15&gt;"));
        assert!(!message.html_body.contains("SPRING<15>"));
    }

    #[tokio::test]
    async fn test_ヘッダー画像はインラインで添付される() {
        let sut = TemplateRenderer::new(asset_dir()).unwrap();

        let message = sut
            .render(&coupon(DiscountCouponFill::DEFAULT_HEADER_IMAGE), "件名")
            .await
            .unwrap();

        let image = message.inline_image.unwrap();
        assert_eq!(image.content_id, "promo_header");
        assert_eq!(image.content_type, "image/png");
        assert!(!image.data.is_empty());
        assert!(message.html_body.contains(r#"src="cid:promo_header""#));
    }

    #[tokio::test]
    async fn test_画像が見つからなくても画像なしで生成する() {
        let sut = TemplateRenderer::new(asset_dir()).unwrap();

        let message = sut
            .render(&coupon("missing_banner.jpg"), "件名")
            .await
            .unwrap();

        assert!(message.inline_image.is_none());
        assert!(!message.html_body.contains("cid:promo_header"));
        assert!(message.text_body.contains("SPRING<15>"));
    }

    #[tokio::test]
    async fn test_同じ入力からは同じ本文を生成する() {
        let sut = TemplateRenderer::new(asset_dir()).unwrap();
        let fill = coupon(DiscountCouponFill::DEFAULT_HEADER_IMAGE);

        let first = sut.render(&fill, "件名").await.unwrap();
        let second = sut.render(&fill, "件名").await.unwrap();

        assert_eq!(first, second);
    }
}
