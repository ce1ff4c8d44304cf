//! # テンプレートカタログ
//!
//! 配信に使えるメールテンプレートと、テンプレートごとの差し込み値の契約を定義する。
//!
//! ## 設計方針
//!
//! - **閉じたカタログ**: テンプレートは [`TemplateId`] の列挙で表し、未知の名前はパース時点で拒否する
//! - **検証済みの差し込み値**: 生の JSON オブジェクト（[`FillValues`]）は
//!   [`TemplateFill::parse`] で型付きの値に変換され、以降は不正な値が存在しない
//!
//! ## 使用例
//!
//! ```rust
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use mailer_domain::template::{FillValues, TemplateFill, TemplateId};
//!
//! let template_id: TemplateId = "discount_coupon".parse()?;
//! let values: FillValues = serde_json::from_value(serde_json::json!({
//!     "discount_value": 15,
//!     "coupon_code": "SPRING15",
//!     "valid_dates_start": "2026-03-01",
//!     "valid_dates_end": "2026-03-31",
//! }))?;
//!
//! let fill = TemplateFill::parse(template_id, &values)?;
//! assert_eq!(fill.template_id(), TemplateId::DiscountCoupon);
//! # Ok(())
//! # }
//! ```

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use strum::IntoStaticStr;
use thiserror::Error;

use crate::DomainError;

/// 差し込み値の生データ（JSON オブジェクト）
pub type FillValues = serde_json::Map<String, serde_json::Value>;

/// テンプレート ID
///
/// API の `email_template` フィールドに snake_case で指定される。
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    IntoStaticStr,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TemplateId {
    /// 割引クーポン
    ///
    /// 旧名 `discount_cupom` も受け付ける。
    #[serde(alias = "discount_cupom")]
    #[strum(to_string = "discount_coupon", serialize = "discount_cupom")]
    DiscountCoupon,
}

/// テンプレートのレンダリングエラー
#[derive(Debug, Error)]
pub enum RenderError {
    /// テンプレートの登録に失敗
    #[error("テンプレートの登録に失敗: {0}")]
    Registration(String),

    /// テンプレートの評価に失敗
    #[error("テンプレートのレンダリングに失敗: {0}")]
    Render(String),
}

/// 割引クーポンテンプレートの差し込み値
///
/// # 不変条件
///
/// - `discount_value` は 1 以上 100 以下（パーセント）
/// - `coupon_code` は空でない
/// - `valid_dates_end` は `valid_dates_start` 以降
/// - `image_name` はパス区切りを含まない `.png` / `.jpg` / `.jpeg` のファイル名
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscountCouponFill {
    image_name:        String,
    discount_value:    u8,
    coupon_code:       String,
    valid_dates_start: NaiveDate,
    valid_dates_end:   NaiveDate,
}

#[derive(Deserialize)]
struct RawDiscountCouponFill {
    #[serde(default = "default_header_image")]
    image_name:        String,
    discount_value:    i64,
    #[serde(alias = "cupom_code")]
    coupon_code:       String,
    valid_dates_start: NaiveDate,
    valid_dates_end:   NaiveDate,
}

fn default_header_image() -> String {
    DiscountCouponFill::DEFAULT_HEADER_IMAGE.to_string()
}

impl DiscountCouponFill {
    /// 画像未指定時のヘッダー画像ファイル名
    pub const DEFAULT_HEADER_IMAGE: &'static str = "discount_cupom_header.png";

    const IMAGE_EXTENSIONS: [&'static str; 3] = ["png", "jpg", "jpeg"];

    pub fn new(
        image_name: impl Into<String>,
        discount_value: i64,
        coupon_code: impl Into<String>,
        valid_dates_start: NaiveDate,
        valid_dates_end: NaiveDate,
    ) -> Result<Self, DomainError> {
        let image_name = image_name.into().trim().to_string();
        let coupon_code = coupon_code.into().trim().to_string();

        let discount_value = u8::try_from(discount_value)
            .ok()
            .filter(|v| (1..=100).contains(v))
            .ok_or_else(|| {
                DomainError::Validation(format!(
                    "discount_value は 1 以上 100 以下である必要があります: {discount_value}"
                ))
            })?;

        if coupon_code.is_empty() {
            return Err(DomainError::Validation(
                "coupon_code は必須です".to_string(),
            ));
        }

        if valid_dates_end < valid_dates_start {
            return Err(DomainError::Validation(format!(
                "valid_dates_end ({valid_dates_end}) は valid_dates_start ({valid_dates_start}) 以降である必要があります"
            )));
        }

        Self::validate_image_name(&image_name)?;

        Ok(Self {
            image_name,
            discount_value,
            coupon_code,
            valid_dates_start,
            valid_dates_end,
        })
    }

    fn validate_image_name(image_name: &str) -> Result<(), DomainError> {
        if image_name.is_empty()
            || image_name.contains(['/', '\\'])
            || image_name.starts_with('.')
        {
            return Err(DomainError::Validation(format!(
                "image_name はファイル名である必要があります: {image_name}"
            )));
        }

        let extension = image_name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase());
        match extension {
            Some(ext) if Self::IMAGE_EXTENSIONS.contains(&ext.as_str()) => Ok(()),
            _ => Err(DomainError::Validation(format!(
                "image_name は .png / .jpg / .jpeg のいずれかである必要があります: {image_name}"
            ))),
        }
    }

    pub fn image_name(&self) -> &str {
        &self.image_name
    }

    /// 画像の MIME タイプ
    pub fn image_content_type(&self) -> &'static str {
        if self.image_name.to_ascii_lowercase().ends_with(".png") {
            "image/png"
        } else {
            "image/jpeg"
        }
    }

    pub fn discount_value(&self) -> u8 {
        self.discount_value
    }

    pub fn coupon_code(&self) -> &str {
        &self.coupon_code
    }

    pub fn valid_dates_start(&self) -> NaiveDate {
        self.valid_dates_start
    }

    pub fn valid_dates_end(&self) -> NaiveDate {
        self.valid_dates_end
    }
}

impl TryFrom<RawDiscountCouponFill> for DiscountCouponFill {
    type Error = DomainError;

    fn try_from(raw: RawDiscountCouponFill) -> Result<Self, Self::Error> {
        Self::new(
            raw.image_name,
            raw.discount_value,
            raw.coupon_code,
            raw.valid_dates_start,
            raw.valid_dates_end,
        )
    }
}

/// テンプレートごとの検証済み差し込み値
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateFill {
    DiscountCoupon(DiscountCouponFill),
}

impl TemplateFill {
    /// 生の差し込み値を、指定テンプレートの契約に従って検証・変換する
    ///
    /// 契約にないキーは無視する。
    ///
    /// # エラー
    ///
    /// 必須キーの欠落、型の不一致、値の制約違反は `DomainError::Validation` を返す。
    pub fn parse(template_id: TemplateId, values: &FillValues) -> Result<Self, DomainError> {
        let object = serde_json::Value::Object(values.clone());

        match template_id {
            TemplateId::DiscountCoupon => {
                let raw: RawDiscountCouponFill = serde_json::from_value(object).map_err(|e| {
                    DomainError::Validation(format!("discount_coupon の差し込み値が不正です: {e}"))
                })?;
                Ok(Self::DiscountCoupon(raw.try_into()?))
            }
        }
    }

    pub fn template_id(&self) -> TemplateId {
        match self {
            Self::DiscountCoupon(_) => TemplateId::DiscountCoupon,
        }
    }
}
