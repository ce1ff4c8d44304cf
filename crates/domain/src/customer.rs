//! # 顧客
//!
//! メール配信の受信者となる顧客エンティティと、それを構成する値オブジェクトを定義する。
//!
//! ## 設計方針
//!
//! - **生成時検証**: 氏名・メールアドレス・CPF・電話番号は値オブジェクトの生成時に検証する
//! - **PII の保護**: CPF（ブラジルの個人納税者番号）は `Debug` 出力をマスクする
//! - **DB 復元は検証しない**: [`Customer::from_db`] は保存済みの値をそのまま信頼する
//!
//! ## 使用例
//!
//! ```rust
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use chrono::{NaiveDate, Utc};
//! use mailer_domain::customer::{Cpf, Customer, CustomerId, CustomerName, Email, NewCustomer};
//!
//! let customer = Customer::new(
//!     CustomerId::new(),
//!     NewCustomer {
//!         full_name:  CustomerName::new("Maria da Silva")?,
//!         birth_date: NaiveDate::from_ymd_opt(1990, 5, 17).unwrap(),
//!         email:      Email::new("maria@example.com")?,
//!         telephone:  None,
//!         cpf:        Cpf::new("12345678901")?,
//!     },
//!     NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
//!     Utc::now(),
//! )?;
//!
//! assert!(customer.has_birthday_on(NaiveDate::from_ymd_opt(2026, 5, 17).unwrap()));
//! # Ok(())
//! # }
//! ```

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::DomainError;

define_uuid_id! {
    /// 顧客 ID（一意識別子）
    ///
    /// UUID v7 を使用し、生成順にソート可能。
    pub struct CustomerId;
}

/// 顧客氏名（値オブジェクト）
///
/// 前後の空白を除去したうえで 3 文字以上 200 文字以内であること。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerName(String);

impl CustomerName {
    const MIN_LENGTH: usize = 3;
    const MAX_LENGTH: usize = 200;

    pub fn new(value: impl Into<String>) -> Result<Self, DomainError> {
        let value = value.into().trim().to_string();
        let length = value.chars().count();

        if length < Self::MIN_LENGTH {
            return Err(DomainError::Validation(format!(
                "氏名は {} 文字以上である必要があります",
                Self::MIN_LENGTH
            )));
        }

        if length > Self::MAX_LENGTH {
            return Err(DomainError::Validation(format!(
                "氏名は {} 文字以内である必要があります",
                Self::MAX_LENGTH
            )));
        }

        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

/// メールアドレス（値オブジェクト）
///
/// `local@domain.tld` の形式を要求する。
/// `@` はちょうど 1 つで、ドメイン部はドットを挟んで前後が空でないこと。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Email(String);

impl Email {
    const MAX_LENGTH: usize = 255;

    /// メールアドレスを作成する
    ///
    /// # エラー
    ///
    /// 形式が不正な場合は `DomainError::Validation` を返す。
    pub fn new(value: impl Into<String>) -> Result<Self, DomainError> {
        let value = value.into().trim().to_string();

        if value.is_empty() {
            return Err(DomainError::Validation(
                "メールアドレスは必須です".to_string(),
            ));
        }

        if value.len() > Self::MAX_LENGTH {
            return Err(DomainError::Validation(
                "メールアドレスは255文字以内である必要があります".to_string(),
            ));
        }

        if !Self::is_well_formed(&value) {
            return Err(DomainError::Validation(format!(
                "メールアドレスの形式が不正です: {value}"
            )));
        }

        Ok(Self(value))
    }

    fn is_well_formed(value: &str) -> bool {
        if value.chars().any(char::is_whitespace) {
            return false;
        }
        let Some((local, domain)) = value.split_once('@') else {
            return false;
        };
        if local.is_empty() || domain.contains('@') {
            return false;
        }
        // ドメイン部のいずれかのドットについて、前後が空でなければよい
        domain
            .char_indices()
            .any(|(i, c)| c == '.' && i > 0 && i + 1 < domain.len())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl std::fmt::Display for Email {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// CPF（ブラジルの個人納税者番号、値オブジェクト）
///
/// 数字 11 桁。PII のため `Debug` 出力はマスクし、`Display` は実装しない。
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Cpf(String);

impl Cpf {
    const LENGTH: usize = 11;

    pub fn new(value: impl Into<String>) -> Result<Self, DomainError> {
        let value = value.into().trim().to_string();

        if value.len() != Self::LENGTH || !value.chars().all(|c| c.is_ascii_digit()) {
            return Err(DomainError::Validation(
                "CPF は数字 11 桁である必要があります".to_string(),
            ));
        }

        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl std::fmt::Debug for Cpf {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Cpf").field(&"[REDACTED]").finish()
    }
}

/// 電話番号（値オブジェクト）
///
/// 先頭に任意の `+`、続けて数字 9〜14 桁。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Telephone(String);

impl Telephone {
    const MIN_DIGITS: usize = 9;
    const MAX_DIGITS: usize = 14;

    pub fn new(value: impl Into<String>) -> Result<Self, DomainError> {
        let value = value.into().trim().to_string();
        let digits = value.strip_prefix('+').unwrap_or(&value);

        let valid = (Self::MIN_DIGITS..=Self::MAX_DIGITS).contains(&digits.len())
            && digits.chars().all(|c| c.is_ascii_digit());
        if !valid {
            return Err(DomainError::Validation(format!(
                "電話番号の形式が不正です: {value}"
            )));
        }

        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

/// 顧客の新規登録に必要な値
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCustomer {
    pub full_name:  CustomerName,
    pub birth_date: NaiveDate,
    pub email:      Email,
    pub telephone:  Option<Telephone>,
    pub cpf:        Cpf,
}

/// 顧客情報の部分更新
///
/// `None` のフィールドは変更しない。電話番号の削除はサポートしない。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CustomerChanges {
    pub full_name:  Option<CustomerName>,
    pub birth_date: Option<NaiveDate>,
    pub email:      Option<Email>,
    pub telephone:  Option<Telephone>,
    pub cpf:        Option<Cpf>,
}

/// 顧客エンティティ
///
/// # 不変条件
///
/// - `email` と `cpf` は全顧客で一意（リポジトリ層の一意制約で保証）
/// - `birth_date` は作成・更新時点の「今日」より過去
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Customer {
    id:         CustomerId,
    full_name:  CustomerName,
    birth_date: NaiveDate,
    email:      Email,
    telephone:  Option<Telephone>,
    cpf:        Cpf,
    created_at: DateTime<Utc>,
}

impl Customer {
    /// 新しい顧客を作成する
    ///
    /// # エラー
    ///
    /// 生年月日が `today` 以降の場合は `DomainError::Validation` を返す。
    pub fn new(
        id: CustomerId,
        fields: NewCustomer,
        today: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        validate_birth_date(fields.birth_date, today)?;

        Ok(Self {
            id,
            full_name: fields.full_name,
            birth_date: fields.birth_date,
            email: fields.email,
            telephone: fields.telephone,
            cpf: fields.cpf,
            created_at: now,
        })
    }

    /// 既存のデータから顧客を復元する
    pub fn from_db(
        id: CustomerId,
        full_name: CustomerName,
        birth_date: NaiveDate,
        email: Email,
        telephone: Option<Telephone>,
        cpf: Cpf,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            full_name,
            birth_date,
            email,
            telephone,
            cpf,
            created_at,
        }
    }

    /// 部分更新を適用した新しいインスタンスを返す
    pub fn apply_changes(
        self,
        changes: CustomerChanges,
        today: NaiveDate,
    ) -> Result<Self, DomainError> {
        let birth_date = changes.birth_date.unwrap_or(self.birth_date);
        validate_birth_date(birth_date, today)?;

        Ok(Self {
            full_name: changes.full_name.unwrap_or(self.full_name),
            birth_date,
            email: changes.email.unwrap_or(self.email),
            telephone: changes.telephone.or(self.telephone),
            cpf: changes.cpf.unwrap_or(self.cpf),
            ..self
        })
    }

    /// 指定日が誕生日（月日が一致）かどうか
    ///
    /// 2 月 29 日生まれの顧客は、閏年の 2 月 29 日にのみ一致する。
    pub fn has_birthday_on(&self, date: NaiveDate) -> bool {
        self.birth_date.month() == date.month() && self.birth_date.day() == date.day()
    }

    pub fn id(&self) -> &CustomerId {
        &self.id
    }

    pub fn full_name(&self) -> &CustomerName {
        &self.full_name
    }

    pub fn birth_date(&self) -> NaiveDate {
        self.birth_date
    }

    pub fn email(&self) -> &Email {
        &self.email
    }

    pub fn telephone(&self) -> Option<&Telephone> {
        self.telephone.as_ref()
    }

    pub fn cpf(&self) -> &Cpf {
        &self.cpf
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

fn validate_birth_date(birth_date: NaiveDate, today: NaiveDate) -> Result<(), DomainError> {
    if birth_date >= today {
        return Err(DomainError::Validation(
            "生年月日は過去の日付である必要があります".to_string(),
        ));
    }
    Ok(())
}
