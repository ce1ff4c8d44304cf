//! # Mailer Service 設定
//!
//! 環境変数から Mailer Service の設定を読み込む。

use std::{env, path::PathBuf, str::FromStr, time::Duration};

use mailer_infra::mail::SmtpCredentials;
use thiserror::Error;

/// 設定読み込みエラー
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 必須の環境変数が未設定
    #[error("{0} が設定されていません")]
    Missing(&'static str),

    /// 値の形式が不正
    #[error("{name} の値が不正です: {value:?}")]
    Invalid { name: &'static str, value: String },

    /// SMTP 認証情報の片方だけが設定されている
    #[error("SMTP_USERNAME と SMTP_PASSWORD は両方設定するか、両方省略してください")]
    PartialCredentials,
}

/// Mailer Service の設定
#[derive(Debug, Clone)]
pub struct MailerConfig {
    /// バインドアドレス
    pub host: String,
    /// ポート番号
    pub port: u16,
    /// データベース接続 URL
    pub database_url: String,
    /// メール送信設定
    pub mail: MailConfig,
    /// テンプレート画像を置くディレクトリ
    pub template_asset_dir: PathBuf,
    /// 1 回の配信で同時に実行する送信の上限
    pub dispatch_max_concurrency: usize,
}

/// 送信バックエンド
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MailBackend {
    /// SMTP サーバー経由で送信
    Smtp,
    /// 送信しない（ログ出力のみ）
    Noop,
}

impl FromStr for MailBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "smtp" => Ok(Self::Smtp),
            "noop" => Ok(Self::Noop),
            _ => Err(ConfigError::Invalid {
                name:  "MAIL_BACKEND",
                value: s.to_string(),
            }),
        }
    }
}

/// メール送信の設定
///
/// `MAIL_BACKEND` 環境変数で送信バックエンドを切り替える:
/// - `smtp`: Mailpit（開発）/ SMTP サーバー経由で送信
/// - `noop`: 送信しない（ログ出力のみ）
#[derive(Debug, Clone)]
pub struct MailConfig {
    pub backend:          MailBackend,
    pub smtp_host:        String,
    pub smtp_port:        u16,
    pub smtp_credentials: Option<SmtpCredentials>,
    /// 1 通あたりの送信タイムアウト
    pub smtp_timeout:     Duration,
    /// 送信元メールアドレス
    pub from_address:     String,
    /// 送信元の表示名
    pub from_name:        Option<String>,
}

impl MailerConfig {
    /// 環境変数から設定を読み込む
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// 任意のキー参照関数から設定を読み込む
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let concurrency: usize = parse_or(&lookup, "DISPATCH_MAX_CONCURRENCY", 8)?;
        if concurrency == 0 {
            return Err(ConfigError::Invalid {
                name:  "DISPATCH_MAX_CONCURRENCY",
                value: "0".to_string(),
            });
        }

        Ok(Self {
            host: lookup("MAILER_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_or(&lookup, "MAILER_PORT", 8000)?,
            database_url: lookup("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?,
            mail: MailConfig::from_lookup(&lookup)?,
            template_asset_dir: lookup("TEMPLATE_ASSET_DIR")
                .map_or_else(|| PathBuf::from("assets/templates"), PathBuf::from),
            dispatch_max_concurrency: concurrency,
        })
    }
}

impl MailConfig {
    fn from_lookup(lookup: &impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let smtp_credentials = match (lookup("SMTP_USERNAME"), lookup("SMTP_PASSWORD")) {
            (Some(username), Some(password)) => Some(SmtpCredentials { username, password }),
            (None, None) => None,
            _ => return Err(ConfigError::PartialCredentials),
        };

        Ok(Self {
            backend: parse_or(lookup, "MAIL_BACKEND", MailBackend::Noop)?,
            smtp_host: lookup("SMTP_HOST").unwrap_or_else(|| "localhost".to_string()),
            smtp_port: parse_or(lookup, "SMTP_PORT", 1025)?,
            smtp_credentials,
            smtp_timeout: Duration::from_secs(parse_or(lookup, "SMTP_TIMEOUT_SECS", 10)?),
            from_address: lookup("MAIL_FROM_ADDRESS")
                .unwrap_or_else(|| "noreply@mailer.example.com".to_string()),
            from_name: lookup("MAIL_FROM_NAME"),
        })
    }
}

fn parse_or<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(name) {
        Some(value) => value
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
        None => Ok(default),
    }
}
