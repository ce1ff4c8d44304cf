//! # Mailer インフラ層
//!
//! 外部システムとの接続・通信を担当するインフラストラクチャ層。
//!
//! ## 責務
//!
//! - **データベース接続**: PostgreSQL への接続プール管理とマイグレーション
//! - **リポジトリ実装**: 顧客ディレクトリと送信ビヘイビアの永続化
//! - **メール送信**: SMTP（lettre）と Noop のトランスポート
//!
//! ## 依存関係
//!
//! ```text
//! mailer-service → infra → domain
//! ```
//!
//! ## モジュール構成
//!
//! - [`db`] - PostgreSQL データベース接続管理
//! - [`error`] - インフラ層エラー定義
//! - [`repository`] - リポジトリ実装
//! - [`mail`] - メール送信トランスポート
//! - `mock` - テスト用のインメモリ実装（`test-utils` feature）

pub mod db;
pub mod error;
pub mod mail;
pub mod repository;

#[cfg(any(test, feature = "test-utils"))]
pub mod mock;

pub use error::{InfraError, InfraErrorKind};
