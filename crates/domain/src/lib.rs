//! # Mailer ドメイン層
//!
//! マーケティングメール配信のドメインモデルを定義する。
//!
//! ## 設計方針
//!
//! - **値オブジェクト**: 顧客の各フィールドは生成時に検証し、不正な値の存在を型で排除
//! - **ポリシーの一元化**: 送信ビヘイビア → (受信者の選び方, 送信確率) の対応は
//!   [`sending_behavior::SendingBehavior::policy`] が唯一の定義
//! - **インフラ非依存**: DB やメール送信の詳細には依存しない
//!
//! ## 依存関係の方向
//!
//! ```text
//! mailer-service → infra → domain
//! ```
//!
//! ## モジュール構成
//!
//! - [`error`] - ドメインエラー
//! - [`clock`] - 時刻プロバイダ
//! - [`customer`] - 顧客エンティティと値オブジェクト
//! - [`sending_behavior`] - 送信ビヘイビアと送信ポリシー
//! - [`template`] - テンプレートカタログと差し込み値の契約
//! - [`mail`] - レンダリング済みメッセージと送信エラー
//! - [`dispatch`] - 配信 ID と受信者ごとの配信結果

#[macro_use]
mod macros;

pub mod clock;
pub mod customer;
pub mod dispatch;
pub mod error;
pub mod mail;
pub mod sending_behavior;
pub mod template;

pub use error::DomainError;
