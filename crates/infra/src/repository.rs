//! # リポジトリ
//!
//! ドメインエンティティの永続化を担当する。
//!
//! - [`CustomerRepository`] - 顧客ディレクトリ（受信者の検索・抽出）
//! - [`SendingBehaviorRepository`] - 現在の送信ビヘイビア（単一レコード）

pub mod customer_repository;
pub mod sending_behavior_repository;

pub use customer_repository::{CustomerRepository, PostgresCustomerRepository};
pub use sending_behavior_repository::{
    PostgresSendingBehaviorRepository,
    SendingBehaviorRepository,
};
