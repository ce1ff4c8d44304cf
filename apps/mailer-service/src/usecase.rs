//! # ユースケース層
//!
//! Mailer Service のビジネスロジックを実装する。
//!
//! ## 設計方針
//!
//! - **依存性注入**: リポジトリ・トランスポート・時刻・乱数源を `Arc<dyn Trait>` で外部から注入
//! - **薄いハンドラ**: ハンドラは薄く保ち、ロジックはユースケースに集約
//!
//! ## モジュール構成
//!
//! - `dispatch`: 配信エンジンとテンプレートレンダラー
//! - `behavior`: 送信ビヘイビアの参照・変更
//! - `customer`: 顧客の登録・更新・参照

pub mod behavior;
pub mod customer;
pub mod dispatch;

pub use behavior::BehaviorUseCaseImpl;
pub use customer::{CreateCustomerInput, CustomerUseCaseImpl, UpdateCustomerInput};
pub use dispatch::{DispatchEngine, DispatchError, DispatchRequest};
