//! # HTTP リクエストハンドラ
//!
//! axum のルートに対応するハンドラ関数を定義する。
//!
//! ## 設計方針
//!
//! - 各ハンドラはサブモジュールに配置
//! - 親モジュール（この `handler.rs`）で re-export し、フラットな API を提供
//! - ハンドラは薄く保ち、ロジックはユースケースに委譲

pub mod behavior;
pub mod customer;
pub mod dispatch;
pub mod health;

pub use behavior::{BehaviorState, get_behavior, update_behavior};
pub use customer::{
    CustomerState,
    create_customer,
    get_customer,
    get_customer_by_email,
    get_customer_total,
    update_customer,
};
pub use dispatch::{DispatchState, send_emails};
pub use health::health_check;
