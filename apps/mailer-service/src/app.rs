//! # ルーター構築
//!
//! ハンドラとルートの対応を定義する。`main` と HTTP 統合テストの両方から使う。

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::handler::{
    BehaviorState,
    CustomerState,
    DispatchState,
    create_customer,
    get_behavior,
    get_customer,
    get_customer_by_email,
    get_customer_total,
    health_check,
    send_emails,
    update_behavior,
    update_customer,
};

/// ルーターが使う共有状態一式
pub struct AppStates {
    pub dispatch: Arc<DispatchState>,
    pub behavior: Arc<BehaviorState>,
    pub customer: Arc<CustomerState>,
}

/// アプリケーションのルーターを構築する
pub fn router(states: AppStates) -> Router {
    Router::new()
        .route("/health", get(health_check))
        // 配信
        .route("/emails/send-emails", post(send_emails))
        .with_state(states.dispatch)
        // 送信ビヘイビア
        .route(
            "/emails/behavior",
            get(get_behavior).patch(update_behavior),
        )
        .with_state(states.behavior)
        // 顧客
        .route("/customers", post(create_customer))
        .route("/customers/total", get(get_customer_total))
        .route("/customers/by-email", get(get_customer_by_email))
        .route(
            "/customers/{customer_id}",
            get(get_customer).put(update_customer),
        )
        .with_state(states.customer)
        .layer(TraceLayer::new_for_http())
}
