//! # ビジネスイベントログの構造化ヘルパー
//!
//! `jq` で効率的に調査できるよう、ログフィールドの命名規約とヘルパーマクロを提供する。
//!
//! ## ビジネスイベント
//!
//! [`log_business_event!`] マクロで出力する。`event.kind = "business_event"` マーカーが
//! 自動付与され、`jq 'select(.["event.kind"] == "business_event")'` でフィルタできる。
//!
//! 配信ごとの結果（送信成功 / サンプリングによるスキップ / 送信失敗）は
//! 永続化されず、このログが唯一の記録になる。
//!
//! ## フィールド命名規約
//!
//! ドット記法（`event.category`、`dispatch.id`）を使用する。JSON 出力でフラットなキーになる。

/// ビジネスイベントを構造化ログとして出力する。
///
/// `event.kind = "business_event"` マーカーを自動付与し、
/// `tracing::info!` レベルで出力する。
///
/// ## 必須フィールド（慣例）
///
/// - `event.category`: イベントカテゴリ（[`event::category`] の定数を使用）
/// - `event.action`: アクション名（[`event::action`] の定数を使用）
/// - `event.result`: 結果（[`event::result`] の定数を使用）
#[macro_export]
macro_rules! log_business_event {
    ($($args:tt)*) => {
        ::tracing::info!(
            event.kind = "business_event",
            $($args)*
        )
    };
}

/// イベントフィールドの定数
pub mod event {
    /// イベントカテゴリ
    pub mod category {
        pub const DISPATCH: &str = "dispatch";
        pub const BEHAVIOR: &str = "behavior";
        pub const CUSTOMER: &str = "customer";
    }

    /// イベントアクション
    pub mod action {
        // 配信
        pub const DISPATCH_ACCEPTED: &str = "dispatch.accepted";
        pub const DISPATCH_COMPLETED: &str = "dispatch.completed";
        pub const EMAIL_SENT: &str = "email.sent";
        pub const EMAIL_SKIPPED: &str = "email.skipped";
        pub const EMAIL_DELIVERY_FAILED: &str = "email.delivery_failed";

        // 送信ビヘイビア
        pub const BEHAVIOR_CHANGED: &str = "behavior.changed";

        // 顧客
        pub const CUSTOMER_CREATED: &str = "customer.created";
        pub const CUSTOMER_UPDATED: &str = "customer.updated";
        pub const CUSTOMERS_IMPORTED: &str = "customer.imported";
    }

    /// イベント結果
    pub mod result {
        pub const SUCCESS: &str = "success";
        pub const SKIPPED: &str = "skipped";
        pub const FAILURE: &str = "failure";
    }
}

/// エラーコンテキストフィールドの定数
///
/// 既存の `tracing::error!` に `error.category` + `error.kind` を追加して使う。
pub mod error {
    /// エラーカテゴリ
    pub mod category {
        /// インフラストラクチャ（DB）
        pub const INFRASTRUCTURE: &str = "infrastructure";
        /// 外部サービス呼び出し（SMTP 等）
        pub const EXTERNAL_SERVICE: &str = "external_service";
    }

    /// エラー種別
    pub mod kind {
        pub const DATABASE: &str = "database";
        pub const MAIL_TRANSPORT: &str = "mail_transport";
        pub const TEMPLATE_ASSET: &str = "template_asset";
        pub const INTERNAL: &str = "internal";
    }
}
