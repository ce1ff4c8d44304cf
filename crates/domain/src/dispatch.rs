//! # 配信
//!
//! 1 回の配信リクエストを識別する [`DispatchId`] と、
//! 受信者ごとの配信結果 [`DispatchOutcome`] を定義する。

use serde::{Deserialize, Serialize};
use strum::IntoStaticStr;

define_uuid_id! {
    /// 配信 ID
    ///
    /// 配信リクエストの受付時に採番し、受付レスポンスと全ログに含める。
    pub struct DispatchId;
}

/// 受信者ごとの配信結果
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, IntoStaticStr, strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DispatchOutcome {
    /// 送信成功
    Sent,
    /// 確率サンプリングによりスキップ（送信を試行していない）
    SkippedBySampling,
    /// 送信を試行したが失敗
    DeliveryFailed,
}
