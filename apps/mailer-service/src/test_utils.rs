//! テストユーティリティ
//!
//! ユースケーステスト・統合テストで共通に使う固定データとビルダー。

mod dispatch_test_builder;

use std::{
    collections::VecDeque,
    sync::{
        Mutex,
        atomic::{AtomicU64, Ordering},
    },
};

use chrono::{NaiveDate, TimeZone, Utc};
pub use dispatch_test_builder::{DispatchTestBuilder, DispatchTestSetup, asset_dir};
use mailer_domain::{
    customer::{Cpf, Customer, CustomerId, CustomerName, Email},
    template::FillValues,
};
use serde_json::json;

use crate::usecase::dispatch::{DispatchRequest, Sampler};

/// あらかじめ与えた値を順に返すサンプラー
///
/// 値を使い切った後は `fallback` を返し続ける。
pub struct SequenceSampler {
    draws:    Mutex<VecDeque<f64>>,
    fallback: f64,
}

impl SequenceSampler {
    pub fn new(draws: impl IntoIterator<Item = f64>) -> Self {
        Self {
            draws:    Mutex::new(draws.into_iter().collect()),
            fallback: 0.0,
        }
    }

    pub fn with_fallback(mut self, fallback: f64) -> Self {
        self.fallback = fallback;
        self
    }
}

impl Sampler for SequenceSampler {
    fn draw(&self) -> f64 {
        self.draws.lock().unwrap().pop_front().unwrap_or(self.fallback)
    }
}

static CPF_SEQUENCE: AtomicU64 = AtomicU64::new(10_000_000_000);

/// 一意な CPF を採番する
pub fn next_cpf() -> Cpf {
    Cpf::new(CPF_SEQUENCE.fetch_add(1, Ordering::Relaxed).to_string()).unwrap()
}

/// 指定アドレスの顧客（生年月日 1990-01-01）
pub fn customer(email: &str) -> Customer {
    customer_born_on(email, NaiveDate::from_ymd_opt(1990, 1, 1).unwrap())
}

/// 指定アドレス・生年月日の顧客
pub fn customer_born_on(email: &str, birth_date: NaiveDate) -> Customer {
    Customer::from_db(
        CustomerId::new(),
        CustomerName::new("Maria da Silva").unwrap(),
        birth_date,
        Email::new(email).unwrap(),
        None,
        next_cpf(),
        Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
    )
}

/// 割引クーポンの差し込み値（2026-03-01 〜 2026-03-31、15%）
pub fn discount_coupon_fill_values() -> FillValues {
    let serde_json::Value::Object(values) = json!({
        "image_name": "discount_cupom_header.png",
        "discount_value": 15,
        "coupon_code": "PROMO15",
        "valid_dates_start": "2026-03-01",
        "valid_dates_end": "2026-03-31",
    }) else {
        unreachable!("json! のオブジェクトリテラル")
    };
    values
}

/// 割引クーポンの配信リクエスト
pub fn discount_coupon_request(count: i64) -> DispatchRequest {
    DispatchRequest {
        template_id: "discount_coupon".to_string(),
        subject: "Cupom de desconto".to_string(),
        fill_values: discount_coupon_fill_values(),
        count,
    }
}
