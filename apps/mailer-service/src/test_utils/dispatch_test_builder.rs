//! 配信テストビルダー
//!
//! モックリポジトリ・モックトランスポート・固定乱数列で [`DispatchEngine`] を組み立てる。

use std::{path::PathBuf, sync::Arc};

use chrono::{NaiveDate, TimeZone, Utc};
use mailer_domain::{clock::FixedClock, customer::Customer, sending_behavior::SendingBehavior};
use mailer_infra::{
    mail::MailTransport,
    mock::{MockCustomerRepository, MockMailTransport, MockSendingBehaviorRepository},
};

use super::SequenceSampler;
use crate::usecase::dispatch::{DispatchEngine, Sampler, TemplateRenderer};

/// 配信テストのセットアップデータ
pub struct DispatchTestSetup {
    pub sut:       DispatchEngine,
    pub behaviors: MockSendingBehaviorRepository,
    pub customers: MockCustomerRepository,
    pub transport: MockMailTransport,
}

/// 配信テストビルダー
///
/// # 使用例
///
/// ```ignore
/// let setup = DispatchTestBuilder::new()
///     .behavior(SendingBehavior::HighChance)
///     .customers(vec![customer("a@example.com")])
///     .draws(vec![0.9])
///     .build();
///
/// let handle = setup.sut.dispatch(discount_coupon_request(1)).await.unwrap();
/// ```
pub struct DispatchTestBuilder {
    behaviors:       MockSendingBehaviorRepository,
    customers:       MockCustomerRepository,
    transport:       MockMailTransport,
    sampler:         Arc<dyn Sampler>,
    renderer:        Option<Arc<TemplateRenderer>>,
    today:           NaiveDate,
    max_concurrency: usize,
}

impl DispatchTestBuilder {
    /// ビヘイビア未設定・顧客なし・乱数 0.0 固定で作成
    pub fn new() -> Self {
        Self {
            behaviors:       MockSendingBehaviorRepository::new(),
            customers:       MockCustomerRepository::new(),
            transport:       MockMailTransport::new(),
            sampler:         Arc::new(SequenceSampler::new([])),
            renderer:        None,
            today:           NaiveDate::from_ymd_opt(2026, 3, 15).unwrap(),
            max_concurrency: 4,
        }
    }

    /// 送信ビヘイビアを設定済みにする
    pub fn behavior(mut self, behavior: SendingBehavior) -> Self {
        self.behaviors = MockSendingBehaviorRepository::with_behavior(behavior);
        self
    }

    pub fn behavior_repository(mut self, behaviors: MockSendingBehaviorRepository) -> Self {
        self.behaviors = behaviors;
        self
    }

    pub fn customers(mut self, customers: Vec<Customer>) -> Self {
        self.customers = MockCustomerRepository::with_customers(customers);
        self
    }

    pub fn customer_repository(mut self, customers: MockCustomerRepository) -> Self {
        self.customers = customers;
        self
    }

    pub fn transport(mut self, transport: MockMailTransport) -> Self {
        self.transport = transport;
        self
    }

    /// 候補者の順に使う乱数列（使い切った後は 0.0）
    pub fn draws(mut self, draws: Vec<f64>) -> Self {
        self.sampler = Arc::new(SequenceSampler::new(draws));
        self
    }

    pub fn sampler(mut self, sampler: Arc<dyn Sampler>) -> Self {
        self.sampler = sampler;
        self
    }

    /// 同梱テンプレート以外のレンダラーを使う
    pub fn renderer(mut self, renderer: TemplateRenderer) -> Self {
        self.renderer = Some(Arc::new(renderer));
        self
    }

    /// 誕生日判定に使う「今日」
    pub fn today(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    pub fn max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency;
        self
    }

    pub fn build(self) -> DispatchTestSetup {
        let transport = Arc::new(self.transport.clone());
        self.build_with_transport(transport)
    }

    /// モック以外のトランスポートで組み立てる
    ///
    /// 返り値の `transport` には送信が記録されない。
    pub fn build_with_transport(self, transport: Arc<dyn MailTransport>) -> DispatchTestSetup {
        let now = Utc.from_utc_datetime(&self.today.and_hms_opt(12, 0, 0).unwrap());

        let sut = DispatchEngine::new(
            Arc::new(self.behaviors.clone()),
            Arc::new(self.customers.clone()),
            transport,
            self.renderer
                .unwrap_or_else(|| Arc::new(TemplateRenderer::new(asset_dir()).unwrap())),
            self.sampler,
            Arc::new(FixedClock::new(now)),
            self.max_concurrency,
        );

        DispatchTestSetup {
            sut,
            behaviors: self.behaviors,
            customers: self.customers,
            transport: self.transport,
        }
    }
}

impl Default for DispatchTestBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// リポジトリ同梱のテンプレート画像ディレクトリ
pub fn asset_dir() -> PathBuf {
    PathBuf::from(concat!(env!("CARGO_MANIFEST_DIR"), "/assets/templates"))
}
