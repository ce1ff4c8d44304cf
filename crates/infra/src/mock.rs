//! # テスト用モック
//!
//! ユースケーステストで使用するインメモリ実装。
//! `test-utils` feature を有効にすることで、他クレートからも利用可能。
//!
//! ```toml
//! [dev-dependencies]
//! mailer-infra = { workspace = true, features = ["test-utils"] }
//! ```

use std::{
    collections::HashSet,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use chrono::NaiveDate;
use mailer_domain::{
    customer::{Cpf, Customer, CustomerId, Email},
    mail::{MailError, OutboundEmail},
    sending_behavior::SendingBehavior,
};

use crate::{
    error::InfraError,
    mail::MailTransport,
    repository::{CustomerRepository, SendingBehaviorRepository},
};

// ===== MockCustomerRepository =====

/// インメモリの顧客ディレクトリ
///
/// `find_random` / `find_random_by_birthday` はランダムではなく登録順に返すため、
/// テストで受信者の順序を固定できる。
#[derive(Clone, Default)]
pub struct MockCustomerRepository {
    customers:        Arc<Mutex<Vec<Customer>>>,
    fail_queries:     Arc<Mutex<bool>>,
    requested_limits: Arc<Mutex<Vec<i64>>>,
}

impl MockCustomerRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_customers(customers: Vec<Customer>) -> Self {
        let repo = Self::new();
        *repo.customers.lock().unwrap() = customers;
        repo
    }

    pub fn add_customer(&self, customer: Customer) {
        self.customers.lock().unwrap().push(customer);
    }

    /// 以降の抽出クエリ（ランダム抽出、メールアドレス・CPF による検索）をエラーにする
    pub fn fail_queries(&self) {
        *self.fail_queries.lock().unwrap() = true;
    }

    /// 抽出クエリに渡された `limit` の履歴
    pub fn requested_limits(&self) -> Vec<i64> {
        self.requested_limits.lock().unwrap().clone()
    }

    pub fn customers(&self) -> Vec<Customer> {
        self.customers.lock().unwrap().clone()
    }

    fn check_available(&self) -> Result<(), InfraError> {
        if *self.fail_queries.lock().unwrap() {
            return Err(InfraError::unexpected("モック: 顧客ディレクトリに接続できません"));
        }
        Ok(())
    }

    fn take(&self, limit: i64, predicate: impl Fn(&Customer) -> bool) -> Vec<Customer> {
        self.requested_limits.lock().unwrap().push(limit);
        self.customers
            .lock()
            .unwrap()
            .iter()
            .filter(|c| predicate(c))
            .take(usize::try_from(limit).unwrap_or(0))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl CustomerRepository for MockCustomerRepository {
    async fn insert(&self, customer: &Customer) -> Result<(), InfraError> {
        let mut customers = self.customers.lock().unwrap();
        if customers.iter().any(|c| c.email() == customer.email()) {
            return Err(InfraError::conflict("Customer", "email"));
        }
        if customers.iter().any(|c| c.cpf() == customer.cpf()) {
            return Err(InfraError::conflict("Customer", "cpf"));
        }
        customers.push(customer.clone());
        Ok(())
    }

    async fn update(&self, customer: &Customer) -> Result<(), InfraError> {
        let mut customers = self.customers.lock().unwrap();
        if let Some(existing) = customers.iter_mut().find(|c| c.id() == customer.id()) {
            *existing = customer.clone();
        }
        Ok(())
    }

    async fn find_by_id(&self, id: &CustomerId) -> Result<Option<Customer>, InfraError> {
        Ok(self
            .customers
            .lock()
            .unwrap()
            .iter()
            .find(|c| c.id() == id)
            .cloned())
    }

    async fn find_by_email(&self, email: &Email) -> Result<Option<Customer>, InfraError> {
        self.check_available()?;
        Ok(self
            .customers
            .lock()
            .unwrap()
            .iter()
            .find(|c| c.email() == email)
            .cloned())
    }

    async fn find_by_cpf(&self, cpf: &Cpf) -> Result<Option<Customer>, InfraError> {
        self.check_available()?;
        Ok(self
            .customers
            .lock()
            .unwrap()
            .iter()
            .find(|c| c.cpf() == cpf)
            .cloned())
    }

    async fn count(&self) -> Result<i64, InfraError> {
        Ok(self.customers.lock().unwrap().len() as i64)
    }

    async fn find_random(&self, limit: i64) -> Result<Vec<Customer>, InfraError> {
        self.check_available()?;
        Ok(self.take(limit, |_| true))
    }

    async fn find_random_by_birthday(
        &self,
        date: NaiveDate,
        limit: i64,
    ) -> Result<Vec<Customer>, InfraError> {
        self.check_available()?;
        Ok(self.take(limit, |c| c.has_birthday_on(date)))
    }
}

// ===== MockSendingBehaviorRepository =====

#[derive(Clone, Default)]
pub struct MockSendingBehaviorRepository {
    current:     Arc<Mutex<Option<SendingBehavior>>>,
    unavailable: Arc<Mutex<bool>>,
    reads:       Arc<Mutex<usize>>,
}

impl MockSendingBehaviorRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_behavior(behavior: SendingBehavior) -> Self {
        let repo = Self::new();
        *repo.current.lock().unwrap() = Some(behavior);
        repo
    }

    /// 以降の読み書きをすべてエラーにする
    pub fn make_unavailable(&self) {
        *self.unavailable.lock().unwrap() = true;
    }

    /// 現在値を直接書き換える（別の管理者による変更の再現用）
    pub fn overwrite(&self, behavior: SendingBehavior) {
        *self.current.lock().unwrap() = Some(behavior);
    }

    /// `get` が呼ばれた回数
    pub fn read_count(&self) -> usize {
        *self.reads.lock().unwrap()
    }

    fn check_available(&self) -> Result<(), InfraError> {
        if *self.unavailable.lock().unwrap() {
            return Err(InfraError::unexpected("モック: ビヘイビアストアに接続できません"));
        }
        Ok(())
    }
}

#[async_trait]
impl SendingBehaviorRepository for MockSendingBehaviorRepository {
    async fn get(&self) -> Result<Option<SendingBehavior>, InfraError> {
        *self.reads.lock().unwrap() += 1;
        self.check_available()?;
        Ok(*self.current.lock().unwrap())
    }

    async fn set(&self, behavior: SendingBehavior) -> Result<(), InfraError> {
        self.check_available()?;
        *self.current.lock().unwrap() = Some(behavior);
        Ok(())
    }
}

// ===== MockMailTransport =====

/// 送信内容を記録するメールトランスポート
///
/// `fail_for` に登録した宛先への送信は `MailError::SendFailed` を返し、
/// `panic_for` に登録した宛先への送信はパニックする。
#[derive(Clone, Default)]
pub struct MockMailTransport {
    sent:      Arc<Mutex<Vec<OutboundEmail>>>,
    attempted: Arc<Mutex<Vec<String>>>,
    failing:   Arc<Mutex<HashSet<String>>>,
    panicking: Arc<Mutex<HashSet<String>>>,
}

impl MockMailTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_for(&self, address: impl Into<String>) {
        self.failing.lock().unwrap().insert(address.into());
    }

    pub fn panic_for(&self, address: impl Into<String>) {
        self.panicking.lock().unwrap().insert(address.into());
    }

    /// 送信に成功したメール
    pub fn sent_emails(&self) -> Vec<OutboundEmail> {
        self.sent.lock().unwrap().clone()
    }

    /// 送信を試行した宛先（成功・失敗を問わない）
    pub fn attempted_addresses(&self) -> Vec<String> {
        self.attempted.lock().unwrap().clone()
    }
}

#[async_trait]
impl MailTransport for MockMailTransport {
    async fn send(&self, email: &OutboundEmail) -> Result<(), MailError> {
        self.attempted.lock().unwrap().push(email.to.clone());

        if self.panicking.lock().unwrap().contains(&email.to) {
            panic!("モック: {} への送信でパニック", email.to);
        }
        if self.failing.lock().unwrap().contains(&email.to) {
            return Err(MailError::SendFailed(format!(
                "モック: {} への送信に失敗",
                email.to
            )));
        }

        self.sent.lock().unwrap().push(email.clone());
        Ok(())
    }
}
