//! # 重複排除と登録
//!
//! 正規化済みの行をドメインの値オブジェクトで検証し、顧客ディレクトリに登録する。
//!
//! - ファイル内でメールアドレスまたは CPF が重複する行は、最初の行だけを採用する
//! - 顧客ディレクトリに登録済みのメールアドレス・CPF を持つ行はスキップする
//! - 行単位の不備はスキップして続行し、ストアの障害は中断する

use std::{collections::HashSet, sync::Arc};

use mailer_domain::{
    DomainError,
    clock::Clock,
    customer::{Cpf, Customer, CustomerId, CustomerName, Email, NewCustomer, Telephone},
};
use mailer_infra::repository::CustomerRepository;
use mailer_shared::{event_log::event, log_business_event};

use crate::{
    ImportError,
    normalize::{CustomerRecord, RowResult},
};

/// インポート結果の集計
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    /// 読み込んだデータ行数
    pub read:              usize,
    /// 登録した（ドライランでは登録可能だった）行数
    pub imported:          usize,
    /// 不備によりスキップした行数
    pub skipped_invalid:   usize,
    /// 重複によりスキップした行数
    pub skipped_duplicate: usize,
}

/// 行ごとの判定
enum RowOutcome {
    Imported,
    Invalid,
    Duplicate,
}

pub struct CustomerImporter {
    customers: Arc<dyn CustomerRepository>,
    clock:     Arc<dyn Clock>,
    dry_run:   bool,
}

impl CustomerImporter {
    pub fn new(customers: Arc<dyn CustomerRepository>, clock: Arc<dyn Clock>) -> Self {
        Self {
            customers,
            clock,
            dry_run: false,
        }
    }

    /// 顧客ディレクトリへ書き込まずに判定だけを行う
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// 読み込んだ行を順に登録する
    ///
    /// # エラー
    ///
    /// 顧客ディレクトリの参照・登録に失敗した場合（一意制約違反を除く）は中断する。
    /// それまでに登録した行は取り消さない。
    pub async fn import(&self, rows: Vec<RowResult>) -> Result<ImportSummary, ImportError> {
        let mut summary = ImportSummary {
            read: rows.len(),
            ..ImportSummary::default()
        };
        let mut seen_emails = HashSet::new();
        let mut seen_cpfs = HashSet::new();

        for (line, row) in rows {
            let outcome = match row {
                Ok(record) => {
                    self.import_record(record, &mut seen_emails, &mut seen_cpfs)
                        .await?
                }
                Err(reason) => {
                    tracing::warn!(line, reason = %reason, "行をスキップしました");
                    RowOutcome::Invalid
                }
            };

            match outcome {
                RowOutcome::Imported => summary.imported += 1,
                RowOutcome::Invalid => summary.skipped_invalid += 1,
                RowOutcome::Duplicate => summary.skipped_duplicate += 1,
            }
        }

        log_business_event!(
            event.category = event::category::CUSTOMER,
            event.action = event::action::CUSTOMERS_IMPORTED,
            event.result = event::result::SUCCESS,
            import.dry_run = self.dry_run,
            import.read = summary.read,
            import.imported = summary.imported,
            import.skipped_invalid = summary.skipped_invalid,
            import.skipped_duplicate = summary.skipped_duplicate,
            "顧客インポート完了"
        );

        Ok(summary)
    }

    async fn import_record(
        &self,
        record: CustomerRecord,
        seen_emails: &mut HashSet<String>,
        seen_cpfs: &mut HashSet<String>,
    ) -> Result<RowOutcome, ImportError> {
        let line = record.line;

        let customer = match self.to_customer(record) {
            Ok(customer) => customer,
            Err(reason) => {
                tracing::warn!(line, reason = %reason, "行をスキップしました");
                return Ok(RowOutcome::Invalid);
            }
        };

        let email_is_new = seen_emails.insert(customer.email().as_str().to_string());
        let cpf_is_new = seen_cpfs.insert(customer.cpf().as_str().to_string());
        if !email_is_new || !cpf_is_new {
            tracing::warn!(line, "ファイル内で重複している行をスキップしました");
            return Ok(RowOutcome::Duplicate);
        }

        if self.customers.find_by_email(customer.email()).await?.is_some()
            || self.customers.find_by_cpf(customer.cpf()).await?.is_some()
        {
            tracing::info!(line, "登録済みの顧客をスキップしました");
            return Ok(RowOutcome::Duplicate);
        }

        if self.dry_run {
            return Ok(RowOutcome::Imported);
        }

        match self.customers.insert(&customer).await {
            Ok(()) => Ok(RowOutcome::Imported),
            Err(e) if e.as_conflict().is_some() => {
                tracing::info!(line, error = %e, "登録済みの顧客をスキップしました");
                Ok(RowOutcome::Duplicate)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn to_customer(&self, record: CustomerRecord) -> Result<Customer, DomainError> {
        let telephone = record.telephone.and_then(|raw| match Telephone::new(raw) {
            Ok(telephone) => Some(telephone),
            Err(e) => {
                tracing::warn!(line = record.line, error = %e, "電話番号を破棄しました");
                None
            }
        });

        let fields = NewCustomer {
            full_name: CustomerName::new(record.full_name)?,
            birth_date: record.birth_date,
            email: Email::new(record.email)?,
            telephone,
            cpf: Cpf::new(record.cpf)?,
        };

        Customer::new(
            CustomerId::new(),
            fields,
            self.clock.today(),
            self.clock.now(),
        )
    }
}
