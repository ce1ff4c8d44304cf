//! # CustomerRepository
//!
//! 顧客情報の永続化と、配信対象の抽出を担当するリポジトリ。
//!
//! ## 設計方針
//!
//! - **抽出は DB で行う**: ランダム抽出・誕生日抽出は `ORDER BY random()` で DB 側に任せる
//! - **一意制約の変換**: メールアドレス・CPF の重複は `InfraErrorKind::Conflict` として返す
//! - **日付はパラメータで受け取る**: 「今日」は呼び出し側の `Clock` から渡す

use async_trait::async_trait;
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use mailer_domain::customer::{Cpf, Customer, CustomerId, CustomerName, Email, Telephone};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::InfraError;

const ENTITY: &str = "Customer";

/// 顧客リポジトリトレイト
#[async_trait]
pub trait CustomerRepository: Send + Sync {
    /// 顧客を新規作成する
    ///
    /// メールアドレスまたは CPF が重複する場合は Conflict を返す。
    async fn insert(&self, customer: &Customer) -> Result<(), InfraError>;

    /// 顧客情報を更新する
    async fn update(&self, customer: &Customer) -> Result<(), InfraError>;

    async fn find_by_id(&self, id: &CustomerId) -> Result<Option<Customer>, InfraError>;

    async fn find_by_email(&self, email: &Email) -> Result<Option<Customer>, InfraError>;

    async fn find_by_cpf(&self, cpf: &Cpf) -> Result<Option<Customer>, InfraError>;

    /// 登録済み顧客の総数
    async fn count(&self) -> Result<i64, InfraError>;

    /// 顧客を一様ランダムに最大 `limit` 件抽出する
    async fn find_random(&self, limit: i64) -> Result<Vec<Customer>, InfraError>;

    /// `date` と月日が一致する誕生日の顧客をランダムに最大 `limit` 件抽出する
    async fn find_random_by_birthday(
        &self,
        date: NaiveDate,
        limit: i64,
    ) -> Result<Vec<Customer>, InfraError>;
}

/// PostgreSQL 実装の CustomerRepository
#[derive(Debug, Clone)]
pub struct PostgresCustomerRepository {
    pool: PgPool,
}

impl PostgresCustomerRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct CustomerRow {
    id:         Uuid,
    full_name:  String,
    birth_date: NaiveDate,
    email:      String,
    telephone:  Option<String>,
    cpf:        String,
    created_at: DateTime<Utc>,
}

impl TryFrom<CustomerRow> for Customer {
    type Error = InfraError;

    fn try_from(row: CustomerRow) -> Result<Self, Self::Error> {
        let invalid = |e: mailer_domain::DomainError| {
            InfraError::unexpected(format!("保存済みの顧客データが不正です (id={}): {e}", row.id))
        };

        Ok(Customer::from_db(
            CustomerId::from_uuid(row.id),
            CustomerName::new(&row.full_name).map_err(invalid)?,
            row.birth_date,
            Email::new(&row.email).map_err(invalid)?,
            row.telephone
                .as_deref()
                .map(Telephone::new)
                .transpose()
                .map_err(invalid)?,
            Cpf::new(&row.cpf).map_err(invalid)?,
            row.created_at,
        ))
    }
}

const SELECT_COLUMNS: &str =
    "SELECT id, full_name, birth_date, email, telephone, cpf, created_at FROM customers";

impl PostgresCustomerRepository {
    async fn fetch_one_where(
        &self,
        condition: &str,
        value: &str,
    ) -> Result<Option<Customer>, InfraError> {
        let row: Option<CustomerRow> =
            sqlx::query_as(&format!("{SELECT_COLUMNS} WHERE {condition} = $1"))
                .bind(value)
                .fetch_optional(&self.pool)
                .await?;

        row.map(Customer::try_from).transpose()
    }
}

#[async_trait]
impl CustomerRepository for PostgresCustomerRepository {
    #[tracing::instrument(skip_all, level = "debug", fields(customer_id = %customer.id()))]
    async fn insert(&self, customer: &Customer) -> Result<(), InfraError> {
        sqlx::query(
            r#"
            INSERT INTO customers (id, full_name, birth_date, email, telephone, cpf, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(customer.id().as_uuid())
        .bind(customer.full_name().as_str())
        .bind(customer.birth_date())
        .bind(customer.email().as_str())
        .bind(customer.telephone().map(Telephone::as_str))
        .bind(customer.cpf().as_str())
        .bind(customer.created_at())
        .execute(&self.pool)
        .await
        .map_err(|e| InfraError::from_unique_violation(ENTITY, e))?;

        Ok(())
    }

    #[tracing::instrument(skip_all, level = "debug", fields(customer_id = %customer.id()))]
    async fn update(&self, customer: &Customer) -> Result<(), InfraError> {
        sqlx::query(
            r#"
            UPDATE customers
            SET full_name = $2, birth_date = $3, email = $4, telephone = $5, cpf = $6
            WHERE id = $1
            "#,
        )
        .bind(customer.id().as_uuid())
        .bind(customer.full_name().as_str())
        .bind(customer.birth_date())
        .bind(customer.email().as_str())
        .bind(customer.telephone().map(Telephone::as_str))
        .bind(customer.cpf().as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| InfraError::from_unique_violation(ENTITY, e))?;

        Ok(())
    }

    async fn find_by_id(&self, id: &CustomerId) -> Result<Option<Customer>, InfraError> {
        let row: Option<CustomerRow> = sqlx::query_as(&format!("{SELECT_COLUMNS} WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        row.map(Customer::try_from).transpose()
    }

    async fn find_by_email(&self, email: &Email) -> Result<Option<Customer>, InfraError> {
        self.fetch_one_where("email", email.as_str()).await
    }

    async fn find_by_cpf(&self, cpf: &Cpf) -> Result<Option<Customer>, InfraError> {
        self.fetch_one_where("cpf", cpf.as_str()).await
    }

    async fn count(&self) -> Result<i64, InfraError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM customers")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    #[tracing::instrument(skip(self), level = "debug")]
    async fn find_random(&self, limit: i64) -> Result<Vec<Customer>, InfraError> {
        let rows: Vec<CustomerRow> =
            sqlx::query_as(&format!("{SELECT_COLUMNS} ORDER BY random() LIMIT $1"))
                .bind(limit)
                .fetch_all(&self.pool)
                .await?;

        rows.into_iter().map(Customer::try_from).collect()
    }

    #[tracing::instrument(skip(self), level = "debug")]
    async fn find_random_by_birthday(
        &self,
        date: NaiveDate,
        limit: i64,
    ) -> Result<Vec<Customer>, InfraError> {
        let rows: Vec<CustomerRow> = sqlx::query_as(&format!(
            r#"
            {SELECT_COLUMNS}
            WHERE EXTRACT(MONTH FROM birth_date)::int = $1
              AND EXTRACT(DAY FROM birth_date)::int = $2
            ORDER BY random()
            LIMIT $3
            "#
        ))
        .bind(date.month() as i32)
        .bind(date.day() as i32)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Customer::try_from).collect()
    }
}
