//! 顧客管理ユースケース

use std::sync::Arc;

use chrono::NaiveDate;
use mailer_domain::{
    clock::Clock,
    customer::{
        Cpf,
        Customer,
        CustomerChanges,
        CustomerId,
        CustomerName,
        Email,
        NewCustomer,
        Telephone,
    },
};
use mailer_infra::{InfraError, repository::CustomerRepository};
use mailer_shared::{event_log::event, log_business_event};

use crate::error::MailerError;

/// 顧客登録の入力
pub struct CreateCustomerInput {
    pub full_name:  String,
    pub birth_date: NaiveDate,
    pub email:      String,
    pub telephone:  Option<String>,
    pub cpf:        String,
}

/// 顧客更新の入力
///
/// `None` のフィールドは変更しない。
#[derive(Default)]
pub struct UpdateCustomerInput {
    pub full_name:  Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub email:      Option<String>,
    pub telephone:  Option<String>,
    pub cpf:        Option<String>,
}

impl UpdateCustomerInput {
    fn is_empty(&self) -> bool {
        self.full_name.is_none()
            && self.birth_date.is_none()
            && self.email.is_none()
            && self.telephone.is_none()
            && self.cpf.is_none()
    }
}

/// 顧客管理ユースケース
pub struct CustomerUseCaseImpl {
    customers: Arc<dyn CustomerRepository>,
    clock:     Arc<dyn Clock>,
}

impl CustomerUseCaseImpl {
    pub fn new(customers: Arc<dyn CustomerRepository>, clock: Arc<dyn Clock>) -> Self {
        Self { customers, clock }
    }

    /// 顧客を登録する
    ///
    /// 1. 各値オブジェクトを検証
    /// 2. メールアドレス・CPF の重複を確認
    /// 3. 生年月日が今日より前であることを検証して Customer を作成
    /// 4. DB に挿入（同時登録による重複は DB 制約で検出）
    pub async fn create(&self, input: CreateCustomerInput) -> Result<Customer, MailerError> {
        let fields = NewCustomer {
            full_name:  CustomerName::new(input.full_name)?,
            birth_date: input.birth_date,
            email:      Email::new(input.email)?,
            telephone:  input.telephone.map(Telephone::new).transpose()?,
            cpf:        Cpf::new(input.cpf)?,
        };

        self.ensure_email_available(&fields.email, None).await?;
        self.ensure_cpf_available(&fields.cpf, None).await?;

        let customer = Customer::new(
            CustomerId::new(),
            fields,
            self.clock.today(),
            self.clock.now(),
        )?;

        self.customers
            .insert(&customer)
            .await
            .map_err(conflict_or_database)?;

        log_business_event!(
            event.category = event::category::CUSTOMER,
            event.action = event::action::CUSTOMER_CREATED,
            event.result = event::result::SUCCESS,
            customer.id = %customer.id(),
            "顧客を登録しました"
        );

        Ok(customer)
    }

    /// 顧客情報を部分更新する
    ///
    /// メールアドレス・CPF を変更する場合は、他の顧客との重複を確認する。
    pub async fn update(
        &self,
        id: &CustomerId,
        input: UpdateCustomerInput,
    ) -> Result<Customer, MailerError> {
        if input.is_empty() {
            return Err(MailerError::BadRequest(
                "更新する項目を 1 つ以上指定してください".to_string(),
            ));
        }

        let current = self.find(id).await?;

        let changes = CustomerChanges {
            full_name:  input.full_name.map(CustomerName::new).transpose()?,
            birth_date: input.birth_date,
            email:      input.email.map(Email::new).transpose()?,
            telephone:  input.telephone.map(Telephone::new).transpose()?,
            cpf:        input.cpf.map(Cpf::new).transpose()?,
        };

        if let Some(email) = changes.email.as_ref().filter(|e| *e != current.email()) {
            self.ensure_email_available(email, Some(id)).await?;
        }
        if let Some(cpf) = changes.cpf.as_ref().filter(|c| *c != current.cpf()) {
            self.ensure_cpf_available(cpf, Some(id)).await?;
        }

        let updated = current.apply_changes(changes, self.clock.today())?;

        self.customers
            .update(&updated)
            .await
            .map_err(conflict_or_database)?;

        log_business_event!(
            event.category = event::category::CUSTOMER,
            event.action = event::action::CUSTOMER_UPDATED,
            event.result = event::result::SUCCESS,
            customer.id = %updated.id(),
            "顧客情報を更新しました"
        );

        Ok(updated)
    }

    pub async fn get_by_id(&self, id: &CustomerId) -> Result<Customer, MailerError> {
        self.find(id).await
    }

    pub async fn get_by_email(&self, email: &str) -> Result<Customer, MailerError> {
        let email = Email::new(email)?;

        self.customers
            .find_by_email(&email)
            .await?
            .ok_or_else(|| MailerError::NotFound(format!("顧客が見つかりません: {email}")))
    }

    /// 登録済み顧客数
    pub async fn total(&self) -> Result<i64, MailerError> {
        Ok(self.customers.count().await?)
    }

    async fn find(&self, id: &CustomerId) -> Result<Customer, MailerError> {
        self.customers
            .find_by_id(id)
            .await?
            .ok_or_else(|| MailerError::NotFound(format!("顧客が見つかりません: {id}")))
    }

    async fn ensure_email_available(
        &self,
        email: &Email,
        owner: Option<&CustomerId>,
    ) -> Result<(), MailerError> {
        match self.customers.find_by_email(email).await? {
            Some(existing) if Some(existing.id()) != owner => Err(MailerError::Conflict(
                "このメールアドレスは既に登録されています".to_string(),
            )),
            _ => Ok(()),
        }
    }

    async fn ensure_cpf_available(
        &self,
        cpf: &Cpf,
        owner: Option<&CustomerId>,
    ) -> Result<(), MailerError> {
        match self.customers.find_by_cpf(cpf).await? {
            Some(existing) if Some(existing.id()) != owner => Err(MailerError::Conflict(
                "この CPF は既に登録されています".to_string(),
            )),
            _ => Ok(()),
        }
    }
}

fn conflict_or_database(e: InfraError) -> MailerError {
    match e.as_conflict() {
        Some((_, field)) => MailerError::Conflict(format!("{field} は既に登録されています")),
        None => MailerError::Database(e),
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use mailer_domain::clock::FixedClock;
    use mailer_infra::mock::MockCustomerRepository;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;
    use crate::test_utils::customer;

    fn clock() -> Arc<dyn Clock> {
        Arc::new(FixedClock::new(
            Utc.with_ymd_and_hms(2026, 3, 15, 9, 0, 0).unwrap(),
        ))
    }

    fn input() -> CreateCustomerInput {
        CreateCustomerInput {
            full_name:  "  João Pereira ".to_string(),
            birth_date: NaiveDate::from_ymd_opt(1988, 7, 2).unwrap(),
            email:      "joao@example.com".to_string(),
            telephone:  Some("+5511987654321".to_string()),
            cpf:        "12345678901".to_string(),
        }
    }

    #[tokio::test]
    async fn test_顧客を登録できる() {
        let repo = MockCustomerRepository::new();
        let sut = CustomerUseCaseImpl::new(Arc::new(repo.clone()), clock());

        let created = sut.create(input()).await.unwrap();

        assert_eq!(created.full_name().as_str(), "João Pereira");
        assert_eq!(created.email().as_str(), "joao@example.com");
        assert_eq!(
            created.created_at(),
            Utc.with_ymd_and_hms(2026, 3, 15, 9, 0, 0).unwrap()
        );
        assert_eq!(repo.customers(), vec![created]);
    }

    #[tokio::test]
    async fn test_メールアドレスが重複すると409() {
        let repo = MockCustomerRepository::with_customers(vec![customer("joao@example.com")]);
        let sut = CustomerUseCaseImpl::new(Arc::new(repo), clock());

        let result = sut.create(input()).await;

        assert!(matches!(result, Err(MailerError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_cpfが重複すると409() {
        let repo = MockCustomerRepository::new();
        let sut = CustomerUseCaseImpl::new(Arc::new(repo), clock());
        sut.create(input()).await.unwrap();

        let result = sut
            .create(CreateCustomerInput {
                email: "outro@example.com".to_string(),
                ..input()
            })
            .await;

        assert!(matches!(result, Err(MailerError::Conflict(msg)) if msg.contains("CPF")));
    }

    #[rstest]
    #[case::短い氏名(CreateCustomerInput { full_name: "Jo".to_string(), ..input() })]
    #[case::不正なメール(CreateCustomerInput { email: "joao.example.com".to_string(), ..input() })]
    #[case::cpfが10桁(CreateCustomerInput { cpf: "1234567890".to_string(), ..input() })]
    #[case::不正な電話番号(CreateCustomerInput { telephone: Some("12-34".to_string()), ..input() })]
    #[case::生年月日が今日(CreateCustomerInput {
        birth_date: NaiveDate::from_ymd_opt(2026, 3, 15).unwrap(),
        ..input()
    })]
    #[tokio::test]
    async fn test_不正な入力は登録できない(#[case] input: CreateCustomerInput) {
        let repo = MockCustomerRepository::new();
        let sut = CustomerUseCaseImpl::new(Arc::new(repo.clone()), clock());

        let result = sut.create(input).await;

        assert!(matches!(result, Err(MailerError::Validation(_))));
        assert!(repo.customers().is_empty());
    }

    #[tokio::test]
    async fn test_顧客情報を部分更新できる() {
        let repo = MockCustomerRepository::new();
        let sut = CustomerUseCaseImpl::new(Arc::new(repo.clone()), clock());
        let created = sut.create(input()).await.unwrap();

        let updated = sut
            .update(
                created.id(),
                UpdateCustomerInput {
                    email: Some("joao.novo@example.com".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.email().as_str(), "joao.novo@example.com");
        assert_eq!(updated.full_name(), created.full_name());
        assert_eq!(updated.cpf(), created.cpf());
        assert_eq!(repo.customers(), vec![updated]);
    }

    #[tokio::test]
    async fn test_自分自身の値のままなら重複扱いしない() {
        let repo = MockCustomerRepository::new();
        let sut = CustomerUseCaseImpl::new(Arc::new(repo), clock());
        let created = sut.create(input()).await.unwrap();

        let result = sut
            .update(
                created.id(),
                UpdateCustomerInput {
                    email: Some("joao@example.com".to_string()),
                    cpf: Some("12345678901".to_string()),
                    ..Default::default()
                },
            )
            .await;

        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_他の顧客のメールアドレスへは変更できない() {
        let other = customer("maria@example.com");
        let repo = MockCustomerRepository::with_customers(vec![other]);
        let sut = CustomerUseCaseImpl::new(Arc::new(repo), clock());
        let created = sut.create(input()).await.unwrap();

        let result = sut
            .update(
                created.id(),
                UpdateCustomerInput {
                    email: Some("maria@example.com".to_string()),
                    ..Default::default()
                },
            )
            .await;

        assert!(matches!(result, Err(MailerError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_空の更新は400() {
        let repo = MockCustomerRepository::new();
        let sut = CustomerUseCaseImpl::new(Arc::new(repo), clock());
        let created = sut.create(input()).await.unwrap();

        let result = sut
            .update(created.id(), UpdateCustomerInput::default())
            .await;

        assert!(matches!(result, Err(MailerError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_存在しない顧客の更新は404() {
        let sut = CustomerUseCaseImpl::new(Arc::new(MockCustomerRepository::new()), clock());

        let result = sut
            .update(
                &CustomerId::new(),
                UpdateCustomerInput {
                    full_name: Some("Maria Souza".to_string()),
                    ..Default::default()
                },
            )
            .await;

        assert!(matches!(result, Err(MailerError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_idとメールアドレスで取得できる() {
        let existing = customer("maria@example.com");
        let repo = MockCustomerRepository::with_customers(vec![existing.clone()]);
        let sut = CustomerUseCaseImpl::new(Arc::new(repo), clock());

        assert_eq!(sut.get_by_id(existing.id()).await.unwrap(), existing);
        assert_eq!(
            sut.get_by_email("maria@example.com").await.unwrap(),
            existing
        );
        assert!(matches!(
            sut.get_by_email("ninguem@example.com").await,
            Err(MailerError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_登録済み顧客数を返す() {
        let repo = MockCustomerRepository::with_customers(vec![
            customer("a@example.com"),
            customer("b@example.com"),
        ]);
        let sut = CustomerUseCaseImpl::new(Arc::new(repo), clock());

        assert_eq!(sut.total().await.unwrap(), 2);
    }
}
