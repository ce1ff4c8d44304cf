//! CustomerRepository 統合テスト
//!
//! データベースを使用したテスト。sqlx::test マクロを使用して、
//! テストごとに独立したデータベースを作成する。
//!
//! 実行方法:
//! ```bash
//! DATABASE_URL=postgres://localhost/mailer cargo test -p mailer-infra --test customer_repository_test
//! ```

use std::collections::HashSet;

use chrono::{NaiveDate, Utc};
use mailer_domain::customer::{
    Cpf,
    Customer,
    CustomerChanges,
    CustomerId,
    CustomerName,
    Email,
    NewCustomer,
    Telephone,
};
use mailer_infra::{
    InfraErrorKind,
    repository::{CustomerRepository, PostgresCustomerRepository},
};
use pretty_assertions::assert_eq;
use sqlx::PgPool;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn today() -> NaiveDate {
    date(2026, 3, 14)
}

/// 連番から一意なメールアドレス・CPF を持つ顧客を作る
fn customer(seq: u32, birth_date: NaiveDate) -> Customer {
    Customer::new(
        CustomerId::new(),
        NewCustomer {
            full_name: CustomerName::new(format!("Cliente {seq}")).unwrap(),
            birth_date,
            email: Email::new(format!("cliente{seq}@example.com")).unwrap(),
            telephone: Some(Telephone::new("+5511987654321").unwrap()),
            cpf: Cpf::new(format!("{seq:011}")).unwrap(),
        },
        today(),
        Utc::now(),
    )
    .unwrap()
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_顧客を登録してidで取得できる(pool: PgPool) {
    let sut = PostgresCustomerRepository::new(pool);
    let original = customer(1, date(1990, 5, 17));

    sut.insert(&original).await.unwrap();
    let found = sut.find_by_id(original.id()).await.unwrap().unwrap();

    assert_eq!(found.id(), original.id());
    assert_eq!(found.email(), original.email());
    assert_eq!(found.cpf(), original.cpf());
    assert_eq!(found.telephone(), original.telephone());
    assert_eq!(found.birth_date(), original.birth_date());
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_メールアドレスとcpfで検索できる(pool: PgPool) {
    let sut = PostgresCustomerRepository::new(pool);
    let original = customer(2, date(1985, 1, 2));
    sut.insert(&original).await.unwrap();

    let by_email = sut.find_by_email(original.email()).await.unwrap();
    let by_cpf = sut.find_by_cpf(original.cpf()).await.unwrap();
    let missing = sut
        .find_by_email(&Email::new("nobody@example.com").unwrap())
        .await
        .unwrap();

    assert_eq!(by_email.map(|c| c.id().clone()), Some(original.id().clone()));
    assert_eq!(by_cpf.map(|c| c.id().clone()), Some(original.id().clone()));
    assert!(missing.is_none());
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_メールアドレスの重複はconflict(pool: PgPool) {
    let sut = PostgresCustomerRepository::new(pool);
    let first = customer(3, date(1990, 1, 1));
    sut.insert(&first).await.unwrap();

    let duplicate = Customer::new(
        CustomerId::new(),
        NewCustomer {
            full_name:  CustomerName::new("Outra Pessoa").unwrap(),
            birth_date: date(1991, 1, 1),
            email:      first.email().clone(),
            telephone:  None,
            cpf:        Cpf::new("99999999999").unwrap(),
        },
        today(),
        Utc::now(),
    )
    .unwrap();

    let err = sut.insert(&duplicate).await.unwrap_err();

    assert_eq!(err.as_conflict(), Some(("Customer", "email")));
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_cpfの重複はconflict(pool: PgPool) {
    let sut = PostgresCustomerRepository::new(pool);
    let first = customer(4, date(1990, 1, 1));
    sut.insert(&first).await.unwrap();

    let duplicate = Customer::new(
        CustomerId::new(),
        NewCustomer {
            full_name:  CustomerName::new("Outra Pessoa").unwrap(),
            birth_date: date(1991, 1, 1),
            email:      Email::new("outra@example.com").unwrap(),
            telephone:  None,
            cpf:        first.cpf().clone(),
        },
        today(),
        Utc::now(),
    )
    .unwrap();

    let err = sut.insert(&duplicate).await.unwrap_err();

    assert!(matches!(
        err.kind(),
        InfraErrorKind::Conflict { field, .. } if field == "cpf"
    ));
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_顧客情報を更新できる(pool: PgPool) {
    let sut = PostgresCustomerRepository::new(pool);
    let original = customer(5, date(1990, 1, 1));
    sut.insert(&original).await.unwrap();

    let updated = original
        .clone()
        .apply_changes(
            CustomerChanges {
                full_name: Some(CustomerName::new("Nome Atualizado").unwrap()),
                ..Default::default()
            },
            today(),
        )
        .unwrap();
    sut.update(&updated).await.unwrap();

    let found = sut.find_by_id(original.id()).await.unwrap().unwrap();
    assert_eq!(found.full_name().as_str(), "Nome Atualizado");
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_件数を取得できる(pool: PgPool) {
    let sut = PostgresCustomerRepository::new(pool);
    assert_eq!(sut.count().await.unwrap(), 0);

    for seq in 10..13 {
        sut.insert(&customer(seq, date(1990, 1, 1))).await.unwrap();
    }

    assert_eq!(sut.count().await.unwrap(), 3);
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_ランダム抽出はlimit件以内で重複しない(pool: PgPool) {
    let sut = PostgresCustomerRepository::new(pool);
    for seq in 20..30 {
        sut.insert(&customer(seq, date(1990, 1, 1))).await.unwrap();
    }

    let picked = sut.find_random(4).await.unwrap();
    let ids: HashSet<_> = picked.iter().map(|c| c.id().clone()).collect();

    assert_eq!(picked.len(), 4);
    assert_eq!(ids.len(), 4);

    let all = sut.find_random(100).await.unwrap();
    assert_eq!(all.len(), 10);
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_誕生日抽出は月日が一致する顧客だけを返す(pool: PgPool) {
    let sut = PostgresCustomerRepository::new(pool);
    let birthday_a = customer(31, date(1980, 3, 14));
    let birthday_b = customer(32, date(2001, 3, 14));
    let other_day = customer(33, date(1980, 3, 15));
    let other_month = customer(34, date(1980, 4, 14));
    for c in [&birthday_a, &birthday_b, &other_day, &other_month] {
        sut.insert(c).await.unwrap();
    }

    let picked = sut.find_random_by_birthday(today(), 10).await.unwrap();
    let ids: HashSet<_> = picked.iter().map(|c| c.id().clone()).collect();

    assert_eq!(
        ids,
        HashSet::from([birthday_a.id().clone(), birthday_b.id().clone()])
    );

    let limited = sut.find_random_by_birthday(today(), 1).await.unwrap();
    assert_eq!(limited.len(), 1);
}
