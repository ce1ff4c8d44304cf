//! HTTP API の統合テスト
//!
//! モックリポジトリ・モックトランスポートでルーター全体を組み立て、
//! `tower::ServiceExt::oneshot` でリクエストを送る。

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode},
};
use chrono::{TimeZone, Utc};
use mailer_domain::{clock::FixedClock, sending_behavior::SendingBehavior};
use mailer_infra::mock::{MockCustomerRepository, MockMailTransport, MockSendingBehaviorRepository};
use mailer_service::{
    app::{self, AppStates},
    handler::{BehaviorState, CustomerState, DispatchState},
    test_utils::{DispatchTestBuilder, customer},
    usecase::{BehaviorUseCaseImpl, CustomerUseCaseImpl},
};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use tower::ServiceExt;

struct TestApp {
    router:    Router,
    behaviors: MockSendingBehaviorRepository,
    customers: MockCustomerRepository,
    transport: MockMailTransport,
}

fn test_app(behaviors: MockSendingBehaviorRepository, customers: MockCustomerRepository) -> TestApp {
    let transport = MockMailTransport::new();
    let clock = Arc::new(FixedClock::new(
        Utc.with_ymd_and_hms(2026, 3, 15, 12, 0, 0).unwrap(),
    ));
    let setup = DispatchTestBuilder::new()
        .behavior_repository(behaviors.clone())
        .customer_repository(customers.clone())
        .transport(transport.clone())
        .build();

    let router = app::router(AppStates {
        dispatch: Arc::new(DispatchState { engine: setup.sut }),
        behavior: Arc::new(BehaviorState {
            usecase: BehaviorUseCaseImpl::new(Arc::new(behaviors.clone())),
        }),
        customer: Arc::new(CustomerState {
            usecase: CustomerUseCaseImpl::new(Arc::new(customers.clone()), clock),
        }),
    });

    TestApp {
        router,
        behaviors,
        customers,
        transport,
    }
}

async fn send(router: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => request
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };

    (status, json)
}

fn send_emails_body(template: &str) -> Value {
    json!({
        "email_template": template,
        "subject": "Seu cupom chegou",
        "template_fill_values": {
            "image_name": "discount_cupom_header.png",
            "discount_value": 20,
            "cupom_code": "OUTONO20",
            "valid_dates_start": "2026-04-01",
            "valid_dates_end": "2026-04-30"
        },
        "count": 2
    })
}

#[tokio::test]
async fn test_ヘルスチェック() {
    let app = test_app(MockSendingBehaviorRepository::new(), MockCustomerRepository::new());

    let (status, body) = send(&app.router, Method::GET, "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_配信を受け付けると202と配信idを返す() {
    let customers = MockCustomerRepository::with_customers(vec![
        customer("ana@example.com"),
        customer("bruno@example.com"),
        customer("carla@example.com"),
    ]);
    let app = test_app(MockSendingBehaviorRepository::new(), customers);

    let (status, body) = send(
        &app.router,
        Method::POST,
        "/emails/send-emails",
        Some(send_emails_body("discount_cupom")),
    )
    .await;

    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["data"]["message"], "Emails are being sent in background");
    assert_eq!(body["data"]["behavior"], "not_defined");
    assert_eq!(body["data"]["candidates"], 2);
    assert_eq!(body["data"]["submitted"], 2);
    assert!(body["data"]["dispatch_id"].as_str().is_some());
    assert_eq!(app.customers.requested_limits(), vec![2]);
}

#[tokio::test]
async fn test_件数を省略すると1件() {
    let customers = MockCustomerRepository::with_customers(vec![
        customer("ana@example.com"),
        customer("bruno@example.com"),
    ]);
    let app = test_app(MockSendingBehaviorRepository::new(), customers);
    let mut body = send_emails_body("discount_coupon");
    body.as_object_mut().unwrap().remove("count");

    let (status, body) = send(&app.router, Method::POST, "/emails/send-emails", Some(body)).await;

    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["data"]["candidates"], 1);
}

#[tokio::test]
async fn test_テンプレートを省略すると割引クーポンで配信する() {
    let customers = MockCustomerRepository::with_customers(vec![customer("ana@example.com")]);
    let app = test_app(MockSendingBehaviorRepository::new(), customers);
    let mut body = send_emails_body("discount_coupon");
    body.as_object_mut().unwrap().remove("email_template");

    let (status, body) = send(&app.router, Method::POST, "/emails/send-emails", Some(body)).await;

    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["data"]["submitted"], 1);
    assert_eq!(app.customers.requested_limits(), vec![2]);
}

#[tokio::test]
async fn test_未知のテンプレートは400で送信もストア参照もしない() {
    let behaviors = MockSendingBehaviorRepository::new();
    let customers = MockCustomerRepository::with_customers(vec![customer("ana@example.com")]);
    let app = test_app(behaviors, customers);

    let (status, body) = send(
        &app.router,
        Method::POST,
        "/emails/send-emails",
        Some(send_emails_body("birthday_card")),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["type"],
        "https://mailer.example.com/errors/unknown-template"
    );
    assert_eq!(app.behaviors.read_count(), 0);
    assert!(app.customers.requested_limits().is_empty());
    assert!(app.transport.attempted_addresses().is_empty());
}

#[tokio::test]
async fn test_割引率が範囲外なら400() {
    let app = test_app(MockSendingBehaviorRepository::new(), MockCustomerRepository::new());
    let mut body = send_emails_body("discount_coupon");
    body["template_fill_values"]["discount_value"] = json!(150);

    let (status, body) = send(&app.router, Method::POST, "/emails/send-emails", Some(body)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["type"],
        "https://mailer.example.com/errors/validation-error"
    );
}

#[tokio::test]
async fn test_ビヘイビアストアに接続できなければ503() {
    let behaviors = MockSendingBehaviorRepository::new();
    behaviors.make_unavailable();
    let app = test_app(behaviors, MockCustomerRepository::new());

    let (status, _) = send(
        &app.router,
        Method::POST,
        "/emails/send-emails",
        Some(send_emails_body("discount_coupon")),
    )
    .await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_ビヘイビアを参照して変更できる() {
    let app = test_app(MockSendingBehaviorRepository::new(), MockCustomerRepository::new());

    let (status, body) = send(&app.router, Method::GET, "/emails/behavior", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "data": { "strategy": "not_defined" } }));

    let (status, body) = send(
        &app.router,
        Method::PATCH,
        "/emails/behavior",
        Some(json!({ "strategy": "moderate_chance" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "data": { "strategy": "moderate_chance" } }));

    let (_, body) = send(&app.router, Method::GET, "/emails/behavior", None).await;
    assert_eq!(body["data"]["strategy"], "moderate_chance");
}

#[tokio::test]
async fn test_未知のビヘイビアは拒否して値を変えない() {
    let behaviors = MockSendingBehaviorRepository::with_behavior(SendingBehavior::HighChance);
    let app = test_app(behaviors, MockCustomerRepository::new());

    let (status, _) = send(
        &app.router,
        Method::PATCH,
        "/emails/behavior",
        Some(json!({ "strategy": "always" })),
    )
    .await;

    assert!(status.is_client_error());
    let (_, body) = send(&app.router, Method::GET, "/emails/behavior", None).await;
    assert_eq!(body["data"]["strategy"], "high_chance");
}

#[tokio::test]
async fn test_顧客の登録から取得まで() {
    let app = test_app(MockSendingBehaviorRepository::new(), MockCustomerRepository::new());

    let (status, created) = send(
        &app.router,
        Method::POST,
        "/customers",
        Some(json!({
            "full_name": "Beatriz Costa",
            "birth_date": "1995-10-20",
            "email": "beatriz@example.com",
            "telephone": "+5521998877665",
            "cpf": "98765432100"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = created["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = send(&app.router, Method::GET, &format!("/customers/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["email"], "beatriz@example.com");

    let (status, body) = send(
        &app.router,
        Method::GET,
        "/customers/by-email?email=beatriz@example.com",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["id"], id.as_str());

    let (status, body) = send(
        &app.router,
        Method::PUT,
        &format!("/customers/{id}"),
        Some(json!({ "full_name": "Beatriz Costa Lima" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["full_name"], "Beatriz Costa Lima");

    let (status, body) = send(&app.router, Method::GET, "/customers/total", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "data": { "total": 1 } }));
}

#[tokio::test]
async fn test_重複したメールアドレスの登録は409() {
    let customers = MockCustomerRepository::with_customers(vec![customer("beatriz@example.com")]);
    let app = test_app(MockSendingBehaviorRepository::new(), customers);

    let (status, body) = send(
        &app.router,
        Method::POST,
        "/customers",
        Some(json!({
            "full_name": "Beatriz Costa",
            "birth_date": "1995-10-20",
            "email": "beatriz@example.com",
            "cpf": "98765432100"
        })),
    )
    .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["status"], 409);
}

#[tokio::test]
async fn test_存在しない顧客は404() {
    let app = test_app(MockSendingBehaviorRepository::new(), MockCustomerRepository::new());

    let (status, _) = send(
        &app.router,
        Method::GET,
        "/customers/0190a6b2-0000-7000-8000-000000000000",
        None,
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}
