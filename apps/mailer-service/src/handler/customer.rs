//! # 顧客ハンドラ
//!
//! ## エンドポイント
//!
//! - `POST /customers` - 顧客登録
//! - `PUT /customers/{customer_id}` - 顧客情報の部分更新
//! - `GET /customers/{customer_id}` - ID で取得
//! - `GET /customers/by-email?email=` - メールアドレスで取得
//! - `GET /customers/total` - 登録済み顧客数

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::NaiveDate;
use mailer_domain::customer::{Customer, CustomerId};
use mailer_shared::ApiResponse;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::MailerError,
    usecase::customer::{CreateCustomerInput, CustomerUseCaseImpl, UpdateCustomerInput},
};

/// 顧客 API の共有状態
pub struct CustomerState {
    pub usecase: CustomerUseCaseImpl,
}

// --- リクエスト/レスポンス型 ---

/// 顧客登録リクエスト
#[derive(Debug, Deserialize)]
pub struct CreateCustomerRequest {
    pub full_name:  String,
    pub birth_date: NaiveDate,
    pub email:      String,
    pub telephone:  Option<String>,
    pub cpf:        String,
}

/// 顧客更新リクエスト
#[derive(Debug, Default, Deserialize)]
pub struct UpdateCustomerRequest {
    pub full_name:  Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub email:      Option<String>,
    pub telephone:  Option<String>,
    pub cpf:        Option<String>,
}

/// メールアドレス検索クエリ
#[derive(Debug, Deserialize)]
pub struct EmailQuery {
    pub email: String,
}

/// 顧客 DTO
#[derive(Debug, Serialize)]
pub struct CustomerDto {
    pub id:         Uuid,
    pub full_name:  String,
    pub birth_date: NaiveDate,
    pub email:      String,
    pub telephone:  Option<String>,
    pub cpf:        String,
    pub created_at: String,
}

impl From<Customer> for CustomerDto {
    fn from(customer: Customer) -> Self {
        Self {
            id:         *customer.id().as_uuid(),
            full_name:  customer.full_name().as_str().to_string(),
            birth_date: customer.birth_date(),
            email:      customer.email().as_str().to_string(),
            telephone:  customer.telephone().map(|t| t.as_str().to_string()),
            cpf:        customer.cpf().as_str().to_string(),
            created_at: customer.created_at().to_rfc3339(),
        }
    }
}

/// 顧客数 DTO
#[derive(Debug, Serialize)]
pub struct CustomerTotalDto {
    pub total: i64,
}

// --- ハンドラ ---

/// POST /customers
pub async fn create_customer(
    State(state): State<Arc<CustomerState>>,
    Json(req): Json<CreateCustomerRequest>,
) -> Result<impl IntoResponse, MailerError> {
    let customer = state
        .usecase
        .create(CreateCustomerInput {
            full_name:  req.full_name,
            birth_date: req.birth_date,
            email:      req.email,
            telephone:  req.telephone,
            cpf:        req.cpf,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(CustomerDto::from(customer))),
    ))
}

/// PUT /customers/{customer_id}
pub async fn update_customer(
    State(state): State<Arc<CustomerState>>,
    Path(customer_id): Path<Uuid>,
    Json(req): Json<UpdateCustomerRequest>,
) -> Result<impl IntoResponse, MailerError> {
    let customer = state
        .usecase
        .update(
            &CustomerId::from_uuid(customer_id),
            UpdateCustomerInput {
                full_name:  req.full_name,
                birth_date: req.birth_date,
                email:      req.email,
                telephone:  req.telephone,
                cpf:        req.cpf,
            },
        )
        .await?;

    Ok((StatusCode::OK, Json(ApiResponse::new(CustomerDto::from(customer)))))
}

/// GET /customers/{customer_id}
pub async fn get_customer(
    State(state): State<Arc<CustomerState>>,
    Path(customer_id): Path<Uuid>,
) -> Result<impl IntoResponse, MailerError> {
    let customer = state
        .usecase
        .get_by_id(&CustomerId::from_uuid(customer_id))
        .await?;

    Ok((StatusCode::OK, Json(ApiResponse::new(CustomerDto::from(customer)))))
}

/// GET /customers/by-email?email=
pub async fn get_customer_by_email(
    State(state): State<Arc<CustomerState>>,
    Query(query): Query<EmailQuery>,
) -> Result<impl IntoResponse, MailerError> {
    let customer = state.usecase.get_by_email(&query.email).await?;

    Ok((StatusCode::OK, Json(ApiResponse::new(CustomerDto::from(customer)))))
}

/// GET /customers/total
pub async fn get_customer_total(
    State(state): State<Arc<CustomerState>>,
) -> Result<impl IntoResponse, MailerError> {
    let total = state.usecase.total().await?;

    Ok((
        StatusCode::OK,
        Json(ApiResponse::new(CustomerTotalDto { total })),
    ))
}
