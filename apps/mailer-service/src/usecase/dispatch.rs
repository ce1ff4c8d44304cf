//! # 配信ユースケース
//!
//! 送信ビヘイビアに従って受信者を選び、受信者ごとに送信するかを確率で判定し、
//! メールトランスポートへ送信を依頼する配信エンジン。
//!
//! ## 処理の流れ
//!
//! 1. テンプレート ID と差し込み値を検証する（失敗時はストアに一切触れない）
//! 2. メッセージを 1 度だけレンダリングし、全受信者で共有する（失敗時もストアに触れない）
//! 3. 送信ビヘイビアを 1 度だけ読み、配信全体のスナップショットとして使う
//! 4. ポリシー表に従い、顧客ディレクトリから候補者を抽出する
//! 5. 候補者ごとに乱数を引き、送信確率を超えたらスキップする
//! 6. 送信は受信者ごとに独立したタスクで行い、失敗・パニックは他の受信者に波及しない
//!
//! `dispatch()` は全送信を投入した時点で戻る。送信結果は監督タスクが
//! すべてログに出力し、[`DispatchReport`] として [`DispatchHandle`] から受け取れる。
//!
//! ## モジュール構成
//!
//! - [`template_renderer`] - tera テンプレートエンジンによるメール生成

pub mod template_renderer;

use std::{collections::HashMap, sync::Arc};

use mailer_domain::{
    DomainError,
    clock::Clock,
    customer::{Customer, CustomerId},
    dispatch::{DispatchId, DispatchOutcome},
    mail::{MailError, OutboundEmail, RenderedMessage},
    sending_behavior::{RecipientSource, SendPolicy, SendingBehavior},
    template::{FillValues, RenderError, TemplateFill, TemplateId},
};
use mailer_infra::{
    InfraError,
    mail::MailTransport,
    repository::{CustomerRepository, SendingBehaviorRepository},
};
use mailer_shared::{
    event_log::{error as log_error, event},
    log_business_event,
};
use rand::Rng;
use serde::Serialize;
use thiserror::Error;
use tokio::{
    sync::Semaphore,
    task::{self, JoinError, JoinHandle, JoinSet},
};
use tracing::Instrument;

pub use template_renderer::TemplateRenderer;

/// 配信リクエストの拒否・失敗
///
/// いずれも送信を 1 件も試行する前に発生する。
/// 受信者ごとの送信失敗はここに含まれず、ログにのみ記録される。
#[derive(Debug, Error)]
pub enum DispatchError {
    /// カタログにないテンプレート ID
    #[error("未知のテンプレートです: {0}")]
    UnknownTemplate(String),

    /// 差し込み値がテンプレートの契約を満たさない
    #[error(transparent)]
    InvalidFillValues(DomainError),

    /// リクエストの形式が不正（件数など）
    #[error("不正な配信リクエスト: {0}")]
    InvalidRequest(String),

    /// 送信ビヘイビアを読み取れない
    #[error("送信ビヘイビアを取得できません: {0}")]
    BehaviorStoreUnavailable(InfraError),

    /// 顧客ディレクトリを検索できない
    #[error("受信者を取得できません: {0}")]
    RecipientQueryFailed(InfraError),

    /// メッセージを生成できない
    #[error(transparent)]
    Render(#[from] RenderError),
}

/// 配信リクエスト
///
/// `template_id` は境界層で受け取った生の識別子で、カタログとの照合はエンジンが行う。
#[derive(Debug, Clone)]
pub struct DispatchRequest {
    pub template_id: String,
    pub subject:     String,
    pub fill_values: FillValues,
    /// 候補者の最大数（1 以上）
    pub count:       i64,
}

/// 配信の受付結果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DispatchAccepted {
    pub dispatch_id: DispatchId,
    /// 配信に使用した送信ビヘイビア
    pub behavior:    SendingBehavior,
    /// 抽出された候補者数
    pub candidates:  usize,
    /// サンプリングを通過し、送信を投入した件数
    pub submitted:   usize,
}

/// 受信者 1 人分の配信結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipientOutcome {
    pub customer_id: CustomerId,
    pub email:       String,
    pub outcome:     DispatchOutcome,
}

/// 配信 1 回分の結果集計
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchReport {
    pub dispatch_id: DispatchId,
    pub sent:        usize,
    pub skipped:     usize,
    pub failed:      usize,
    /// 受信者ごとの結果（順序は保証しない）
    pub outcomes:    Vec<RecipientOutcome>,
}

impl DispatchReport {
    /// 指定アドレスの配信結果
    pub fn outcome_for(&self, email: &str) -> Option<DispatchOutcome> {
        self.outcomes
            .iter()
            .find(|o| o.email == email)
            .map(|o| o.outcome)
    }
}

/// 受け付けた配信へのハンドル
///
/// `completion` を待つと全送信の完了後に [`DispatchReport`] が得られる。
/// 待たずに破棄しても送信と結果のログ出力は継続する。
#[derive(Debug)]
pub struct DispatchHandle {
    pub accepted:   DispatchAccepted,
    pub completion: JoinHandle<DispatchReport>,
}

/// 受信者ごとの送信判定に使う乱数源
///
/// `draw()` は `[0.0, 1.0)` の一様乱数を返す。
pub trait Sampler: Send + Sync {
    fn draw(&self) -> f64;
}

/// スレッドローカル乱数による実装
pub struct ThreadRngSampler;

impl Sampler for ThreadRngSampler {
    fn draw(&self) -> f64 {
        rand::rng().random::<f64>()
    }
}

/// 配信エンジン
pub struct DispatchEngine {
    behaviors:       Arc<dyn SendingBehaviorRepository>,
    customers:       Arc<dyn CustomerRepository>,
    transport:       Arc<dyn MailTransport>,
    renderer:        Arc<TemplateRenderer>,
    sampler:         Arc<dyn Sampler>,
    clock:           Arc<dyn Clock>,
    max_concurrency: usize,
}

impl DispatchEngine {
    pub fn new(
        behaviors: Arc<dyn SendingBehaviorRepository>,
        customers: Arc<dyn CustomerRepository>,
        transport: Arc<dyn MailTransport>,
        renderer: Arc<TemplateRenderer>,
        sampler: Arc<dyn Sampler>,
        clock: Arc<dyn Clock>,
        max_concurrency: usize,
    ) -> Self {
        Self {
            behaviors,
            customers,
            transport,
            renderer,
            sampler,
            clock,
            max_concurrency: max_concurrency.max(1),
        }
    }

    /// 配信を受け付け、全送信を投入して戻る
    ///
    /// # エラー
    ///
    /// - `UnknownTemplate` / `InvalidFillValues` / `InvalidRequest`: ストアへのアクセス前に拒否
    /// - `BehaviorStoreUnavailable`: 送信ビヘイビアの読み取りに失敗（記録がない場合はエラーにしない）
    /// - `RecipientQueryFailed`: 候補者の抽出に失敗
    /// - `Render`: メッセージの生成に失敗（ストアへのアクセス前）
    pub async fn dispatch(&self, request: DispatchRequest) -> Result<DispatchHandle, DispatchError> {
        let template_id: TemplateId = request
            .template_id
            .parse()
            .map_err(|_| DispatchError::UnknownTemplate(request.template_id.clone()))?;
        let fill = TemplateFill::parse(template_id, &request.fill_values)
            .map_err(DispatchError::InvalidFillValues)?;
        if request.count < 1 {
            return Err(DispatchError::InvalidRequest(format!(
                "count は 1 以上である必要があります: {}",
                request.count
            )));
        }

        let dispatch_id = DispatchId::new();
        let span = tracing::info_span!("dispatch", dispatch.id = %dispatch_id);

        self.accept(dispatch_id, fill, &request.subject, request.count)
            .instrument(span)
            .await
    }

    async fn accept(
        &self,
        dispatch_id: DispatchId,
        fill: TemplateFill,
        subject: &str,
        count: i64,
    ) -> Result<DispatchHandle, DispatchError> {
        let message = Arc::new(self.renderer.render(&fill, subject).await?);

        let behavior = self.current_behavior().await?;
        let policy = behavior.policy();

        let candidates = self.select_candidates(policy, count).await?;

        let fan_out = self.fan_out(&dispatch_id, policy, &candidates, &message);
        let submitted = fan_out.joins.len();

        log_business_event!(
            event.category = event::category::DISPATCH,
            event.action = event::action::DISPATCH_ACCEPTED,
            event.result = event::result::SUCCESS,
            dispatch.id = %dispatch_id,
            dispatch.template = %fill.template_id(),
            dispatch.behavior = %behavior,
            dispatch.candidates = candidates.len(),
            dispatch.submitted = submitted,
            "配信を受け付けました"
        );

        let completion =
            tokio::spawn(supervise(dispatch_id.clone(), fan_out).in_current_span());

        Ok(DispatchHandle {
            accepted: DispatchAccepted {
                dispatch_id,
                behavior,
                candidates: candidates.len(),
                submitted,
            },
            completion,
        })
    }

    /// 送信ビヘイビアのスナップショットを読む
    ///
    /// 記録がない場合は `NotDefined` として扱う（fail-open）。
    async fn current_behavior(&self) -> Result<SendingBehavior, DispatchError> {
        let stored = self.behaviors.get().await.map_err(|e| {
            tracing::error!(
                error.category = log_error::category::INFRASTRUCTURE,
                error.kind = log_error::kind::DATABASE,
                error = %e,
                "送信ビヘイビアの取得に失敗"
            );
            DispatchError::BehaviorStoreUnavailable(e)
        })?;

        Ok(stored.unwrap_or_else(|| {
            tracing::info!(
                "送信ビヘイビアが未設定のため not_defined（ランダム抽出・全員送信）で配信します"
            );
            SendingBehavior::NotDefined
        }))
    }

    async fn select_candidates(
        &self,
        policy: SendPolicy,
        limit: i64,
    ) -> Result<Vec<Customer>, DispatchError> {
        let result = match policy.source {
            RecipientSource::Random => self.customers.find_random(limit).await,
            RecipientSource::BirthdayToday => {
                self.customers
                    .find_random_by_birthday(self.clock.today(), limit)
                    .await
            }
        };

        result.map_err(|e| {
            tracing::error!(
                error.category = log_error::category::INFRASTRUCTURE,
                error.kind = log_error::kind::DATABASE,
                error = %e,
                recipient.source = %policy.source,
                "候補者の抽出に失敗"
            );
            DispatchError::RecipientQueryFailed(e)
        })
    }

    /// 候補者ごとにサンプリングし、通過した送信をタスクとして投入する
    ///
    /// 乱数は候補者の順に引く。スキップした受信者の結果はここでログに出力する。
    fn fan_out(
        &self,
        dispatch_id: &DispatchId,
        policy: SendPolicy,
        candidates: &[Customer],
        message: &Arc<RenderedMessage>,
    ) -> FanOut {
        let semaphore = Arc::new(Semaphore::new(self.max_concurrency));
        let mut fan_out = FanOut::default();

        for customer in candidates {
            let recipient = Recipient::from(customer);

            if !policy.admits(self.sampler.draw()) {
                log_outcome(dispatch_id, &recipient, DispatchOutcome::SkippedBySampling, None);
                fan_out
                    .skipped
                    .push(recipient.into_outcome(DispatchOutcome::SkippedBySampling));
                continue;
            }

            let transport = Arc::clone(&self.transport);
            let semaphore = Arc::clone(&semaphore);
            let email = OutboundEmail::new(recipient.email.clone(), Arc::clone(message));

            let attempt = tokio::spawn(
                async move {
                    let _permit = semaphore.acquire_owned().await;
                    transport.send(&email).await
                }
                .in_current_span(),
            );
            fan_out.submit(recipient, attempt);
        }

        fan_out
    }
}

type AttemptResult = (Recipient, Result<Result<(), MailError>, JoinError>);

/// 投入済みの送信とスキップ済みの受信者
#[derive(Default)]
struct FanOut {
    joins:      JoinSet<AttemptResult>,
    /// 回収用タスクの ID → 受信者（回収用タスク自体が中断された場合の特定用）
    recipients: HashMap<task::Id, Recipient>,
    skipped:    Vec<RecipientOutcome>,
}

impl FanOut {
    fn submit<F>(&mut self, recipient: Recipient, attempt: F)
    where
        F: Future<Output = Result<Result<(), MailError>, JoinError>> + Send + 'static,
    {
        let tracked = recipient.clone();
        let handle = self
            .joins
            .spawn(async move { (recipient, attempt.await) });
        self.recipients.insert(handle.id(), tracked);
    }
}

/// ログと集計に必要な受信者情報
#[derive(Debug, Clone)]
struct Recipient {
    customer_id: CustomerId,
    email:       String,
}

impl From<&Customer> for Recipient {
    fn from(customer: &Customer) -> Self {
        Self {
            customer_id: customer.id().clone(),
            email:       customer.email().as_str().to_string(),
        }
    }
}

impl Recipient {
    fn into_outcome(self, outcome: DispatchOutcome) -> RecipientOutcome {
        RecipientOutcome {
            customer_id: self.customer_id,
            email: self.email,
            outcome,
        }
    }
}

/// 投入済みの送信をすべて回収し、結果をログに出力する
///
/// 送信タスクがパニックした場合も `DeliveryFailed` として記録する。
async fn supervise(dispatch_id: DispatchId, fan_out: FanOut) -> DispatchReport {
    let FanOut {
        mut joins,
        mut recipients,
        skipped,
    } = fan_out;
    let mut outcomes = skipped;

    while let Some(joined) = joins.join_next().await {
        let (recipient, attempt) = match joined {
            Ok(settled) => settled,
            // 回収用タスク自体の中断（ランタイム停止など）。送信結果は不明なので失敗として記録する
            Err(e) => match recipients.remove(&e.id()) {
                Some(recipient) => (recipient, Err(e)),
                None => {
                    tracing::error!(
                        error.category = log_error::category::INFRASTRUCTURE,
                        error.kind = log_error::kind::INTERNAL,
                        dispatch.id = %dispatch_id,
                        error = %e,
                        "受信者を特定できない送信タスクが中断されました"
                    );
                    continue;
                }
            },
        };

        let outcome = match attempt {
            Ok(Ok(())) => {
                log_outcome(&dispatch_id, &recipient, DispatchOutcome::Sent, None);
                DispatchOutcome::Sent
            }
            Ok(Err(e)) => {
                log_outcome(
                    &dispatch_id,
                    &recipient,
                    DispatchOutcome::DeliveryFailed,
                    Some(&e.to_string()),
                );
                DispatchOutcome::DeliveryFailed
            }
            Err(e) => {
                log_outcome(
                    &dispatch_id,
                    &recipient,
                    DispatchOutcome::DeliveryFailed,
                    Some(&format!("送信タスクが異常終了しました: {e}")),
                );
                DispatchOutcome::DeliveryFailed
            }
        };
        outcomes.push(recipient.into_outcome(outcome));
    }

    let count = |target: DispatchOutcome| outcomes.iter().filter(|o| o.outcome == target).count();
    let report = DispatchReport {
        sent: count(DispatchOutcome::Sent),
        skipped: count(DispatchOutcome::SkippedBySampling),
        failed: count(DispatchOutcome::DeliveryFailed),
        dispatch_id,
        outcomes,
    };

    let result = if report.failed == 0 {
        event::result::SUCCESS
    } else {
        event::result::FAILURE
    };
    log_business_event!(
        event.category = event::category::DISPATCH,
        event.action = event::action::DISPATCH_COMPLETED,
        event.result = result,
        dispatch.id = %report.dispatch_id,
        dispatch.sent = report.sent,
        dispatch.skipped = report.skipped,
        dispatch.failed = report.failed,
        "配信が完了しました"
    );

    report
}

fn log_outcome(
    dispatch_id: &DispatchId,
    recipient: &Recipient,
    outcome: DispatchOutcome,
    cause: Option<&str>,
) {
    match outcome {
        DispatchOutcome::Sent => log_business_event!(
            event.category = event::category::DISPATCH,
            event.action = event::action::EMAIL_SENT,
            event.result = event::result::SUCCESS,
            dispatch.id = %dispatch_id,
            customer.id = %recipient.customer_id,
            email.recipient = %recipient.email,
            "メール送信成功"
        ),
        DispatchOutcome::SkippedBySampling => log_business_event!(
            event.category = event::category::DISPATCH,
            event.action = event::action::EMAIL_SKIPPED,
            event.result = event::result::SKIPPED,
            dispatch.id = %dispatch_id,
            customer.id = %recipient.customer_id,
            email.recipient = %recipient.email,
            "サンプリングにより送信をスキップ"
        ),
        DispatchOutcome::DeliveryFailed => log_business_event!(
            event.category = event::category::DISPATCH,
            event.action = event::action::EMAIL_DELIVERY_FAILED,
            event.result = event::result::FAILURE,
            dispatch.id = %dispatch_id,
            customer.id = %recipient.customer_id,
            email.recipient = %recipient.email,
            error.category = log_error::category::EXTERNAL_SERVICE,
            error.kind = log_error::kind::MAIL_TRANSPORT,
            error = cause.unwrap_or_default(),
            "メール送信失敗"
        ),
    }
}
