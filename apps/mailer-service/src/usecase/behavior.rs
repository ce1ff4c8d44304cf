//! 送信ビヘイビア管理ユースケース

use std::sync::Arc;

use mailer_domain::sending_behavior::SendingBehavior;
use mailer_infra::{InfraError, repository::SendingBehaviorRepository};
use mailer_shared::{
    event_log::{error as log_error, event},
    log_business_event,
};

use crate::error::MailerError;

/// 送信ビヘイビア管理ユースケース
///
/// ビヘイビアストアへの薄い委譲。値の妥当性は境界層の列挙型デシリアライズで保証される。
pub struct BehaviorUseCaseImpl {
    behaviors: Arc<dyn SendingBehaviorRepository>,
}

impl BehaviorUseCaseImpl {
    pub fn new(behaviors: Arc<dyn SendingBehaviorRepository>) -> Self {
        Self { behaviors }
    }

    /// 現在の送信ビヘイビア
    ///
    /// 記録がない場合は `NotDefined` を返す。
    pub async fn get(&self) -> Result<SendingBehavior, MailerError> {
        let stored = self.behaviors.get().await.map_err(store_unavailable)?;

        Ok(stored.unwrap_or_default())
    }

    /// 送信ビヘイビアを変更する
    pub async fn set(&self, behavior: SendingBehavior) -> Result<SendingBehavior, MailerError> {
        self.behaviors
            .set(behavior)
            .await
            .map_err(store_unavailable)?;

        log_business_event!(
            event.category = event::category::BEHAVIOR,
            event.action = event::action::BEHAVIOR_CHANGED,
            event.result = event::result::SUCCESS,
            behavior.strategy = %behavior,
            "送信ビヘイビアを変更しました"
        );

        Ok(behavior)
    }
}

fn store_unavailable(e: InfraError) -> MailerError {
    tracing::error!(
        error.category = log_error::category::INFRASTRUCTURE,
        error.kind = log_error::kind::DATABASE,
        error = %e,
        span_trace = %e.span_trace(),
        "送信ビヘイビアストアへのアクセスに失敗"
    );
    MailerError::ServiceUnavailable(format!("送信ビヘイビアストアにアクセスできません: {e}"))
}

#[cfg(test)]
mod tests {
    use mailer_infra::mock::MockSendingBehaviorRepository;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    #[tokio::test]
    async fn test_記録がなければnot_definedを返す() {
        let sut = BehaviorUseCaseImpl::new(Arc::new(MockSendingBehaviorRepository::new()));

        let result = sut.get().await.unwrap();

        assert_eq!(result, SendingBehavior::NotDefined);
    }

    #[rstest]
    #[case(SendingBehavior::ByBirthday)]
    #[case(SendingBehavior::LowChance)]
    #[case(SendingBehavior::ModerateChance)]
    #[case(SendingBehavior::HighChance)]
    #[case(SendingBehavior::NotDefined)]
    #[tokio::test]
    async fn test_設定した値を取得できる(#[case] behavior: SendingBehavior) {
        let repo = MockSendingBehaviorRepository::new();
        let sut = BehaviorUseCaseImpl::new(Arc::new(repo.clone()));

        let set = sut.set(behavior).await.unwrap();
        let got = sut.get().await.unwrap();

        assert_eq!(set, behavior);
        assert_eq!(got, behavior);
    }

    #[tokio::test]
    async fn test_ストアのエラーはservice_unavailableになる() {
        let repo = MockSendingBehaviorRepository::with_behavior(SendingBehavior::LowChance);
        repo.make_unavailable();
        let sut = BehaviorUseCaseImpl::new(Arc::new(repo));

        assert!(matches!(
            sut.get().await,
            Err(MailerError::ServiceUnavailable(_))
        ));
        assert!(matches!(
            sut.set(SendingBehavior::HighChance).await,
            Err(MailerError::ServiceUnavailable(_))
        ));
    }
}
