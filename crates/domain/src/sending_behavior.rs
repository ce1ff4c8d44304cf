//! # 送信ビヘイビア
//!
//! 運用者が切り替える「送信ビヘイビア」と、そこから導かれる送信ポリシーを定義する。
//!
//! ## ドメイン用語
//!
//! | 型 | ドメイン用語 | 説明 |
//! |---|------------|------|
//! | [`SendingBehavior`] | 送信ビヘイビア | 全体で 1 つだけ保持される配信戦略 |
//! | [`RecipientSource`] | 受信者の選び方 | ランダム抽出 or 今日が誕生日の顧客 |
//! | [`SendPolicy`] | 送信ポリシー | 受信者の選び方と受信者ごとの送信確率の組 |
//!
//! ## ポリシー表
//!
//! | ビヘイビア | 受信者の選び方 | 送信確率 |
//! |-----------|---------------|---------|
//! | `not_defined` | ランダム | 1.00 |
//! | `by_birthday` | 誕生日 | 1.00 |
//! | `low_chance` | ランダム | 0.25 |
//! | `moderate_chance` | ランダム | 0.50 |
//! | `high_chance` | ランダム | 0.85 |
//!
//! 対応は [`SendingBehavior::policy`] の 1 箇所にのみ存在する。
//! ビヘイビアを追加する場合はバリアントと表の 1 行を追加すればよい。

use serde::{Deserialize, Serialize};
use strum::IntoStaticStr;

/// 送信ビヘイビア
///
/// DB の `sending_behavior.strategy` カラムと API の `strategy` フィールドに
/// snake_case で格納される。
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    IntoStaticStr,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SendingBehavior {
    /// 未設定: ランダム抽出、全員に送信
    ///
    /// 記録が存在しない場合もこの扱いになる。
    #[default]
    NotDefined,
    /// 今日が誕生日の顧客に全員送信
    ByBirthday,
    /// ランダム抽出、25% の確率で送信
    LowChance,
    /// ランダム抽出、50% の確率で送信
    ModerateChance,
    /// ランダム抽出、85% の確率で送信
    HighChance,
}

/// 受信者の選び方
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, IntoStaticStr, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RecipientSource {
    /// 顧客ディレクトリから一様ランダムに抽出
    Random,
    /// 今日（月日）が誕生日の顧客からランダムに抽出
    BirthdayToday,
}

/// 送信ポリシー
///
/// `send_probability` は `[0.0, 1.0]` の範囲。
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SendPolicy {
    pub source:           RecipientSource,
    pub send_probability: f64,
}

impl SendPolicy {
    pub const ALWAYS: f64 = 1.00;
    pub const LOW: f64 = 0.25;
    pub const MODERATE: f64 = 0.50;
    pub const HIGH: f64 = 0.85;

    const fn new(source: RecipientSource, send_probability: f64) -> Self {
        Self {
            source,
            send_probability,
        }
    }

    /// `[0.0, 1.0)` の乱数値 `draw` に対して送信するかどうか
    ///
    /// `draw` が送信確率を超えた場合のみスキップする。
    pub fn admits(&self, draw: f64) -> bool {
        draw <= self.send_probability
    }
}

impl SendingBehavior {
    /// すべてのビヘイビア（宣言順）
    pub const ALL: [Self; 5] = [
        Self::NotDefined,
        Self::ByBirthday,
        Self::LowChance,
        Self::ModerateChance,
        Self::HighChance,
    ];

    /// このビヘイビアの送信ポリシー
    pub const fn policy(self) -> SendPolicy {
        use RecipientSource::{BirthdayToday, Random};

        match self {
            Self::NotDefined => SendPolicy::new(Random, SendPolicy::ALWAYS),
            Self::ByBirthday => SendPolicy::new(BirthdayToday, SendPolicy::ALWAYS),
            Self::LowChance => SendPolicy::new(Random, SendPolicy::LOW),
            Self::ModerateChance => SendPolicy::new(Random, SendPolicy::MODERATE),
            Self::HighChance => SendPolicy::new(Random, SendPolicy::HIGH),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(SendingBehavior::NotDefined, RecipientSource::Random, 1.00)]
    #[case(SendingBehavior::ByBirthday, RecipientSource::BirthdayToday, 1.00)]
    #[case(SendingBehavior::LowChance, RecipientSource::Random, 0.25)]
    #[case(SendingBehavior::ModerateChance, RecipientSource::Random, 0.50)]
    #[case(SendingBehavior::HighChance, RecipientSource::Random, 0.85)]
    fn test_ビヘイビアごとのポリシー(
        #[case] behavior: SendingBehavior,
        #[case] source: RecipientSource,
        #[case] probability: f64,
    ) {
        let policy = behavior.policy();

        assert_eq!(policy.source, source);
        assert_eq!(policy.send_probability, probability);
    }

    #[test]
    fn test_送信確率はすべて0から1の範囲() {
        for behavior in SendingBehavior::ALL {
            let p = behavior.policy().send_probability;
            assert!((0.0..=1.0).contains(&p), "{behavior}: {p}");
        }
    }

    #[test]
    fn test_デフォルトは未設定() {
        assert_eq!(SendingBehavior::default(), SendingBehavior::NotDefined);
    }

    #[rstest]
    #[case("not_defined", SendingBehavior::NotDefined)]
    #[case("by_birthday", SendingBehavior::ByBirthday)]
    #[case("low_chance", SendingBehavior::LowChance)]
    #[case("moderate_chance", SendingBehavior::ModerateChance)]
    #[case("high_chance", SendingBehavior::HighChance)]
    fn test_snake_caseの文字列と相互変換できる(
        #[case] text: &str,
        #[case] behavior: SendingBehavior,
    ) {
        assert_eq!(SendingBehavior::from_str(text).unwrap(), behavior);
        assert_eq!(behavior.to_string(), text);
        assert_eq!(
            serde_json::to_value(behavior).unwrap(),
            serde_json::json!(text)
        );
    }

    #[test]
    fn test_未知の文字列はパースできない() {
        assert!(SendingBehavior::from_str("always").is_err());
        assert!(serde_json::from_str::<SendingBehavior>(r#""LOW_CHANCE""#).is_err());
    }

    #[rstest]
    #[case(0.0, true)]
    #[case(0.25, true)]
    #[case(0.2500001, false)]
    #[case(0.99, false)]
    fn test_乱数値が送信確率を超えるとスキップ(#[case] draw: f64, #[case] admitted: bool) {
        assert_eq!(SendingBehavior::LowChance.policy().admits(draw), admitted);
    }

    #[test]
    fn test_送信確率1は常に送信する() {
        let policy = SendingBehavior::NotDefined.policy();

        assert!(policy.admits(0.0));
        assert!(policy.admits(0.999_999));
    }
}
