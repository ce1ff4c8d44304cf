//! インポート処理全体を中断するエラー
//!
//! 行単位の不備は [`crate::RowRejection`] として扱い、処理は継続する。

use mailer_infra::InfraError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("ファイルを読み込めません: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV を解析できません: {0}")]
    Csv(#[from] csv::Error),

    /// 必須項目に対応するカラムが 1 つもない
    #[error("必須カラムがありません: {0}")]
    MissingColumns(String),

    #[error("顧客の登録に失敗しました: {0}")]
    Repository(#[from] InfraError),
}
