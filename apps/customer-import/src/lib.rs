//! # 顧客インポート
//!
//! 外部システムから書き出された顧客 CSV を読み込み、正規化して顧客ディレクトリに登録する
//! 単発のパイプライン。
//!
//! ## 入力形式
//!
//! - 文字コードは Latin-1、区切り文字はデフォルトで `;`
//! - ヘッダーは前後の空白を除去し小文字化して照合する
//!
//! | 項目 | カラム（先に値があるものを採用） |
//! |------|-------------------------------|
//! | 氏名 | `nome`, `nomecivil` |
//! | 生年月日 | `datanascimento`（`dd/mm/YYYY` または `YYYY-MM-DD`） |
//! | メールアドレス | `email` |
//! | 電話番号 | `telefone_1` 〜 `telefone_4` |
//! | CPF | `cpf`（`.` と `-` を除去して 11 桁） |
//!
//! ## モジュール構成
//!
//! - [`normalize`] - CSV 行の読み込みと正規化
//! - [`pipeline`] - 重複排除と顧客ディレクトリへの登録

mod error;
pub mod normalize;
pub mod pipeline;

pub use error::ImportError;
pub use normalize::{CustomerRecord, RowRejection, read_rows};
pub use pipeline::{CustomerImporter, ImportSummary};
