//! # Customer Import
//!
//! 顧客 CSV を読み込み、顧客ディレクトリ（PostgreSQL）に登録するコマンド。
//!
//! ```text
//! customer-import [--delimiter ';'] [--dry-run] <CSV_PATH>
//! ```
//!
//! ## 環境変数
//!
//! | 変数名 | 必須 | 説明 |
//! |--------|------|------|
//! | `DATABASE_URL` | **Yes** | PostgreSQL 接続 URL（`--database-url` でも指定可） |
//! | `LOG_FORMAT` | No | `json` または `pretty`（デフォルト: `pretty`） |
//! | `RUST_LOG` | No | ログレベル |

use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, bail};
use clap::Parser;
use customer_import::{CustomerImporter, read_rows};
use mailer_domain::clock::SystemClock;
use mailer_infra::{db, repository::PostgresCustomerRepository};
use mailer_shared::observability::{TracingConfig, init_tracing};

#[derive(Debug, Parser)]
#[command(name = "customer-import", about = "顧客 CSV を顧客ディレクトリに登録する")]
struct Cli {
    /// 取り込む CSV ファイル（Latin-1）
    csv_path: PathBuf,

    /// 区切り文字
    #[arg(long, default_value_t = ';')]
    delimiter: char,

    /// 登録せずに判定結果だけを出力する
    #[arg(long)]
    dry_run: bool,

    #[arg(long, env = "DATABASE_URL")]
    database_url: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    init_tracing(TracingConfig::from_env("customer-import"));
    let _tracing_guard = tracing::info_span!("app", service = "customer-import").entered();

    let cli = Cli::parse();
    let Ok(delimiter) = u8::try_from(cli.delimiter) else {
        bail!("区切り文字は ASCII で指定してください: {:?}", cli.delimiter);
    };

    let bytes = tokio::fs::read(&cli.csv_path)
        .await
        .with_context(|| format!("ファイルを読み込めません: {}", cli.csv_path.display()))?;
    let rows = read_rows(&bytes, delimiter).context("CSV の読み込みに失敗しました")?;
    tracing::info!(
        path = %cli.csv_path.display(),
        rows = rows.len(),
        dry_run = cli.dry_run,
        "CSV を読み込みました"
    );

    let pool = db::create_pool(&cli.database_url)
        .await
        .context("データベース接続に失敗しました")?;
    db::run_migrations(&pool)
        .await
        .context("マイグレーションの適用に失敗しました")?;

    let importer = CustomerImporter::new(
        Arc::new(PostgresCustomerRepository::new(pool)),
        Arc::new(SystemClock),
    )
    .dry_run(cli.dry_run);

    let summary = importer
        .import(rows)
        .await
        .context("顧客の登録に失敗しました")?;

    tracing::info!(
        read = summary.read,
        imported = summary.imported,
        skipped_invalid = summary.skipped_invalid,
        skipped_duplicate = summary.skipped_duplicate,
        "インポートが完了しました"
    );

    Ok(())
}
