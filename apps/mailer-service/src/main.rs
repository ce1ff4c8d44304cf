//! # Mailer Service サーバー
//!
//! マーケティングメールの配信エンジンを HTTP で公開する。
//!
//! ## 役割
//!
//! - **配信**: 送信ビヘイビアに従って受信者を選び、割引クーポンメールを送信する
//! - **送信ビヘイビア管理**: 現在の配信戦略の参照・変更
//! - **顧客管理**: 配信対象となる顧客の登録・更新・参照
//!
//! ## 環境変数
//!
//! | 変数名 | 必須 | 説明 |
//! |--------|------|------|
//! | `MAILER_HOST` | No | バインドアドレス（デフォルト: `0.0.0.0`） |
//! | `MAILER_PORT` | No | ポート番号（デフォルト: `8000`） |
//! | `DATABASE_URL` | **Yes** | PostgreSQL 接続 URL |
//! | `MAIL_BACKEND` | No | `smtp` または `noop`（デフォルト: `noop`） |
//! | `SMTP_HOST` / `SMTP_PORT` | No | SMTP リレー（デフォルト: `localhost:1025`） |
//! | `SMTP_USERNAME` / `SMTP_PASSWORD` | No | SMTP 認証情報（両方指定するか、どちらも省略） |
//! | `SMTP_TIMEOUT_SECS` | No | 1 通あたりの送信タイムアウト秒（デフォルト: `10`） |
//! | `MAIL_FROM_ADDRESS` / `MAIL_FROM_NAME` | No | 送信元 |
//! | `TEMPLATE_ASSET_DIR` | No | テンプレート画像のディレクトリ（デフォルト: `assets/templates`） |
//! | `DISPATCH_MAX_CONCURRENCY` | No | 1 配信あたりの同時送信数（デフォルト: `8`） |
//! | `LOG_FORMAT` | No | `json` または `pretty`（デフォルト: `pretty`） |
//!
//! ## 起動方法
//!
//! ```bash
//! cargo run -p mailer-service
//! ```

use std::{net::SocketAddr, sync::Arc};

use anyhow::Context as _;
use mailer_domain::clock::SystemClock;
use mailer_infra::{
    db,
    mail::{MailTransport, NoopMailTransport, SmtpConfig, SmtpMailTransport},
    repository::{PostgresCustomerRepository, PostgresSendingBehaviorRepository},
};
use mailer_service::{
    app::{self, AppStates},
    config::{MailBackend, MailConfig, MailerConfig},
    handler::{BehaviorState, CustomerState, DispatchState},
    usecase::{
        BehaviorUseCaseImpl,
        CustomerUseCaseImpl,
        DispatchEngine,
        dispatch::{TemplateRenderer, ThreadRngSampler},
    },
};
use mailer_shared::observability::{TracingConfig, init_tracing};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env ファイルを読み込む（存在する場合）
    dotenvy::dotenv().ok();

    init_tracing(TracingConfig::from_env("mailer-service"));
    let _tracing_guard = tracing::info_span!("app", service = "mailer-service").entered();

    let config = MailerConfig::from_env().context("設定の読み込みに失敗しました")?;

    tracing::info!(
        "Mailer Service サーバーを起動します: {}:{}",
        config.host,
        config.port
    );

    let pool = db::create_pool(&config.database_url)
        .await
        .context("データベース接続に失敗しました")?;
    db::run_migrations(&pool)
        .await
        .context("マイグレーションの適用に失敗しました")?;
    tracing::info!("データベースに接続しました");

    let behaviors = Arc::new(PostgresSendingBehaviorRepository::new(pool.clone()));
    let customers = Arc::new(PostgresCustomerRepository::new(pool));
    let clock = Arc::new(SystemClock);
    let transport = build_transport(&config.mail)?;
    let renderer = Arc::new(
        TemplateRenderer::new(&config.template_asset_dir)
            .context("テンプレートの登録に失敗しました")?,
    );

    let engine = DispatchEngine::new(
        behaviors.clone(),
        customers.clone(),
        transport,
        renderer,
        Arc::new(ThreadRngSampler),
        clock.clone(),
        config.dispatch_max_concurrency,
    );

    let app = app::router(AppStates {
        dispatch: Arc::new(DispatchState { engine }),
        behavior: Arc::new(BehaviorState {
            usecase: BehaviorUseCaseImpl::new(behaviors),
        }),
        customer: Arc::new(CustomerState {
            usecase: CustomerUseCaseImpl::new(customers, clock),
        }),
    });

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .context("アドレスのパースに失敗しました")?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!("Mailer Service サーバーが起動しました: {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

fn build_transport(mail: &MailConfig) -> anyhow::Result<Arc<dyn MailTransport>> {
    match mail.backend {
        MailBackend::Smtp => {
            let transport = SmtpMailTransport::new(SmtpConfig {
                host:         mail.smtp_host.clone(),
                port:         mail.smtp_port,
                credentials:  mail.smtp_credentials.clone(),
                timeout:      mail.smtp_timeout,
                from_address: mail.from_address.clone(),
                from_name:    mail.from_name.clone(),
            })
            .context("SMTP トランスポートの初期化に失敗しました")?;
            tracing::info!(
                host = %mail.smtp_host,
                port = mail.smtp_port,
                "SMTP でメールを送信します"
            );
            Ok(Arc::new(transport))
        }
        MailBackend::Noop => {
            tracing::info!("メール送信は無効です（noop）");
            Ok(Arc::new(NoopMailTransport))
        }
    }
}
