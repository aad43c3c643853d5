//! Pressroom binary: the API server and the bulk resync command.

use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use pressroom::adapters::http::{
    newsletter_routes, webhook_routes, NewsletterAppState, WebhookAppState,
};
use pressroom::adapters::memory::InMemoryListRegistry;
use pressroom::adapters::postgres::{
    PostgresListRegistry, PostgresNewsletterStore, PostgresSnapshotStore,
};
use pressroom::adapters::providers::ProviderRegistry;
use pressroom::adapters::woocommerce::{WooClientConfig, WooCommerceClient, WooWebhookVerifier};
use pressroom::application::membership::MembershipBridge;
use pressroom::application::resync::{ResyncConfig, WooResyncDriver};
use pressroom::application::sync::{ContactSyncEngine, SyncContext};
use pressroom::config::AppConfig;
use pressroom::domain::foundation::{OrderId, SubscriptionId, UserId};
use pressroom::domain::lists::NativeListId;
use pressroom::domain::provider::ProviderKind;
use pressroom::ports::{ListRegistry, MigrationSource};

#[derive(Parser)]
#[command(name = "pressroom", about = "Newsroom audience synchronization service")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP API server
    Serve,
    /// Bulk resync of WooCommerce contacts to the active provider
    Resync(ResyncArgs),
}

#[derive(Args)]
struct ResyncArgs {
    /// Compute and log, but do not call the provider
    #[arg(long)]
    dry_run: bool,

    /// Skip users/subscriptions without an active subscription
    #[arg(long)]
    active_only: bool,

    /// Resync subscriptions migrated from this source (stripe|piano|csv)
    #[arg(long, value_name = "SOURCE")]
    migrated_subscriptions: Option<MigrationSource>,

    /// Explicit subscription ids (comma-separated)
    #[arg(long, value_delimiter = ',')]
    subscription_ids: Vec<u64>,

    /// Explicit user ids (comma-separated)
    #[arg(long, value_delimiter = ',')]
    user_ids: Vec<u64>,

    /// Explicit order ids (comma-separated)
    #[arg(long, value_delimiter = ',')]
    order_ids: Vec<u64>,

    /// Page size for batched modes
    #[arg(long, default_value_t = 10)]
    batch_size: u64,

    /// Starting offset for batched modes
    #[arg(long, default_value_t = 0)]
    offset: u64,

    /// Page cap for batched modes; 0 means unbounded
    #[arg(long, default_value_t = 0)]
    max_batches: u64,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Failed to load configuration: {}", err);
            std::process::exit(1);
        }
    };
    init_tracing(&config);
    if let Err(err) = config.validate() {
        tracing::error!("Invalid configuration: {}", err);
        std::process::exit(1);
    }

    let result = match cli.command {
        Command::Serve => serve(config).await,
        Command::Resync(args) => resync(config, args).await,
    };
    if let Err(err) = result {
        tracing::error!("{}", err);
        std::process::exit(1);
    }
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.server.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Builds the provider set from configuration and resolves the active one.
fn build_engine(
    config: &AppConfig,
    list_registry: Arc<dyn ListRegistry>,
) -> Result<Arc<ContactSyncEngine>, String> {
    let mut registry = ProviderRegistry::new();
    for kind in ProviderKind::all() {
        if kind == ProviderKind::Manual {
            continue;
        }
        if let Some(credentials) = config.esp.credentials_for(kind) {
            registry = registry
                .with_credentials(kind, credentials)
                .map_err(|e| format!("{} credentials rejected: {}", kind, e))?;
        }
    }
    let provider = registry.get(config.esp.active);

    let mut engine = ContactSyncEngine::new(provider, list_registry)
        .with_commerce_sync_enabled(config.woocommerce.sync_enabled);
    if let Some(audience) = &config.esp.audience_id {
        engine = engine.with_audience(NativeListId::new(audience.clone()));
    }
    Ok(Arc::new(engine))
}

async fn connect_pool(config: &AppConfig) -> Result<PgPool, String> {
    let pool = PgPoolOptions::new()
        .min_connections(config.database.min_connections)
        .max_connections(config.database.max_connections)
        .acquire_timeout(config.database.acquire_timeout())
        .connect(&config.database.url)
        .await
        .map_err(|e| format!("Database connection failed: {}", e))?;
    if config.database.run_migrations {
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| format!("Migration failed: {}", e))?;
    }
    Ok(pool)
}

fn woo_client(config: &AppConfig) -> Option<Arc<WooCommerceClient>> {
    if !config.woocommerce.is_configured() {
        return None;
    }
    Some(Arc::new(WooCommerceClient::new(WooClientConfig::new(
        config.woocommerce.base_url.clone(),
        config.woocommerce.consumer_key.clone(),
        config.woocommerce.consumer_secret.clone(),
    ))))
}

async fn serve(config: AppConfig) -> Result<(), String> {
    if !config.database.is_configured() {
        return Err("The server requires PRESSROOM__DATABASE__URL".to_string());
    }
    let pool = connect_pool(&config).await?;
    let list_registry = Arc::new(PostgresListRegistry::new(pool.clone()));
    let engine = build_engine(&config, list_registry)?;
    let store = Arc::new(PostgresNewsletterStore::new(pool.clone()));

    let mut app = axum::Router::new().nest(
        "/api/v1",
        newsletter_routes().with_state(NewsletterAppState {
            engine: engine.clone(),
            store,
        }),
    );

    if let Some(woo) = woo_client(&config) {
        let bridge = Arc::new(
            MembershipBridge::new(
                engine.clone(),
                Arc::new(PostgresSnapshotStore::new(pool.clone())),
                woo.clone(),
                woo,
            )
            .with_post_checkout_signup(config.features.post_checkout_signup),
        );
        let verifier = Arc::new(WooWebhookVerifier::new(
            config.woocommerce.webhook_secret.clone(),
        ));
        app = app.nest(
            "/api/v1/webhooks",
            webhook_routes().with_state(WebhookAppState { bridge, verifier }),
        );
    } else {
        tracing::warn!("WooCommerce is not configured; webhook intake disabled");
    }

    let origins: Vec<axum::http::HeaderValue> = config
        .server
        .cors_origins_list()
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();
    let cors = if origins.is_empty() {
        CorsLayer::new()
    } else {
        CorsLayer::new().allow_origin(AllowOrigin::list(origins))
    };

    let app = app
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_secs,
        )))
        .layer(cors);

    let addr = config.server.socket_addr();
    tracing::info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| format!("Bind failed: {}", e))?;
    axum::serve(listener, app)
        .await
        .map_err(|e| format!("Server error: {}", e))
}

async fn resync(config: AppConfig, args: ResyncArgs) -> Result<(), String> {
    let Some(woo) = woo_client(&config) else {
        return Err("WooCommerce is not configured; set PRESSROOM__WOOCOMMERCE__*".to_string());
    };

    // The list registry only matters when the database is configured;
    // resync itself never resolves local lists.
    let list_registry: Arc<dyn ListRegistry> = if config.database.is_configured() {
        Arc::new(PostgresListRegistry::new(connect_pool(&config).await?))
    } else {
        Arc::new(InMemoryListRegistry::new())
    };
    let engine = build_engine(&config, list_registry)?;
    let driver = WooResyncDriver::new(engine, woo.clone(), woo.clone(), woo);

    let resync_config = ResyncConfig {
        dry_run: args.dry_run,
        active_only: args.active_only,
        migrated_source: args.migrated_subscriptions,
        subscription_ids: args.subscription_ids.into_iter().map(SubscriptionId::new).collect(),
        order_ids: args.order_ids.into_iter().map(OrderId::new).collect(),
        user_ids: args.user_ids.into_iter().map(UserId::new).collect(),
        batch_size: args.batch_size,
        offset: args.offset,
        max_batches: args.max_batches,
    };

    let ctx = SyncContext::new();
    let processed = driver
        .resync(&ctx, &resync_config)
        .await
        .map_err(|e| format!("Resync aborted: {}", e))?;
    println!("Processed {} contact(s).", processed);
    Ok(())
}
