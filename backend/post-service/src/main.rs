use actix_web::{web, App, HttpServer};
use post_service::handlers;
use post_service::media::{MediaStore, S3MediaStore};
use post_service::payment::{PaymentGateway, ZaloPayClient};
use post_service::services::Services;
use sqlx::postgres::PgPoolOptions;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinSet;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn other_error(context: &str, err: impl std::fmt::Display) -> io::Error {
    io::Error::new(io::ErrorKind::Other, format!("{}: {}", context, err))
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,sqlx=warn".into());
    let registry = tracing_subscriber::registry().with(filter);

    if std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json")) {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = terminate.recv() => {},
                }
            }
            Err(e) => {
                tracing::warn!("Failed to install SIGTERM handler: {}", e);
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

/// Post Service
///
/// Posts, comments, likes, comment likes and donations for the Nova social
/// platform, plus the ranked "random" feed.
///
/// # Surfaces
///
/// - gRPC `nova.post_service.v1.PostService` (and the standard health service)
/// - HTTP: `/api/v1/health`, `/api/v1/health/live`, `/metrics`, `/donation/*`
#[actix_web::main]
async fn main() -> io::Result<()> {
    init_tracing();

    // Load configuration
    let config = match post_service::Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::error!("Configuration loading failed: {:#}", e);
            eprintln!("ERROR: Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    tracing::info!("Starting post-service v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Environment: {}", config.app.env);

    // Database
    let db_pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .acquire_timeout(Duration::from_secs(10))
        .connect(&config.database.url)
        .await
        .map_err(|e| other_error("Failed to connect to PostgreSQL", e))?;

    sqlx::migrate!("./migrations")
        .run(&db_pool)
        .await
        .map_err(|e| other_error("Failed to run migrations", e))?;
    tracing::info!("Database migrations applied");

    // External collaborators
    let media: Arc<dyn MediaStore> = Arc::new(S3MediaStore::from_config(&config.media).await);
    let gateway: Arc<dyn PaymentGateway> = Arc::new(
        ZaloPayClient::new(config.zalopay.clone())
            .map_err(|e| other_error("Failed to initialize ZaloPay client", e))?,
    );

    let services = Services::new(db_pool.clone(), media, gateway, &config.feed);

    let http_bind_address = format!("{}:{}", config.app.host, config.app.http_port);
    let grpc_addr: SocketAddr = format!("{}:{}", config.app.host, config.grpc.port)
        .parse()
        .map_err(|e| other_error("Invalid gRPC bind address", e))?;

    tracing::info!("Starting HTTP server at {}", http_bind_address);

    let pool_data = web::Data::new(db_pool.clone());
    let donation_data = web::Data::from(services.donations.clone());
    let server = HttpServer::new(move || {
        App::new()
            .app_data(pool_data.clone())
            .app_data(donation_data.clone())
            .wrap(tracing_actix_web::TracingLogger::default())
            .route("/metrics", web::get().to(post_service::metrics::serve_metrics))
            .configure(handlers::configure)
    })
    .bind(&http_bind_address)?
    .workers(4)
    .run();

    let server_handle = server.handle();

    let (shutdown_tx, _) = broadcast::channel(1);
    let grpc_shutdown = shutdown_tx.subscribe();

    // Spawn both HTTP and gRPC servers concurrently
    let mut tasks: JoinSet<io::Result<()>> = JoinSet::new();

    tasks.spawn(async move {
        tracing::info!("HTTP server is running");
        server.await
    });

    let max_message_bytes = config.grpc.max_message_bytes;
    tasks.spawn(async move {
        post_service::grpc::start_grpc_server(grpc_addr, services, max_message_bytes, grpc_shutdown)
            .await
            .map_err(|e| other_error("gRPC server failed", e))
    });

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    // Run until a signal arrives or either server stops
    let mut first_error: Option<io::Error> = None;
    loop {
        tokio::select! {
            result = tasks.join_next() => match result {
                Some(Ok(Ok(()))) => {
                    tracing::info!("Server task completed");
                    continue;
                }
                Some(Ok(Err(e))) => {
                    tracing::error!("Server task failed: {}", e);
                    first_error = Some(e);
                }
                Some(Err(e)) => {
                    tracing::error!("Server task panicked or was cancelled: {}", e);
                    first_error = Some(other_error("Task join error", e));
                }
                None => {}
            },
            _ = &mut shutdown => tracing::info!("Shutdown signal received"),
        }
        break;
    }

    let _ = shutdown_tx.send(());
    server_handle.stop(true).await;
    tasks.shutdown().await;

    db_pool.close().await;
    tracing::info!("post-service shut down");

    match first_error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
