//! # Wordbook Binary
//!
//! The entry point that assembles the application based on compile-time features.
//!
//! `wordbook` serves the API; `wordbook issue-token <userId>` prints a
//! session token for a user authenticated elsewhere.

use std::sync::Arc;
use std::time::Duration;

use actix_web::{web, App, HttpServer};
use anyhow::{bail, Context};
use configs::Settings;
use tracing::info;
use tracing_subscriber::EnvFilter;
use wb_api::{configure_routes, middleware, AppState};
use wb_auth_simple::SimpleAuthProvider;
use wb_core::{AuthProvider, Backends, BlobStore, DocumentStore, FetchRelay, UserId, Vocabulary};
use wb_relay_http::HttpFetchRelay;

// Feature-gated imports: each persistent plugin replaces its in-memory twin.
#[cfg(feature = "db-sqlite")]
use wb_db_sqlite::SqliteDocumentStore;

#[cfg(feature = "storage-local")]
use wb_storage_local::LocalBlobStore;

const CONFIG_FILE: &str = "config/wordbook";

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load(Some(CONFIG_FILE)).context("failed to load settings")?;
    init_tracing(&settings)?;
    if let Some(path) = &settings.env_file {
        info!(path = %path.display(), "loaded .env");
    }

    let auth: Arc<dyn AuthProvider> = Arc::new(SimpleAuthProvider::new(settings.auth.secret.clone()));

    let mut args = std::env::args().skip(1);
    match args.next().as_deref() {
        None => serve(settings, auth).await,
        Some("issue-token") => {
            let user = args.next().context("usage: wordbook issue-token <userId>")?;
            println!("{}", auth.issue(&UserId::from(user)));
            Ok(())
        }
        Some(other) => bail!("unknown command {other}"),
    }
}

fn init_tracing(settings: &Settings) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.log.filter))
        .context("invalid log filter")?;
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let result = if settings.log.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    result.map_err(|e| anyhow::anyhow!("failed to install tracing subscriber: {e}"))
}

async fn serve(settings: Settings, auth: Arc<dyn AuthProvider>) -> anyhow::Result<()> {
    // 1. Initialize Document Store Implementation
    #[cfg(feature = "db-sqlite")]
    let docs: Arc<dyn DocumentStore> = Arc::new(
        SqliteDocumentStore::new(&settings.storage.database_url)
            .await
            .context("failed to init SQLite")?,
    );
    #[cfg(not(feature = "db-sqlite"))]
    let docs: Arc<dyn DocumentStore> = Arc::new(wb_store_memory::MemoryDocumentStore::new());

    // 2. Initialize Blob Storage Implementation
    #[cfg(feature = "storage-local")]
    let blobs: Arc<dyn BlobStore> = Arc::new(LocalBlobStore::new(
        settings.storage.blob_root.clone(),
        settings.storage.blob_url_prefix.clone(),
    ));
    #[cfg(not(feature = "storage-local"))]
    let blobs: Arc<dyn BlobStore> = Arc::new(wb_store_memory::MemoryBlobStore::new());

    // 3. Image relay shares the blob store
    let relay: Arc<dyn FetchRelay> = Arc::new(HttpFetchRelay::new(
        blobs.clone(),
        Duration::from_secs(settings.relay.timeout_secs),
        settings.relay.max_bytes,
    )?);

    // 4. Wrap in AppState (dynamic dispatch over the chosen plugins)
    let state = web::Data::new(AppState {
        vocab: Vocabulary::new(Backends {
            docs,
            blobs,
            relay: relay.clone(),
        }),
        auth,
        relay,
    });

    let (host, port) = settings.bind_address();
    let cors_origin = settings.server.cors_origin.clone();
    info!(%host, port, "Wordbook starting");

    #[cfg(feature = "storage-local")]
    let blob_files = (
        settings.storage.blob_url_prefix.clone(),
        settings.storage.blob_root.clone(),
    );

    HttpServer::new(move || {
        let app = App::new()
            .app_data(state.clone())
            .wrap(middleware::cors_policy(&cors_origin))
            .wrap(middleware::standard_middleware());

        // Download URLs issued by the local blob store point here.
        #[cfg(feature = "storage-local")]
        let app = app.service(actix_files::Files::new(&blob_files.0, &blob_files.1));

        app.configure(configure_routes)
    })
    .bind((host.as_str(), port))
    .with_context(|| format!("failed to bind {host}:{port}"))?
    .run()
    .await?;
    Ok(())
}
