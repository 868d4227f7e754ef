use actix_cors::Cors;
use actix_web::{error, http::StatusCode, middleware, web, App, HttpRequest, HttpResponse, HttpServer};
use roomie_match::config::{LogFormat, Settings, StorageBackend};
use roomie_match::core::{ProfileDirectory, RecordStore, RelationshipEngine};
use roomie_match::models::ErrorResponse;
use roomie_match::routes::{self, relationships::AppState};
use roomie_match::services::{
    AppwriteClient, AppwriteCollections, CacheManager, CachedDirectory, MemoryProfileDirectory,
    MemoryRecordStore, PostgresClient,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Malformed request payload, rendered with the same body as engine errors
#[derive(Debug)]
struct PayloadError(ErrorResponse);

impl PayloadError {
    fn bad_request(kind: &str, err: impl std::fmt::Display) -> Self {
        Self(ErrorResponse {
            error: kind.to_string(),
            message: err.to_string(),
            status_code: StatusCode::BAD_REQUEST.as_u16(),
        })
    }
}

impl std::fmt::Display for PayloadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.0.error, self.0.message)
    }
}

impl error::ResponseError for PayloadError {
    fn status_code(&self) -> StatusCode {
        StatusCode::BAD_REQUEST
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::BadRequest().json(&self.0)
    }
}

fn json_payload_error(err: error::JsonPayloadError, req: &HttpRequest) -> actix_web::Error {
    tracing::info!("Rejected JSON body on {}: {}", req.path(), err);
    PayloadError::bad_request("invalid_json", err).into()
}

fn query_payload_error(err: error::QueryPayloadError, req: &HttpRequest) -> actix_web::Error {
    tracing::info!("Rejected query string on {}: {}", req.path(), err);
    PayloadError::bad_request("invalid_query", err).into()
}

fn io_error(context: &str, err: impl std::fmt::Display) -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::Other, format!("{}: {}", context, err))
}

/// Build the profile directory, with the cache in front
async fn build_directory(
    settings: &Settings,
) -> std::io::Result<Arc<dyn ProfileDirectory>> {
    let inner: Arc<dyn ProfileDirectory> = match settings.storage.backend {
        StorageBackend::Memory => {
            let directory = match &settings.storage.profiles_file {
                Some(path) => {
                    let json = std::fs::read_to_string(path)
                        .map_err(|e| io_error("Failed to read profiles file", e))?;
                    MemoryProfileDirectory::from_json(&json)
                        .map_err(|e| io_error("Invalid profiles file", e))?
                }
                None => MemoryProfileDirectory::new(),
            };
            info!("Using in-memory profile directory");
            return Ok(Arc::new(directory));
        }
        StorageBackend::Postgres => {
            let appwrite = settings
                .appwrite
                .clone()
                .ok_or_else(|| io_error("Configuration error", "missing [appwrite] section"))?;

            let client = AppwriteClient::new(
                appwrite.endpoint,
                appwrite.api_key,
                appwrite.project_id,
                appwrite.database_id,
                AppwriteCollections {
                    user_profiles: settings.collection.user_profiles.clone(),
                },
                Duration::from_secs(appwrite.timeout_secs),
            )
            .map_err(|e| io_error("Failed to create Appwrite client", e))?
            .with_page_size(appwrite.page_size);

            info!("Appwrite client initialized");
            Arc::new(client)
        }
    };

    let cache_ttl = settings.cache.ttl_secs.unwrap_or(300);
    let l1_cache_size = settings.cache.l1_cache_size.unwrap_or(1000);

    let cache = match &settings.cache.redis_url {
        Some(redis_url) => match CacheManager::new(redis_url, l1_cache_size, cache_ttl).await {
            Ok(c) => {
                info!("Cache manager initialized (L1: {} entries, TTL: {}s)", l1_cache_size, cache_ttl);
                c
            }
            Err(e) => {
                warn!("Failed to connect to Redis ({}), using L1 cache only", e);
                CacheManager::in_memory(l1_cache_size, cache_ttl)
            }
        },
        None => CacheManager::in_memory(l1_cache_size, cache_ttl),
    };

    Ok(Arc::new(CachedDirectory::new(inner, Arc::new(cache))))
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenv::dotenv().ok();

    // Load configuration
    let settings = Settings::load().map_err(|e| io_error("Configuration error", e))?;

    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.logging.level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true);

    match settings.logging.format {
        LogFormat::Pretty => subscriber.pretty().init(),
        LogFormat::Compact => subscriber.compact().init(),
        LogFormat::Json => subscriber.json().init(),
    }

    info!("Starting Roomie Match relationship service...");

    let directory = build_directory(&settings).await?;

    let (store, postgres): (Arc<dyn RecordStore>, Option<Arc<PostgresClient>>) =
        match settings.storage.backend {
            StorageBackend::Memory => {
                warn!("Using in-memory record store, relationships are lost on restart");
                (Arc::new(MemoryRecordStore::new()) as Arc<dyn RecordStore>, None)
            }
            StorageBackend::Postgres => {
                let database = settings
                    .database
                    .clone()
                    .ok_or_else(|| io_error("Configuration error", "missing [database] section"))?;

                let postgres = Arc::new(
                    PostgresClient::from_settings(
                        &database.url,
                        database.max_connections,
                        database.min_connections,
                        database.acquire_timeout_secs,
                        database.idle_timeout_secs,
                    )
                    .await
                    .map_err(|e| {
                        error!("Failed to connect to PostgreSQL: {}", e);
                        io_error("PostgreSQL connection error", e)
                    })?,
                );

                info!(
                    "PostgreSQL record store initialized (max: {} connections)",
                    database.max_connections.unwrap_or(10)
                );
                (postgres.clone() as Arc<dyn RecordStore>, Some(postgres))
            }
        };

    let app_state = AppState {
        engine: RelationshipEngine::new(store, directory),
        postgres,
    };

    // Configure HTTP server
    let host = settings.server.host.clone();
    let port = settings.server.port;
    let workers = settings.server.workers.unwrap_or(4);

    info!("Starting HTTP server on {}:{}", host, port);

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .app_data(web::JsonConfig::default().error_handler(json_payload_error))
            .app_data(web::QueryConfig::default().error_handler(query_payload_error))
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .wrap(middleware::Compress::default())
            .configure(routes::configure_routes)
    })
    .workers(workers)
    .bind((host, port))?
    .run()
    .await
}
