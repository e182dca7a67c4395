//! Service wiring and bootstrap.

use std::sync::Arc;

use anyhow::Context;
use domain::services::{QuizStore, RegistrationStore, UserStore};
use persistence::memory::MemoryStoreOptions;
use persistence::{InMemoryStore, PgStore};
use tracing::info;

use crate::config::{Config, StoreBackend};
use crate::logging::init_logging;
use crate::services::{ProfileService, QuizService, RegistrationService};

/// The three collections the services read and write.
#[derive(Clone)]
pub struct Stores {
    pub quizzes: Arc<dyn QuizStore>,
    pub registrations: Arc<dyn RegistrationStore>,
    pub users: Arc<dyn UserStore>,
}

impl Stores {
    /// All collections backed by one adapter.
    pub fn from_adapter<S>(store: S) -> Self
    where
        S: QuizStore + RegistrationStore + UserStore + 'static,
    {
        let store = Arc::new(store);
        Self {
            quizzes: store.clone(),
            registrations: store.clone(),
            users: store,
        }
    }
}

/// Entry point bundling the quiz, registration and profile services.
#[derive(Clone)]
pub struct Quizhub {
    pub quizzes: QuizService,
    pub registrations: RegistrationService,
    pub profiles: ProfileService,
}

impl Quizhub {
    pub fn with_stores(config: &Config, stores: Stores) -> Self {
        Self {
            quizzes: QuizService::new(stores.clone()),
            registrations: RegistrationService::new(stores.clone(), config.views.clone()),
            profiles: ProfileService::new(stores),
        }
    }

    /// Connects the store adapter selected by `config.store.backend`.
    pub async fn connect(config: &Config) -> anyhow::Result<Self> {
        let stores = match config.store.backend {
            StoreBackend::Memory => Stores::from_adapter(InMemoryStore::with_options(
                MemoryStoreOptions {
                    feed_buffer: config.views.change_buffer,
                    ..MemoryStoreOptions::default()
                },
            )),
            StoreBackend::Postgres => {
                let pool = persistence::db::create_pool(&config.database)
                    .await
                    .context("Failed to connect to database")?;
                if config.store.run_migrations {
                    persistence::db::run_migrations(&pool)
                        .await
                        .context("Failed to run database migrations")?;
                    info!("Database migrations completed");
                }
                let store = PgStore::new(pool).with_feed_buffer(config.views.change_buffer);
                store.spawn_pool_metrics(config.database.pool_metrics_interval());
                Stores::from_adapter(store)
            }
        };

        info!(backend = ?config.store.backend, "Quizhub services ready");
        Ok(Self::with_stores(config, stores))
    }

    /// Loads `.env` and configuration, installs logging, and connects.
    pub async fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Config::load().context("Failed to load configuration")?;

        if let Err(e) = init_logging(&config.logging) {
            eprintln!("Logging already initialized: {e}");
        }

        info!(
            version = env!("CARGO_PKG_VERSION"),
            "Starting Quizhub client services"
        );

        Self::connect(&config).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_connect_memory_backend() {
        let config = Config::load_for_test(&[]).unwrap();
        let hub = Quizhub::connect(&config).await.unwrap();
        let quizzes = hub.quizzes.browse(&Default::default()).await.unwrap();
        assert!(quizzes.quizzes.is_empty());
    }

    #[tokio::test]
    async fn test_connect_postgres_without_server_fails() {
        let config = Config::load_for_test(&[
            ("store.backend", "postgres"),
            ("database.url", "postgres://nobody@127.0.0.1:1/quizhub"),
            ("database.connect_timeout_secs", "1"),
            ("database.min_connections", "0"),
        ])
        .unwrap();
        assert!(Quizhub::connect(&config).await.is_err());
    }
}
