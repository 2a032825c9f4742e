//! Store factory: explicit backend selection and construction.
//!
//! The backend is always a deliberate choice — code, environment, or a
//! `store.toml` file. Construction failures are returned to the caller;
//! there is no fallback from one backend to another.

use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use super::error::{StoreError, StoreResult};
use super::repositories::LocalStore;
#[cfg(feature = "postgres-repo")]
use super::repositories::PostgresStore;
use super::store::FullStore;
use super::store_config::StoreSettings;
use super::PostgresConfig;

/// Which store implementation to construct.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    /// Postgres + Diesel implementation
    Postgres,
    /// In-memory store
    Local,
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "postgres" | "pg" => Ok(Self::Postgres),
            "local" => Ok(Self::Local),
            _ => Err(format!("unknown store backend: {}", s)),
        }
    }
}

impl StoreBackend {
    /// Read the backend from the environment.
    ///
    /// `STORE_BACKEND` wins when set; otherwise Postgres is selected when
    /// a database URL is present, and Local as the last resort.
    pub fn from_env() -> Result<Self, String> {
        if let Ok(val) = std::env::var("STORE_BACKEND") {
            return val.parse();
        }

        if std::env::var("DATABASE_URL").is_ok() {
            Ok(Self::Postgres)
        } else {
            Ok(Self::Local)
        }
    }
}

/// Centralized construction of store instances.
pub struct StoreFactory;

impl StoreFactory {
    /// Create a store for `backend`. Postgres requires a config.
    pub async fn create(
        backend: StoreBackend,
        postgres_config: Option<&PostgresConfig>,
    ) -> StoreResult<Arc<dyn FullStore>> {
        match backend {
            StoreBackend::Postgres => {
                #[cfg(feature = "postgres-repo")]
                {
                    let config = postgres_config.ok_or_else(|| {
                        StoreError::configuration("Postgres backend requires a PostgresConfig")
                    })?;
                    let store = Self::create_postgres(config).await?;
                    Ok(store as Arc<dyn FullStore>)
                }
                #[cfg(not(feature = "postgres-repo"))]
                {
                    let _ = postgres_config;
                    Err(StoreError::configuration(
                        "postgres-repo feature not enabled",
                    ))
                }
            }
            StoreBackend::Local => Ok(Self::create_local()),
        }
    }

    #[cfg(feature = "postgres-repo")]
    pub async fn create_postgres(config: &PostgresConfig) -> StoreResult<Arc<PostgresStore>> {
        let store = PostgresStore::new(config.clone())?;
        Ok(Arc::new(store))
    }

    pub fn create_local() -> Arc<dyn FullStore> {
        Arc::new(LocalStore::new())
    }

    /// Create a store from environment configuration.
    pub async fn from_env() -> StoreResult<Arc<dyn FullStore>> {
        let backend = StoreBackend::from_env().map_err(StoreError::configuration)?;

        match backend {
            StoreBackend::Postgres => {
                #[cfg(feature = "postgres-repo")]
                {
                    let config =
                        PostgresConfig::from_env().map_err(StoreError::configuration)?;
                    let store = Self::create_postgres(&config).await?;
                    Ok(store as Arc<dyn FullStore>)
                }
                #[cfg(not(feature = "postgres-repo"))]
                {
                    Err(StoreError::configuration(
                        "postgres-repo feature not enabled",
                    ))
                }
            }
            StoreBackend::Local => Ok(Self::create_local()),
        }
    }

    /// Create a store from a `store.toml` configuration file.
    pub async fn from_config_file<P: AsRef<Path>>(path: P) -> StoreResult<Arc<dyn FullStore>> {
        let settings = StoreSettings::from_file(path)?;
        Self::from_settings(&settings).await
    }

    async fn from_settings(settings: &StoreSettings) -> StoreResult<Arc<dyn FullStore>> {
        match settings.backend()? {
            StoreBackend::Postgres => {
                #[cfg(feature = "postgres-repo")]
                {
                    let config = settings.to_postgres_config()?.ok_or_else(|| {
                        StoreError::configuration(
                            "Postgres backend requires a [postgres] section",
                        )
                    })?;
                    let store = Self::create_postgres(&config).await?;
                    Ok(store as Arc<dyn FullStore>)
                }
                #[cfg(not(feature = "postgres-repo"))]
                {
                    Err(StoreError::configuration(
                        "postgres-repo feature not enabled",
                    ))
                }
            }
            StoreBackend::Local => Ok(Self::create_local()),
        }
    }
}

/// Fluent configuration for store construction.
pub struct StoreBuilder {
    backend: StoreBackend,
    #[cfg(feature = "postgres-repo")]
    postgres_config: Option<PostgresConfig>,
}

impl StoreBuilder {
    pub fn new() -> Self {
        Self {
            backend: StoreBackend::Local,
            #[cfg(feature = "postgres-repo")]
            postgres_config: None,
        }
    }

    pub fn backend(mut self, backend: StoreBackend) -> Self {
        self.backend = backend;
        self
    }

    #[cfg(feature = "postgres-repo")]
    pub fn postgres_config(mut self, config: PostgresConfig) -> Self {
        self.postgres_config = Some(config);
        self
    }

    /// Load backend + Postgres settings from the environment.
    pub fn from_env(mut self) -> Result<Self, StoreError> {
        self.backend = StoreBackend::from_env().map_err(StoreError::configuration)?;

        if self.backend == StoreBackend::Postgres {
            #[cfg(feature = "postgres-repo")]
            {
                let config = PostgresConfig::from_env().map_err(StoreError::configuration)?;
                self.postgres_config = Some(config);
            }
            #[cfg(not(feature = "postgres-repo"))]
            {
                return Err(StoreError::configuration(
                    "postgres-repo feature not enabled",
                ));
            }
        }

        Ok(self)
    }

    pub async fn build(self) -> StoreResult<Arc<dyn FullStore>> {
        #[cfg(feature = "postgres-repo")]
        let pg_config = self.postgres_config.as_ref();
        #[cfg(not(feature = "postgres-repo"))]
        let pg_config = None;

        StoreFactory::create(self.backend, pg_config).await
    }
}

impl Default for StoreBuilder {
    fn default() -> Self {
        Self::new()
    }
}
