//! Data-access layer.
//!
//! Persistence sits behind the store traits in [`store`], so backends can
//! be swapped without touching either engine:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │  CrudEngine / SchedulingService (business logic)        │
//! └───────────────────┬─────────────────────────────────────┘
//!                     │
//! ┌───────────────────▼─────────────────────────────────────┐
//! │  EntityStore + AppointmentStore traits (store.rs)       │
//! └───────────────────┬─────────────────────────────────────┘
//!                     │
//!     ┌───────────────┴───────────────┐
//!     │ LocalStore     │ PostgresStore │
//!     │ (in-memory)    │ (Diesel)      │
//!     └───────────────────────────────┘
//! ```
//!
//! The backend is selected explicitly — from code, environment variables,
//! or a `store.toml` file via [`factory::StoreFactory`]. The in-memory
//! store is a deliberate choice for tests and local development, never a
//! fallback: a Postgres connection failure at startup is fatal rather
//! than a silent downgrade.

// Feature flag priority: postgres > local.
#[cfg(not(any(feature = "postgres-repo", feature = "local-repo")))]
compile_error!("Enable at least one store backend feature.");

pub mod error;
pub mod factory;
pub mod repositories;
pub mod store;
pub mod store_config;

pub use error::{ErrorContext, StoreError, StoreResult};
pub use factory::{StoreBackend, StoreBuilder, StoreFactory};
pub use repositories::LocalStore;
#[cfg(feature = "postgres-repo")]
pub use repositories::{PostgresConfig, PostgresStore};
pub use store::{AppointmentStore, BookingOutcome, EntityStore, FullStore};
pub use store_config::StoreSettings;

/// Placeholder config type when the Postgres backend is compiled out, so
/// factory signatures stay stable across feature sets.
#[cfg(not(feature = "postgres-repo"))]
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    _private: (),
}
