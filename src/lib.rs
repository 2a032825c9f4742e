//! # Orchestrall Core Backend
//!
//! Multi-tenant backend core for the Orchestrall platform, reimplemented
//! as a Rust library. Two independent capabilities live here:
//!
//! - **Entity Registry & CRUD Engine**: one reusable code path exposing
//!   list/get/create/update/delete/bulk operations for any registered
//!   entity, with pagination, filtering, sorting, free-text search and
//!   per-entity field validation. Tenant isolation is enforced on every
//!   call.
//! - **Appointment Scheduling Engine**: availability computation from
//!   recurring weekly doctor schedules, conflict-checked booking, and the
//!   appointment status state machine (booked, confirmed, cancelled,
//!   completed, no-show) including reschedules.
//!
//! ## Architecture
//!
//! The crate is organized into several logical modules:
//!
//! - [`api`]: shared value types (tenant/record identifiers, paging)
//! - [`registry`]: entity descriptors, query validation, the CRUD engine
//! - [`scheduler`]: slot generation, booking, status transitions
//! - [`db`]: store traits, the in-memory store, the Postgres store, and
//!   the factory that selects a backend explicitly at startup
//! - [`notify`]: outbound notification dispatch for scheduling events
//! - [`http`]: Axum-based REST adapter (feature `http-server`)
//!
//! Both engines are stateless between calls: they hold an
//! `Arc<dyn FullStore>` handle and a tenant id is passed into every CRUD
//! operation explicitly. Nothing is cached across requests, so every
//! conflict decision reflects the live persisted state.

pub mod api;
pub mod db;
pub mod error;
pub mod models;
pub mod notify;
pub mod registry;
pub mod scheduler;

#[cfg(feature = "http-server")]
pub mod http;
