//! Party schedule domain: events, locations and tags.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐
//! │  Handlers   │  ← admin + public HTTP endpoints
//! └──────┬──────┘
//!        │
//! ┌──────▼──────┐     ┌─────────┐
//! │   Service   │ ◄── │   CSV   │  ← import / export
//! └──────┬──────┘     └─────────┘
//!        │
//! ┌──────▼──────┐
//! │ Repository  │  ← trait + PostgreSQL / in-memory implementations
//! └──────┬──────┘
//!        │
//! ┌──────▼──────┐
//! │   Models    │  ← records, merge inputs, sea-orm entities
//! └─────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use domain_events::{handlers, InMemoryEventRepository, EventService};
//!
//! let service = EventService::new(InMemoryEventRepository::new());
//! let admin = handlers::admin_router(service.clone());
//! let public = handlers::public_router(service);
//! ```

pub mod csv;
pub mod entity;
pub mod error;
pub mod handlers;
pub mod models;
pub mod postgres;
pub mod repository;
pub mod service;

pub use crate::csv::{ImportResult, RowError};
pub use error::{EventError, EventResult};
pub use handlers::{AdminApiDoc, PublicApiDoc};
pub use models::{Event, Location, MergeEvent, MergeLocation, MergeTag, Tag};
pub use postgres::PgEventRepository;
pub use repository::{EventRepository, InMemoryEventRepository};
pub use service::{EventService, Merged, Upsert};
