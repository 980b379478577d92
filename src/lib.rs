pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod service;

pub use crate::config::AppConfig;
pub use crate::db::{open_store, RecordStore};
pub use crate::error::{AppError, StoreError};
pub use crate::service::{reconcile, BookkeepingService, Reconciler};
