//! Content backend for the problem admin dashboard.
//!
//! The interesting part lives in [`reconcile`]: keeping the images embedded in a
//! markdown document consistent with the objects held in storage. The rest is the
//! glue the dashboard needs around it (storage gateways, save workflows, config).

pub mod config;
pub mod error;
pub mod markdown;
pub mod models;
pub mod notification;
pub mod reconcile;
pub mod services;
pub mod storage;
pub mod utils;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_helpers;

#[cfg(test)]
mod tests;

pub use error::{ReconcileError, StorageOperation};
pub use models::{ImageRef, ImageSource, LocalFile};
pub use reconcile::{ReconciliationRequest, ReconciliationResult, Reconciler};
