//! Administrative backend for managing working students, their employments,
//! projects, time periods, and project allocations, plus a spreadsheet
//! import that reconciles exported rows into the same records.

pub mod config;
pub mod domain;
pub mod error;
pub mod http;
pub mod import;
pub mod integrity;
pub mod services;
pub mod store;
pub mod telemetry;
