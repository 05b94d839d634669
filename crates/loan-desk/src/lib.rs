//! Loan decision service: scores applicants, explains rejections, and keeps running verdict
//! counters behind username/password sessions.

pub mod auth;
pub mod batch;
pub mod config;
pub mod decision;
pub mod error;
mod storage;
pub mod telemetry;
