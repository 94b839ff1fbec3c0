//! ielts-core: timed practice-test session engine, scoring and band estimation.
//!
//! This crate defines the question model, the per-skill timing table, the
//! session state machine that drives a practice run, and the pure scoring
//! functions that turn a finished run into an [`result::ExamResult`].

pub mod band;
pub mod clock;
pub mod config;
pub mod driver;
pub mod error;
pub mod model;
pub mod parser;
pub mod result;
pub mod scoring;
pub mod session;
pub mod timing;
pub mod traits;
