//! Fake-engine test harness for `aai_core`: a scriptable [`EngineApi`]
//! implementation, scenario builders, and run metrics, used by this crate's
//! integration tests and its `aai-headless` CLI driver.
//!
//! [`EngineApi`]: aai_core::engine_api::EngineApi
#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![allow(clippy::module_name_repetitions)]

pub mod fake_engine;
pub mod metrics;
pub mod scenario;

pub use fake_engine::FakeEngine;
pub use metrics::RunMetrics;
