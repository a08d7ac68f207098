//! Core library for the Greenland apartment community rental pipeline.
//!
//! The crate owns the multi-step application form model, the step validator
//! gating forward navigation, the fee schedule, and the payment confirmation
//! pipeline: checkout session creation, webhook-driven paid transitions, and
//! the client-triggered verification fallback. External collaborators
//! (document storage, persistence, the payment provider, and the email
//! delivery service) are consumed through traits so the whole pipeline can
//! be exercised in isolation.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
