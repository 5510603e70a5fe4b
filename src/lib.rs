//! Credit Report Analysis API Library
//!
//! This library provides the payment-status analysis of TrueLink credit
//! reports used by the loan-servicing backend, together with the HTTP
//! surface that exposes it.
//!
//! # Modules
//!
//! - `api`: HTTP-facing components.
//! - `core`: Analysis logic and shared errors.
//! - `call_logger`: Sanitized API call logging.
//! - `config`: Configuration management.
//! - `errors`: Error handling types.
//! - `handlers`: HTTP request handlers.
//! - `ip_allowlist`: IP allowlist middleware.
//! - `payment_status`: Monthly pay-status classification.
//! - `report`: Report rendering.
//! - `router`: Route and middleware wiring.

pub mod api;
pub mod core;

// Re-export primary modules for shared use in tests and binaries
pub mod call_logger;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod ip_allowlist;
pub mod payment_status;
pub mod report;
pub mod router;
