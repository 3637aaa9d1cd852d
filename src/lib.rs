//! # ossfinder
//!
//! Backend for a small full-text search portal over indexed open-source
//! projects. The service is a thin orchestration layer: an HTTP edge
//! (search, upload, contact, health) in front of an external
//! Typesense-compatible search engine, a CAPTCHA verification API, and an
//! SMTP relay.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────┐   ┌──────────────┐   ┌──────────────┐
//! │ Client │──▶│  Edge (axum) │──▶│   Gateway    │──▶ search engine
//! └────────┘   │ /search      │   │ retry/dedupe │
//!              │ /upload      │   └──────────────┘
//!              │ /contact ────┼──▶ CAPTCHA API, SMTP relay
//!              │ /health      │
//!              └──────────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration with environment secret overrides |
//! | [`models`] | Document record and batch outcome types |
//! | [`error`] | Gateway error taxonomy (transient vs. permanent) |
//! | [`retry`] | Deadline-bounded retry for remote calls |
//! | [`gateway`] | Search-engine client: bootstrap, search, idempotent indexing |
//! | [`captcha`] | Friendly Captcha verification (fail closed) |
//! | [`mailer`] | Mailer trait and SMTP implementation |
//! | [`contact`] | Contact form validation and email rendering |
//! | [`server`] | HTTP edge service |

pub mod captcha;
pub mod config;
pub mod contact;
pub mod error;
pub mod gateway;
pub mod mailer;
pub mod models;
pub mod retry;
pub mod server;
