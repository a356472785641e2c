//! # yargi-core
//!
//! Adapter fabric for nine Turkish legal decision databases. Each adapter
//! turns a typed search request into the exact wire form its upstream
//! expects (JSON envelopes, URL-encoded forms, GUID-keyed dropdowns,
//! WebForms postbacks), drives the source through its quirks, and normalizes
//! the answer into canonical result lists and paginated Markdown documents.
//!
//! ## Architecture
//!
//! Shared plumbing, used by every adapter:
//!
//! - [`fetcher`] — per-source HTTP client with cookie jar, default headers
//!   and a 60 s deadline
//! - [`browser`] — lazily launched headless Chromium for the one source
//!   that requires live postbacks
//! - [`markdown`] — HTML cleaning, HTML→Markdown conversion and 5 000-char
//!   chunking
//! - [`pdf`] — single-page PDF extraction and PDF→Markdown
//!
//! One module per source holds that source's request/response models and
//! client. Adapters are long-lived singletons; all of them are safe to call
//! from concurrent tasks and their `close` operations are idempotent.

/// Constitutional Court norm-control corpus adapter.
pub mod anayasa;
/// Constitutional Court individual-application corpus adapter.
pub mod anayasa_bireysel;
/// Shared multi-court back-end adapter.
pub mod bedesten;
/// Headless browser driver.
pub mod browser;
/// Council of State adapter.
pub mod danistay;
/// UYAP precedent index adapter.
pub mod emsal;
/// Error types and result alias.
pub mod error;
/// HTTP fetcher shared by the HTTP-backed adapters.
pub mod fetcher;
/// Public Procurement Authority adapter.
pub mod kik;
/// Document normalizer: HTML→Markdown and pagination.
pub mod markdown;
/// Single-page PDF extraction and PDF→Markdown.
pub mod pdf;
/// Competition Authority adapter.
pub mod rekabet;
/// Court of Jurisdictional Disputes adapter.
pub mod uyusmazlik;
/// Court of Cassation adapter.
pub mod yargitay;

pub use error::{Error, Result};
