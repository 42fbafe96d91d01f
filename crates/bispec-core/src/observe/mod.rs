//! # Observability
//!
//! Structured logging through `tracing`. The library only emits events;
//! applications decide where they go:
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │  bispectral graph build      deferred chunks │
//! │        debug!()              trace!/debug!() │
//! └──────────────────────┬───────────────────────┘
//!                        ▼
//!              tracing-subscriber registry
//!              EnvFilter ─► fmt (json/pretty/compact)
//!                        ▼
//!                     stderr
//! ```

pub mod logging;

pub use logging::{build_filter, init_logging, LogConfig, LogFormat, LogLevel};
