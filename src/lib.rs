// src/lib.rs
// Public library surface for the binaries and integration tests.

pub mod aggregate;
pub mod app;
pub mod breaker;
pub mod cache;
pub mod clock;
pub mod config;
pub mod daily;
pub mod metrics;
pub mod quote;
pub mod random;
pub mod scheduler;
pub mod sources;
pub mod store;
pub mod tagging;

// ---- Re-exports for stable public API ----
pub use crate::aggregate::{Aggregator, QuoteQuery};
pub use crate::app::App;
pub use crate::daily::DailyPinService;
pub use crate::quote::{Category, OriginClass, Quote, SourceId};
