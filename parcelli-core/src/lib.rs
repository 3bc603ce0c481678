//! Core types and service wiring for the parcelli shipment tracker.

/// Domain models and identifiers shared by all providers.
pub mod model;
/// Free-text and timestamp normalization applied to provider data.
pub mod normalize;
/// Translation of raw provider shipments into normalized records.
pub mod parse;
/// Registry and helpers for plugging tracking providers into the service.
pub mod plugin;
/// Traits describing the provider and configuration interfaces.
pub mod ports;
/// Interval-driven polling of all providers.
pub mod scheduler;
/// High-level service facade fanning requests out to every provider.
pub mod service;
/// Authoritative keyed store of the latest known shipment records.
pub mod store;

pub use model::*;
pub use normalize::*;
pub use parse::*;
pub use plugin::*;
pub use ports::*;
pub use scheduler::*;
pub use service::*;
pub use store::*;
