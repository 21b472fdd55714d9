//! # Thrimp Core
//!
//! `thrimp-core` is the foundational library powering the Thrimp CLI. It provides a dynamic
//! Thrift client capable of calling any method of any service described by a parsed Thrift
//! IDL document, without compile-time knowledge of the schema and without generated stubs.
//!
//! ## Key Components
//!
//! * **[`schema::Document`]:** The parsed-IDL document model. Producing it (parsing `.thrift`
//!   text) is the job of an external parser; this crate only consumes the loaded document,
//!   for example deserialized from JSON.
//! * **[`registry::ResolvedService`]:** A service descriptor bundled with a total
//!   type-name → wire-tag registry and a merged struct/exception lookup table. Built once,
//!   shared read-only across sessions.
//! * **[`client::ThrimpClient`]:** The main entry point. One session per connection: it owns
//!   the transport, the binary protocol codecs, and the sequence counter, and exposes
//!   [`client::ThrimpClient::call`] taking positional `serde_json::Value` arguments.
//!
//! ## Value codec
//!
//! The [`codec`] module recursively transcodes `serde_json::Value` to Thrift binary wire
//! format (and back) against the schema's type references, including the numeric coercion
//! table applied on the write path.
//!
//! ## Re-exports
//!
//! This crate re-exports `thrift` and `serde_json` to ensure that consumers use compatible
//! versions of these underlying dependencies.
pub mod client;
pub mod codec;
pub mod registry;
pub mod schema;

// Re-exports
pub use serde_json;
pub use thrift;
