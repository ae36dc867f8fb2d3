//! msync-daemon library target.
//!
//! Exposes the router, event loop and sources for integration tests. The
//! binary `main.rs` wires them together.

pub mod api_types;
pub mod event_loop;
pub mod routes;
pub mod source;
pub mod state;
pub mod telemetry;
