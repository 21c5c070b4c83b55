//! HTTP middleware in front of the career tool routes.
//!
//! - **Request Gate**: header heuristics, repeat-offender blocking, CORS and CSP
//! - **Client Address**: proxy-aware resolution with trusted-proxy validation
//!
//! Request IDs and tracing come from `tower-http` and are wired in
//! [`crate::routes`].

pub mod gate;
pub mod ip;

pub use gate::{ClientAddress, GateLayer, GateService};
pub use ip::{
    CidrRange, TrustedProxyConfig, UNKNOWN_ADDRESS, resolve_address, resolve_client_address,
};
