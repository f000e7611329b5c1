//! Core helpers for switchyard.
//!
//! This crate owns everything on the far side of a view: the remote
//! invocation [`Gateway`](gateway::Gateway) contract with its HTTP and
//! fixture-directory implementations, the environment-driven gateway
//! configuration, and the internal check protocol codec. It knows nothing
//! about views or rendering; use `switchyard-host`, which drives these
//! helpers from the CRUD view lifecycle.

pub mod check;
pub mod env;
pub mod gateway;

pub use env::{GatewayConfig, GatewayLocation};
pub use gateway::{
    Gateway, GatewayError, InvocationRequest, InvocationResponse, build_gateway,
    fs::FixtureGateway, http::HttpGateway,
};
