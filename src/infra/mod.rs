//! Carrier integrations: the Parcify HTTP API, response cache and host sinks.

pub mod cache;
pub mod debug_log;
pub mod gateway;
pub mod notify;
