//! Parcify personal delivery carrier.
//!
//! Quotes shipping rates for the Antwerp service area and registers shipments
//! as Parcify parcels before the host persists them.

pub mod app;
pub mod domain;
pub mod infra;
pub mod util;
