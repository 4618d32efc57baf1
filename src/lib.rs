//! Property affordability and wealth projection for the Ljubljana housing market.
//!
//! - **core**: pure calculators (DTI price solve, compound growth projection, payment adjustment)
//! - **api**: HTTP routes and the command line front end
//! - **config**: environment-driven market and policy settings

pub mod api;
pub mod config;
pub mod core;
