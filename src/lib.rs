//! Item packaging and container loading.
//!
//! Picks boxes for shipment items, bundles and prices them, and loads each
//! client's packages into one container of a fleet with a deterministic
//! shelf heuristic.

pub mod api;
pub mod assignment;
pub mod bundle;
pub mod cache;
pub mod catalog;
pub mod config;
pub mod geometry;
pub mod ids;
pub mod intake;
pub mod model;
pub mod packer;
pub mod pricing;
pub mod recommender;
pub mod types;
