pub mod api;
pub mod config;
pub mod error;
pub mod flow;
pub mod geo;
pub mod models;
pub mod observability;
pub mod pricing;
pub mod providers;
pub mod state;
pub mod sync;
