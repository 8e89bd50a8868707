//! Production plan calculator for factory-building games.
//!
//! Given a tenant's catalogue of recipes and machines, [`calculator::calculate`]
//! derives every production station needed to sustain a target output rate,
//! reusing by-product surplus where it can.

pub mod calculator;
pub mod catalog;
pub mod config;
pub mod db;
pub mod error;
pub mod import;
pub mod models;
pub mod report;
pub mod request;
pub mod sample;

pub use calculator::{calculate, PlanOptions};
pub use catalog::{Catalog, SqliteCatalog};
pub use error::{PlanError, PlanResult};
pub use models::{ProductionNode, ProductionPlan, SurplusEntry};
pub use request::PlanRequest;
