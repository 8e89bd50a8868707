//! Planning request accepted by the calculator

use serde::{Deserialize, Serialize};

use crate::error::{PlanError, PlanResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanRequest {
    pub tenant_id: i64,
    pub resource: String,
    pub rate: f64,
    #[serde(default)]
    pub alt_recipes: Vec<String>,
    #[serde(default)]
    pub alt_machines: Vec<String>,
}

impl PlanRequest {
    pub fn new(tenant_id: i64, resource: impl Into<String>, rate: f64) -> Self {
        Self {
            tenant_id,
            resource: resource.into(),
            rate,
            alt_recipes: Vec::new(),
            alt_machines: Vec::new(),
        }
    }

    pub fn with_alt_recipes(mut self, recipes: Vec<String>) -> Self {
        self.alt_recipes = recipes;
        self
    }

    pub fn with_alt_machines(mut self, machines: Vec<String>) -> Self {
        self.alt_machines = machines;
        self
    }

    pub fn validate(&self) -> PlanResult<()> {
        if self.tenant_id <= 0 {
            return Err(PlanError::InvalidRequest(
                "tenant id should be a positive integer".to_string(),
            ));
        }
        if self.resource.trim().is_empty() {
            return Err(PlanError::InvalidRequest(
                "resource name cannot be empty".to_string(),
            ));
        }
        if !self.rate.is_finite() || self.rate <= 0.0 {
            return Err(PlanError::InvalidRequest(format!(
                "rate should be a positive number, got {}",
                self.rate
            )));
        }
        Ok(())
    }
}
