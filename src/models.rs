//! Data models for tenant catalogues and production plans

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
    pub id: i64,
    pub name: String,
    pub liquid: bool,
    pub unit: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Machine {
    pub id: i64,
    pub name: String,
    pub speed: f64,
    pub power_kw: f64,
    pub default_choice: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Recipe {
    pub id: i64,
    pub name: String,
    pub production_time_s: f64,
    pub default_choice: bool,
    pub inputs: Vec<Ingredient>,
    pub outputs: Vec<Ingredient>,
}

/// One (resource, amount per cycle) line of a recipe
#[derive(Debug, Clone, PartialEq)]
pub struct Ingredient {
    pub resource: String,
    pub amount: f64,
}

/// A resource flow for a single machine running a recipe, in units/s
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceFlow {
    pub resource: String,
    pub rate_per_second: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecipeFlows {
    pub inputs: Vec<ResourceFlow>,
    pub outputs: Vec<ResourceFlow>,
}

/// The recipe and machine chosen to produce a resource
#[derive(Debug, Clone, PartialEq)]
pub struct ProducerPairing {
    pub recipe_id: i64,
    pub recipe_name: String,
    pub machine_id: i64,
    pub machine_name: String,
    /// Output of the demanded resource for one machine, units/s
    pub rate: f64,
    pub power_kw: f64,
}

/// One scaled recipe+machine decision in a plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductionNode {
    #[serde(rename = "NodeId")]
    pub node_id: usize,
    #[serde(rename = "RecipeName")]
    pub recipe_name: String,
    #[serde(rename = "MachineName")]
    pub machine_name: String,
    #[serde(rename = "MachineNumber")]
    pub machine_count: f64,
    #[serde(rename = "TotalPowerConsumedkW")]
    pub total_power_kw: f64,
    #[serde(rename = "RequiredResourcesPerSecond")]
    pub required_per_second: BTreeMap<String, f64>,
    #[serde(rename = "ProducedResourcesPerSecond")]
    pub produced_per_second: BTreeMap<String, f64>,
    #[serde(rename = "SourceNodes")]
    pub source_node_ids: Vec<usize>,
}

impl ProductionNode {
    /// Nodes with no inputs harvest a raw resource
    pub fn is_extraction(&self) -> bool {
        self.required_per_second.is_empty()
    }
}

/// By-product output not yet consumed by any node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurplusEntry {
    #[serde(rename = "NodeId")]
    pub producer_node_id: usize,
    #[serde(rename = "ExcessResourceName")]
    pub resource_name: String,
    #[serde(rename = "ExcessProducedResourcePerSecond")]
    pub rate_per_second: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductionPlan {
    #[serde(rename = "TargetResource")]
    pub target_resource: String,
    #[serde(rename = "TargetResourceRate")]
    pub target_rate: f64,
    #[serde(rename = "TargetResourceSourceNode")]
    pub root_node_id: usize,
    #[serde(rename = "TreeNodes")]
    pub nodes: Vec<ProductionNode>,
    #[serde(rename = "ExcessResources")]
    pub excess_resources: Vec<SurplusEntry>,
}

impl ProductionPlan {
    pub fn node(&self, node_id: usize) -> Option<&ProductionNode> {
        self.nodes.get(node_id)
    }

    pub fn total_power_kw(&self) -> f64 {
        self.nodes.iter().map(|n| n.total_power_kw).sum()
    }
}
