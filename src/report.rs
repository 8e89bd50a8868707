//! Text rendering of production plans

use std::collections::BTreeMap;

use crate::models::{ProductionNode, ProductionPlan};

/// Format a plan as an indented tree starting at the root node.
///
/// Children created for a node are nested below it; inputs taken from
/// another node's by-product are listed as a reference to that node.
pub fn format_plan_tree(plan: &ProductionPlan) -> String {
    let mut output = String::new();
    if let Some(root) = plan.node(plan.root_node_id) {
        format_node(plan, root, 0, &mut output);
    }
    output
}

fn format_node(plan: &ProductionPlan, node: &ProductionNode, indent: usize, output: &mut String) {
    let prefix = "  ".repeat(indent);

    output.push_str(&format!(
        "{}#{} {:.2}x {} running {} ({:.1} kW)\n",
        prefix, node.node_id, node.machine_count, node.machine_name, node.recipe_name, node.total_power_kw
    ));

    if node.is_extraction() {
        for (resource, rate) in &node.produced_per_second {
            output.push_str(&format!("{}  extracts {} @ {:.3}/s\n", prefix, resource, rate));
        }
    }
    for (resource, rate) in &node.required_per_second {
        output.push_str(&format!("{}  needs {} @ {:.3}/s\n", prefix, resource, rate));
    }

    let mut seen = Vec::new();
    for source in &node.source_node_ids {
        if seen.contains(source) {
            continue;
        }
        seen.push(*source);
        let Some(child) = plan.node(*source) else {
            continue;
        };
        if *source > node.node_id {
            format_node(plan, child, indent + 1, output);
        } else {
            output.push_str(&format!(
                "{}  reuses surplus from #{} ({})\n",
                prefix, child.node_id, child.recipe_name
            ));
        }
    }
}

/// Aggregated view of a production plan
#[derive(Debug)]
pub struct PlanSummary {
    pub target_resource: String,
    pub target_rate: f64,
    pub total_power_kw: f64,
    /// (machine, recipe) -> machine count
    pub machine_counts: Vec<((String, String), f64)>,
    pub extraction_rates: Vec<(String, f64)>,
    pub excess: Vec<(String, f64)>,
}

/// Generate a summary of the production plan
pub fn summarize_plan(plan: &ProductionPlan) -> PlanSummary {
    let mut machines: BTreeMap<(String, String), f64> = BTreeMap::new();
    let mut extraction: BTreeMap<String, f64> = BTreeMap::new();
    let mut excess: BTreeMap<String, f64> = BTreeMap::new();

    for node in &plan.nodes {
        *machines
            .entry((node.machine_name.clone(), node.recipe_name.clone()))
            .or_default() += node.machine_count;

        if node.is_extraction() {
            for (resource, rate) in &node.produced_per_second {
                *extraction.entry(resource.clone()).or_default() += rate;
            }
        }
    }
    for entry in &plan.excess_resources {
        *excess.entry(entry.resource_name.clone()).or_default() += entry.rate_per_second;
    }

    PlanSummary {
        target_resource: plan.target_resource.clone(),
        target_rate: plan.target_rate,
        total_power_kw: plan.total_power_kw(),
        machine_counts: machines.into_iter().collect(),
        extraction_rates: extraction.into_iter().collect(),
        excess: excess.into_iter().collect(),
    }
}

impl std::fmt::Display for PlanSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Production Summary ===")?;
        writeln!(f, "Target: {} @ {:.3}/s", self.target_resource, self.target_rate)?;
        writeln!(f)?;

        writeln!(f, "Machines required:")?;
        for ((machine, recipe), count) in &self.machine_counts {
            writeln!(f, "  {:.2}x {} ({})", count, machine, recipe)?;
        }
        writeln!(f)?;

        writeln!(f, "Raw resources extracted:")?;
        for (name, rate) in &self.extraction_rates {
            writeln!(f, "  {} @ {:.3}/s", name, rate)?;
        }
        writeln!(f)?;

        if !self.excess.is_empty() {
            writeln!(f, "Excess output:")?;
            for (name, rate) in &self.excess {
                writeln!(f, "  {} @ {:.3}/s", name, rate)?;
            }
            writeln!(f)?;
        }

        write!(f, "Power: {:.1} kW", self.total_power_kw)
    }
}
