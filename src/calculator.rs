//! Production plan calculator logic

use tracing::{debug, info, info_span};

use crate::catalog::Catalog;
use crate::error::{PlanError, PlanResult};
use crate::models::{ProductionNode, ProductionPlan, SurplusEntry};
use crate::request::PlanRequest;

/// Residue of a subtraction at or below this fraction of the larger
/// operand counts as zero
pub const RELATIVE_EPSILON: f64 = 1e-9;

/// Default limit on how many recipe levels a plan may nest
pub const DEFAULT_MAX_DEPTH: usize = 64;

#[derive(Debug, Clone)]
pub struct PlanOptions {
    pub max_depth: usize,
}

impl Default for PlanOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// Calculate the production plan for a request
///
/// Resolves the target resource recursively, reusing by-product surplus
/// from already planned nodes. Either the whole plan is built or an error
/// is returned; partial plans are never produced.
pub fn calculate<C: Catalog + ?Sized>(
    catalog: &C,
    request: &PlanRequest,
    options: &PlanOptions,
) -> PlanResult<ProductionPlan> {
    request.validate()?;

    let span = info_span!(
        "calculate",
        tenant_id = request.tenant_id,
        resource = %request.resource,
        rate = request.rate
    );
    let _guard = span.enter();

    let mut ctx = PlanContext::new(catalog, request, options.max_depth);
    let root_node_id = ctx.resolve(&request.resource, request.rate)?;

    info!(
        nodes = ctx.nodes.len(),
        excess = ctx.surplus.len(),
        "production plan calculated"
    );

    Ok(ProductionPlan {
        target_resource: request.resource.clone(),
        target_rate: request.rate,
        root_node_id,
        nodes: ctx.nodes,
        excess_resources: ctx.surplus,
    })
}

/// Mutable state of one planning run
struct PlanContext<'a, C: Catalog + ?Sized> {
    catalog: &'a C,
    tenant_id: i64,
    allowed_recipes: &'a [String],
    allowed_machines: &'a [String],
    max_depth: usize,
    nodes: Vec<ProductionNode>,
    surplus: Vec<SurplusEntry>,
    /// Resources currently being resolved, outermost first
    chain: Vec<String>,
}

impl<'a, C: Catalog + ?Sized> PlanContext<'a, C> {
    fn new(catalog: &'a C, request: &'a PlanRequest, max_depth: usize) -> Self {
        Self {
            catalog,
            tenant_id: request.tenant_id,
            allowed_recipes: &request.alt_recipes,
            allowed_machines: &request.alt_machines,
            max_depth,
            nodes: Vec::new(),
            surplus: Vec::new(),
            chain: Vec::new(),
        }
    }

    fn resolve(&mut self, resource: &str, rate: f64) -> PlanResult<usize> {
        if self.chain.iter().any(|r| r == resource) {
            let mut chain = self.chain.clone();
            chain.push(resource.to_string());
            return Err(PlanError::CyclicRecipe {
                resource: resource.to_string(),
                chain,
            });
        }
        if self.chain.len() >= self.max_depth {
            return Err(PlanError::DepthExceeded {
                resource: resource.to_string(),
                limit: self.max_depth,
            });
        }

        let pairing = self
            .catalog
            .select_best_producer(
                self.tenant_id,
                resource,
                self.allowed_recipes,
                self.allowed_machines,
            )?
            .ok_or_else(|| PlanError::NoRecipe {
                resource: resource.to_string(),
            })?;

        let machine_count = rate / pairing.rate;
        let flows = self
            .catalog
            .flows_for(pairing.recipe_id, pairing.machine_id, self.tenant_id)?;

        let node_id = self.nodes.len();
        let mut node = ProductionNode {
            node_id,
            recipe_name: pairing.recipe_name,
            machine_name: pairing.machine_name,
            machine_count,
            total_power_kw: machine_count * pairing.power_kw,
            required_per_second: Default::default(),
            produced_per_second: Default::default(),
            source_node_ids: Vec::new(),
        };

        let mut outstanding: Vec<(String, f64)> = Vec::new();
        for input in flows.inputs {
            let required = input.rate_per_second * machine_count;
            *node
                .required_per_second
                .entry(input.resource.clone())
                .or_default() += required;

            let remaining = self.draw_surplus(&input.resource, required, &mut node.source_node_ids);
            if remaining > 0.0 {
                outstanding.push((input.resource, remaining));
            }
        }

        for output in flows.outputs {
            let produced = output.rate_per_second * machine_count;
            *node
                .produced_per_second
                .entry(output.resource.clone())
                .or_default() += produced;

            if output.resource != resource && produced > 0.0 {
                self.surplus.push(SurplusEntry {
                    producer_node_id: node_id,
                    resource_name: output.resource,
                    rate_per_second: produced,
                });
            }
        }

        debug!(
            node_id,
            resource,
            recipe = %node.recipe_name,
            machine = %node.machine_name,
            machine_count,
            "planned node"
        );
        self.nodes.push(node);

        self.chain.push(resource.to_string());
        for (input, amount) in outstanding {
            let child = self.resolve(&input, amount)?;
            self.nodes[node_id].source_node_ids.push(child);
        }
        self.chain.pop();

        Ok(node_id)
    }

    /// Satisfy `required` units/s of `resource` from the surplus pool.
    ///
    /// Every matching entry is visited in pool order and recorded in
    /// `sources`. Entries smaller than what is outstanding are consumed
    /// whole; a larger one is reduced by the outstanding amount, which is
    /// zero once the requirement is met. Returns what is still outstanding.
    fn draw_surplus(&mut self, resource: &str, required: f64, sources: &mut Vec<usize>) -> f64 {
        let mut outstanding = required;
        let mut i = 0;
        while i < self.surplus.len() {
            let entry = &mut self.surplus[i];
            if entry.resource_name != resource {
                i += 1;
                continue;
            }

            sources.push(entry.producer_node_id);
            if entry.rate_per_second < outstanding {
                outstanding = residue_to_zero(outstanding - entry.rate_per_second, outstanding);
                self.surplus.remove(i);
                continue;
            }

            let remainder = residue_to_zero(entry.rate_per_second - outstanding, entry.rate_per_second);
            outstanding = 0.0;
            if remainder > 0.0 {
                entry.rate_per_second = remainder;
                i += 1;
            } else {
                self.surplus.remove(i);
            }
        }

        outstanding
    }
}

/// `difference` of two rates, or zero when it is only rounding residue of `scale`
fn residue_to_zero(difference: f64, scale: f64) -> f64 {
    if difference <= scale * RELATIVE_EPSILON { 0.0 } else { difference }
}
