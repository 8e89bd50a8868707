//! Recipe and machine lookups used by the planner

use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, OptionalExtension};
use tracing::trace;

use crate::error::PlanResult;
use crate::models::{ProducerPairing, RecipeFlows, ResourceFlow};

/// Read-only source of recipe/machine facts for one or more tenants
pub trait Catalog {
    /// Pick the best recipe+machine pairing that produces `resource`.
    ///
    /// Default recipes and machines are always eligible; the named
    /// alternates are eligible in addition. Returns `None` when nothing
    /// produces the resource for this tenant.
    fn select_best_producer(
        &self,
        tenant_id: i64,
        resource: &str,
        allowed_recipes: &[String],
        allowed_machines: &[String],
    ) -> PlanResult<Option<ProducerPairing>>;

    /// Per-machine input and output flows of a recipe run on a machine
    fn flows_for(&self, recipe_id: i64, machine_id: i64, tenant_id: i64) -> PlanResult<RecipeFlows>;
}

/// Catalogue backed by the SQLite schema in [`crate::db`]
pub struct SqliteCatalog<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteCatalog<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn flows(
        &self,
        table: &str,
        recipe_id: i64,
        machine_id: i64,
        tenant_id: i64,
    ) -> PlanResult<Vec<ResourceFlow>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT r.name, (CAST(io.amount AS REAL) / rcp.production_time_s * m.speed) AS rate
             FROM recipes rcp
             JOIN {table} io ON io.recipes_id = rcp.id AND io.tenant_id = ?3
             JOIN resources r ON r.id = io.resources_id AND r.tenant_id = ?3
             JOIN machines_recipes mr ON mr.recipes_id = rcp.id AND mr.machines_id = ?2 AND mr.tenant_id = ?3
             JOIN machines m ON m.id = mr.machines_id AND m.tenant_id = ?3
             WHERE rcp.id = ?1 AND rcp.tenant_id = ?3
             ORDER BY io.id"
        ))?;

        let rows = stmt.query_map((recipe_id, machine_id, tenant_id), |row| {
            Ok(ResourceFlow {
                resource: row.get(0)?,
                rate_per_second: row.get(1)?,
            })
        })?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }
}

/// Builds `?N, ?N+1, ...` for a list of names and appends the values
fn bind_names(names: &[String], values: &mut Vec<Value>) -> String {
    let mut placeholders = Vec::with_capacity(names.len());
    for name in names {
        values.push(Value::Text(name.clone()));
        placeholders.push(format!("?{}", values.len()));
    }
    placeholders.join(", ")
}

impl Catalog for SqliteCatalog<'_> {
    fn select_best_producer(
        &self,
        tenant_id: i64,
        resource: &str,
        allowed_recipes: &[String],
        allowed_machines: &[String],
    ) -> PlanResult<Option<ProducerPairing>> {
        let mut values = vec![Value::Integer(tenant_id), Value::Text(resource.to_string())];

        let recipe_filter = if allowed_recipes.is_empty() {
            "rcp.default_choice = 1".to_string()
        } else {
            format!(
                "(rcp.default_choice = 1 OR rcp.name IN ({}))",
                bind_names(allowed_recipes, &mut values)
            )
        };
        let machine_filter = if allowed_machines.is_empty() {
            "m.default_choice = 1".to_string()
        } else {
            format!(
                "(m.default_choice = 1 OR m.name IN ({}))",
                bind_names(allowed_machines, &mut values)
            )
        };

        let query = format!(
            "SELECT rcp.id, rcp.name, m.id, m.name,
                    (CAST(ro.amount AS REAL) / rcp.production_time_s * m.speed) AS rate,
                    m.power_consumption_kw
             FROM recipes rcp
             JOIN recipes_outputs ro ON ro.recipes_id = rcp.id AND ro.tenant_id = ?1
             JOIN resources r ON r.id = ro.resources_id AND r.tenant_id = ?1
             JOIN machines_recipes mr ON mr.recipes_id = rcp.id AND mr.tenant_id = ?1
             JOIN machines m ON m.id = mr.machines_id AND m.tenant_id = ?1
             WHERE rcp.tenant_id = ?1
               AND r.name = ?2
               AND rcp.production_time_s > 0
               AND m.speed > 0
               AND ro.amount > 0
               AND {recipe_filter}
               AND {machine_filter}
             ORDER BY rcp.default_choice DESC, rate DESC, m.default_choice DESC, rcp.id, m.id
             LIMIT 1"
        );

        let pairing = self
            .conn
            .query_row(&query, params_from_iter(values), |row| {
                Ok(ProducerPairing {
                    recipe_id: row.get(0)?,
                    recipe_name: row.get(1)?,
                    machine_id: row.get(2)?,
                    machine_name: row.get(3)?,
                    rate: row.get(4)?,
                    power_kw: row.get(5)?,
                })
            })
            .optional()?;

        trace!(tenant_id, resource, ?pairing, "selected producer");
        Ok(pairing)
    }

    fn flows_for(&self, recipe_id: i64, machine_id: i64, tenant_id: i64) -> PlanResult<RecipeFlows> {
        Ok(RecipeFlows {
            inputs: self.flows("recipes_inputs", recipe_id, machine_id, tenant_id)?,
            outputs: self.flows("recipes_outputs", recipe_id, machine_id, tenant_id)?,
        })
    }
}
