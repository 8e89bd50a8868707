//! Database schema and catalogue operations
//!
//! Every table carries a `tenant_id`; all reads filter on it.

use anyhow::{Context, Result};
use rusqlite::{Connection, OptionalExtension};

use crate::models::{Ingredient, Machine, Recipe, Resource};

/// Initialize the database schema
pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS resources (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            tenant_id INTEGER NOT NULL,
            name TEXT NOT NULL,
            liquid INTEGER NOT NULL DEFAULT 0,
            resource_unit TEXT NOT NULL DEFAULT 'item',
            UNIQUE (tenant_id, name)
        );

        CREATE TABLE IF NOT EXISTS machines (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            tenant_id INTEGER NOT NULL,
            name TEXT NOT NULL,
            speed REAL NOT NULL,
            power_consumption_kw REAL NOT NULL,
            default_choice INTEGER NOT NULL DEFAULT 0,
            UNIQUE (tenant_id, name)
        );

        CREATE TABLE IF NOT EXISTS recipes (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            tenant_id INTEGER NOT NULL,
            name TEXT NOT NULL,
            production_time_s REAL NOT NULL,
            default_choice INTEGER NOT NULL DEFAULT 0,
            UNIQUE (tenant_id, name)
        );

        CREATE TABLE IF NOT EXISTS recipes_inputs (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            tenant_id INTEGER NOT NULL,
            recipes_id INTEGER NOT NULL,
            resources_id INTEGER NOT NULL,
            amount REAL NOT NULL
        );

        CREATE TABLE IF NOT EXISTS recipes_outputs (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            tenant_id INTEGER NOT NULL,
            recipes_id INTEGER NOT NULL,
            resources_id INTEGER NOT NULL,
            amount REAL NOT NULL
        );

        -- Which machines can run which recipes
        CREATE TABLE IF NOT EXISTS machines_recipes (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            tenant_id INTEGER NOT NULL,
            recipes_id INTEGER NOT NULL,
            machines_id INTEGER NOT NULL,
            UNIQUE (tenant_id, recipes_id, machines_id)
        );

        CREATE INDEX IF NOT EXISTS idx_recipes_outputs_resource ON recipes_outputs(tenant_id, resources_id);
        CREATE INDEX IF NOT EXISTS idx_recipes_inputs_recipe ON recipes_inputs(tenant_id, recipes_id);
        CREATE INDEX IF NOT EXISTS idx_recipes_outputs_recipe ON recipes_outputs(tenant_id, recipes_id);
        CREATE INDEX IF NOT EXISTS idx_machines_recipes_recipe ON machines_recipes(tenant_id, recipes_id);
        "#,
    )?;
    Ok(())
}

/// Remove every catalogue row owned by a tenant
pub fn clear_tenant_data(conn: &Connection, tenant_id: i64) -> Result<()> {
    for table in [
        "machines_recipes",
        "recipes_outputs",
        "recipes_inputs",
        "recipes",
        "machines",
        "resources",
    ] {
        conn.execute(&format!("DELETE FROM {table} WHERE tenant_id = ?1"), [tenant_id])
            .with_context(|| format!("Failed to clear {table} for tenant {tenant_id}"))?;
    }
    Ok(())
}

/// Insert or update a resource, returning its id
pub fn upsert_resource(
    conn: &Connection,
    tenant_id: i64,
    name: &str,
    liquid: bool,
    unit: &str,
) -> Result<i64> {
    conn.execute(
        "INSERT INTO resources (tenant_id, name, liquid, resource_unit)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT (tenant_id, name) DO UPDATE SET liquid = excluded.liquid, resource_unit = excluded.resource_unit",
        (tenant_id, name, liquid, unit),
    )?;
    resource_id(conn, tenant_id, name)?
        .with_context(|| format!("Resource '{name}' missing after upsert"))
}

/// Id of a resource, creating it with default attributes if unknown
pub fn ensure_resource(conn: &Connection, tenant_id: i64, name: &str) -> Result<i64> {
    if let Some(id) = resource_id(conn, tenant_id, name)? {
        return Ok(id);
    }
    conn.execute(
        "INSERT INTO resources (tenant_id, name) VALUES (?1, ?2)",
        (tenant_id, name),
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn resource_id(conn: &Connection, tenant_id: i64, name: &str) -> Result<Option<i64>> {
    let id = conn
        .query_row(
            "SELECT id FROM resources WHERE tenant_id = ?1 AND name = ?2",
            (tenant_id, name),
            |row| row.get(0),
        )
        .optional()?;
    Ok(id)
}

/// Insert or update a machine, returning its id
pub fn upsert_machine(
    conn: &Connection,
    tenant_id: i64,
    name: &str,
    speed: f64,
    power_kw: f64,
    default_choice: bool,
) -> Result<i64> {
    conn.execute(
        "INSERT INTO machines (tenant_id, name, speed, power_consumption_kw, default_choice)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT (tenant_id, name) DO UPDATE SET
            speed = excluded.speed,
            power_consumption_kw = excluded.power_consumption_kw,
            default_choice = excluded.default_choice",
        (tenant_id, name, speed, power_kw, default_choice),
    )?;
    machine_id(conn, tenant_id, name)?
        .with_context(|| format!("Machine '{name}' missing after upsert"))
}

pub fn machine_id(conn: &Connection, tenant_id: i64, name: &str) -> Result<Option<i64>> {
    let id = conn
        .query_row(
            "SELECT id FROM machines WHERE tenant_id = ?1 AND name = ?2",
            (tenant_id, name),
            |row| row.get(0),
        )
        .optional()?;
    Ok(id)
}

/// Insert a recipe header, returning its id
pub fn insert_recipe(
    conn: &Connection,
    tenant_id: i64,
    name: &str,
    production_time_s: f64,
    default_choice: bool,
) -> Result<i64> {
    conn.execute(
        "INSERT INTO recipes (tenant_id, name, production_time_s, default_choice)
         VALUES (?1, ?2, ?3, ?4)",
        (tenant_id, name, production_time_s, default_choice),
    )
    .with_context(|| format!("Failed to insert recipe '{name}'"))?;
    Ok(conn.last_insert_rowid())
}

/// Insert a recipe input line
pub fn insert_recipe_input(
    conn: &Connection,
    tenant_id: i64,
    recipe_id: i64,
    resource_id: i64,
    amount: f64,
) -> Result<()> {
    conn.execute(
        "INSERT INTO recipes_inputs (tenant_id, recipes_id, resources_id, amount)
         VALUES (?1, ?2, ?3, ?4)",
        (tenant_id, recipe_id, resource_id, amount),
    )?;
    Ok(())
}

/// Insert a recipe output line
pub fn insert_recipe_output(
    conn: &Connection,
    tenant_id: i64,
    recipe_id: i64,
    resource_id: i64,
    amount: f64,
) -> Result<()> {
    conn.execute(
        "INSERT INTO recipes_outputs (tenant_id, recipes_id, resources_id, amount)
         VALUES (?1, ?2, ?3, ?4)",
        (tenant_id, recipe_id, resource_id, amount),
    )?;
    Ok(())
}

/// Allow a machine to run a recipe
pub fn link_machine_recipe(
    conn: &Connection,
    tenant_id: i64,
    recipe_id: i64,
    machine_id: i64,
) -> Result<()> {
    conn.execute(
        "INSERT OR IGNORE INTO machines_recipes (tenant_id, recipes_id, machines_id)
         VALUES (?1, ?2, ?3)",
        (tenant_id, recipe_id, machine_id),
    )?;
    Ok(())
}

/// List all resources of a tenant
pub fn list_resources(conn: &Connection, tenant_id: i64) -> Result<Vec<Resource>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, liquid, resource_unit FROM resources WHERE tenant_id = ?1 ORDER BY name",
    )?;

    let rows = stmt.query_map([tenant_id], |row| {
        Ok(Resource {
            id: row.get(0)?,
            name: row.get(1)?,
            liquid: row.get(2)?,
            unit: row.get(3)?,
        })
    })?;

    let mut results = Vec::new();
    for row in rows {
        results.push(row?);
    }
    Ok(results)
}

/// List all resources some recipe of the tenant produces
pub fn list_producible_resources(conn: &Connection, tenant_id: i64) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT DISTINCT r.name
         FROM recipes_outputs ro
         JOIN resources r ON r.id = ro.resources_id AND r.tenant_id = ?1
         WHERE ro.tenant_id = ?1
         ORDER BY r.name",
    )?;

    let rows = stmt.query_map([tenant_id], |row| row.get(0))?;

    let mut results = Vec::new();
    for row in rows {
        results.push(row?);
    }
    Ok(results)
}

/// List all machines of a tenant
pub fn list_machines(conn: &Connection, tenant_id: i64) -> Result<Vec<Machine>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, speed, power_consumption_kw, default_choice
         FROM machines WHERE tenant_id = ?1 ORDER BY name",
    )?;

    let rows = stmt.query_map([tenant_id], |row| {
        Ok(Machine {
            id: row.get(0)?,
            name: row.get(1)?,
            speed: row.get(2)?,
            power_kw: row.get(3)?,
            default_choice: row.get(4)?,
        })
    })?;

    let mut results = Vec::new();
    for row in rows {
        results.push(row?);
    }
    Ok(results)
}

/// List all recipes of a tenant with their inputs and outputs
pub fn list_recipes(conn: &Connection, tenant_id: i64) -> Result<Vec<Recipe>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, production_time_s, default_choice
         FROM recipes WHERE tenant_id = ?1 ORDER BY name",
    )?;

    let rows = stmt.query_map([tenant_id], |row| {
        Ok(Recipe {
            id: row.get(0)?,
            name: row.get(1)?,
            production_time_s: row.get(2)?,
            default_choice: row.get(3)?,
            inputs: Vec::new(),
            outputs: Vec::new(),
        })
    })?;

    let mut results = Vec::new();
    for row in rows {
        let mut recipe = row?;
        recipe.inputs = get_ingredients(conn, tenant_id, recipe.id, IngredientSide::Input)?;
        recipe.outputs = get_ingredients(conn, tenant_id, recipe.id, IngredientSide::Output)?;
        results.push(recipe);
    }
    Ok(results)
}

/// Find one recipe by name
pub fn find_recipe(conn: &Connection, tenant_id: i64, name: &str) -> Result<Option<Recipe>> {
    let recipe = conn
        .query_row(
            "SELECT id, name, production_time_s, default_choice
             FROM recipes WHERE tenant_id = ?1 AND name = ?2",
            (tenant_id, name),
            |row| {
                Ok(Recipe {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    production_time_s: row.get(2)?,
                    default_choice: row.get(3)?,
                    inputs: Vec::new(),
                    outputs: Vec::new(),
                })
            },
        )
        .optional()?;

    let Some(mut recipe) = recipe else {
        return Ok(None);
    };
    recipe.inputs = get_ingredients(conn, tenant_id, recipe.id, IngredientSide::Input)?;
    recipe.outputs = get_ingredients(conn, tenant_id, recipe.id, IngredientSide::Output)?;
    Ok(Some(recipe))
}

/// Machines linked to a recipe
pub fn machines_for_recipe(conn: &Connection, tenant_id: i64, recipe_id: i64) -> Result<Vec<Machine>> {
    let mut stmt = conn.prepare(
        "SELECT m.id, m.name, m.speed, m.power_consumption_kw, m.default_choice
         FROM machines m
         JOIN machines_recipes mr ON mr.machines_id = m.id AND mr.tenant_id = ?1
         WHERE m.tenant_id = ?1 AND mr.recipes_id = ?2
         ORDER BY m.name",
    )?;

    let rows = stmt.query_map((tenant_id, recipe_id), |row| {
        Ok(Machine {
            id: row.get(0)?,
            name: row.get(1)?,
            speed: row.get(2)?,
            power_kw: row.get(3)?,
            default_choice: row.get(4)?,
        })
    })?;

    let mut results = Vec::new();
    for row in rows {
        results.push(row?);
    }
    Ok(results)
}

#[derive(Debug, Clone, Copy)]
enum IngredientSide {
    Input,
    Output,
}

impl IngredientSide {
    fn table(self) -> &'static str {
        match self {
            Self::Input => "recipes_inputs",
            Self::Output => "recipes_outputs",
        }
    }
}

fn get_ingredients(
    conn: &Connection,
    tenant_id: i64,
    recipe_id: i64,
    side: IngredientSide,
) -> Result<Vec<Ingredient>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT r.name, i.amount
         FROM {} i
         JOIN resources r ON r.id = i.resources_id AND r.tenant_id = ?1
         WHERE i.tenant_id = ?1 AND i.recipes_id = ?2
         ORDER BY i.id",
        side.table()
    ))?;

    let rows = stmt.query_map((tenant_id, recipe_id), |row| {
        Ok(Ingredient {
            resource: row.get(0)?,
            amount: row.get(1)?,
        })
    })?;

    let mut results = Vec::new();
    for row in rows {
        results.push(row?);
    }
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        conn
    }

    #[test]
    fn test_init_schema_is_idempotent() {
        let conn = open();
        init_schema(&conn).unwrap();
        assert!(list_machines(&conn, 1).unwrap().is_empty());
    }

    #[test]
    fn test_recipe_roundtrip_keeps_ingredient_order() {
        let conn = open();
        let plate = ensure_resource(&conn, 1, "iron_plate").unwrap();
        let screw = ensure_resource(&conn, 1, "screw").unwrap();
        let rip = ensure_resource(&conn, 1, "reinforced_iron_plate").unwrap();
        let recipe = insert_recipe(&conn, 1, "reinforced_iron_plate", 12.0, true).unwrap();
        insert_recipe_input(&conn, 1, recipe, plate, 6.0).unwrap();
        insert_recipe_input(&conn, 1, recipe, screw, 12.0).unwrap();
        insert_recipe_output(&conn, 1, recipe, rip, 1.0).unwrap();

        let found = find_recipe(&conn, 1, "reinforced_iron_plate").unwrap().unwrap();
        assert!(found.default_choice);
        assert_eq!(found.production_time_s, 12.0);
        let inputs: Vec<_> = found.inputs.iter().map(|i| i.resource.as_str()).collect();
        assert_eq!(inputs, ["iron_plate", "screw"]);
        assert_eq!(found.outputs.len(), 1);
    }

    #[test]
    fn test_reads_are_tenant_scoped() {
        let conn = open();
        upsert_machine(&conn, 1, "constructor", 1.0, 4.0, true).unwrap();
        upsert_machine(&conn, 2, "assembler", 1.0, 15.0, true).unwrap();
        insert_recipe(&conn, 2, "screw", 6.0, true).unwrap();

        let names: Vec<_> = list_machines(&conn, 1)
            .unwrap()
            .into_iter()
            .map(|m| m.name)
            .collect();
        assert_eq!(names, ["constructor"]);
        assert!(find_recipe(&conn, 1, "screw").unwrap().is_none());
        assert!(list_recipes(&conn, 1).unwrap().is_empty());
    }

    #[test]
    fn test_upsert_machine_updates_in_place() {
        let conn = open();
        let first = upsert_machine(&conn, 1, "miner", 1.0, 5.0, true).unwrap();
        let second = upsert_machine(&conn, 1, "miner", 2.0, 12.0, false).unwrap();
        assert_eq!(first, second);

        let machines = list_machines(&conn, 1).unwrap();
        assert_eq!(machines.len(), 1);
        assert_eq!(machines[0].speed, 2.0);
        assert!(!machines[0].default_choice);
    }

    #[test]
    fn test_list_resources_reports_liquid_and_unit() {
        let conn = open();
        upsert_resource(&conn, 1, "water", true, "m3").unwrap();
        ensure_resource(&conn, 1, "iron_ore").unwrap();

        let resources = list_resources(&conn, 1).unwrap();
        let names: Vec<_> = resources.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["iron_ore", "water"]);
        assert!(!resources[0].liquid);
        assert_eq!(resources[0].unit, "item");
        assert!(resources[1].liquid);
        assert_eq!(resources[1].unit, "m3");
    }

    #[test]
    fn test_clear_tenant_data_leaves_other_tenants() {
        let conn = open();
        ensure_resource(&conn, 1, "iron_ore").unwrap();
        ensure_resource(&conn, 2, "iron_ore").unwrap();
        clear_tenant_data(&conn, 1).unwrap();

        assert!(list_resources(&conn, 1).unwrap().is_empty());
        assert_eq!(list_resources(&conn, 2).unwrap().len(), 1);
    }
}
