//! Catalogue import from JSON documents
//!
//! A document lists resources, machines and recipes by name. Recipes refer
//! to resources and machines by name too; undeclared resources are created
//! on the fly, undeclared machines are an error.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::db;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CatalogDocument {
    #[serde(default)]
    pub resources: Vec<ResourceEntry>,
    #[serde(default)]
    pub machines: Vec<MachineEntry>,
    #[serde(default)]
    pub recipes: Vec<RecipeEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ResourceEntry {
    pub name: String,
    #[serde(default)]
    pub liquid: bool,
    #[serde(default = "default_unit")]
    pub unit: String,
}

fn default_unit() -> String {
    "item".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MachineEntry {
    pub name: String,
    pub speed: f64,
    pub power_consumption_kw: f64,
    #[serde(default)]
    pub default_choice: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RecipeEntry {
    pub name: String,
    pub production_time_s: f64,
    #[serde(default)]
    pub default_choice: bool,
    #[serde(default)]
    pub inputs: Vec<IngredientEntry>,
    pub outputs: Vec<IngredientEntry>,
    pub machines: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct IngredientEntry {
    pub resource: String,
    pub amount: f64,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct ImportStats {
    pub files: usize,
    pub resources: usize,
    pub machines: usize,
    pub recipes: usize,
    pub errors: usize,
}

impl std::fmt::Display for ImportStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Imported {} files ({} resources, {} machines, {} recipes). Errors: {}",
            self.files, self.resources, self.machines, self.recipes, self.errors
        )
    }
}

impl ImportStats {
    fn add(&mut self, other: &ImportStats) {
        self.files += other.files;
        self.resources += other.resources;
        self.machines += other.machines;
        self.recipes += other.recipes;
        self.errors += other.errors;
    }
}

pub fn parse_document(content: &str) -> Result<CatalogDocument> {
    let doc: CatalogDocument = serde_json::from_str(content)?;
    for recipe in &doc.recipes {
        if recipe.production_time_s <= 0.0 {
            bail!("Recipe '{}' has non-positive production time", recipe.name);
        }
        if recipe.outputs.is_empty() {
            bail!("Recipe '{}' has no outputs", recipe.name);
        }
    }
    for machine in &doc.machines {
        if machine.speed <= 0.0 {
            bail!("Machine '{}' has non-positive speed", machine.name);
        }
    }
    Ok(doc)
}

/// Insert one document for a tenant inside a single transaction
pub fn import_document(conn: &Connection, tenant_id: i64, doc: &CatalogDocument) -> Result<ImportStats> {
    let tx = conn.unchecked_transaction()?;
    let mut stats = ImportStats::default();

    for resource in &doc.resources {
        db::upsert_resource(&tx, tenant_id, &resource.name, resource.liquid, &resource.unit)?;
        stats.resources += 1;
    }

    for machine in &doc.machines {
        db::upsert_machine(
            &tx,
            tenant_id,
            &machine.name,
            machine.speed,
            machine.power_consumption_kw,
            machine.default_choice,
        )?;
        stats.machines += 1;
    }

    for recipe in &doc.recipes {
        let recipe_id = db::insert_recipe(
            &tx,
            tenant_id,
            &recipe.name,
            recipe.production_time_s,
            recipe.default_choice,
        )?;
        for input in &recipe.inputs {
            let resource_id = db::ensure_resource(&tx, tenant_id, &input.resource)?;
            db::insert_recipe_input(&tx, tenant_id, recipe_id, resource_id, input.amount)?;
        }
        for output in &recipe.outputs {
            let resource_id = db::ensure_resource(&tx, tenant_id, &output.resource)?;
            db::insert_recipe_output(&tx, tenant_id, recipe_id, resource_id, output.amount)?;
        }
        for machine in &recipe.machines {
            let machine_id = db::machine_id(&tx, tenant_id, machine)?.with_context(|| {
                format!("Recipe '{}' refers to unknown machine '{machine}'", recipe.name)
            })?;
            db::link_machine_recipe(&tx, tenant_id, recipe_id, machine_id)?;
        }
        debug!(recipe = %recipe.name, "imported recipe");
        stats.recipes += 1;
    }

    tx.commit()?;
    stats.files = 1;
    Ok(stats)
}

/// Import a single file
pub fn import_file(conn: &Connection, tenant_id: i64, path: &Path) -> Result<ImportStats> {
    let content =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let doc = parse_document(&content).with_context(|| format!("Failed to parse {}", path.display()))?;
    import_document(conn, tenant_id, &doc)
        .with_context(|| format!("Failed to import {}", path.display()))
}

/// Find all catalogue documents under a directory, in path order
pub fn find_catalog_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
        .collect();
    files.sort();
    files
}

/// Import a file or every `*.json` document under a directory.
///
/// Per-file failures are logged and counted; the remaining files are still
/// imported.
pub fn import_path(conn: &Connection, tenant_id: i64, path: &Path) -> Result<ImportStats> {
    if path.is_file() {
        return import_file(conn, tenant_id, path);
    }
    if !path.is_dir() {
        bail!("{} is neither a file nor a directory", path.display());
    }

    let files = find_catalog_files(path);
    info!(count = files.len(), dir = %path.display(), "found catalog documents");

    let mut stats = ImportStats::default();
    for file in &files {
        match import_file(conn, tenant_id, file) {
            Ok(file_stats) => stats.add(&file_stats),
            Err(e) => {
                warn!("{e:#}");
                stats.errors += 1;
            }
        }
    }
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;

    const IRON_DOC: &str = r#"{
        "Resources": [{"Name": "iron_ore"}, {"Name": "water", "Liquid": true, "Unit": "m3"}],
        "Machines": [
            {"Name": "miner_mk1", "Speed": 1.0, "PowerConsumptionKw": 5, "DefaultChoice": true},
            {"Name": "smelter", "Speed": 1.0, "PowerConsumptionKw": 4, "DefaultChoice": true}
        ],
        "Recipes": [
            {"Name": "iron_ore", "ProductionTimeS": 1, "DefaultChoice": true,
             "Outputs": [{"Resource": "iron_ore", "Amount": 1}], "Machines": ["miner_mk1"]},
            {"Name": "iron_ingot", "ProductionTimeS": 2, "DefaultChoice": true,
             "Inputs": [{"Resource": "iron_ore", "Amount": 1}],
             "Outputs": [{"Resource": "iron_ingot", "Amount": 1}], "Machines": ["smelter"]}
        ]
    }"#;

    fn open() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        db::init_schema(&conn).unwrap();
        conn
    }

    #[test]
    fn test_import_document() {
        let conn = open();
        let doc = parse_document(IRON_DOC).unwrap();
        let stats = import_document(&conn, 1, &doc).unwrap();

        assert_eq!(stats.resources, 2);
        assert_eq!(stats.machines, 2);
        assert_eq!(stats.recipes, 2);

        let resources = db::list_resources(&conn, 1).unwrap();
        let water = resources.iter().find(|r| r.name == "water").unwrap();
        assert!(water.liquid);
        assert_eq!(water.unit, "m3");
        // iron_ingot was never declared
        assert!(resources.iter().any(|r| r.name == "iron_ingot"));

        let recipe = db::find_recipe(&conn, 1, "iron_ingot").unwrap().unwrap();
        let machines = db::machines_for_recipe(&conn, 1, recipe.id).unwrap();
        assert_eq!(machines[0].name, "smelter");
    }

    #[test]
    fn test_unknown_machine_rolls_back() {
        let conn = open();
        let doc = parse_document(
            r#"{"Recipes": [{"Name": "screw", "ProductionTimeS": 6,
                "Outputs": [{"Resource": "screw", "Amount": 4}], "Machines": ["constructor"]}]}"#,
        )
        .unwrap();

        let err = import_document(&conn, 1, &doc).unwrap_err();
        assert!(err.to_string().contains("unknown machine 'constructor'"));
        assert!(db::list_recipes(&conn, 1).unwrap().is_empty());
        assert!(db::list_resources(&conn, 1).unwrap().is_empty());
    }

    #[test]
    fn test_parse_rejects_zero_production_time() {
        let err = parse_document(
            r#"{"Recipes": [{"Name": "screw", "ProductionTimeS": 0,
                "Outputs": [{"Resource": "screw", "Amount": 4}], "Machines": []}]}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("non-positive production time"));
    }

    #[test]
    fn test_import_directory_counts_bad_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("iron.json"), IRON_DOC).unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("nested").join("broken.json"), "{ not json").unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let conn = open();
        let stats = import_path(&conn, 7, dir.path()).unwrap();
        assert_eq!(stats.files, 1);
        assert_eq!(stats.recipes, 2);
        assert_eq!(stats.errors, 1);
        assert_eq!(db::list_recipes(&conn, 7).unwrap().len(), 2);
        assert!(db::list_recipes(&conn, 1).unwrap().is_empty());
    }

    #[test]
    fn test_missing_path_is_an_error() {
        let conn = open();
        let dir = tempfile::tempdir().unwrap();
        assert!(import_path(&conn, 1, &dir.path().join("absent")).is_err());
    }
}
