//! Built-in sample catalogue: iron and oil production lines

use anyhow::{Context, Result};
use rusqlite::Connection;

use crate::db;
use crate::import::{self, ImportStats};

pub const SAMPLE_CATALOG: &str = include_str!("../data/sample_catalog.json");

/// Replace a tenant's catalogue with the sample data
pub fn load_sample_data(conn: &Connection, tenant_id: i64) -> Result<ImportStats> {
    db::clear_tenant_data(conn, tenant_id)?;
    let doc = import::parse_document(SAMPLE_CATALOG).context("Sample catalog is malformed")?;
    import::import_document(conn, tenant_id, &doc)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_loads_and_reloads() {
        let conn = Connection::open_in_memory().unwrap();
        db::init_schema(&conn).unwrap();

        let first = load_sample_data(&conn, 1).unwrap();
        let second = load_sample_data(&conn, 1).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.machines, 7);
        assert_eq!(first.recipes, 13);

        let producible = db::list_producible_resources(&conn, 1).unwrap();
        assert!(producible.contains(&"reinforced_iron_plate".to_string()));
        assert!(producible.contains(&"polymer_resin".to_string()));
    }
}
