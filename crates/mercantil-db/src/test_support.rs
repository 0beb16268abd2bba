//! Fixtures shared by the repository tests.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use mercantil_core::{RequestContext, Role};
use sqlx::SqlitePool;

use crate::{Database, DbConfig};

pub async fn test_db() -> Database {
    Database::new(DbConfig::in_memory()).await.unwrap()
}

/// A database file in the temp directory with a pool of several
/// connections. The file and its WAL companions are removed on drop.
pub struct TempDb {
    pub db: Database,
    path: PathBuf,
}

impl Drop for TempDb {
    fn drop(&mut self) {
        remove_database_files(&self.path);
    }
}

fn remove_database_files(path: &Path) {
    for suffix in ["", "-wal", "-shm"] {
        let _ = std::fs::remove_file(format!("{}{}", path.display(), suffix));
    }
}

pub async fn file_db(max_connections: u32) -> TempDb {
    static NEXT: AtomicU32 = AtomicU32::new(0);

    let path = std::env::temp_dir().join(format!(
        "mercantil-test-{}-{}.db",
        std::process::id(),
        NEXT.fetch_add(1, Ordering::Relaxed)
    ));
    remove_database_files(&path);

    let config = DbConfig::new(&path)
        .max_connections(max_connections)
        .busy_timeout(Duration::from_secs(10));
    TempDb {
        db: Database::new(config).await.unwrap(),
        path,
    }
}

pub fn staff() -> RequestContext {
    RequestContext {
        employee_id: "EM0001".to_string(),
        role: Role::Staff,
        branch_id: "SU0001".to_string(),
        department_id: Some("DP0001".to_string()),
    }
}

pub fn admin() -> RequestContext {
    RequestContext {
        employee_id: "EM0000".to_string(),
        role: Role::Admin,
        branch_id: "SU0001".to_string(),
        department_id: None,
    }
}

/// One company with two branches, four active clients and one inactive,
/// five products of which three can be sold.
///
/// | product | name          | stock | purchased       |
/// |---------|---------------|-------|-----------------|
/// | PR0001  | Tornillo 1/4  | 20    | 20 @ 5.00       |
/// | PR0002  | Martillo      | 5     | 5 @ 12.00       |
/// | PR0003  | Serrucho      | 8     | 8 @ 70.00       |
/// | PR0004  | Alicate       | 0     | never           |
/// | PR0005  | Cinta métrica | 3     | 3, but inactive |
pub async fn seed_catalog(pool: &SqlitePool) {
    let statements = [
        "INSERT INTO companies (id, tax_id, name) VALUES ('CO0001', '0614-150190-101-1', 'Ferretería Central')",
        "INSERT INTO branches (id, company_id, name) VALUES ('SU0001', 'CO0001', 'Centro'), ('SU0002', 'CO0001', 'Norte')",
        "INSERT INTO departments (id, branch_id, name) VALUES ('DP0001', 'SU0001', 'Ventas'), ('DP0002', 'SU0002', 'Bodega')",
        "INSERT INTO employees (id, department_id, first_names, last_names) VALUES \
            ('EM0001', 'DP0001', 'Marta', 'Gómez'), ('EM0002', 'DP0002', 'Luis', 'Ortiz')",
        "INSERT INTO natural_clients (id, first_names, last_names, is_active) VALUES \
            ('CN0001', 'Ana Lucía', 'Rivas', 1), ('CN0002', 'Carlos', 'Pérez', 1), ('CN0003', 'Diana', 'Flores', 0)",
        "INSERT INTO legal_clients (id, company_name) VALUES ('CJ0001', 'Constructora Ágil'), ('CJ0002', 'Beta Servicios')",
        "INSERT INTO products (id, name, is_active, stock) VALUES \
            ('PR0001', 'Tornillo 1/4', 1, 20), ('PR0002', 'Martillo', 1, 5), ('PR0003', 'Serrucho', 1, 8), \
            ('PR0004', 'Alicate', 1, 0), ('PR0005', 'Cinta métrica', 0, 3)",
        "INSERT INTO purchase_lines (id, product_id, quantity, unit_cost_cents) VALUES \
            ('DC0001', 'PR0001', 10, 500), ('DC0002', 'PR0001', 10, 500), ('DC0003', 'PR0002', 5, 1200), \
            ('DC0004', 'PR0003', 8, 7000), ('DC0005', 'PR0005', 3, 300)",
    ];

    for sql in statements {
        sqlx::query(sql).execute(pool).await.unwrap();
    }
}

/// Two assets of company CO0001, one per branch.
pub async fn seed_assets(pool: &SqlitePool) {
    sqlx::query(
        "INSERT INTO assets (id, name, price_cents, acquired_on, useful_life_years, department_id) VALUES \
            ('AC0001', 'Laptop', 120000, '2024-01-15', 5, 'DP0001'), \
            ('AC0002', 'Escritorio', 30000, '2024-06-01', 10, 'DP0002')",
    )
    .execute(pool)
    .await
    .unwrap();
}
