//! Audit log migrations - embedded SQL files
//!
//! Applied to audit.duckdb by the logging service, tracked in its own
//! sys_migrations table.

pub const LOG_MIGRATIONS: &[(&str, &str)] = &[
    ("000_migrations.sql", include_str!("000_migrations.sql")),
    (
        "001_initial_schema.sql",
        include_str!("001_initial_schema.sql"),
    ),
];
