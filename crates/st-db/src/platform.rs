//! Dialect facts: platform name normalisation, history DDL templates and
//! the locking select used to serialise concurrent runs.

use crate::traits::MigrationConnection;

/// Default history-table DDL, used when no platform template matches.
pub const DEFAULT_CREATE_TABLE: &str = "\
create table ${table} (
  id                integer not null,
  version           varchar(150) not null,
  kind              varchar(1) not null,
  comment           varchar(150) not null,
  checksum          integer not null,
  ran_by            varchar(30) not null,
  ran_on            timestamp not null,
  run_millis        bigint not null,
  constraint ${pk_table} primary key (id)
)";

const DUCKDB_CREATE_TABLE: &str = "\
create table ${table} (
  id                integer not null,
  version           varchar not null,
  kind              varchar not null,
  comment           varchar not null,
  checksum          integer not null,
  ran_by            varchar not null,
  ran_on            timestamp not null,
  run_millis        bigint not null,
  constraint ${pk_table} primary key (id)
)";

const POSTGRES_CREATE_TABLE: &str = "\
create table ${table} (
  id                integer not null,
  version           varchar(150) not null,
  kind              varchar(1) not null,
  comment           varchar(150) not null,
  checksum          integer not null,
  ran_by            varchar(30) not null,
  ran_on            timestamptz not null,
  run_millis        bigint not null,
  constraint ${pk_table} primary key (id)
)";

const SQLITE_CREATE_TABLE: &str = "\
create table ${table} (
  id                integer not null,
  version           text not null,
  kind              text not null,
  comment           text not null,
  checksum          integer not null,
  ran_by            text not null,
  ran_on            timestamp not null,
  run_millis        integer not null,
  constraint ${pk_table} primary key (id)
)";

const SQLSERVER_CREATE_TABLE: &str = "\
create table ${table} (
  id                integer not null,
  version           nvarchar(150) not null,
  kind              nvarchar(1) not null,
  comment           nvarchar(150) not null,
  checksum          integer not null,
  ran_by            nvarchar(30) not null,
  ran_on            datetime2 not null,
  run_millis        bigint not null,
  constraint ${pk_table} primary key (id)
)";

/// Platform name for a connection, derived from its product name.
pub fn normalise(conn: &dyn MigrationConnection) -> String {
    normalise_name(conn.product_name())
}

/// Map a driver product name (or user-supplied platform) to a canonical name.
pub fn normalise_name(product: &str) -> String {
    let lower = product.trim().to_lowercase();
    let canonical = if lower.contains("postgres") {
        "postgres"
    } else if lower.contains("microsoft") || lower.contains("sql server") || lower == "mssql" {
        "sqlserver"
    } else if lower.contains("duckdb") {
        "duckdb"
    } else if lower.contains("sqlite") {
        "sqlite"
    } else if lower.contains("mariadb") {
        "mariadb"
    } else if lower.contains("mysql") {
        "mysql"
    } else if lower.contains("oracle") {
        "oracle"
    } else if lower == "h2" {
        "h2"
    } else {
        lower.as_str()
    };
    canonical.to_string()
}

/// History-table DDL registered for a platform, if any.
pub fn ddl_template_for(platform: &str) -> Option<&'static str> {
    match platform {
        "duckdb" => Some(DUCKDB_CREATE_TABLE),
        "postgres" => Some(POSTGRES_CREATE_TABLE),
        "sqlite" => Some(SQLITE_CREATE_TABLE),
        "sqlserver" => Some(SQLSERVER_CREATE_TABLE),
        _ => None,
    }
}

/// Build the select that loads every history row, taking row locks where the
/// platform supports it.
pub fn locking_select(platform: &str, columns: &str, table: &str) -> String {
    match platform {
        "postgres" | "mysql" | "mariadb" | "oracle" | "h2" => {
            format!("select {columns} from {table} order by id for update")
        }
        "sqlserver" => format!("select {columns} from {table} with (updlock) order by id"),
        _ => format!("select {columns} from {table} order by id"),
    }
}

/// Fold an identifier the way the platform stores unquoted names.
pub fn fold_identifier(conn: &dyn MigrationConnection, name: &str) -> String {
    if conn.stores_upper_case_identifiers() {
        name.to_uppercase()
    } else {
        name.to_string()
    }
}
