//! SQL text for the destination table and the staging table
//!
//! Identifiers come from validated configuration and the field catalogue;
//! values are always bound as parameters. No statement text depends on the
//! job, so prepared statements cached per connection are reused across jobs.

use tokio_postgres::types::ToSql;

use crate::config::DestinationConfig;
use crate::core::columns::{destination_columns, FieldKind, FIELDS, KEY_FIELDS};
use crate::domain::NotificationRecord;

/// Columns bound per staged row
pub const COLUMNS_PER_ROW: usize = 33;

fn quote(identifier: &str) -> String {
    format!("\"{}\"", identifier.replace('"', "\"\""))
}

/// `"schema"."table"`
pub fn qualified_table(dest: &DestinationConfig) -> String {
    format!("{}.{}", quote(&dest.schema), quote(&dest.table))
}

/// Temporary staging table, private to the session and dropped at commit
pub const STAGING_TABLE: &str = "sinan_staging";

pub fn staging_table() -> String {
    quote(STAGING_TABLE)
}

fn column_list() -> String {
    destination_columns().collect::<Vec<_>>().join(", ")
}

fn key_list() -> String {
    KEY_FIELDS.iter().map(|f| f.column()).collect::<Vec<_>>().join(", ")
}

fn update_assignments() -> String {
    FIELDS
        .iter()
        .filter(|spec| !KEY_FIELDS.contains(&spec.field))
        .map(|spec| format!("{0} = EXCLUDED.{0}", spec.column))
        .collect::<Vec<_>>()
        .join(", ")
}

fn column_type(kind: FieldKind, column: &str) -> &'static str {
    match kind {
        FieldKind::Date => "DATE",
        FieldKind::NotificationNumber => "BIGINT",
        FieldKind::Integer | FieldKind::Geocode | FieldKind::Epiweek | FieldKind::Year => "INTEGER",
        FieldKind::DiseaseCode => "VARCHAR(5)",
        FieldKind::Sex => "VARCHAR(1)",
        FieldKind::Text if column == "nm_bairro" => "VARCHAR(60)",
        FieldKind::Text => "TEXT",
    }
}

/// Idempotent DDL for the destination schema, table and uniqueness constraint
pub fn create_destination(dest: &DestinationConfig) -> String {
    let columns: Vec<String> = FIELDS
        .iter()
        .map(|spec| {
            let null = if KEY_FIELDS.contains(&spec.field) { " NOT NULL" } else { "" };
            format!("    {} {}{null}", spec.column, column_type(spec.kind, spec.column))
        })
        .collect();

    format!(
        "CREATE SCHEMA IF NOT EXISTS {schema};\n\
         CREATE TABLE IF NOT EXISTS {table} (\n    id BIGSERIAL PRIMARY KEY,\n{columns},\n    \
         CONSTRAINT {constraint} UNIQUE ({keys})\n);",
        schema = quote(&dest.schema),
        table = qualified_table(dest),
        columns = columns.join(",\n"),
        constraint = quote(&dest.unique_constraint),
        keys = key_list(),
    )
}

/// Staging table mirroring the destination, dropped at commit
pub fn create_staging(dest: &DestinationConfig) -> String {
    let staging = staging_table();
    format!(
        "CREATE TEMP TABLE {staging} ON COMMIT DROP AS SELECT {columns} FROM {table} WITH NO DATA;\n\
         ALTER TABLE {staging} ADD UNIQUE ({keys});",
        columns = column_list(),
        table = qualified_table(dest),
        keys = key_list(),
    )
}

/// Multi-row insert into the staging table; a key collision keeps the new row
pub fn stage_rows(rows: usize) -> String {
    let values: Vec<String> = (0..rows)
        .map(|r| {
            let params: Vec<String> = (1..=COLUMNS_PER_ROW)
                .map(|c| format!("${}", r * COLUMNS_PER_ROW + c))
                .collect();
            format!("({})", params.join(", "))
        })
        .collect();

    format!(
        "INSERT INTO {staging} ({columns}) VALUES {values} ON CONFLICT ({keys}) DO UPDATE SET {updates}",
        staging = staging_table(),
        columns = column_list(),
        values = values.join(", "),
        keys = key_list(),
        updates = update_assignments(),
    )
}

/// The single merge statement; `inserted` is false for rows that pre-existed
pub fn upsert_from_staging(dest: &DestinationConfig) -> String {
    format!(
        "INSERT INTO {table} ({columns}) SELECT {columns} FROM {staging} \
         ON CONFLICT ON CONSTRAINT {constraint} DO UPDATE SET {updates} \
         RETURNING id, (xmax = 0) AS inserted",
        table = qualified_table(dest),
        columns = column_list(),
        staging = staging_table(),
        constraint = quote(&dest.unique_constraint),
        updates = update_assignments(),
    )
}

/// Bind parameters for one record, in catalogue column order
pub fn record_params(r: &NotificationRecord) -> [&(dyn ToSql + Sync); COLUMNS_PER_ROW] {
    [
        &r.dt_notific,
        &r.se_notif,
        &r.ano_notif,
        &r.dt_sin_pri,
        &r.se_sin_pri,
        &r.dt_digita,
        &r.municipio_geocodigo,
        &r.nu_notific,
        &r.cid10_codigo,
        &r.dt_nasc,
        &r.cs_sexo,
        &r.nu_idade_n,
        &r.resul_pcr,
        &r.criterio,
        &r.classi_fin,
        &r.dt_chik_s1,
        &r.dt_chik_s2,
        &r.dt_prnt,
        &r.res_chiks1,
        &r.res_chiks2,
        &r.resul_prnt,
        &r.dt_soro,
        &r.resul_soro,
        &r.dt_ns1,
        &r.resul_ns1,
        &r.dt_viral,
        &r.resul_vi_n,
        &r.dt_pcr,
        &r.sorotipo,
        &r.id_distrit,
        &r.id_bairro,
        &r.nm_bairro,
        &r.id_unidade,
    ]
}
