use crate::error::{EsgError, EsgResult};
use crate::models::company::Company;
use crate::models::metric::{parse_metric_value, Metric, MetricEntry, MetricValues};
use crate::models::trend::TrendPoint;
use crate::state::EsgState;
use rusqlite::{params, Connection, OptionalExtension, Result, Row};
use serde_json::{Map, Value};
use std::path::Path;

const DB_SCHEMA_VERSION: i64 = 2;

pub fn initialize_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "PRAGMA foreign_keys = ON;
         PRAGMA journal_mode = WAL;
         PRAGMA synchronous = NORMAL;",
    )?;

    let mut version: i64 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;

    if version < 1 {
        apply_migration_1(conn)?;
        version = 1;
        conn.pragma_update(None, "user_version", version)?;
    }

    if version < 2 {
        apply_migration_2(conn)?;
        version = 2;
        conn.pragma_update(None, "user_version", version)?;
    }

    if version > DB_SCHEMA_VERSION {
        log::warn!("metric store schema version {version} is newer than {DB_SCHEMA_VERSION}");
    }

    Ok(())
}

fn apply_migration_1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS companies (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            sector TEXT NOT NULL DEFAULT 'other',
            created_at INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS metrics (
            id TEXT PRIMARY KEY,
            company_id TEXT NOT NULL REFERENCES companies(id) ON DELETE CASCADE,
            metric_name TEXT NOT NULL,
            value REAL NOT NULL DEFAULT 0,
            period INTEGER NOT NULL,
            created_at INTEGER NOT NULL,
            UNIQUE (company_id, metric_name, period)
        );
        ",
    )
}

fn apply_migration_2(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE INDEX IF NOT EXISTS idx_metrics_company_period ON metrics(company_id, period);
        CREATE INDEX IF NOT EXISTS idx_metrics_company_name ON metrics(company_id, metric_name);
        ",
    )
}

/// Open the workspace store at `.esglens/esg.db`, creating and migrating it as needed.
pub fn open_store(workspace_path: &Path) -> EsgResult<Connection> {
    let dir = workspace_path.join(".esglens");
    std::fs::create_dir_all(&dir)?;
    let conn = Connection::open(dir.join("esg.db"))?;
    initialize_schema(&conn)?;
    Ok(conn)
}

/// Upsert a batch in one transaction. Each metric's `id` is replaced with the id
/// of the stored row, which is the existing row's id when the metric was updated.
pub fn upsert_metrics(conn: &Connection, metrics: &mut [Metric]) -> Result<()> {
    let tx = conn.unchecked_transaction()?;
    for metric in metrics.iter_mut() {
        let stored_id = upsert_metric(&tx, metric)?;
        metric.id = stored_id;
    }
    tx.commit()
}

/// Insert or update one metric and return the id of the stored row.
pub fn upsert_metric(conn: &Connection, metric: &Metric) -> Result<String> {
    conn.query_row(
        "
        INSERT INTO metrics (id, company_id, metric_name, value, period, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        ON CONFLICT(company_id, metric_name, period) DO UPDATE SET
            value = excluded.value,
            created_at = excluded.created_at
        RETURNING id
        ",
        params![
            metric.id,
            metric.company_id,
            metric.metric_name,
            metric.value,
            metric.period,
            metric.created_at,
        ],
        |row| row.get(0),
    )
}

fn metric_from_row(row: &Row<'_>) -> Result<Metric> {
    Ok(Metric {
        id: row.get(0)?,
        company_id: row.get(1)?,
        metric_name: row.get(2)?,
        value: row.get(3)?,
        period: row.get(4)?,
        created_at: row.get(5)?,
    })
}

fn company_from_row(row: &Row<'_>) -> Result<Company> {
    Ok(Company {
        id: row.get(0)?,
        name: row.get(1)?,
        sector: row.get(2)?,
        created_at: row.get(3)?,
    })
}

pub fn load_company(conn: &Connection, id: &str) -> Result<Option<Company>> {
    conn.query_row(
        "SELECT id, name, sector, created_at FROM companies WHERE id = ?1",
        params![id],
        company_from_row,
    )
    .optional()
}

/// All metric values a company reported for one period.
pub fn load_period_values(conn: &Connection, company_id: &str, period: i32) -> Result<MetricValues> {
    let mut stmt = conn.prepare(
        "SELECT metric_name, value FROM metrics WHERE company_id = ?1 AND period = ?2",
    )?;
    let values = stmt
        .query_map(params![company_id, period], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?))
        })?
        .collect::<Result<MetricValues>>()?;
    Ok(values)
}

/// Yearly history of one metric, oldest first.
pub fn load_metric_history(
    conn: &Connection,
    company_id: &str,
    metric_name: &str,
) -> Result<Vec<TrendPoint>> {
    let mut stmt = conn.prepare(
        "SELECT period, value FROM metrics WHERE company_id = ?1 AND metric_name = ?2 ORDER BY period ASC",
    )?;
    let points = stmt
        .query_map(params![company_id, metric_name], |row| {
            Ok(TrendPoint {
                period: row.get(0)?,
                value: row.get(1)?,
            })
        })?
        .collect::<Result<Vec<_>>>()?;
    Ok(points)
}

pub fn require_company(conn: &Connection, company_id: &str) -> EsgResult<Company> {
    load_company(conn, company_id)?
        .ok_or_else(|| EsgError::NotFound(format!("company {company_id}")))
}

pub async fn company_crud(
    state: &EsgState,
    operation: String,
    item: Option<Company>,
    id: Option<String>,
) -> std::result::Result<Value, String> {
    state
        .with_store(|conn| match operation.as_str() {
            "create" => {
                let mut item = item.ok_or_else(|| invalid("item", "required for create"))?;
                if item.id.is_empty() {
                    item.id = uuid::Uuid::new_v4().to_string();
                }
                if item.created_at == 0 {
                    item.created_at = chrono::Utc::now().timestamp();
                }
                conn.execute(
                    "INSERT INTO companies (id, name, sector, created_at) VALUES (?1, ?2, ?3, ?4)",
                    params![&item.id, &item.name, &item.sector, item.created_at],
                )?;
                log::info!("created company {} ({})", item.name, item.id);
                Ok(serde_json::json!({"status": "created", "id": item.id}))
            }
            "update" => {
                let item = item.ok_or_else(|| invalid("item", "required for update"))?;
                let changed = conn.execute(
                    "UPDATE companies SET name = ?2, sector = ?3 WHERE id = ?1",
                    params![&item.id, &item.name, &item.sector],
                )?;
                if changed == 0 {
                    return Err(EsgError::NotFound(format!("company {}", item.id)));
                }
                Ok(serde_json::json!({"status": "updated", "id": item.id}))
            }
            "read" => {
                let id = id.ok_or_else(|| invalid("id", "required for read"))?;
                let company = load_company(conn, &id)?;
                Ok(serde_json::to_value(company)?)
            }
            "list" => {
                let mut stmt = conn.prepare(
                    "SELECT id, name, sector, created_at FROM companies ORDER BY name ASC",
                )?;
                let companies = stmt
                    .query_map([], company_from_row)?
                    .filter_map(|r| r.ok())
                    .collect::<Vec<_>>();
                Ok(serde_json::to_value(companies)?)
            }
            "delete" => {
                let id = id.ok_or_else(|| invalid("id", "required for delete"))?;
                conn.execute("DELETE FROM companies WHERE id = ?1", params![id])?;
                Ok(serde_json::json!({"status": "deleted"}))
            }
            _ => Err(invalid("operation", &format!("unknown operation {operation}"))),
        })
        .map_err(String::from)
}

pub async fn metric_crud(
    state: &EsgState,
    operation: String,
    item: Option<MetricEntry>,
    id: Option<String>,
    company_id: Option<String>,
) -> std::result::Result<Value, String> {
    let strict = match operation.as_str() {
        "upsert" => {
            crate::commands::settings::load_effective_settings(&state.workspace_str())?.strict_numeric_input
        }
        _ => false,
    };

    state
        .with_store(|conn| match operation.as_str() {
            "upsert" => {
                let entry = item.ok_or_else(|| invalid("item", "required for upsert"))?;
                let mut item = entry.into_metric(strict)?;
                require_company(conn, &item.company_id)?;
                if item.id.is_empty() {
                    item.id = uuid::Uuid::new_v4().to_string();
                }
                if item.created_at == 0 {
                    item.created_at = chrono::Utc::now().timestamp();
                }
                let stored_id = upsert_metric(conn, &item)?;
                Ok(serde_json::json!({"status": "saved", "id": stored_id}))
            }
            "read" => {
                let id = id.ok_or_else(|| invalid("id", "required for read"))?;
                let metric = conn
                    .query_row(
                        "SELECT id, company_id, metric_name, value, period, created_at FROM metrics WHERE id = ?1",
                        params![id],
                        metric_from_row,
                    )
                    .optional()?;
                Ok(serde_json::to_value(metric)?)
            }
            "list" => {
                let company_id = company_id.ok_or_else(|| invalid("company_id", "required for list"))?;
                let mut stmt = conn.prepare(
                    "SELECT id, company_id, metric_name, value, period, created_at FROM metrics WHERE company_id = ?1 ORDER BY period ASC, metric_name ASC",
                )?;
                let metrics = stmt
                    .query_map(params![company_id], metric_from_row)?
                    .filter_map(|r| r.ok())
                    .collect::<Vec<_>>();
                Ok(serde_json::to_value(metrics)?)
            }
            "delete" => {
                let id = id.ok_or_else(|| invalid("id", "required for delete"))?;
                conn.execute("DELETE FROM metrics WHERE id = ?1", params![id])?;
                Ok(serde_json::json!({"status": "deleted"}))
            }
            _ => Err(invalid("operation", &format!("unknown operation {operation}"))),
        })
        .map_err(String::from)
}

/// Bulk data entry for one company and period.
///
/// Values are coerced leniently unless `strictNumericInput` is enabled in settings,
/// in which case the first non-numeric value rejects the whole batch.
pub async fn record_metrics(
    state: &EsgState,
    company_id: String,
    period: i32,
    values: Map<String, Value>,
) -> std::result::Result<Vec<Metric>, String> {
    let settings = crate::commands::settings::load_effective_settings(&state.workspace_str())?;
    let now = chrono::Utc::now().timestamp();

    let mut metrics = Vec::with_capacity(values.len());
    for (name, raw) in &values {
        let value = parse_metric_value(name, raw, settings.strict_numeric_input)?;
        metrics.push(Metric {
            id: uuid::Uuid::new_v4().to_string(),
            company_id: company_id.clone(),
            metric_name: name.clone(),
            value,
            period,
            created_at: now,
        });
    }

    state
        .with_store(|conn| {
            require_company(conn, &company_id)?;
            upsert_metrics(conn, &mut metrics)?;
            Ok(())
        })
        .map_err(|e| format!("Record error: {e}"))?;

    log::info!(
        "recorded {} metrics for company {company_id}, period {period}",
        metrics.len()
    );
    Ok(metrics)
}

fn invalid(field: &str, reason: &str) -> EsgError {
    EsgError::InvalidInput {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}
