use navhub_core::{SITE_ORDER_INT32_MAX, SITE_ORDER_MS_THRESHOLD};
use rusqlite::{params, Connection};
use serde::Serialize;

use crate::error::SchemaError;
use crate::inspect::ensure_identifier;
use crate::target::{OrderColumn, TargetSchema};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderRepair {
    pub table: &'static str,
    pub column: &'static str,
    pub rescaled_rows: usize,
    pub clamped_rows: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RepairReport {
    pub order_columns: Vec<OrderRepair>,
}

impl RepairReport {
    #[must_use]
    pub fn repaired_rows(&self) -> usize {
        self.order_columns
            .iter()
            .map(|repair| repair.rescaled_rows + repair.clamped_rows)
            .sum()
    }
}

/// Fix ordering values written before every writer normalized them.
///
/// Runs after structural reconciliation. Two bulk updates per column, in
/// this order: millisecond epochs are divided down to seconds, then
/// whatever still exceeds `i32::MAX` is clamped. The clamp sees the
/// rescaled values.
///
/// # Errors
/// Returns [`SchemaError::Repair`] for the first failing update.
pub fn repair_known_corruptions(
    conn: &Connection,
    target: &TargetSchema,
) -> Result<RepairReport, SchemaError> {
    let mut report = RepairReport::default();

    for order in target.order_columns {
        report.order_columns.push(repair_order_column(conn, order)?);
    }

    Ok(report)
}

fn repair_order_column(
    conn: &Connection,
    order: &OrderColumn,
) -> Result<OrderRepair, SchemaError> {
    ensure_identifier(order.table)?;
    ensure_identifier(order.column)?;
    let OrderColumn { table, column } = *order;

    let rescaled_rows = conn
        .execute(
            &format!(
                "UPDATE \"{table}\" SET \"{column}\" = CAST(\"{column}\" / 1000 AS INTEGER)
                 WHERE \"{column}\" >= ?1"
            ),
            params![SITE_ORDER_MS_THRESHOLD],
        )
        .map_err(|source| SchemaError::Repair {
            table,
            column,
            rule: "rescale-ms",
            source,
        })?;

    let clamped_rows = conn
        .execute(
            &format!("UPDATE \"{table}\" SET \"{column}\" = ?1 WHERE \"{column}\" > ?1"),
            params![SITE_ORDER_INT32_MAX],
        )
        .map_err(|source| SchemaError::Repair {
            table,
            column,
            rule: "clamp-max",
            source,
        })?;

    if rescaled_rows + clamped_rows > 0 {
        tracing::info!(table, column, rescaled_rows, clamped_rows, "repaired ordering values");
    }

    Ok(OrderRepair {
        table,
        column,
        rescaled_rows,
        clamped_rows,
    })
}
