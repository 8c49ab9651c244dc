//! Free-text contract search over business name, agency and contract id.

use crate::dataset::{ContractTable, RowView};
use crate::filter::has_contract_id;
use tracing::debug;

/// Rows whose business name, contracting agency or contract id contains
/// `query`, ignoring case. A blank query matches every row.
pub fn search_contracts<'a>(
    table: &'a ContractTable,
    query: &str,
    require_contract_id: bool,
) -> Vec<RowView<'a>> {
    let needle = query.trim().to_lowercase();

    let rows: Vec<RowView<'a>> = table
        .rows()
        .filter(|row| !require_contract_id || has_contract_id(row))
        .filter(|row| needle.is_empty() || matches(row, &needle))
        .collect();

    debug!(query = %needle, matches = rows.len(), "searched contracts");
    rows
}

fn matches(row: &RowView<'_>, needle: &str) -> bool {
    [row.business_name(), Some(row.agency()), row.contract_id()]
        .into_iter()
        .flatten()
        .any(|field| field.to_lowercase().contains(needle))
}
