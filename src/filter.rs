//! Contract filter pipeline
//!
//! Query parameters are parsed into a [`ContractFilter`] up front, so a bad
//! numeric bound is reported before the dataset is touched. Filters compose as
//! a logical AND and keep the original row order.

use crate::dataset::{ContractTable, RowView};
use crate::error::FilterError;
use lazy_static::lazy_static;
use regex::Regex;
use tracing::debug;

lazy_static! {
    static ref CURRENCY_NOISE: Regex = Regex::new(r"[$,\s]+").unwrap();
}

/// Parse an obligation amount such as `"$1,234.50"`, `"(250.00)"` or
/// `"1.5E+06"`.
///
/// Dollar signs, grouping commas and whitespace are stripped; whatever is
/// left must parse as a finite `f64`. Accounting-style parentheses mark a
/// negative amount.
pub fn normalize_amount(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    let (negative, body) = match trimmed.strip_prefix('(').and_then(|s| s.strip_suffix(')')) {
        Some(inner) => (true, inner),
        None => (false, trimmed),
    };
    let cleaned = CURRENCY_NOISE.replace_all(body, "");
    if cleaned.is_empty() {
        return None;
    }

    let value = cleaned.parse::<f64>().ok().filter(|v| v.is_finite())?;
    Some(if negative { -value.abs() } else { value })
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContractFilter {
    pub require_contract_id: bool,
    pub state: Option<String>,
    pub min_cost: Option<f64>,
    pub max_cost: Option<f64>,
    pub description: Option<String>,
    pub department: Option<String>,
    pub tags: Vec<String>,
}

impl ContractFilter {
    /// Build a filter from decoded query pairs.
    ///
    /// Single-valued parameters take their first occurrence. `tags` may repeat
    /// and each value may itself be a comma-separated list. `cost` is accepted
    /// as an alias for `min_cost`.
    pub fn from_query(pairs: &[(String, String)]) -> Result<Self, FilterError> {
        let first = |key: &str| {
            pairs
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.trim())
                .filter(|v| !v.is_empty())
        };

        let min_cost = match first("min_cost") {
            Some(value) => Some(parse_bound("min_cost", value)?),
            None => first("cost").map(|v| parse_bound("cost", v)).transpose()?,
        };
        let max_cost = first("max_cost")
            .map(|v| parse_bound("max_cost", v))
            .transpose()?;

        let tags = pairs
            .iter()
            .filter(|(k, _)| k == "tags")
            .flat_map(|(_, v)| v.split(','))
            .map(|tag| tag.trim().to_lowercase())
            .filter(|tag| !tag.is_empty())
            .collect();

        Ok(Self {
            require_contract_id: false,
            state: first("state").map(str::to_lowercase),
            min_cost,
            max_cost,
            description: first("description").map(str::to_lowercase),
            department: first("department").map(str::to_lowercase),
            tags,
        })
    }

    pub fn require_contract_id(mut self, required: bool) -> Self {
        self.require_contract_id = required;
        self
    }

    /// Run every active stage over `table` and return the surviving rows.
    pub fn apply<'a>(&self, table: &'a ContractTable) -> Vec<RowView<'a>> {
        let mut rows: Vec<RowView<'a>> = table.rows().collect();
        debug!(rows = rows.len(), "filtering contracts");

        if self.require_contract_id {
            rows.retain(|row| has_contract_id(row));
            debug!(remaining = rows.len(), "filtered by contract id presence");
        }

        if let Some(state) = &self.state {
            rows.retain(|row| row.state().trim().to_lowercase() == *state);
            debug!(state = %state, remaining = rows.len(), "filtered by state");
        }

        if self.min_cost.is_some() || self.max_cost.is_some() {
            let mut priced: Vec<(RowView<'a>, f64)> = rows
                .into_iter()
                .filter_map(|row| normalize_amount(row.obligation()).map(|amount| (row, amount)))
                .collect();
            debug!(remaining = priced.len(), "normalized obligation amounts");

            if let Some(min) = self.min_cost {
                priced.retain(|(_, amount)| *amount >= min);
                debug!(min_cost = min, remaining = priced.len(), "filtered by min cost");
            }
            if let Some(max) = self.max_cost {
                priced.retain(|(_, amount)| *amount <= max);
                debug!(max_cost = max, remaining = priced.len(), "filtered by max cost");
            }

            rows = priced.into_iter().map(|(row, _)| row).collect();
        }

        if let Some(description) = &self.description {
            rows.retain(|row| row.description().to_lowercase().contains(description.as_str()));
            debug!(description = %description, remaining = rows.len(), "filtered by description");
        }

        if let Some(department) = &self.department {
            rows.retain(|row| row.agency().to_lowercase().contains(department.as_str()));
            debug!(department = %department, remaining = rows.len(), "filtered by department");
        }

        if !self.tags.is_empty() {
            rows.retain(|row| {
                let field = row.tags().to_lowercase();
                self.tags.iter().any(|tag| field.contains(tag.as_str()))
            });
            debug!(tags = ?self.tags, remaining = rows.len(), "filtered by tags");
        }

        rows
    }
}

pub(crate) fn has_contract_id(row: &RowView<'_>) -> bool {
    row.contract_id()
        .map(|id| !id.trim().is_empty())
        .unwrap_or(false)
}

fn parse_bound(param: &'static str, value: &str) -> Result<f64, FilterError> {
    value
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| FilterError::InvalidNumber {
            param,
            value: value.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
Contract ID,Entity State,NAICS Description,Contracting Agency,Action Obligation ($),Tags
C-1,Texas,Engineering Services,Department of Defense,\"$1,234.50\",Defense;Aerospace
C-2,ohio,Software Publishers,General Services Administration,900,IT;Cloud
,Texas,Engineering Services,Department of Energy,12,Energy
C-4,TEXAS,Computer Systems Design,Department of Defense,not disclosed,Digital
C-5,Utah,Research and Development,NASA,\"$50,000\",
";

    fn table() -> ContractTable {
        ContractTable::from_reader(SAMPLE.as_bytes()).unwrap()
    }

    fn query(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn ids(rows: &[RowView<'_>]) -> Vec<String> {
        rows.iter()
            .map(|r| r.contract_id().unwrap_or("").to_string())
            .collect()
    }

    #[test]
    fn test_normalize_amount() {
        assert_eq!(normalize_amount("$1,234.50"), Some(1234.50));
        assert_eq!(normalize_amount("900"), Some(900.0));
        assert_eq!(normalize_amount(" -75.25 "), Some(-75.25));
        assert_eq!(normalize_amount("(1,000.00)"), Some(-1000.0));
        assert_eq!(normalize_amount("$"), None);
        assert_eq!(normalize_amount(""), None);
        assert_eq!(normalize_amount("not disclosed"), None);
        assert_eq!(normalize_amount("1.2.3"), None);
        assert_eq!(normalize_amount("1,234.50 (2023)"), None);
        assert_eq!(normalize_amount("nan"), None);
    }

    #[test]
    fn test_normalize_amount_accepts_exponent_forms() {
        assert_eq!(normalize_amount("1.5E+06"), Some(1_500_000.0));
        assert_eq!(normalize_amount("2.5e6"), Some(2_500_000.0));
        assert_eq!(normalize_amount("$-3.97E+07"), Some(-39_700_000.0));
    }

    #[test]
    fn test_exponent_amounts_compare_by_real_value() {
        let csv = "Contract ID,Entity State,NAICS Description,Contracting Agency,Action Obligation ($),Tags\n\
                   C-1,Texas,Services,DoD,1.5E+06,IT\n\
                   C-2,Texas,Services,DoD,1.50,IT\n";
        let table = ContractTable::from_reader(csv.as_bytes()).unwrap();

        let filter = ContractFilter::from_query(&query(&[("min_cost", "1e6")])).unwrap();
        assert_eq!(ids(&filter.apply(&table)), vec!["C-1"]);

        let filter = ContractFilter::from_query(&query(&[("max_cost", "2")])).unwrap();
        assert_eq!(ids(&filter.apply(&table)), vec!["C-2"]);
    }

    #[test]
    fn test_from_query_ignores_blank_values() {
        let filter = ContractFilter::from_query(&query(&[
            ("state", "  "),
            ("min_cost", ""),
            ("tags", ""),
        ]))
        .unwrap();
        assert_eq!(filter, ContractFilter::default());
    }

    #[test]
    fn test_from_query_rejects_non_numeric_bounds() {
        let err = ContractFilter::from_query(&query(&[("min_cost", "abc")])).unwrap_err();
        assert_eq!(err.param(), "min_cost");
        assert!(err.to_string().contains("min_cost"));

        let err = ContractFilter::from_query(&query(&[("max_cost", "NaN")])).unwrap_err();
        assert_eq!(err.param(), "max_cost");
    }

    #[test]
    fn test_from_query_splits_and_lowercases_tags() {
        let filter = ContractFilter::from_query(&query(&[
            ("tags", "Defense, IT"),
            ("tags", "Cloud"),
        ]))
        .unwrap();
        assert_eq!(filter.tags, vec!["defense", "it", "cloud"]);
    }

    #[test]
    fn test_cost_is_alias_for_min_cost() {
        let filter = ContractFilter::from_query(&query(&[("cost", "500")])).unwrap();
        assert_eq!(filter.min_cost, Some(500.0));

        let filter =
            ContractFilter::from_query(&query(&[("min_cost", "10"), ("cost", "500")])).unwrap();
        assert_eq!(filter.min_cost, Some(10.0));
    }

    #[test]
    fn test_no_filters_returns_every_row() {
        let table = table();
        let rows = ContractFilter::default().apply(&table);
        assert_eq!(rows.len(), table.len());
    }

    #[test]
    fn test_blank_contract_ids_dropped_when_required() {
        let table = table();
        let rows = ContractFilter::default().require_contract_id(true).apply(&table);
        assert_eq!(ids(&rows), vec!["C-1", "C-2", "C-4", "C-5"]);
    }

    #[test]
    fn test_state_match_is_case_insensitive_and_exact() {
        let table = table();
        let filter = ContractFilter::from_query(&query(&[("state", "texas")])).unwrap();
        let rows = filter.apply(&table);
        assert_eq!(ids(&rows), vec!["C-1", "", "C-4"]);
        assert!(rows.iter().all(|r| r.state().eq_ignore_ascii_case("texas")));

        let filter = ContractFilter::from_query(&query(&[("state", "tex")])).unwrap();
        assert!(filter.apply(&table).is_empty());
    }

    #[test]
    fn test_cost_range_uses_normalized_amounts() {
        let table = table();
        let filter =
            ContractFilter::from_query(&query(&[("min_cost", "100"), ("max_cost", "1234.50")]))
                .unwrap();
        let rows = filter.apply(&table);
        assert_eq!(ids(&rows), vec!["C-1", "C-2"]);
        for row in &rows {
            let amount = normalize_amount(row.obligation()).unwrap();
            assert!((100.0..=1234.50).contains(&amount));
        }
    }

    #[test]
    fn test_unparsable_amounts_excluded_only_when_bounded() {
        let table = table();
        let filter = ContractFilter::from_query(&query(&[("max_cost", "1000000")])).unwrap();
        let rows = filter.apply(&table);
        assert!(!ids(&rows).contains(&"C-4".to_string()));
        assert_eq!(rows.len(), 4);
    }

    #[test]
    fn test_description_and_department_substrings() {
        let table = table();
        let filter =
            ContractFilter::from_query(&query(&[("description", "ENGINEERING")])).unwrap();
        assert_eq!(ids(&filter.apply(&table)), vec!["C-1", ""]);

        let filter = ContractFilter::from_query(&query(&[("department", "defense")])).unwrap();
        assert_eq!(ids(&filter.apply(&table)), vec!["C-1", "C-4"]);

        let filter = ContractFilter::from_query(&query(&[
            ("description", "engineering"),
            ("department", "defense"),
        ]))
        .unwrap();
        assert_eq!(ids(&filter.apply(&table)), vec!["C-1"]);
    }

    #[test]
    fn test_tags_match_any_requested_tag() {
        let table = table();
        let filter =
            ContractFilter::from_query(&query(&[("tags", "Defense"), ("tags", "Cloud")])).unwrap();
        assert_eq!(ids(&filter.apply(&table)), vec!["C-1", "C-2"]);
    }

    #[test]
    fn test_filters_combine_as_and() {
        let table = table();
        let filter = ContractFilter::from_query(&query(&[
            ("state", "Texas"),
            ("min_cost", "1000"),
            ("tags", "defense"),
        ]))
        .unwrap()
        .require_contract_id(true);
        assert_eq!(ids(&filter.apply(&table)), vec!["C-1"]);
    }
}
