//! Translate equality filters into a LanceDB SQL predicate.

use lexdb_core::types::{scalar_text, Filters};

use crate::schema::{ID_COL, PUSHDOWN_COLUMNS};

#[derive(Debug, Default, PartialEq, Eq)]
pub struct FilterPlan {
    /// Conjunction over the mirrored metadata columns.
    pub predicate: Option<String>,
    /// Some constraints could not be pushed down and must be checked per row.
    pub post_filter: bool,
}

pub fn plan(filters: &Filters) -> FilterPlan {
    let mut clauses = Vec::new();
    let mut post_filter = false;
    for (key, value) in filters.iter() {
        match (PUSHDOWN_COLUMNS.contains(&key.as_str()), scalar_text(value)) {
            (true, Some(text)) => clauses.push(format!("`{key}` = {}", quote(&text))),
            _ => post_filter = true,
        }
    }
    FilterPlan { predicate: (!clauses.is_empty()).then(|| clauses.join(" AND ")), post_filter }
}

pub fn quote(s: &str) -> String { format!("'{}'", s.replace('\'', "''")) }

/// `id IN (...)` over the given ids.
pub fn id_in(ids: &[String]) -> String {
    let list: Vec<String> = ids.iter().map(|id| quote(id)).collect();
    format!("{ID_COL} IN ({})", list.join(", "))
}
