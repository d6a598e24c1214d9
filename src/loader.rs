//! Key-set lookups of related rows
//!
//! Resolves the display names of many referenced rows with one `in` query
//! per table instead of one point lookup per referencing row. Large key sets
//! are split so each request URL stays well below server limits.

use std::collections::{BTreeSet, HashMap};

use futures::future::try_join_all;
use serde_json::Value;
use tracing::trace;

use crate::data::{value_text, DataClient, Query, Row};
use crate::error::Result;

/// Most keys sent in a single `in.(...)` filter
pub const IN_CHUNK_SIZE: usize = 100;

/// Runs `query` with an `in` filter on `column` for every chunk of `keys`
/// and concatenates the rows. No keys, no request.
pub async fn select_in(data: &dyn DataClient, query: Query, column: &str, keys: &[&str]) -> Result<Vec<Row>> {
    let requests = keys
        .chunks(IN_CHUNK_SIZE)
        .map(|chunk| data.select(query.clone().in_list(column, chunk)));
    let pages = try_join_all(requests).await?;
    Ok(pages.into_iter().flatten().collect())
}

/// Fetches `label_column` for every id in `ids` from `table`.
///
/// Ids are deduplicated; ids with no matching row, or whose label is blank,
/// are absent from the returned map. An empty key set issues no request.
pub async fn load_labels<'a, I>(
    data: &dyn DataClient,
    table: &str,
    label_column: &str,
    ids: I,
) -> Result<HashMap<String, String>>
where
    I: IntoIterator<Item = &'a str>,
{
    let keys: BTreeSet<&str> = ids.into_iter().filter(|id| !id.is_empty()).collect();
    if keys.is_empty() {
        return Ok(HashMap::new());
    }
    let keys: Vec<&str> = keys.into_iter().collect();
    trace!(table, keys = keys.len(), "batch lookup");

    let query = Query::table(table).select(&format!("id,{}", label_column));
    let rows = select_in(data, query, "id", &keys).await?;

    Ok(rows
        .into_iter()
        .filter_map(|row| {
            let id = row.get("id").map(value_text)?;
            let label = row
                .get(label_column)
                .and_then(Value::as_str)
                .filter(|label| !label.trim().is_empty())?;
            Some((id, label.to_string()))
        })
        .collect())
}
