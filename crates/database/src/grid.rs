//! Range operations over an in-memory sheet grid.
//!
//! Both store backends funnel through these helpers so that slicing,
//! appending and overwriting behave identically.

use crate::error::{Result, StoreError};
use crate::range::CellRange;

/// One sheet as a dense list of rows. `rows[0]` is spreadsheet row 1.
pub type Grid = Vec<Vec<String>>;

/// Rows inside `range`, projected to its columns.
///
/// Blank rows at the end of the range are dropped, blank rows in the middle
/// are kept so row positions stay meaningful to callers.
pub fn read(grid: &Grid, range: &CellRange) -> Vec<Vec<String>> {
    let mut out: Vec<Vec<String>> = grid
        .iter()
        .enumerate()
        .filter(|(idx, _)| range.contains_row(idx + 1))
        .map(|(_, row)| range.project(row))
        .collect();
    while out.last().map_or(false, |row| row.is_empty()) {
        out.pop();
    }
    out
}

/// Append `values` as a new row after the last occupied row.
///
/// Returns the 1-based index of the new row.
pub fn append(grid: &mut Grid, range: &CellRange, values: &[String]) -> usize {
    while grid.last().map_or(false, |row| row.iter().all(|c| c.is_empty())) {
        grid.pop();
    }
    let mut row = Vec::new();
    range.splice(&mut row, values);
    grid.push(row);
    grid.len()
}

/// Overwrite cells starting at the range's top-left corner.
///
/// The range must name a starting row. Rows beyond an explicit end row are
/// rejected rather than silently dropped.
pub fn update(grid: &mut Grid, range: &CellRange, rows: &[Vec<String>], raw: &str) -> Result<()> {
    let start = range.start_row.ok_or_else(|| StoreError::InvalidRange {
        range: raw.to_string(),
        reason: "update needs a starting row".to_string(),
    })?;

    if let Some(end) = range.end_row {
        if start + rows.len() > end + 1 {
            return Err(StoreError::InvalidRange {
                range: raw.to_string(),
                reason: format!("{} rows do not fit", rows.len()),
            });
        }
    }

    for (offset, values) in rows.iter().enumerate() {
        let idx = start - 1 + offset;
        if grid.len() <= idx {
            grid.resize(idx + 1, Vec::new());
        }
        range.splice(&mut grid[idx], values);
    }
    Ok(())
}
