//! A1-notation cell ranges.
//!
//! Supported forms: `A:C`, `A2:F`, `A1:B10`, `B2`. Columns are stored 0-based,
//! rows 1-based to match what users see in a spreadsheet.

use std::fmt;
use std::str::FromStr;

use crate::error::StoreError;

/// A rectangular cell range. Open row bounds mean "to the edge of the sheet".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellRange {
    pub start_col: usize,
    pub end_col: usize,
    pub start_row: Option<usize>,
    pub end_row: Option<usize>,
}

impl CellRange {
    /// Number of columns covered.
    pub fn width(&self) -> usize {
        self.end_col - self.start_col + 1
    }

    /// First row covered (rows are 1-based).
    pub fn first_row(&self) -> usize {
        self.start_row.unwrap_or(1)
    }

    /// Whether a 1-based row index falls inside the range.
    pub fn contains_row(&self, row: usize) -> bool {
        row >= self.first_row() && self.end_row.map_or(true, |end| row <= end)
    }

    /// Slice a full sheet row down to the range's columns, dropping trailing blanks.
    pub fn project(&self, cells: &[String]) -> Vec<String> {
        let mut out: Vec<String> = (self.start_col..=self.end_col)
            .map(|col| cells.get(col).cloned().unwrap_or_default())
            .collect();
        while out.last().map_or(false, |c| c.is_empty()) {
            out.pop();
        }
        out
    }

    /// Write `values` into `cells` starting at the range's first column.
    ///
    /// Values beyond the range width are dropped.
    pub fn splice(&self, cells: &mut Vec<String>, values: &[String]) {
        for (offset, value) in values.iter().take(self.width()).enumerate() {
            let col = self.start_col + offset;
            if cells.len() <= col {
                cells.resize(col + 1, String::new());
            }
            cells[col] = value.clone();
        }
    }
}

impl FromStr for CellRange {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| StoreError::InvalidRange {
            range: s.to_string(),
            reason: reason.to_string(),
        };

        let trimmed = s.trim();
        let (start, end) = match trimmed.split_once(':') {
            Some((a, b)) => (a, b),
            None => (trimmed, trimmed),
        };

        let (start_col, start_row) = parse_ref(start).ok_or_else(|| invalid("bad start cell"))?;
        let (end_col, end_row) = parse_ref(end).ok_or_else(|| invalid("bad end cell"))?;

        if end_col < start_col {
            return Err(invalid("end column before start column"));
        }
        if let (Some(a), Some(b)) = (start_row, end_row) {
            if b < a {
                return Err(invalid("end row before start row"));
            }
        }

        Ok(Self {
            start_col,
            end_col,
            start_row,
            end_row,
        })
    }
}

impl fmt::Display for CellRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let row = |r: Option<usize>| r.map(|r| r.to_string()).unwrap_or_default();
        write!(
            f,
            "{}{}:{}{}",
            column_name(self.start_col),
            row(self.start_row),
            column_name(self.end_col),
            row(self.end_row)
        )
    }
}

/// Parse `AB12` into (0-based column, optional 1-based row).
fn parse_ref(cell: &str) -> Option<(usize, Option<usize>)> {
    let cell = cell.trim();
    let split = cell
        .find(|c: char| c.is_ascii_digit())
        .unwrap_or(cell.len());
    let (letters, digits) = cell.split_at(split);

    if letters.is_empty() || !letters.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }

    let col = letters
        .chars()
        .map(|c| (c.to_ascii_uppercase() as u8 - b'A') as usize + 1)
        .fold(0usize, |acc, n| acc * 26 + n)
        - 1;

    let row = if digits.is_empty() {
        None
    } else {
        let row: usize = digits.parse().ok()?;
        if row == 0 {
            return None;
        }
        Some(row)
    };

    Some((col, row))
}

/// Spreadsheet column letters for a 0-based index (`0` is `A`, `26` is `AA`).
pub fn column_name(mut col: usize) -> String {
    let mut name = Vec::new();
    loop {
        name.push(b'A' + (col % 26) as u8);
        if col < 26 {
            break;
        }
        col = col / 26 - 1;
    }
    name.reverse();
    String::from_utf8(name).unwrap_or_default()
}
