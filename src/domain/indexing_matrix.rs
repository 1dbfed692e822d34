use std::fmt;

use serde::Serialize;

use super::search_result::KeywordResultSet;

pub const ABSENT_CELL: &str = "—";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FoundAt {
    pub position: u32,
    pub page: u32,
}

impl fmt::Display for FoundAt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} (page {})", self.position, self.page)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatrixCell {
    pub keyword: String,
    pub found: Option<FoundAt>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatrixRow {
    pub tcin: String,
    pub cells: Vec<MatrixCell>,
}

/// TCIN x keyword lookup. Every input pair has a cell; absence is explicit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexingMatrix {
    rows: Vec<MatrixRow>,
}

impl IndexingMatrix {
    /// The first record for a TCIN under a keyword wins.
    pub fn build(tcins: &[String], keywords: &[String], results: &KeywordResultSet) -> Self {
        let rows = tcins
            .iter()
            .map(|tcin| MatrixRow {
                tcin: tcin.clone(),
                cells: keywords
                    .iter()
                    .map(|keyword| MatrixCell {
                        keyword: keyword.clone(),
                        found: results
                            .get(keyword)
                            .and_then(|result| result.first_record_for(tcin))
                            .map(|record| FoundAt {
                                position: record.position,
                                page: record.page,
                            }),
                    })
                    .collect(),
            })
            .collect();

        IndexingMatrix { rows }
    }

    /// `None` when the pair was not part of the inputs, `Some(None)` when absent.
    pub fn get(&self, tcin: &str, keyword: &str) -> Option<Option<FoundAt>> {
        self.rows
            .iter()
            .find(|row| row.tcin == tcin)
            .and_then(|row| row.cells.iter().find(|cell| cell.keyword == keyword))
            .map(|cell| cell.found)
    }

    pub fn rows(&self) -> &[MatrixRow] {
        &self.rows
    }

    /// Number of (tcin, keyword) cells.
    pub fn len(&self) -> usize {
        self.rows.iter().map(|row| row.cells.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn summary(&self) -> IndexingSummary {
        let total_checks = self.len();
        let found = self
            .rows
            .iter()
            .flat_map(|row| row.cells.iter())
            .filter(|cell| cell.found.is_some())
            .count();

        IndexingSummary::new(total_checks, found)
    }

    /// Flat table: one row per TCIN, one column per keyword.
    pub fn to_table(&self, keywords: &[String]) -> IndexingTable {
        let columns = std::iter::once("TCIN".to_string())
            .chain(keywords.iter().cloned())
            .collect();

        let rows = self
            .rows
            .iter()
            .map(|row| TableRow {
                tcin: row.tcin.clone(),
                cells: row
                    .cells
                    .iter()
                    .map(|cell| match cell.found {
                        Some(found) => found.to_string(),
                        None => ABSENT_CELL.to_string(),
                    })
                    .collect(),
            })
            .collect();

        IndexingTable { columns, rows }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexingSummary {
    pub total_checks: usize,
    pub found: usize,
    pub success_rate: f64,
    pub success_rate_display: String,
}

impl IndexingSummary {
    pub fn new(total_checks: usize, found: usize) -> Self {
        let success_rate = match total_checks {
            0 => 0.0,
            total => found as f64 / total as f64,
        };

        IndexingSummary {
            total_checks,
            found,
            success_rate,
            success_rate_display: format!("{:.1}%", success_rate * 100.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexingTable {
    pub columns: Vec<String>,
    pub rows: Vec<TableRow>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableRow {
    pub tcin: String,
    pub cells: Vec<String>,
}
