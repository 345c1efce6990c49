//! Row-by-row import results.

use std::fmt;

use colored::Colorize;
use directory_core::SupplierId;

use super::{success, warn};

/// Where a skipped row came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowSource {
    /// 1-based line in an input file.
    Line(u64),
    /// A supplier already in the database.
    Supplier {
        /// Supplier id.
        id: SupplierId,
        /// Supplier name.
        name: String,
    },
}

impl fmt::Display for RowSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Line(line) => write!(f, "line {line}"),
            Self::Supplier { id, name } => write!(f, "supplier {id} ({name})"),
        }
    }
}

/// A row that was not imported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRow {
    /// Where the row came from.
    pub source: RowSource,
    /// Why it was skipped.
    pub reason: String,
}

/// Counts for one import run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportReport {
    /// Rows read, skipped ones included.
    pub rows: usize,
    /// Records created.
    pub created: usize,
    /// Existing records changed.
    pub updated: usize,
    /// Vendor links added.
    pub linked: usize,
    /// Rows left out.
    pub skipped: Vec<SkippedRow>,
}

impl ImportReport {
    /// Records a skipped file row.
    pub fn skip(&mut self, line: u64, reason: impl Into<String>) {
        self.skipped.push(SkippedRow {
            source: RowSource::Line(line),
            reason: reason.into(),
        });
    }

    /// Records a skipped supplier.
    pub fn skip_supplier(&mut self, id: SupplierId, name: &str, reason: impl Into<String>) {
        self.skipped.push(SkippedRow {
            source: RowSource::Supplier {
                id,
                name: name.to_string(),
            },
            reason: reason.into(),
        });
    }

    /// Prints the counts, then every skipped row.
    pub fn print(&self, title: &str) {
        success(&format!(
            "{title}: {} rows, {} created, {} updated, {} linked, {} skipped",
            self.rows,
            self.created,
            self.updated,
            self.linked,
            self.skipped.len()
        ));
        for row in &self.skipped {
            warn(&format!("{} {}", format!("{}:", row.source).dimmed(), row.reason));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skipped_rows_name_their_source() {
        let mut report = ImportReport::default();
        report.skip(4, "Vendor: This field may not be blank.");
        report.skip_supplier(SupplierId::new(7), "Coast Music", "email: Enter a valid email address.");

        assert_eq!(report.skipped[0].source.to_string(), "line 4");
        assert_eq!(report.skipped[1].source.to_string(), "supplier 7 (Coast Music)");
    }
}
