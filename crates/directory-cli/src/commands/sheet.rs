//! Delimited files with a header row.

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use directory_core::validation::non_empty;

use crate::output::{CliError, ErrorKind};

/// One data row, keyed by column name.
#[derive(Debug, Clone)]
pub struct Row {
    /// 1-based line in the file.
    pub line: u64,
    cells: HashMap<String, String>,
}

impl Row {
    /// Whether the row has a cell for `column`.
    pub fn has(&self, column: &str) -> bool {
        self.cells.contains_key(column)
    }

    /// Raw cell value.
    pub fn get(&self, column: &str) -> Option<&str> {
        self.cells.get(column).map(String::as_str)
    }

    /// Trimmed cell value; blank cells are `None`.
    pub fn text(&self, column: &str) -> Option<String> {
        non_empty(self.get(column))
    }
}

/// A parsed file: its columns, then each row or the reason it could not be
/// read.
#[derive(Debug)]
pub struct Sheet {
    /// Header names, trimmed.
    pub columns: Vec<String>,
    /// Data rows in file order.
    pub rows: Vec<Result<Row, (u64, String)>>,
}

impl Sheet {
    /// Opens a file. `delimiter` is `b'\t'` for TSV and `b','` for CSV.
    pub fn open(path: &Path, delimiter: u8) -> Result<Self, CliError> {
        let file = File::open(path)
            .map_err(|e| CliError::with_cause(ErrorKind::Io, format!("Cannot open {}", path.display()), e))?;
        Self::from_reader(file, delimiter)
    }

    /// Parses from any reader.
    pub fn from_reader<R: Read>(input: R, delimiter: u8) -> Result<Self, CliError> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .flexible(true)
            .from_reader(input);

        let columns: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
            .collect();

        let rows = reader
            .records()
            .map(|record| match record {
                Ok(record) => {
                    let line = record.position().map_or(0, |p| p.line());
                    let cells = columns
                        .iter()
                        .cloned()
                        .zip(record.iter().map(str::to_string))
                        .collect();
                    Ok(Row { line, cells })
                }
                Err(e) => {
                    let line = e.position().map_or(0, |p| p.line());
                    Err((line, e.to_string()))
                }
            })
            .collect();

        Ok(Self { columns, rows })
    }

    /// Fails unless every column in `required` is present.
    pub fn require(&self, required: &[&str]) -> Result<(), CliError> {
        let missing: Vec<&str> = required
            .iter()
            .copied()
            .filter(|c| !self.columns.iter().any(|col| col == c))
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(CliError::validation(format!("Missing column(s): {}", missing.join(", "))))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_tsv_with_short_rows() {
        let data = "Vendor\tSupplier\tCategory\nFender\tCoast Music, Yorkville\tGuitars\nGibson\tCoast Music\n";
        let sheet = Sheet::from_reader(data.as_bytes(), b'\t').unwrap();

        assert_eq!(sheet.columns, vec!["Vendor", "Supplier", "Category"]);
        let rows: Vec<&Row> = sheet.rows.iter().map(|r| r.as_ref().unwrap()).collect();
        assert_eq!(rows[0].get("Supplier"), Some("Coast Music, Yorkville"));
        assert_eq!(rows[0].line, 2);
        assert!(!rows[1].has("Category"));
    }

    #[test]
    fn test_blank_cells_are_none() {
        let sheet = Sheet::from_reader("Supplier,phone\nCoast,  \n".as_bytes(), b',').unwrap();
        let row = sheet.rows[0].as_ref().unwrap();
        assert!(row.has("phone"));
        assert_eq!(row.text("phone"), None);
    }

    #[test]
    fn test_require_names_missing_columns() {
        let sheet = Sheet::from_reader("\u{feff}Supplier,website\n".as_bytes(), b',').unwrap();
        assert!(sheet.require(&["Supplier"]).is_ok());

        let err = sheet.require(&["Supplier", "Vendor", "Category"]).unwrap_err();
        assert_eq!(err.message, "Missing column(s): Vendor, Category");
    }
}
