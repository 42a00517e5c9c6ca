//! File writers for CSV, JSON and XLSX.

use super::transform::{Cell, Table};
use crate::error::{Result, SimError};
use crate::workbook::new_sheet;
use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

/// Writes one table as CSV with a header row.
pub fn write_csv_table(table: &Table, path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(table.headers)?;
    for row in &table.rows {
        writer.write_record(row.iter().map(Cell::to_text))?;
    }
    writer.flush()?;
    Ok(())
}

/// Writes any serializable value as pretty JSON.
pub fn write_json<T: Serialize + ?Sized>(value: &T, path: &Path) -> Result<()> {
    let writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(writer, value)?;
    Ok(())
}

/// Writes every table to its own sheet of one workbook.
pub fn write_xlsx_tables(tables: &[Table], path: &Path) -> Result<()> {
    let mut book = umya_spreadsheet::new_file_empty_worksheet();
    for table in tables {
        let sheet = new_sheet(&mut book, table.name)?;
        for (col, header) in (1u32..).zip(table.headers) {
            sheet.get_cell_mut((col, 1)).set_value(*header);
        }
        for (row_index, row) in (2u32..).zip(&table.rows) {
            for (col, cell) in (1u32..).zip(row) {
                let target = sheet.get_cell_mut((col, row_index));
                match cell {
                    Cell::Text(text) => {
                        target.set_value(text.as_str());
                    }
                    Cell::Number(number) => {
                        target.set_value_number(*number);
                    }
                    Cell::Bool(flag) => {
                        target.set_value_bool(*flag);
                    }
                }
            }
        }
    }
    umya_spreadsheet::writer::xlsx::write(&book, path)
        .map_err(|e| SimError::Workbook(format!("failed to write {:?}: {}", path, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn table() -> Table {
        Table {
            name: "things",
            headers: &["name", "count", "active"],
            rows: vec![
                vec!["alpha".into(), 3u32.into(), true.into()],
                vec!["beta, gamma".into(), 4.5.into(), false.into()],
            ],
        }
    }

    #[test]
    fn test_csv_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("things.csv");
        write_csv_table(&table(), &path).unwrap();

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let headers = reader.headers().unwrap().clone();
        assert_eq!(headers.iter().collect::<Vec<_>>(), vec!["name", "count", "active"]);
        let records: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(records.len(), 2);
        assert_eq!(&records[1][0], "beta, gamma");
        assert_eq!(&records[1][1], "4.5");
    }

    #[test]
    fn test_xlsx_sheet_per_table() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("things.xlsx");
        write_xlsx_tables(&[table()], &path).unwrap();

        let book = umya_spreadsheet::reader::xlsx::read(&path).unwrap();
        let sheet = book.get_sheet_by_name("things").unwrap();
        assert_eq!(sheet.get_value((1, 1)), "name");
        assert_eq!(sheet.get_value((1, 3)), "beta, gamma");
        assert_eq!(sheet.get_value((1, 2)), "alpha");
    }
}
