use std::fs;
use std::path::{Path, PathBuf};

use rust_xlsxwriter::{Workbook, Worksheet, XlsxError};
use tracing::{debug, info};

use crate::column::ColumnDef;
use crate::domain::TVError;
use crate::value::CellValue;

pub const SHEET_NAME: &str = "Sheet1";

/// Which rows of the table go into an export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportScope {
    /// Every row passing the filters, in sorted order.
    Filtered,
    /// Only selected rows passing the filters, in sorted order.
    Selected,
}

/// One exported row: visible column id to accessed value, in column order.
pub type ExportRecord = Vec<(String, CellValue)>;

pub fn export_records<T>(rows: &[&T], columns: &[&ColumnDef<T>]) -> Vec<ExportRecord> {
    rows.iter()
        .map(|row| {
            columns
                .iter()
                .map(|c| (c.id().to_string(), c.value(row)))
                .collect()
        })
        .collect()
}

fn write_cell(
    sheet: &mut Worksheet,
    row: u32,
    col: u16,
    value: &CellValue,
) -> Result<(), XlsxError> {
    match value {
        CellValue::Null => {}
        CellValue::Bool(b) => {
            sheet.write_boolean(row, col, *b)?;
        }
        CellValue::Number(n) if n.is_nan() => {}
        CellValue::Number(n) => {
            sheet.write_number(row, col, *n)?;
        }
        CellValue::Text(s) => {
            sheet.write_string(row, col, s)?;
        }
        CellValue::Date(_) => {
            sheet.write_string(row, col, value.to_text())?;
        }
    }
    Ok(())
}

/// Encodes rows as a single sheet XLSX workbook.
///
/// The header row holds the column ids in the given order. An empty row set
/// still produces a valid, header only document.
pub fn export_workbook<T>(rows: &[&T], columns: &[&ColumnDef<T>]) -> Result<Vec<u8>, TVError> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name(SHEET_NAME)?;

    for (cidx, column) in columns.iter().enumerate() {
        let cidx = u16::try_from(cidx).map_err(|_| XlsxError::RowColumnLimitError)?;
        sheet.write_string(0, cidx, column.id())?;
    }

    for (ridx, record) in export_records(rows, columns).iter().enumerate() {
        let ridx = u32::try_from(ridx + 1).map_err(|_| XlsxError::RowColumnLimitError)?;
        for (cidx, (_, value)) in record.iter().enumerate() {
            write_cell(sheet, ridx, cidx as u16, value)?;
        }
    }

    let bytes = workbook.save_to_buffer()?;
    debug!(
        "Encoded {} rows x {} columns into {} bytes",
        rows.len(),
        columns.len(),
        bytes.len()
    );
    Ok(bytes)
}

/// Writes the workbook to `dir/name.xlsx` and returns the path written.
pub fn export_to_file<T>(
    rows: &[&T],
    columns: &[&ColumnDef<T>],
    dir: &Path,
    name: &str,
) -> Result<PathBuf, TVError> {
    let bytes = export_workbook(rows, columns)?;
    let mut path = dir.join(name);
    if path.extension().and_then(|e| e.to_str()) != Some("xlsx") {
        path.set_extension("xlsx");
    }
    fs::write(&path, bytes)?;
    info!("Exported {} rows to {}", rows.len(), path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use calamine::{Data, Reader, Xlsx, open_workbook_from_rs};
    use std::io::Cursor;

    struct File {
        name: &'static str,
        size: f64,
        shared: bool,
    }

    fn columns() -> Vec<ColumnDef<File>> {
        vec![
            ColumnDef::new("name", |f: &File| f.name.into()),
            ColumnDef::new("size", |f: &File| f.size.into())
                .render_with(|f| format!("{} KB", f.size / 1024.0)),
            ColumnDef::new("shared", |f: &File| f.shared.into()),
        ]
    }

    fn read_back(bytes: Vec<u8>) -> Vec<Vec<Data>> {
        let mut wb: Xlsx<_> = open_workbook_from_rs(Cursor::new(bytes)).unwrap();
        let range = wb.worksheet_range(SHEET_NAME).unwrap();
        range.rows().map(|r| r.to_vec()).collect()
    }

    #[test]
    fn records_use_accessed_values() {
        let files = [File { name: "logo.png", size: 512000.0, shared: true }];
        let rows: Vec<&File> = files.iter().collect();
        let cols = columns();
        let refs: Vec<&ColumnDef<File>> = cols.iter().collect();
        let records = export_records(&rows, &refs);
        assert_eq!(records[0][1], ("size".to_string(), CellValue::Number(512000.0)));
    }

    #[test]
    fn empty_export_has_headers() {
        let cols = columns();
        let refs: Vec<&ColumnDef<File>> = cols.iter().collect();
        let bytes = export_workbook::<File>(&[], &refs).unwrap();
        let sheet = read_back(bytes);
        assert_eq!(sheet.len(), 1);
        assert_eq!(
            sheet[0],
            vec![
                Data::String("name".into()),
                Data::String("size".into()),
                Data::String("shared".into())
            ]
        );
    }

    #[test]
    fn writes_one_row_per_record_in_column_order() {
        let files = [
            File { name: "report.pdf", size: 2048576.0, shared: false },
            File { name: "team.jpg", size: 2097152.0, shared: true },
        ];
        let rows: Vec<&File> = files.iter().collect();
        let cols = columns();
        let refs: Vec<&ColumnDef<File>> = vec![&cols[1], &cols[0]];
        let sheet = read_back(export_workbook(&rows, &refs).unwrap());
        assert_eq!(sheet.len(), 3);
        assert_eq!(sheet[0][0], Data::String("size".into()));
        assert_eq!(sheet[1][0], Data::Float(2048576.0));
        assert_eq!(sheet[2][1], Data::String("team.jpg".into()));
    }

    #[test]
    fn export_to_file_appends_extension() {
        let dir = std::env::temp_dir();
        let cols = columns();
        let refs: Vec<&ColumnDef<File>> = cols.iter().collect();
        let path = export_to_file::<File>(&[], &refs, &dir, "dashtable-export-test").unwrap();
        assert_eq!(path.extension().and_then(|e| e.to_str()), Some("xlsx"));
        assert!(path.exists());
        fs::remove_file(path).unwrap();
    }
}
