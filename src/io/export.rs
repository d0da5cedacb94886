//! CSV export for balance tables.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use crate::reporting::BalanceTable;

/// Exports a balance table to a CSV file at the given path.
///
/// Writes a header row (`year`, contributor columns, `Total`) followed by
/// one data row per year. Produces deterministic output for identical
/// inputs.
///
/// # Errors
///
/// Returns an `io::Error` if file creation or writing fails.
pub fn export_csv(table: &BalanceTable, path: &Path) -> io::Result<()> {
    let file = File::create(path)?;
    let buf = io::BufWriter::new(file);
    write_csv(table, buf)
}

/// Writes a balance table as CSV to any writer.
///
/// # Errors
///
/// Returns an `io::Error` if writing fails.
pub fn write_csv(table: &BalanceTable, writer: impl Write) -> io::Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);

    wtr.write_record(table.headers())?;

    for (i, year) in table.span.years().enumerate() {
        let mut record = Vec::with_capacity(table.columns.len() + 2);
        record.push(year.to_string());
        for (_, values) in &table.columns {
            record.push(format!("{:.6}", values[i]));
        }
        record.push(format!("{:.6}", table.total[i]));
        wtr.write_record(&record)?;
    }

    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::YearSpan;

    fn make_table() -> BalanceTable {
        BalanceTable {
            title: "electricity production".to_string(),
            span: YearSpan::new(2020, 3),
            columns: vec![
                ("solar".to_string(), vec![1.0, 2.0, 3.0]),
                ("wind".to_string(), vec![4.0, 5.0, 6.0]),
            ],
            total: vec![5.0, 7.0, 9.0],
        }
    }

    #[test]
    fn header_row_names_all_columns() {
        let mut buf = Vec::new();
        write_csv(&make_table(), &mut buf).expect("writes");
        let output = String::from_utf8(buf).expect("valid UTF-8");
        assert_eq!(output.lines().next(), Some("year,solar,wind,Total"));
    }

    #[test]
    fn row_count_matches_year_count() {
        let mut buf = Vec::new();
        write_csv(&make_table(), &mut buf).expect("writes");
        let output = String::from_utf8(buf).expect("valid UTF-8");
        // 1 header + 3 data rows
        assert_eq!(output.lines().count(), 4);
    }

    #[test]
    fn deterministic_output() {
        let table = make_table();
        let mut buf1 = Vec::new();
        let mut buf2 = Vec::new();
        write_csv(&table, &mut buf1).expect("first write");
        write_csv(&table, &mut buf2).expect("second write");
        assert_eq!(buf1, buf2);
    }

    #[test]
    fn round_trip_parseable() {
        let mut buf = Vec::new();
        write_csv(&make_table(), &mut buf).expect("writes");

        let mut rdr = csv::ReaderBuilder::new().from_reader(buf.as_slice());
        assert_eq!(rdr.headers().expect("header row").len(), 4);

        let mut row_count = 0;
        for record in rdr.records() {
            let rec = record.expect("every row should parse");
            // Year column parses as i32, value columns as f64
            rec[0].parse::<i32>().expect("year column should parse");
            for i in 1..4 {
                rec[i].parse::<f64>().expect("value columns should parse");
            }
            row_count += 1;
        }
        assert_eq!(row_count, 3);
    }
}
