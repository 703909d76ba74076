use std::io::Write;

use anyhow::Result;
use profootball_lib::Table;
use serde::Serialize;
use tabled::builder::Builder;
use tabled::settings::Style;

#[derive(Clone, Debug, PartialEq)]
pub enum OutputFormat {
    Table,
    Json,
    Csv,
    Markdown,
}

// -- Row builders --

fn build_rows(table: &Table) -> Vec<Vec<String>> {
    table
        .rows()
        .iter()
        .map(|row| row.iter().map(|v| v.to_string()).collect())
        .collect()
}

fn build_table(table: &Table) -> tabled::Table {
    let mut builder = Builder::default();
    builder.push_record(table.columns().iter().cloned());
    for row in build_rows(table) {
        builder.push_record(row);
    }
    builder.build()
}

// -- Table output --

pub fn print_table(table: &Table) {
    println!("{}", build_table(table));
}

// -- Markdown output --

pub fn print_markdown(table: &Table) {
    let mut out = build_table(table);
    out.with(Style::markdown());
    println!("{}", out);
}

// -- CSV output --

pub fn write_csv<W: Write>(table: &Table, writer: W) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(table.columns())?;
    for row in build_rows(table) {
        wtr.write_record(&row)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn print_csv(table: &Table) -> Result<()> {
    write_csv(table, std::io::stdout())
}

// -- JSON output --

pub fn print_json<T: Serialize>(data: &T) {
    match serde_json::to_string_pretty(data) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Failed to serialize to JSON: {}", e),
    }
}

pub fn records_json(table: &Table) -> serde_json::Result<serde_json::Value> {
    let records: Vec<_> = table.records().collect();
    serde_json::to_value(records)
}

/// Prints `table` in the requested format.
pub fn render(table: &Table, format: &OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table => print_table(table),
        OutputFormat::Markdown => print_markdown(table),
        OutputFormat::Csv => print_csv(table)?,
        OutputFormat::Json => print_json(&records_json(table)?),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use profootball_lib::Value;

    fn sample() -> Table {
        let mut t = Table::new(vec!["Tm".into(), "Y/P".into(), "Year".into()]).unwrap();
        t.push_row(vec!["NE".into(), Value::Number(5.4), Value::Number(2021.0)])
            .unwrap();
        t.push_row(vec!["BUF".into(), Value::Missing, Value::Number(2021.0)])
            .unwrap();
        t
    }

    #[test]
    fn test_build_rows_formats_values() {
        let rows = build_rows(&sample());
        assert_eq!(rows[0], vec!["NE", "5.4", "2021"]);
        assert_eq!(rows[1], vec!["BUF", "", "2021"]);
    }

    #[test]
    fn test_table_has_header_and_rows() {
        let rendered = build_table(&sample()).to_string();
        assert!(rendered.contains("Y/P"));
        assert!(rendered.contains("BUF"));
    }

    #[test]
    fn test_markdown_style() {
        let mut out = build_table(&sample());
        out.with(Style::markdown());
        let rendered = out.to_string();
        assert!(rendered.lines().next().unwrap().starts_with("| Tm"));
        assert!(rendered.lines().nth(1).unwrap().starts_with("|-"));
    }

    #[test]
    fn test_csv_headers_and_missing() {
        let mut buf = Vec::new();
        write_csv(&sample(), &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(text, "Tm,Y/P,Year\nNE,5.4,2021\nBUF,,2021\n");
    }

    #[test]
    fn test_json_records() {
        let val = records_json(&sample()).unwrap();
        assert_eq!(
            val,
            serde_json::json!([
                {"Tm": "NE", "Y/P": 5.4, "Year": 2021},
                {"Tm": "BUF", "Y/P": null, "Year": 2021}
            ])
        );
    }
}
