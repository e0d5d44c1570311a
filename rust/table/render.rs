//! CSV and JSON rendering of table rows

use crate::error::{IntegrationError, Result};
use crate::table::projector::TableRow;
use csv::{QuoteStyle, ReaderBuilder, Terminator, WriterBuilder};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use std::str::FromStr;

/// CSV body returned when there are no active contracts
pub const NO_DATA: &str = "no data";

/// CSV formatting convention
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CsvDialect {
    /// Comma separated, minimal quoting, CRLF line endings
    #[default]
    #[serde(rename = "Excel")]
    Excel,
    /// Tab separated, minimal quoting, CRLF line endings
    #[serde(rename = "Excel w/Tabs")]
    ExcelTab,
    /// Comma separated, every field quoted, LF line endings
    #[serde(rename = "Unix")]
    Unix,
}

impl CsvDialect {
    pub fn label(self) -> &'static str {
        match self {
            CsvDialect::Excel => "Excel",
            CsvDialect::ExcelTab => "Excel w/Tabs",
            CsvDialect::Unix => "Unix",
        }
    }

    pub fn delimiter(self) -> u8 {
        match self {
            CsvDialect::ExcelTab => b'\t',
            CsvDialect::Excel | CsvDialect::Unix => b',',
        }
    }

    pub fn terminator(self) -> Terminator {
        match self {
            CsvDialect::Unix => Terminator::Any(b'\n'),
            CsvDialect::Excel | CsvDialect::ExcelTab => Terminator::CRLF,
        }
    }

    pub fn line_ending(self) -> &'static str {
        match self {
            CsvDialect::Unix => "\n",
            CsvDialect::Excel | CsvDialect::ExcelTab => "\r\n",
        }
    }

    pub fn quote_style(self) -> QuoteStyle {
        match self {
            CsvDialect::Unix => QuoteStyle::Always,
            CsvDialect::Excel | CsvDialect::ExcelTab => QuoteStyle::Necessary,
        }
    }

    pub fn writer_builder(self) -> WriterBuilder {
        let mut builder = WriterBuilder::new();
        builder
            .delimiter(self.delimiter())
            .terminator(self.terminator())
            .quote_style(self.quote_style())
            .double_quote(true);
        builder
    }

    /// Reader accepting what [`render_csv`] writes in this dialect.
    pub fn reader_builder(self) -> ReaderBuilder {
        let mut builder = ReaderBuilder::new();
        builder.delimiter(self.delimiter()).has_headers(true);
        builder
    }
}

impl fmt::Display for CsvDialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for CsvDialect {
    type Err = IntegrationError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "Excel" => Ok(CsvDialect::Excel),
            "Excel w/Tabs" => Ok(CsvDialect::ExcelTab),
            "Unix" => Ok(CsvDialect::Unix),
            other => Err(IntegrationError::Config(format!(
                "unknown CSV dialect '{}' (expected Excel, Excel w/Tabs or Unix)",
                other
            ))),
        }
    }
}

/// Header plus one line per row, in the column order of the first row.
/// Cells without a value are written empty.
pub fn render_csv(rows: &[TableRow], dialect: CsvDialect) -> Result<String> {
    let Some(first) = rows.first() else {
        return Ok(NO_DATA.to_string());
    };
    let header: Vec<&str> = first.keys().map(String::as_str).collect();
    // the csv writer would quote an empty record; write bare line endings
    if header.is_empty() {
        return Ok(dialect.line_ending().repeat(rows.len() + 1));
    }

    let mut writer = dialect.writer_builder().from_writer(Vec::new());
    writer.write_record(&header)?;
    for row in rows {
        writer.write_record(
            header
                .iter()
                .map(|name| row.get(*name).and_then(|cell| cell.as_deref()).unwrap_or("")),
        )?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| IntegrationError::Io(e.into_error()))?;
    String::from_utf8(bytes).map_err(|e| IntegrationError::Decode(e.to_string()))
}

/// `{"rows": [...]}`, well formed even when there are no rows.
pub fn render_json(rows: &[TableRow]) -> Value {
    json!({ "rows": rows })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[(&str, Option<&str>)]) -> TableRow {
        cells
            .iter()
            .map(|(name, cell)| (name.to_string(), cell.map(str::to_string)))
            .collect()
    }

    #[test]
    fn test_empty_rows() {
        assert_eq!(render_csv(&[], CsvDialect::Excel).unwrap(), "no data");
        assert_eq!(render_csv(&[], CsvDialect::Unix).unwrap(), "no data");
        assert_eq!(render_json(&[]), json!({"rows": []}));
    }

    #[test]
    fn test_excel_dialect() {
        let rows = vec![
            row(&[("name", Some("a, b")), ("qty", Some("1"))]),
            row(&[("name", Some("say \"hi\"")), ("qty", None)]),
        ];
        assert_eq!(
            render_csv(&rows, CsvDialect::Excel).unwrap(),
            "name,qty\r\n\"a, b\",1\r\n\"say \"\"hi\"\"\",\r\n"
        );
    }

    #[test]
    fn test_excel_tab_dialect() {
        let rows = vec![row(&[("name", Some("a, b")), ("qty", Some("1"))])];
        assert_eq!(
            render_csv(&rows, CsvDialect::ExcelTab).unwrap(),
            "name\tqty\r\na, b\t1\r\n"
        );
    }

    #[test]
    fn test_unix_dialect_quotes_everything() {
        let rows = vec![row(&[("name", Some("x")), ("qty", None)])];
        assert_eq!(
            render_csv(&rows, CsvDialect::Unix).unwrap(),
            "\"name\",\"qty\"\n\"x\",\"\"\n"
        );
    }

    #[test]
    fn test_csv_round_trip() {
        let rows = vec![
            row(&[("id", Some("1")), ("memo", Some("line\nbreak")), ("when", Some("01/03/2024"))]),
            row(&[("id", Some("2")), ("memo", Some("tab\there")), ("when", Some("02/03/2024"))]),
        ];
        for dialect in [CsvDialect::Excel, CsvDialect::ExcelTab, CsvDialect::Unix] {
            let text = render_csv(&rows, dialect).unwrap();
            let mut reader = dialect.reader_builder().from_reader(text.as_bytes());

            let header: Vec<String> = reader.headers().unwrap().iter().map(str::to_string).collect();
            assert_eq!(header, vec!["id", "memo", "when"]);

            let parsed: Vec<Vec<String>> = reader
                .records()
                .map(|r| r.unwrap().iter().map(str::to_string).collect())
                .collect();
            let expected: Vec<Vec<String>> = rows
                .iter()
                .map(|r| r.values().map(|c| c.clone().unwrap_or_default()).collect())
                .collect();
            assert_eq!(parsed, expected, "dialect {}", dialect);
        }
    }

    #[test]
    fn test_rows_without_columns() {
        let rows = vec![TableRow::new(), TableRow::new()];
        assert_eq!(render_csv(&rows, CsvDialect::Excel).unwrap(), "\r\n\r\n\r\n");
        assert_eq!(render_csv(&rows, CsvDialect::Unix).unwrap(), "\n\n\n");

        for dialect in [CsvDialect::Excel, CsvDialect::ExcelTab, CsvDialect::Unix] {
            let text = render_csv(&rows, dialect).unwrap();
            let mut reader = dialect.reader_builder().from_reader(text.as_bytes());
            assert!(reader.headers().unwrap().is_empty(), "dialect {}", dialect);
            assert_eq!(reader.records().count(), 0);
        }
    }

    #[test]
    fn test_json_keeps_column_order_and_nulls() {
        let rows = vec![row(&[("b", Some("1")), ("a", None)])];
        let rendered = render_json(&rows);
        assert_eq!(rendered.to_string(), r#"{"rows":[{"b":"1","a":null}]}"#);
    }

    #[test]
    fn test_dialect_labels() {
        assert_eq!("Excel w/Tabs".parse::<CsvDialect>().unwrap(), CsvDialect::ExcelTab);
        assert_eq!("Unix".parse::<CsvDialect>().unwrap(), CsvDialect::Unix);
        assert!("excel".parse::<CsvDialect>().is_err());
        let dialect: CsvDialect = serde_json::from_str("\"Excel w/Tabs\"").unwrap();
        assert_eq!(dialect, CsvDialect::ExcelTab);
    }
}
