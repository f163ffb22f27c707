//! Report writers: JSON array, newline-delimited JSON, CSV.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use chrono::SecondsFormat;
use netinv_core::InventoryRecord;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Report serialization format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Pretty-printed JSON array.
    Json,
    /// One JSON object per line.
    #[default]
    Jsonl,
    /// Comma-separated values with a header row.
    Csv,
}

/// Flat CSV row. Absent fields become empty cells.
#[derive(Serialize)]
struct CsvRow<'a> {
    ip: String,
    mac: &'a str,
    hostname: &'a str,
    reachable: &'static str,
    seen_via: &'static str,
    timestamp: String,
}

impl<'a> From<&'a InventoryRecord> for CsvRow<'a> {
    fn from(record: &'a InventoryRecord) -> Self {
        Self {
            ip: record.ip.to_string(),
            mac: record.mac.as_deref().unwrap_or_default(),
            hostname: record.hostname.as_deref().unwrap_or_default(),
            reachable: match record.reachable {
                Some(true) => "true",
                Some(false) => "false",
                None => "",
            },
            seen_via: record.seen_via.as_str(),
            timestamp: record.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true),
        }
    }
}

/// Serialize `records` to `writer` in the given format.
pub fn write_records<W: Write>(
    records: &[InventoryRecord],
    format: OutputFormat,
    mut writer: W,
) -> Result<()> {
    match format {
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut writer, records)?;
            writer.write_all(b"\n")?;
        }
        OutputFormat::Jsonl => {
            for record in records {
                serde_json::to_writer(&mut writer, record)?;
                writer.write_all(b"\n")?;
            }
        }
        OutputFormat::Csv => {
            let mut csv = csv::Writer::from_writer(&mut writer);
            if records.is_empty() {
                csv.write_record(["ip", "mac", "hostname", "reachable", "seen_via", "timestamp"])?;
            }
            for record in records {
                csv.serialize(CsvRow::from(record))?;
            }
            csv.flush()?;
        }
    }
    writer.flush()?;
    Ok(())
}

/// Write the report to `path`, replacing any existing file.
pub fn write_report(records: &[InventoryRecord], format: OutputFormat, path: &Path) -> Result<()> {
    let file = File::create(path)?;
    write_records(records, format, BufWriter::new(file))?;

    tracing::debug!(
        path = %path.display(),
        format = ?format,
        records = records.len(),
        "Report written"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use netinv_core::SeenVia;

    fn records() -> Vec<InventoryRecord> {
        let ts = Utc.with_ymd_and_hms(2026, 5, 4, 3, 2, 1).unwrap();
        vec![
            InventoryRecord {
                ip: "192.168.1.1".parse().unwrap(),
                mac: Some("aa:bb:cc:dd:ee:ff".to_string()),
                hostname: Some("router.lan".to_string()),
                reachable: Some(true),
                seen_via: SeenVia::Neigh,
                timestamp: ts,
            },
            InventoryRecord {
                ip: "192.168.1.23".parse().unwrap(),
                mac: None,
                hostname: None,
                reachable: None,
                seen_via: SeenVia::Ping,
                timestamp: ts,
            },
        ]
    }

    fn render(format: OutputFormat, records: &[InventoryRecord]) -> String {
        let mut buf = Vec::new();
        write_records(records, format, &mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_csv_output() {
        let out = render(OutputFormat::Csv, &records());
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "ip,mac,hostname,reachable,seen_via,timestamp");
        assert_eq!(
            lines[1],
            "192.168.1.1,aa:bb:cc:dd:ee:ff,router.lan,true,neigh,2026-05-04T03:02:01Z"
        );
        assert_eq!(lines[2], "192.168.1.23,,,,ping,2026-05-04T03:02:01Z");
    }

    #[test]
    fn test_csv_header_without_records() {
        let out = render(OutputFormat::Csv, &[]);
        assert_eq!(out, "ip,mac,hostname,reachable,seen_via,timestamp\n");
    }

    #[test]
    fn test_jsonl_output() {
        let out = render(OutputFormat::Jsonl, &records());
        let lines: Vec<serde_json::Value> = out
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["hostname"], "router.lan");
        assert!(lines[1]["mac"].is_null());
        assert!(lines[1]["reachable"].is_null());
        assert_eq!(lines[1]["seen_via"], "ping");
    }

    #[test]
    fn test_json_array_output() {
        let out = render(OutputFormat::Json, &records());
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        let array = value.as_array().unwrap();
        assert_eq!(array.len(), 2);
        assert_eq!(array[0]["ip"], "192.168.1.1");
        assert_eq!(array[0]["timestamp"], "2026-05-04T03:02:01Z");
    }

    #[test]
    fn test_write_report_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("inventory.jsonl");

        write_report(&records(), OutputFormat::Jsonl, &path).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written.lines().count(), 2);
    }
}
