//! Tab separated report output

use crate::aggregate::ReportRow;
use crate::error::Result;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

/// File name of the report inside the reports directory
pub const REPORT_FILE_NAME: &str = "must_support_elements.tsv";

const HEADER: [&str; 5] = [
    "Resource Type",
    "Profile Name",
    "Element",
    "Cardinality",
    "Use Count",
];

/// Write `rows` as TSV with a header line. An empty `rows` writes the header only.
pub fn write_tsv<W: Write>(rows: &[ReportRow], writer: &mut W) -> Result<()> {
    writeln!(writer, "{}", HEADER.join("\t"))?;
    for row in rows {
        let use_count = row.use_count.map(|n| n.to_string()).unwrap_or_default();
        let fields = [
            sanitize(&row.resource_type),
            sanitize(&row.profile_title),
            sanitize(&row.element),
            sanitize(&row.cardinality),
            use_count,
        ];
        writeln!(writer, "{}", fields.join("\t"))?;
    }
    writer.flush()?;
    Ok(())
}

/// Write the report file into `reports_dir`, creating the directory if needed.
pub fn write_report(rows: &[ReportRow], reports_dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(reports_dir)?;
    let path = reports_dir.join(REPORT_FILE_NAME);
    let mut writer = BufWriter::new(File::create(&path)?);
    write_tsv(rows, &mut writer)?;
    info!(path = %path.display(), rows = rows.len(), "Wrote mustSupport report");
    Ok(path)
}

fn sanitize(field: &str) -> String {
    field
        .chars()
        .map(|c| if matches!(c, '\t' | '\n' | '\r') { ' ' } else { c })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(element: &str, use_count: Option<u64>) -> ReportRow {
        ReportRow {
            resource_type: "Patient".to_string(),
            profile_title: "US Core Patient Profile".to_string(),
            element: element.to_string(),
            cardinality: "0..*".to_string(),
            use_count,
        }
    }

    fn render(rows: &[ReportRow]) -> String {
        let mut out = Vec::new();
        write_tsv(rows, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_header_only_when_empty() {
        assert_eq!(
            render(&[]),
            "Resource Type\tProfile Name\tElement\tCardinality\tUse Count\n"
        );
    }

    #[test]
    fn test_rows_and_blank_counts() {
        let out = render(&[row("Patient.name", Some(3)), row("Patient.telecom", None)]);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1], "Patient\tUS Core Patient Profile\tPatient.name\t0..*\t3");
        assert_eq!(lines[2], "Patient\tUS Core Patient Profile\tPatient.telecom\t0..*\t");
    }

    #[test]
    fn test_field_separators_are_sanitized() {
        let mut tricky = row("Patient.name", Some(1));
        tricky.profile_title = "Patient\tProfile\nv2".to_string();
        let out = render(&[tricky]);
        assert_eq!(out.lines().nth(1), Some("Patient\tPatient Profile v2\tPatient.name\t0..*\t1"));
    }

    #[test]
    fn test_write_report_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let reports = dir.path().join("reports");
        let path = write_report(&[row("Patient.name", None)], &reports).unwrap();
        assert_eq!(path, reports.join(REPORT_FILE_NAME));
        let content = fs::read_to_string(path).unwrap();
        assert!(content.starts_with("Resource Type\t"));
        assert_eq!(content.lines().count(), 2);
    }
}
