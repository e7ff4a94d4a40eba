use crate::errors::{AppError, ResultExt};
use crate::models::EnrichedCustomer;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

const HEADER: [&str; 8] = [
    "customer_id",
    "name",
    "email",
    "total_spend",
    "social_handle",
    "success",
    "reason",
    "submission_status",
];

/// `{dir}/customer_orders_since_{start_date}.csv`
pub fn report_path(dir: &Path, start_date: &str) -> PathBuf {
    dir.join(format!("customer_orders_since_{}.csv", start_date))
}

/// Quote a field when it contains a delimiter, quote or line break.
fn escape_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn write_row<W: Write>(writer: &mut W, fields: &[String]) -> std::io::Result<()> {
    let line = fields
        .iter()
        .map(|f| escape_field(f))
        .collect::<Vec<_>>()
        .join(",");
    writeln!(writer, "{}", line)
}

/// Write rows as CSV with a header line.
pub fn write_rows<W: Write>(writer: &mut W, rows: &[EnrichedCustomer]) -> std::io::Result<()> {
    let header: Vec<String> = HEADER.iter().map(|h| h.to_string()).collect();
    write_row(writer, &header)?;

    for row in rows {
        write_row(
            writer,
            &[
                row.customer_id.to_string(),
                row.name.clone().unwrap_or_default(),
                row.email.clone().unwrap_or_default(),
                row.total_spend.to_string(),
                row.social_handle.clone().unwrap_or_default(),
                if row.success { "True" } else { "False" }.to_string(),
                row.reason.clone(),
                row.submission_status.clone(),
            ],
        )?;
    }

    writer.flush()
}

/// Write the report file, replacing any previous one.
pub fn write_csv(path: &Path, rows: &[EnrichedCustomer]) -> Result<(), AppError> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create report {}", path.display()))?;
    let mut writer = BufWriter::new(file);

    write_rows(&mut writer, rows)
        .with_context(|| format!("Failed to write report {}", path.display()))?;

    tracing::info!("Wrote {} rows to {}", rows.len(), path.display());
    Ok(())
}
