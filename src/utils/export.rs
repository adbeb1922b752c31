//! JSON artifact export.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::models::SearchReport;

/// Errors raised while writing the report
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("Failed to write '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize report: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Write the report as pretty-printed UTF-8 JSON
pub fn write_report(report: &SearchReport, path: &Path) -> Result<(), ExportError> {
    let io_err = |source| ExportError::Io {
        path: path.display().to_string(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(io_err)?;
    }

    let file = File::create(path).map_err(io_err)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, report)?;
    writer.write_all(b"\n").map_err(io_err)?;
    writer.flush().map_err(io_err)?;

    tracing::debug!(path = %path.display(), articles = report.articles.len(), "Report written");
    Ok(())
}
