//! JSON status report.
//!
//! The report is a plain array of [`TunnelStatus`] rows, indented with four spaces,
//! in tunnel order.

use std::fs;
use std::path::Path;

use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use swanwatch_common::error::ReportError;
use swanwatch_common::tunnel::TunnelStatus;
use tracing::info;

const INDENT: &[u8] = b"    ";

pub fn render_report(statuses: &[TunnelStatus]) -> Result<Vec<u8>, ReportError> {
    let mut buf: Vec<u8> = Vec::new();
    let mut serializer =
        serde_json::Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(INDENT));
    statuses.serialize(&mut serializer)?;
    Ok(buf)
}

/// Writes the report to `path`, replacing any previous report.
pub fn write_report(path: &Path, statuses: &[TunnelStatus]) -> Result<(), ReportError> {
    let bytes: Vec<u8> = render_report(statuses)?;
    fs::write(path, bytes).map_err(|source| ReportError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    info!("Report with {} tunnels written to {}", statuses.len(), path.display());
    Ok(())
}
