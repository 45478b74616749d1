//! Report export to JSON and HTML files.
//!
//! Pure formatting: nothing here decides what goes into a report.

use crate::entry::Entry;
use crate::report::Report;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

fn ensure_parent(path: &Path) -> Result<(), crate::Error> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

/// Write any serializable value as pretty JSON, creating parent directories.
pub fn write_json<T: Serialize + ?Sized>(value: &T, path: &Path) -> Result<PathBuf, crate::Error> {
    ensure_parent(path)?;
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json)?;
    Ok(path.to_path_buf())
}

/// JSON export of a report
pub fn save_json(report: &Report, path: &Path) -> Result<PathBuf, crate::Error> {
    write_json(report, path)
}

/// HTML export of a report
pub fn save_html(report: &Report, path: &Path) -> Result<PathBuf, crate::Error> {
    ensure_parent(path)?;
    fs::write(path, render_html(report))?;
    Ok(path.to_path_buf())
}

fn entry_rows(entries: &[Entry]) -> String {
    entries
        .iter()
        .map(|e| {
            format!(
                r#"<tr><td class="level-{}">{}</td><td>{}</td><td>{}</td></tr>"#,
                e.level,
                e.level,
                html_escape(&e.subject),
                html_escape(&e.message)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Render a report as a standalone table-based HTML document.
pub fn render_html(report: &Report) -> String {
    let options = serde_json::to_string_pretty(&report.options).unwrap_or_default();

    format!(r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8"/>
<title>{title} Report</title>
<style>
body {{ font-family: system-ui, sans-serif; margin: 24px; }}
h1 {{ margin-bottom: 4px; }}
.small {{ color: #666; margin-top: 0; }}
table {{ border-collapse: collapse; width: 100%; margin: 12px 0 28px; }}
th, td {{ border: 1px solid #ddd; padding: 8px; font-size: 13px; }}
th {{ background: #f5f5f5; text-align: left; }}
.level-WARNING {{ color: #b45309; font-weight: bold; }}
.level-INFO {{ color: #1f2937; }}
code {{ background: #f7f7f7; padding: 2px 6px; border-radius: 4px; }}
</style>
</head>
<body>
<h1>{title}</h1>
<p class="small">Version <code>{version}</code> - {timestamp}</p>
<h2>Summary</h2>
<ul>
<li>Scan warnings: <b>{sw}</b></li>
<li>Scan info: <b>{si}</b></li>
<li>Action warnings: <b>{aw}</b></li>
<li>Action info: <b>{ai}</b></li>
</ul>
<h2>Options</h2>
<pre>{options}</pre>
<h2>Scan Results</h2>
<table>
<thead><tr><th>Level</th><th>Node</th><th>Message</th></tr></thead>
<tbody>
{scan_rows}
</tbody>
</table>
<h2>Cleanup Actions</h2>
<table>
<thead><tr><th>Level</th><th>Node</th><th>Message</th></tr></thead>
<tbody>
{action_rows}
</tbody>
</table>
</body>
</html>"#,
        title = html_escape(&report.tool.name),
        version = html_escape(&report.tool.version),
        timestamp = html_escape(&report.timestamp),
        sw = report.summary.scan_warning_count,
        si = report.summary.scan_info_count,
        aw = report.summary.action_warning_count,
        ai = report.summary.action_info_count,
        options = html_escape(&options),
        scan_rows = entry_rows(&report.scan_results),
        action_rows = entry_rows(&report.actions),
    )
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
