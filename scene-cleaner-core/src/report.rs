//! Report generation from scan and cleanup results.
//!
//! Produces structured reports suitable for CLI output,
//! JSON export, or HTML rendering.

use crate::entry::{count_level, ActionEntry, IssueEntry, Level};
use crate::options::Options;
use chrono::{Local, SecondsFormat};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const TOOL_NAME: &str = "Scene Cleaner";
pub const TOOL_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolInfo {
    pub name: String,
    pub version: String,
}

impl Default for ToolInfo {
    fn default() -> Self {
        Self {
            name: TOOL_NAME.to_string(),
            version: TOOL_VERSION.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub scan_warning_count: usize,
    pub scan_info_count: usize,
    pub action_warning_count: usize,
    pub action_info_count: usize,
}

/// Result of one scan and/or clean invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub tool: ToolInfo,
    /// ISO-8601, seconds precision
    pub timestamp: String,
    pub options: BTreeMap<String, bool>,
    pub scan_results: Vec<IssueEntry>,
    pub actions: Vec<ActionEntry>,
    pub summary: ReportSummary,
}

/// Builder for constructing reports
pub struct ReportBuilder {
    tool: ToolInfo,
    timestamp: Option<String>,
    options: Options,
    scan_results: Vec<IssueEntry>,
    actions: Vec<ActionEntry>,
}

impl ReportBuilder {
    pub fn new() -> Self {
        Self {
            tool: ToolInfo::default(),
            timestamp: None,
            options: Options::default(),
            scan_results: Vec::new(),
            actions: Vec::new(),
        }
    }

    pub fn with_tool(mut self, name: impl Into<String>, version: impl Into<String>) -> Self {
        self.tool = ToolInfo {
            name: name.into(),
            version: version.into(),
        };
        self
    }

    /// Fix the timestamp instead of stamping the build time
    pub fn with_timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.timestamp = Some(timestamp.into());
        self
    }

    pub fn with_options(mut self, options: Options) -> Self {
        self.options = options;
        self
    }

    pub fn with_scan_results(mut self, results: Vec<IssueEntry>) -> Self {
        self.scan_results = results;
        self
    }

    pub fn with_actions(mut self, actions: Vec<ActionEntry>) -> Self {
        self.actions = actions;
        self
    }

    pub fn add_scan_result(mut self, result: IssueEntry) -> Self {
        self.scan_results.push(result);
        self
    }

    pub fn add_action(mut self, action: ActionEntry) -> Self {
        self.actions.push(action);
        self
    }

    pub fn build(self) -> Report {
        let summary = ReportSummary {
            scan_warning_count: count_level(&self.scan_results, Level::Warning),
            scan_info_count: count_level(&self.scan_results, Level::Info),
            action_warning_count: count_level(&self.actions, Level::Warning),
            action_info_count: count_level(&self.actions, Level::Info),
        };

        Report {
            tool: self.tool,
            timestamp: self.timestamp.unwrap_or_else(now_iso),
            options: self.options.to_map(),
            scan_results: self.scan_results,
            actions: self.actions,
            summary,
        }
    }
}

impl Default for ReportBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Current local time, ISO-8601 with seconds precision
pub fn now_iso() -> String {
    Local::now().to_rfc3339_opts(SecondsFormat::Secs, false)
}

/// Merge scan and cleanup results into a report stamped with the current time.
pub fn build_report(options: &Options, scan_results: &[IssueEntry], actions: &[ActionEntry]) -> Report {
    ReportBuilder::new()
        .with_options(*options)
        .with_scan_results(scan_results.to_vec())
        .with_actions(actions.to_vec())
        .build()
}

impl Report {
    /// Format as human-readable text
    pub fn to_text(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!("{} {} - {}", self.tool.name, self.tool.version, self.timestamp));
        lines.push(String::new());

        let enabled: Vec<&str> = self
            .options
            .iter()
            .filter(|(_, v)| **v)
            .map(|(k, _)| k.as_str())
            .collect();
        lines.push(format!("Options: {}", enabled.join(", ")));
        lines.push(String::new());

        if !self.scan_results.is_empty() {
            lines.push("Scan Results".to_string());
            for r in &self.scan_results {
                lines.push(format!("  {}", r));
            }
            lines.push(String::new());
        }

        if !self.actions.is_empty() {
            lines.push("Cleanup Actions".to_string());
            for a in &self.actions {
                lines.push(format!("  {}", a));
            }
            lines.push(String::new());
        }

        lines.push(format!(
            "Summary: {} warnings, {} info (scan); {} warnings, {} info (actions)",
            self.summary.scan_warning_count,
            self.summary.scan_info_count,
            self.summary.action_warning_count,
            self.summary.action_info_count
        ));

        lines.join("\n")
    }

    /// Serialize to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
