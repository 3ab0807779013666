//! Report generation: aggregate queries over the store rendered as a
//! static HTML page of plotly charts.
//!
//! Chart generators are registered in an explicit ordered list — never
//! discovered by introspection — so the report layout is deterministic and
//! the set of charts is visible in one place.

pub mod charts;
pub mod html;

use std::path::Path;

use rusqlite::{Connection, OptionalExtension};
use tracing::{debug, info};

use crate::config::ReportConfig;
use crate::error::{Result, ScopeError};

/// A rendered chart: plotly traces plus layout, keyed by a stable name
/// used as the HTML element id.
#[derive(Debug)]
pub struct Chart {
    pub name: &'static str,
    pub traces: Vec<serde_json::Value>,
    pub layout: serde_json::Value,
}

/// Read-side context handed to every chart generator.
pub struct ReportContext {
    pub(crate) conn: Connection,
    /// Effective owner address (surrogate when the store is pseudonymized);
    /// excluded from top-sender/recipient charts. Empty disables exclusion.
    pub(crate) owner: String,
    pub(crate) top_limit: usize,
}

type ChartFn = fn(&ReportContext) -> Result<Chart>;

/// The fixed, ordered set of report charts.
pub const CHART_REGISTRY: &[(&str, ChartFn)] = &[
    ("top_senders", charts::top_senders),
    ("top_recipients", charts::top_recipients),
    ("messages_by_day_of_week", charts::messages_by_day_of_week),
    ("messages_by_hour", charts::messages_by_hour),
    ("chat_vs_mail_monthly", charts::chat_vs_mail_monthly),
    ("chat_vs_mail_cumulative", charts::chat_vs_mail_cumulative),
    ("thread_durations", charts::thread_durations),
    ("thread_sizes", charts::thread_sizes),
];

impl ReportContext {
    /// Open the store read-side and resolve the owner address through the
    /// identity mapping (pseudonymized stores know the owner only by
    /// surrogate).
    pub fn open(db_path: &Path, config: &ReportConfig) -> Result<Self> {
        let conn = Connection::open(db_path)?;

        let owner = if config.owner_address.is_empty() {
            String::new()
        } else {
            let mapped: Option<String> = conn
                .query_row(
                    "SELECT surrogate_address FROM identity_map WHERE real_address = ?1",
                    [&config.owner_address],
                    |row| row.get(0),
                )
                .optional()?;
            mapped.unwrap_or_else(|| config.owner_address.clone())
        };

        Ok(Self {
            conn,
            owner,
            top_limit: config.top_limit.max(1),
        })
    }

    /// Generate every registered chart, in registry order.
    ///
    /// Charts whose queries return no rows are skipped rather than rendered
    /// empty. The cumulative usage chart honors the config toggle.
    pub fn generate_charts(&self, config: &ReportConfig) -> Result<Vec<Chart>> {
        let mut rendered = Vec::new();
        for (name, generate) in CHART_REGISTRY {
            if *name == "chat_vs_mail_cumulative" && !config.cumulative {
                continue;
            }
            let chart = generate(self)?;
            if chart.traces.is_empty() {
                debug!(chart = name, "No data, skipping chart");
                continue;
            }
            rendered.push(chart);
        }
        Ok(rendered)
    }
}

/// Generate the full report and write it to `output`.
///
/// Returns the number of charts rendered.
pub fn write_report(db_path: &Path, config: &ReportConfig, output: &Path) -> Result<usize> {
    let context = ReportContext::open(db_path, config)?;
    let charts = context.generate_charts(config)?;
    if charts.is_empty() {
        return Err(ScopeError::Report(
            "store contains no dated messages to report on".to_string(),
        ));
    }

    let page = html::render_page(&charts);
    std::fs::write(output, page).map_err(|e| ScopeError::io(output, e))?;
    info!(charts = charts.len(), output = %output.display(), "Report written");
    Ok(charts.len())
}
