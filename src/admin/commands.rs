//! Administration command implementations.
//!
//! Every command writes human-readable output to the given writer and
//! reports success or failure through [`ExitStatus`].

use chrono::DateTime;
use std::io::Write;
use std::path::Path;
use std::process::ExitCode;
use super::service::IpGuard;
use crate::cli::AdminCommand;
use crate::db::models::{Rule, RuleKind};
use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    Success,
    Failure,
}

impl From<ExitStatus> for ExitCode {
    fn from(status: ExitStatus) -> Self {
        match status {
            ExitStatus::Success => ExitCode::SUCCESS,
            ExitStatus::Failure => ExitCode::FAILURE,
        }
    }
}

/// Run one administration command.
pub async fn run<W: Write>(cmd: AdminCommand, guard: &IpGuard, out: &mut W) -> ExitStatus {
    match execute(cmd, guard, out).await {
        Ok(status) => status,
        Err(e) => {
            // Nothing left to report to if the writer itself failed.
            let _ = writeln!(out, "[ERROR] {}", error_message(&e));
            ExitStatus::Failure
        }
    }
}

async fn execute<W: Write>(cmd: AdminCommand, guard: &IpGuard, out: &mut W) -> AppResult<ExitStatus> {
    match cmd {
        AdminCommand::Add { kind, ip, description } => {
            add(guard, kind, ip, description, out).await
        }
        AdminCommand::Remove { kind, ip } => remove(guard, kind, ip, out).await,
        AdminCommand::List { kind } => list(guard, kind, out).await,
        AdminCommand::Clear { kind } => clear(guard, kind, out).await,
        AdminCommand::Stats => stats(guard, out).await,
        AdminCommand::Toggle { id } => toggle(guard, id, out).await,
        AdminCommand::Import { kind, file, description } => {
            import(guard, kind, file.as_deref(), description, out).await
        }
        AdminCommand::Check { ip } => check(guard, &ip, out).await,
    }
}

fn error_message(e: &AppError) -> String {
    match e {
        AppError::Validation(msg) | AppError::NotFound(msg) => msg.clone(),
        other => other.to_string(),
    }
}

fn required<T>(value: Option<T>, message: &str) -> AppResult<T> {
    value.ok_or_else(|| AppError::Validation(message.to_string()))
}

fn parse_kind(kind: Option<&str>) -> AppResult<Option<RuleKind>> {
    kind.map(str::parse::<RuleKind>).transpose()
}

async fn add<W: Write>(
    guard: &IpGuard,
    kind: Option<String>,
    ip: Option<String>,
    description: Option<String>,
    out: &mut W,
) -> AppResult<ExitStatus> {
    let (kind, ip) = required(kind.zip(ip), "Type and IP are required for add action")?;
    let kind: RuleKind = kind.parse()?;

    let rule = guard.add(kind, &ip, description.as_deref()).await?;
    writeln!(out, "[OK] IP {} added to {}", rule.pattern, kind)?;
    Ok(ExitStatus::Success)
}

async fn remove<W: Write>(
    guard: &IpGuard,
    kind: Option<String>,
    ip: Option<String>,
    out: &mut W,
) -> AppResult<ExitStatus> {
    let (kind, ip) = required(kind.zip(ip), "Type and IP are required for remove action")?;
    let kind: RuleKind = kind.parse()?;

    if guard.remove(kind, &ip).await? {
        writeln!(out, "[OK] IP {} removed from {}", ip.trim(), kind)?;
    } else {
        writeln!(out, "[WARN] IP {} not found in {}", ip.trim(), kind)?;
    }
    Ok(ExitStatus::Success)
}

async fn list<W: Write>(guard: &IpGuard, kind: Option<String>, out: &mut W) -> AppResult<ExitStatus> {
    let kind = parse_kind(kind.as_deref())?;
    let rules = guard.rules(kind).await?;

    if rules.is_empty() {
        writeln!(out, "No IPs found")?;
        return Ok(ExitStatus::Success);
    }

    let rows: Vec<Vec<String>> = rules.iter().map(rule_row).collect();
    write_table(
        out,
        &["ID", "IP Address", "Type", "Description", "Active", "Created"],
        &rows,
    )?;
    Ok(ExitStatus::Success)
}

fn rule_row(rule: &Rule) -> Vec<String> {
    vec![
        rule.id.to_string(),
        rule.pattern.clone(),
        rule.kind.to_string(),
        rule.label.clone().unwrap_or_else(|| "-".to_string()),
        if rule.is_active { "Yes" } else { "No" }.to_string(),
        format_timestamp(&rule.created_at),
    ]
}

fn format_timestamp(ts: &str) -> String {
    DateTime::parse_from_rfc3339(ts)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|_| ts.to_string())
}

async fn clear<W: Write>(guard: &IpGuard, kind: Option<String>, out: &mut W) -> AppResult<ExitStatus> {
    match parse_kind(kind.as_deref())? {
        Some(kind) => {
            let removed = guard.clear_kind(kind).await?;
            writeln!(out, "[OK] Cleared {} {} entries", removed, kind)?;
        }
        None => {
            let removed = guard.clear_all().await?;
            writeln!(out, "[OK] Cleared {} entries", removed)?;
        }
    }
    Ok(ExitStatus::Success)
}

async fn stats<W: Write>(guard: &IpGuard, out: &mut W) -> AppResult<ExitStatus> {
    let stats = guard.stats().await?;
    let rows = vec![
        vec!["Whitelist Count".to_string(), stats.whitelist_count.to_string()],
        vec!["Blacklist Count".to_string(), stats.blacklist_count.to_string()],
        vec!["Total Active".to_string(), stats.total_active.to_string()],
        vec!["Total Inactive".to_string(), stats.total_inactive.to_string()],
    ];
    write_table(out, &["Metric", "Count"], &rows)?;
    Ok(ExitStatus::Success)
}

async fn toggle<W: Write>(guard: &IpGuard, id: Option<i64>, out: &mut W) -> AppResult<ExitStatus> {
    let id = required(id, "ID is required for toggle action")?;

    match guard.toggle(id).await {
        Ok(rule) => {
            let state = if rule.is_active { "active" } else { "inactive" };
            writeln!(out, "[OK] IP {} ({}) is now {}", rule.pattern, rule.kind, state)?;
            Ok(ExitStatus::Success)
        }
        Err(AppError::NotFound(_)) => {
            writeln!(out, "[ERROR] IP not found")?;
            Ok(ExitStatus::Failure)
        }
        Err(e) => Err(e),
    }
}

async fn import<W: Write>(
    guard: &IpGuard,
    kind: Option<String>,
    file: Option<&Path>,
    description: Option<String>,
    out: &mut W,
) -> AppResult<ExitStatus> {
    let (kind, file) = required(kind.zip(file), "Type and file are required for import action")?;
    let kind: RuleKind = kind.parse()?;

    let contents = tokio::fs::read_to_string(file).await.map_err(|e| {
        AppError::Validation(format!("Cannot read {}: {}", file.display(), e))
    })?;

    let report = guard.import(kind, &contents, description.as_deref()).await?;
    for skipped in &report.skipped {
        writeln!(
            out,
            "[WARN] line {}: {}",
            skipped.line.unwrap_or_default(),
            skipped.message
        )?;
    }
    writeln!(out, "[OK] Imported {} entries into {}", report.added, kind)?;
    Ok(ExitStatus::Success)
}

async fn check<W: Write>(guard: &IpGuard, ip: &str, out: &mut W) -> AppResult<ExitStatus> {
    let (decision, reason) = guard.explain(ip).await?;
    writeln!(out, "{}: {} ({})", ip.trim(), decision.as_str(), reason.as_str())?;
    Ok(ExitStatus::Success)
}

/// Render rows as a boxed, left-aligned table.
fn write_table<W: Write>(out: &mut W, headers: &[&str], rows: &[Vec<String>]) -> std::io::Result<()> {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (w, cell) in widths.iter_mut().zip(row) {
            *w = (*w).max(cell.chars().count());
        }
    }

    let border = widths
        .iter()
        .map(|w| "-".repeat(w + 2))
        .collect::<Vec<_>>()
        .join("+");
    let border = format!("+{}+", border);

    writeln!(out, "{}", border)?;
    writeln!(out, "{}", table_line(headers.iter().copied(), &widths))?;
    writeln!(out, "{}", border)?;
    for row in rows {
        writeln!(out, "{}", table_line(row.iter().map(String::as_str), &widths))?;
    }
    writeln!(out, "{}", border)?;
    Ok(())
}

fn table_line<'a>(cells: impl Iterator<Item = &'a str>, widths: &[usize]) -> String {
    let inner = cells
        .zip(widths)
        .map(|(c, w)| format!(" {:<width$} ", c, width = *w))
        .collect::<Vec<_>>()
        .join("|");
    format!("|{}|", inner)
}
