//! Line-oriented output for `--plain` and non-interactive use

use tokio::sync::watch;

use crate::api::{QueueJob, QueueState, SystemStats};
use crate::batch::{format_metrics, ItemStatus, RunProgress, RunSummary};
use crate::db::{BatchRunItemRecord, BatchRunRecord};
use crate::fleet::FleetStatus;

use super::animations::ProgressBar;
use super::theme::Icons;

/// Lines describing what changed between two snapshots of the same run
pub fn describe_changes(prev: &RunProgress, next: &RunProgress) -> Vec<String> {
    let total = next.total();
    let mut lines = Vec::new();

    for (index, entry) in next.items.iter().enumerate() {
        let before = prev.items.get(index).map(|e| &e.status);
        if before == Some(&entry.status) {
            continue;
        }
        let position = format!("[{}/{}]", index + 1, total);
        match &entry.status {
            ItemStatus::Pending => {}
            ItemStatus::Running => {
                lines.push(format!("{} {} {}", position, Icons::ARROW_RIGHT, entry.item.label))
            }
            ItemStatus::Success { metrics } if metrics.is_empty() => {
                lines.push(format!("{} {} {}", position, Icons::SUCCESS, entry.item.label))
            }
            ItemStatus::Success { metrics } => lines.push(format!(
                "{} {} {} ({})",
                position,
                Icons::SUCCESS,
                entry.item.label,
                format_metrics(metrics)
            )),
            ItemStatus::Failure { reason } => lines.push(format!(
                "{} {} {}: {}",
                position,
                Icons::ERROR,
                entry.item.label,
                reason
            )),
        }
    }

    lines
}

/// Print progress lines until the run reports it has finished
pub async fn follow_run(mut rx: watch::Receiver<RunProgress>) {
    let mut last = RunProgress::default();
    loop {
        let current = rx.borrow_and_update().clone();
        // a fresh run restarts from all-pending
        if current.started_at != last.started_at {
            last = RunProgress::pending(&[]);
        }
        for line in describe_changes(&last, &current) {
            println!("{}", line);
        }
        if current.finished_at.is_some() {
            break;
        }
        last = current;
        if rx.changed().await.is_err() {
            break;
        }
    }
}

pub fn summary_lines(summary: &RunSummary) -> Vec<String> {
    let mut bar = ProgressBar::new(30);
    bar.set_percent(summary.progress.percent_complete());
    let elapsed = (summary.finished_at - summary.started_at).num_seconds();

    let mut lines = vec![
        bar.render(),
        format!(
            "{} ok: {}  falhas: {}  não processados: {}  total: {}  ({}s)",
            if summary.cancelled { "cancelado." } else { "concluído." },
            summary.succeeded,
            summary.failed,
            summary.skipped,
            summary.total,
            elapsed
        ),
    ];
    for entry in &summary.progress.items {
        if let ItemStatus::Failure { reason } = &entry.status {
            lines.push(format!("  {} {} ({}): {}", Icons::ERROR, entry.item.label, entry.item.id, reason));
        }
    }
    lines
}

pub fn fleet_lines(status: &FleetStatus, log_tail: usize) -> Vec<String> {
    let mut lines = vec![format!(
        "global: {}  em execução: {}  erros: {}  salvos: {}/{}",
        status.global_status,
        status.running_units(),
        status.failed_units(),
        status.total_saved(),
        status.total_found()
    )];

    for unit in &status.units {
        let mut bar = ProgressBar::new(10);
        bar.set_percent(unit.progress_percent);
        let mut line = format!(
            "  {} {:<14} {:<10} {} {}/{}",
            Icons::unit(unit.status),
            unit.unit_name,
            unit.status.to_string(),
            bar.render(),
            unit.saved_count,
            unit.found_count
        );
        if let Some(message) = unit.message.as_deref().filter(|m| !m.is_empty()) {
            line.push_str("  ");
            line.push_str(message);
        }
        lines.push(line);
    }

    let start = status.recent_log_lines.len().saturating_sub(log_tail);
    for log in &status.recent_log_lines[start..] {
        lines.push(format!("  | {}", log));
    }
    lines
}

pub fn history_lines(runs: &[BatchRunRecord]) -> Vec<String> {
    if runs.is_empty() {
        return vec!["nenhuma execução registrada".to_string()];
    }
    runs.iter()
        .map(|run| {
            format!(
                "{}  {:<9}  {}  ok {:>3}  falhas {:>3}  pulados {:>3}  total {:>3}{}",
                run.id,
                run.job,
                run.finished_at,
                run.succeeded,
                run.failed,
                run.skipped,
                run.total,
                if run.cancelled { "  (cancelado)" } else { "" }
            )
        })
        .collect()
}

pub fn run_item_lines(items: &[BatchRunItemRecord]) -> Vec<String> {
    items
        .iter()
        .map(|item| {
            let detail = match (item.is_success(), &item.reason) {
                (true, _) => format_metrics(&item.metrics()),
                (false, Some(reason)) => reason.clone(),
                (false, None) => String::new(),
            };
            format!(
                "{:>3}. {:<8} {} ({})  {}",
                item.position + 1,
                item.status,
                item.label,
                item.item_id,
                detail
            )
            .trim_end()
            .to_string()
        })
        .collect()
}

pub fn stats_lines(stats: &SystemStats) -> Vec<String> {
    fn or_dash<T: ToString>(value: &Option<T>) -> String {
        value.as_ref().map_or_else(|| "—".to_string(), T::to_string)
    }
    vec![format!(
        "API: {}  banco: {}  jobs ativos: {}  jobs falhados: {}",
        or_dash(&stats.api_status),
        or_dash(&stats.db_status),
        or_dash(&stats.active_jobs),
        or_dash(&stats.failed_jobs)
    )]
}

pub fn queue_lines(state: QueueState, jobs: &[QueueJob]) -> Vec<String> {
    if jobs.is_empty() {
        return vec![format!("nenhum job em '{}'", state)];
    }
    jobs.iter()
        .map(|job| {
            let mut line = format!(
                "{:<12} {:<24} {:<10} tentativas {:>2}",
                job.id, job.name, job.status, job.attempts_made
            );
            if let Some(reason) = job.failed_reason.as_deref().filter(|r| !r.is_empty()) {
                line.push_str("  ");
                line.push_str(Icons::ERROR);
                line.push(' ');
                line.push_str(reason);
            }
            line
        })
        .collect()
}
