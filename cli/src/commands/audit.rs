use colored::*;
use swanwatch_common::config::{Config, RunOptions};
use swanwatch_core::inventory::InventoryClient;
use swanwatch_core::prober::Prober;
use swanwatch_core::remediation::SshTerminator;
use swanwatch_core::{AuditSummary, run_audit};
use tracing::{Instrument, info_span, warn};
use tracing_indicatif::span_ext::IndicatifSpanExt;

use crate::terminal::{colors, format, print};

pub async fn audit(cfg: &Config, options: RunOptions, q_level: u8) -> anyhow::Result<()> {
    let inventory = InventoryClient::new(cfg)?;
    let prober = Prober::ping(&cfg.probe);
    let mut terminator = SshTerminator::new(cfg);

    let span = info_span!("audit", indicatif.pb_show = true);
    span.pb_set_message("Auditing tunnels...");

    let summary: AuditSummary = run_audit(cfg, options, &inventory, &prober, &mut terminator)
        .instrument(span)
        .await?;

    audit_ends(&summary, q_level);
    Ok(())
}

fn audit_ends(summary: &AuditSummary, q_level: u8) {
    if summary.statuses.is_empty() {
        print::header("zero tunnels found", q_level);
        print::no_results();
        return;
    }

    if q_level < 2 {
        print::header("tunnel status", q_level);
        print_tunnels(summary);
    }
    print_remediation(summary, q_level);
    print_summary(summary);
}

fn print_tunnels(summary: &AuditSummary) {
    for (idx, status) in summary.statuses.iter().enumerate() {
        print::tree_head(idx, &status.company);
        print::as_tree_one_level(format::status_details(status));
        if idx + 1 != summary.statuses.len() {
            print::blank();
        }
    }
}

fn print_remediation(summary: &AuditSummary, q_level: u8) {
    let Some(remediation) = &summary.remediation else {
        return;
    };

    print::header("remediation", q_level);
    for uuid in &remediation.terminated {
        print::print_status(format!("{} {}", "terminated".color(colors::ONLINE), uuid));
    }
    for (uuid, e) in &remediation.failed {
        warn!("{uuid}: {e}");
    }
}

fn print_summary(summary: &AuditSummary) {
    let online: ColoredString = format!("{} online", summary.online()).bold().green();
    let offline: ColoredString = format!("{} offline", summary.offline()).bold().red();
    let remediated: usize = summary
        .remediation
        .as_ref()
        .map_or(0, |r| r.terminated.len());
    let remediated: ColoredString = format!("{remediated} remediated").bold().yellow();
    let total_time: ColoredString = format!("{:.2}s", summary.elapsed.as_secs_f64())
        .bold()
        .yellow();
    let output: String = format!(
        "{online}, {offline}, {remediated} in {total_time}"
    );

    print::fat_separator();
    print::centerln(&output);
    print::print_status(format!("Report written to {}", summary.report_path.display()));
}
