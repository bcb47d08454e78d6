//! Human-readable run report

use std::fmt::Write as _;

use keyrot_rotation::orchestrator::RunReport;
use keyrot_rotation::rotation::RotationOutcome;

/// One line per profile plus a summary line
pub fn render_text(report: &RunReport) -> String {
    let mut out = String::new();

    if report.profiles.is_empty() {
        out.push_str("no rotatable profiles selected\n");
        return out;
    }

    let width = report
        .profiles
        .iter()
        .map(|p| p.profile.len())
        .max()
        .unwrap_or(0);

    for entry in &report.profiles {
        let marker = match &entry.outcome {
            RotationOutcome::Rotated { .. } => "ok",
            RotationOutcome::Planned { .. } => "plan",
            RotationOutcome::NoActionPossible { .. } => "skip",
            RotationOutcome::Failed { .. } => "FAIL",
        };
        let _ = writeln!(
            out,
            "{marker:<4} {:<width$}  {}",
            entry.profile, entry.outcome
        );
    }

    let _ = writeln!(
        out,
        "\n{} rotated, {} failed, {} total",
        report.rotated_count(),
        report.failed_count(),
        report.profiles.len()
    );
    out
}
