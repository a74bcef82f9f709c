//! Human-readable run report

use crate::harness::RunSummary;
use std::fmt::Write;

const RULE_WIDTH: usize = 80;

/// Render the final summary as printed by the CLI
pub fn render(summary: &RunSummary) -> String {
    let rule = "=".repeat(RULE_WIDTH);
    let mut out = String::new();

    let _ = writeln!(out, "{}", rule);
    let _ = writeln!(out, "Self-Match Verification Summary (seed {})", summary.seed);
    let _ = writeln!(out, "{}", rule);

    let ingestion = &summary.ingestion;
    let _ = writeln!(
        out,
        "Ingestion: added {} of {} identities, {} failures, took {:.2} seconds",
        ingestion.succeeded,
        summary.generated,
        ingestion.failed(),
        ingestion.elapsed.as_secs_f64()
    );

    let settle = &summary.settle;
    let _ = writeln!(
        out,
        "Settle:    waited {:.2} seconds{}",
        settle.waited.as_secs_f64(),
        if settle.converged {
            ""
        } else {
            " (gave up polling before every identity self-matched)"
        }
    );
    let _ = writeln!(out);

    for outcome in &summary.outcomes {
        let mark = if outcome.passed { "PASS" } else { "FAIL" };
        let _ = write!(out, "[{}] {}", mark, outcome.queried_identity);
        if let (Some(name), Some(score)) = (&outcome.top_match_name, outcome.top_score) {
            let _ = write!(out, " -> {} ({:.6})", name, score);
        }
        if let Some(reason) = &outcome.failure {
            let _ = write!(out, ": {}", reason);
        }
        let _ = writeln!(out);
        for (rank, runner_up) in outcome.runners_up.iter().enumerate() {
            let _ = writeln!(
                out,
                "         #{} {} ({:.6})",
                rank + 1,
                runner_up.identity_name,
                runner_up.similarity_score
            );
        }
    }

    if !summary.probes.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "Probes:");
        for probe in &summary.probes {
            let mark = if probe.passed { "PASS" } else { "FAIL" };
            let _ = writeln!(out, "[{}] {}: {}", mark, probe.name, probe.detail);
        }
    }

    let _ = writeln!(out, "{}", rule);
    let _ = writeln!(
        out,
        "Test Summary: {}/{} tests passed",
        summary.verified_passed(),
        summary.sampled()
    );
    if summary.sampled() == 0 {
        let _ = writeln!(out, "NO TESTS RUN: no identities were sampled");
    } else if summary.verified_failed() == 0 {
        let _ = writeln!(
            out,
            "ALL TESTS PASSED: the service identifies every sampled identity as most similar to itself"
        );
    } else {
        let _ = writeln!(
            out,
            "{} TESTS FAILED: the service has issues identifying identities",
            summary.verified_failed()
        );
    }
    if ingestion.failed() > 0 {
        let _ = writeln!(out, "{} ingestion failures", ingestion.failed());
    }
    if summary.probes_failed() > 0 {
        let _ = writeln!(out, "{} probe failures", summary.probes_failed());
    }
    let _ = write!(out, "{}", rule);
    out
}
