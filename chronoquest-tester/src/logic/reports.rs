use std::io::Write;
use std::time::Duration;

use anyhow::Result;
use colored::Colorize;
use serde::Serialize;

use super::simulation::{RunRecord, StrategySummary};

#[derive(Serialize)]
struct JsonReport<'a> {
    summaries: &'a [StrategySummary],
    runs: &'a [RunRecord],
}

#[allow(clippy::cast_precision_loss)]
fn pass_rate(runs: &[RunRecord]) -> f64 {
    if runs.is_empty() {
        return 0.0;
    }
    let passed = runs.iter().filter(|r| r.passed()).count();
    passed as f64 / runs.len() as f64 * 100.0
}

fn losses_line(summary: &StrategySummary) -> String {
    if summary.losses_by_cause.is_empty() {
        return "none".to_string();
    }
    summary
        .losses_by_cause
        .iter()
        .map(|(cause, count)| format!("{cause} {count}"))
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn generate_console_report<W: Write>(
    out: &mut W,
    summaries: &[StrategySummary],
    runs: &[RunRecord],
    total_duration: Duration,
) -> Result<()> {
    writeln!(out)?;
    writeln!(out, "{}", "📊 Autopilot Results Summary".bright_cyan().bold())?;
    writeln!(out, "{}", "============================".cyan())?;

    let passed = runs.iter().filter(|r| r.passed()).count();
    writeln!(out, "Total runs: {}", runs.len())?;
    writeln!(out, "Clean: {}", passed.to_string().green())?;
    writeln!(out, "With violations: {}", (runs.len() - passed).to_string().red())?;
    writeln!(out, "Clean rate: {:.1}%", pass_rate(runs))?;
    writeln!(out, "Total time: {total_duration:?}")?;
    writeln!(out)?;

    for summary in summaries {
        let status = if summary.violations == 0 {
            "✅ PASS".green()
        } else {
            "❌ FAIL".red()
        };
        writeln!(out, "{} {}", status, summary.strategy.bold())?;
        writeln!(
            out,
            "   Wins: {}/{} ({:.1}%)",
            summary.wins,
            summary.runs,
            summary.win_rate * 100.0
        )?;
        writeln!(out, "   Losses: {}", losses_line(summary))?;
        writeln!(
            out,
            "   Stalled: {}  Turn limit: {}",
            summary.stalled, summary.turn_limited
        )?;
        writeln!(
            out,
            "   Mean turns: {:.1}  Mean flights: {:.1}",
            summary.mean_turns, summary.mean_flights
        )?;
        if !summary.badges_seen.is_empty() {
            let badges: Vec<&str> = summary.badges_seen.iter().map(|b| b.as_str()).collect();
            writeln!(out, "   Badges: {}", badges.join(", "))?;
        }
        writeln!(out)?;
    }

    let failing: Vec<&RunRecord> = runs.iter().filter(|r| !r.passed()).collect();
    if !failing.is_empty() {
        writeln!(out, "{}", "🚨 Invariant Violations".bright_red().bold())?;
        writeln!(out, "{}", "======================".red())?;
        for run in failing {
            writeln!(out, "{} seed {}", run.strategy.bold(), run.seed)?;
            for violation in &run.violations {
                writeln!(out, "     • {}", violation.red())?;
            }
        }
    }
    Ok(())
}

pub fn generate_json_report<W: Write>(
    out: &mut W,
    summaries: &[StrategySummary],
    runs: &[RunRecord],
) -> Result<()> {
    let report = JsonReport { summaries, runs };
    serde_json::to_writer_pretty(&mut *out, &report)?;
    writeln!(out)?;
    Ok(())
}

pub fn generate_markdown_report<W: Write>(
    out: &mut W,
    summaries: &[StrategySummary],
    runs: &[RunRecord],
) -> Result<()> {
    writeln!(out, "# ChronoQuest Autopilot Results\n")?;

    let passed = runs.iter().filter(|r| r.passed()).count();
    writeln!(out, "## Summary\n")?;
    writeln!(out, "- **Total runs**: {}", runs.len())?;
    writeln!(out, "- **Clean**: {passed}")?;
    writeln!(out, "- **With violations**: {}", runs.len() - passed)?;
    writeln!(out, "- **Clean rate**: {:.1}%\n", pass_rate(runs))?;

    writeln!(out, "## Strategies\n")?;
    writeln!(
        out,
        "| Strategy | Runs | Wins | Win rate | Losses | Stalled | Turn limit | Mean turns |"
    )?;
    writeln!(out, "|---|---|---|---|---|---|---|---|")?;
    for summary in summaries {
        writeln!(
            out,
            "| {} | {} | {} | {:.1}% | {} | {} | {} | {:.1} |",
            summary.strategy,
            summary.runs,
            summary.wins,
            summary.win_rate * 100.0,
            losses_line(summary),
            summary.stalled,
            summary.turn_limited,
            summary.mean_turns
        )?;
    }
    writeln!(out)?;

    let failing: Vec<&RunRecord> = runs.iter().filter(|r| !r.passed()).collect();
    if !failing.is_empty() {
        writeln!(out, "## Violations\n")?;
        for run in failing {
            writeln!(out, "### ❌ {} seed {}\n", run.strategy, run.seed)?;
            for violation in &run.violations {
                writeln!(out, "- {violation}")?;
            }
            writeln!(out)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::simulation::{RunEnding, summarize};
    use chronoquest_game::BadgeId;

    fn run(ending: RunEnding, violations: &[&str]) -> RunRecord {
        RunRecord {
            strategy: "cautious".to_string(),
            seed: 7,
            ending,
            turns: 12,
            flights: 10,
            fragments: 5,
            fluxfire: 40,
            credits: 300,
            range: 450,
            rejected_actions: 0,
            badges: vec![BadgeId::new("FIRST_WIN")],
            violations: violations.iter().map(ToString::to_string).collect(),
        }
    }

    #[test]
    fn json_report_has_both_sections() {
        let runs = vec![run(RunEnding::Won, &[])];
        let summaries = summarize(&runs);
        let mut buf = Vec::new();
        generate_json_report(&mut buf, &summaries, &runs).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&buf).unwrap();
        assert_eq!(value["summaries"][0]["wins"], 1);
        assert_eq!(value["runs"][0]["ending"], "won");
    }

    #[test]
    fn markdown_lists_violations() {
        let runs = vec![
            run(RunEnding::Won, &[]),
            run(RunEnding::TrapTimeout, &["turn 3: fragment 2 found twice"]),
        ];
        let summaries = summarize(&runs);
        let mut buf = Vec::new();
        generate_markdown_report(&mut buf, &summaries, &runs).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("# ChronoQuest Autopilot Results"));
        assert!(text.contains("| cautious | 2 | 1 | 50.0% | trap timeout 1 |"));
        assert!(text.contains("- turn 3: fragment 2 found twice"));
    }

    #[test]
    fn console_report_mentions_each_strategy() {
        let runs = vec![run(RunEnding::Stalled, &[])];
        let summaries = summarize(&runs);
        let mut buf = Vec::new();
        generate_console_report(&mut buf, &summaries, &runs, Duration::from_millis(5)).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("cautious"));
        assert!(text.contains("FIRST_WIN"));
        assert!(!text.contains("Invariant Violations"));
    }
}
