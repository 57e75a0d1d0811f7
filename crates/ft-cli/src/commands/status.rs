//! The `status` command: show pending usage from the local ledger.

use anyhow::{Context, Result};

use ft_core::UsageEntry;
use ft_store::LedgerStore;

use crate::Config;

const BAR_WIDTH: usize = 30;

/// Prints the pending (not yet flushed) ledger.
pub fn run(config: &Config, json: bool) -> Result<()> {
    let store = LedgerStore::open(&config.ledger_path).with_context(|| {
        format!("failed to open ledger at {}", config.ledger_path.display())
    })?;
    let entries = sorted_entries(store.load_ledger().context("failed to load ledger")?);

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    if entries.is_empty() {
        println!("No pending usage.");
        return Ok(());
    }

    println!("Pending usage (not yet flushed):\n");
    print!("{}", render(&entries));
    Ok(())
}

/// Sorts ledger entries by minutes descending, name ascending on ties.
fn sorted_entries(entries: std::collections::HashMap<String, f64>) -> Vec<UsageEntry> {
    let mut entries: Vec<UsageEntry> = entries
        .into_iter()
        .map(|(domain, minutes)| UsageEntry { domain, minutes })
        .collect();
    entries.sort_by(|a, b| {
        b.minutes
            .partial_cmp(&a.minutes)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.domain.cmp(&b.domain))
    });
    entries
}

/// Renders entries as a ranked table with proportional bars.
fn render(entries: &[UsageEntry]) -> String {
    let max = entries
        .iter()
        .map(|e| e.minutes)
        .fold(1.0_f64, f64::max);

    let mut out = String::new();
    for entry in entries {
        out.push_str(&format!(
            "{:<20} {} {}\n",
            entry.domain,
            bar(entry.minutes, max),
            format_minutes(entry.minutes),
        ));
    }
    out
}

/// Draws a bar proportional to `value / max`, at least one cell when the
/// value is positive.
fn bar(value: f64, max: f64) -> String {
    #[expect(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss,
        reason = "bar length is tiny and non-negative"
    )]
    let mut len = ((value / max) * BAR_WIDTH as f64) as usize;
    if len < 1 && value > 0.0 {
        len = 1;
    }
    "▇".repeat(len)
}

/// Formats minutes as `Xh Ym`, or just `Ym` under an hour.
fn format_minutes(minutes: f64) -> String {
    #[expect(
        clippy::cast_possible_truncation,
        reason = "rounded minute totals fit comfortably in i64"
    )]
    let total = minutes.round() as i64;
    let hours = total / 60;
    let mins = total % 60;
    if hours > 0 {
        format!("{hours}h {mins}m")
    } else {
        format!("{mins}m")
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn formats_minutes_with_and_without_hours() {
        assert_eq!(format_minutes(0.2), "0m");
        assert_eq!(format_minutes(22.4), "22m");
        assert_eq!(format_minutes(59.6), "1h 0m");
        assert_eq!(format_minutes(65.0), "1h 5m");
    }

    #[test]
    fn bar_scales_and_never_vanishes_for_positive_values() {
        assert_eq!(bar(65.0, 65.0).chars().count(), 30);
        assert_eq!(bar(0.01, 65.0).chars().count(), 1);
        assert_eq!(bar(0.0, 65.0).chars().count(), 0);
    }

    #[test]
    fn entries_sort_by_minutes_descending() {
        let mut map = HashMap::new();
        map.insert("docs.rs".to_string(), 22.4);
        map.insert("github.com".to_string(), 65.0);
        map.insert("foo.com".to_string(), 22.4);

        let sorted = sorted_entries(map);
        let domains: Vec<&str> = sorted.iter().map(|e| e.domain.as_str()).collect();
        assert_eq!(domains, vec!["github.com", "docs.rs", "foo.com"]);
    }

    #[test]
    fn renders_ranked_table() {
        let entries = vec![
            UsageEntry {
                domain: "github.com".into(),
                minutes: 65.0,
            },
            UsageEntry {
                domain: "docs.rs".into(),
                minutes: 22.4,
            },
        ];
        insta::assert_snapshot!(render(&entries), @r"
        github.com           ▇▇▇▇▇▇▇▇▇▇▇▇▇▇▇▇▇▇▇▇▇▇▇▇▇▇▇▇▇▇ 1h 5m
        docs.rs              ▇▇▇▇▇▇▇▇▇▇ 22m
        ");
    }
}
