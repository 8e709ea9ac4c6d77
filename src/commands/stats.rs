//! `stats` and `summary` commands: inspect aggregates from the terminal

use colored::Colorize;
use prettytable::{format, row, Table};

use crate::config::Config;
use crate::error::Result;
use crate::game::{DilemmaStat, GameService, SessionSummary};

/// Print the aggregate statistics for one dilemma
pub fn show_dilemma_stats(config: &Config, dilemma_id: &str, json: bool) -> Result<()> {
    let service = GameService::from_config(config)?;
    let stat = service.dilemma_stats(dilemma_id)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&stat)?);
        return Ok(());
    }

    if stat.total_responses == 0 {
        println!(
            "{}",
            format!("No responses recorded for {} yet.", dilemma_id).yellow()
        );
    }

    println!();
    stats_table(std::slice::from_ref(&stat)).printstd();
    println!();
    Ok(())
}

/// Print what a session has answered, without completing it
pub fn show_session_summary(config: &Config, session_id: &str, json: bool) -> Result<()> {
    let service = GameService::from_config(config)?;
    let summary = service.session_summary(session_id)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    if summary.choices.is_empty() {
        println!(
            "{}",
            format!("Session {} has not recorded any choices.", session_id).yellow()
        );
        return Ok(());
    }

    println!("\nChoices for session {}:", session_id.cyan());
    choices_table(&summary).printstd();
    println!("\nHow everyone else decided:");
    stats_table(&summary.stats).printstd();
    println!();
    Ok(())
}

/// Tabulate dilemma statistics, one row per dilemma
pub fn stats_table(stats: &[DilemmaStat]) -> Table {
    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_BORDERS_ONLY);
    table.set_titles(row![
        "Dilemma".bold(),
        "Responses".bold(),
        "A".bold(),
        "B".bold(),
        "A %".bold(),
        "B %".bold()
    ]);

    for stat in stats {
        table.add_row(row![
            stat.dilemma_id.cyan(),
            stat.total_responses,
            stat.choice_a_count,
            stat.choice_b_count,
            format!("{:.1}", stat.choice_a_percentage),
            format!("{:.1}", stat.choice_b_percentage)
        ]);
    }

    table
}

fn choices_table(summary: &SessionSummary) -> Table {
    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_BORDERS_ONLY);
    table.set_titles(row!["Dilemma".bold(), "Choice".bold(), "Agreeing %".bold()]);

    for choice in &summary.choices {
        table.add_row(row![
            choice.dilemma_id.cyan(),
            choice.choice,
            format!("{:.1}", choice.percentage_same)
        ]);
    }

    table
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stat(dilemma_id: &str, a: u64, b: u64, pa: f64, pb: f64) -> DilemmaStat {
        DilemmaStat {
            dilemma_id: dilemma_id.to_string(),
            total_responses: a + b,
            choice_a_count: a,
            choice_b_count: b,
            choice_a_percentage: pa,
            choice_b_percentage: pb,
        }
    }

    #[test]
    fn test_stats_table_one_row_per_dilemma() {
        let table = stats_table(&[
            stat("trolley", 1, 1, 50.0, 50.0),
            stat("lifeboat", 2, 1, 66.7, 33.3),
        ]);
        assert_eq!(table.len(), 2);

        let rendered = table.to_string();
        assert!(rendered.contains("trolley"));
        assert!(rendered.contains("66.7"));
    }

    #[test]
    fn test_stats_table_formats_whole_percentages_with_decimal() {
        let rendered = stats_table(&[stat("empty", 0, 0, 50.0, 50.0)]).to_string();
        assert!(rendered.contains("50.0"));
    }

    #[test]
    fn test_show_dilemma_stats_against_temp_database() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.storage.database_path =
            Some(dir.path().join("dilemma.db").to_string_lossy().to_string());

        assert!(show_dilemma_stats(&config, "trolley", true).is_ok());
        assert!(show_dilemma_stats(&config, "trolley", false).is_ok());
    }

    #[test]
    fn test_show_session_summary_unknown_session_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.storage.database_path =
            Some(dir.path().join("dilemma.db").to_string_lossy().to_string());

        assert!(show_session_summary(&config, "missing", false).is_err());
    }
}
