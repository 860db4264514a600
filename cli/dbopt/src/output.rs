//! Output formatting for CLI commands.

use colored::Colorize;
use dbopt_reconcile::{ApplyOutcome, ObservedState, TestOutcome};
use serde::Serialize;
use tabled::settings::Style;
use tabled::{Table, Tabled};

/// Output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table format.
    #[default]
    Table,
    /// JSON format.
    Json,
}

#[derive(Tabled)]
struct Field {
    #[tabled(rename = "FIELD")]
    name: &'static str,
    #[tabled(rename = "VALUE")]
    value: String,
}

fn observed_rows(observed: &ObservedState) -> Vec<Field> {
    let row = |name, value: String| Field { name, value };
    vec![
        row("server_name", observed.server_name.clone()),
        row("instance_name", observed.instance_name.clone()),
        row("option_name", observed.option_name.clone()),
        row("option_value", observed.option_value.to_string()),
        row("restart_service", observed.restart_service.to_string()),
        row("restart_timeout_secs", observed.restart_timeout_secs.to_string()),
        row("is_active_node", observed.is_active_node.to_string()),
    ]
}

fn print_json<T: Serialize>(data: &T) {
    match serde_json::to_string_pretty(data) {
        Ok(json) => println!("{json}"),
        Err(e) => eprintln!("{} {e}", "Error:".red().bold()),
    }
}

/// Print an observed state.
pub fn print_observed(observed: &ObservedState, format: OutputFormat) {
    match format {
        OutputFormat::Table => {
            let mut table = Table::new(observed_rows(observed));
            table.with(Style::sharp());
            println!("{table}");
        }
        OutputFormat::Json => print_json(observed),
    }
}

#[derive(Serialize)]
struct TestReport<'a> {
    outcome: TestOutcome,
    in_desired_state: bool,
    observed: &'a ObservedState,
}

/// Print the result of a test.
pub fn print_test(outcome: TestOutcome, observed: &ObservedState, format: OutputFormat) {
    match format {
        OutputFormat::Table => match outcome {
            TestOutcome::Satisfied => print_success(&format!(
                "'{}' is {} as desired.",
                observed.option_name, observed.option_value
            )),
            TestOutcome::Unsatisfied => println!(
                "{} '{}' is {}.",
                "Drift:".yellow().bold(),
                observed.option_name,
                observed.option_value
            ),
            TestOutcome::NotApplicable => print_info(&format!(
                "{} is not the active node for {}; nothing evaluated.",
                observed.server_name, observed.instance_name
            )),
        },
        OutputFormat::Json => print_json(&TestReport {
            outcome,
            in_desired_state: outcome.is_satisfied(),
            observed,
        }),
    }
}

#[derive(Serialize)]
struct ApplyReport<'a> {
    outcome: ApplyOutcome,
    option_name: &'a str,
    option_value: i32,
}

/// Print the result of an apply.
pub fn print_apply(outcome: ApplyOutcome, option_name: &str, value: i32, format: OutputFormat) {
    match format {
        OutputFormat::Table => match outcome {
            ApplyOutcome::NoRestartNeeded => {
                print_success(&format!("Set '{option_name}' to {value}."))
            }
            ApplyOutcome::Restarted => print_success(&format!(
                "Set '{option_name}' to {value} and restarted the instance."
            )),
            ApplyOutcome::RestartRequired => print_warning(&format!(
                "Set '{option_name}' to {value}; restart the instance for it to take effect."
            )),
        },
        OutputFormat::Json => print_json(&ApplyReport {
            outcome,
            option_name,
            option_value: value,
        }),
    }
}

/// Print a success message.
pub fn print_success(message: &str) {
    println!("{} {}", "Success:".green().bold(), message);
}

/// Print an info message.
pub fn print_info(message: &str) {
    println!("{} {}", "Info:".blue().bold(), message);
}

/// Print a warning message.
pub fn print_warning(message: &str) {
    println!("{} {}", "Warning:".yellow().bold(), message);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_observed_rows_cover_every_field() {
        let observed = ObservedState {
            server_name: "SQL01".to_string(),
            instance_name: "MSSQLSERVER".to_string(),
            option_name: "backup compression default".to_string(),
            option_value: 1,
            restart_service: false,
            restart_timeout_secs: 120,
            is_active_node: true,
        };
        let rows = observed_rows(&observed);
        assert_eq!(rows.len(), 7);
        assert_eq!(rows[3].value, "1");

        let table = Table::new(rows).to_string();
        assert!(table.contains("backup compression default"));
    }
}
