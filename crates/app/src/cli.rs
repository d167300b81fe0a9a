use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use engine::{Money, SortOrder};

#[derive(Debug, Parser)]
#[command(name = "spendbook", version, about = "Monthly expenses against salary")]
pub struct Cli {
    /// Optional config file path (TOML).
    #[arg(long, global = true)]
    pub config: Option<String>,
    /// Override the owner id.
    #[arg(long, global = true)]
    pub owner: Option<String>,
    /// Override timezone (IANA name).
    #[arg(long, global = true)]
    pub timezone: Option<String>,
    /// Override the database: `memory` or a SQLite file path.
    #[arg(long, global = true)]
    pub database: Option<String>,
    #[command(subcommand)]
    pub command: Command,
}

/// Month/year selection; missing parts default to the current month.
#[derive(Debug, Clone, Copy, Args)]
pub struct CursorArgs {
    /// Month number, 1 to 12.
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=12))]
    pub month: Option<u8>,
    #[arg(long)]
    pub year: Option<i32>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Record an expense.
    Add {
        label: String,
        #[arg(value_parser = parse_money)]
        amount: Money,
        #[command(flatten)]
        at: CursorArgs,
    },
    /// List the expenses of a month.
    List {
        #[command(flatten)]
        at: CursorArgs,
        /// newest, oldest, amount-asc or amount-desc.
        #[arg(long, default_value = "newest", value_parser = parse_sort)]
        sort: SortOrder,
    },
    /// Delete an expense by id.
    Remove { id: String },
    /// Read or set the salary of a month.
    Salary {
        #[command(subcommand)]
        action: SalaryAction,
    },
    /// Salary, expenses and balance of a month.
    Summary {
        #[command(flatten)]
        at: CursorArgs,
    },
    /// Twelve-month overview of a year.
    Year {
        #[arg(long)]
        year: Option<i32>,
    },
    /// Expenses attributed to one month of a year.
    Detail {
        #[arg(value_parser = clap::value_parser!(u8).range(1..=12))]
        month: u8,
        #[arg(long)]
        year: Option<i32>,
    },
    /// Follow a month live until interrupted.
    Watch {
        #[command(flatten)]
        at: CursorArgs,
    },
    /// Import a JSON array of expense documents.
    Import { file: PathBuf },
}

#[derive(Debug, Subcommand)]
pub enum SalaryAction {
    Get {
        #[command(flatten)]
        at: CursorArgs,
    },
    Set {
        #[arg(value_parser = parse_money)]
        amount: Money,
        #[command(flatten)]
        at: CursorArgs,
    },
}

fn parse_money(value: &str) -> Result<Money, String> {
    value.parse::<Money>().map_err(|err| err.to_string())
}

fn parse_sort(value: &str) -> Result<SortOrder, String> {
    value.parse::<SortOrder>().map_err(|err| err.to_string())
}
