mod cmd;
mod tax;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "kitetax",
    version,
    about = "Classify crypto wallet transactions and estimate tax due (US, Singapore)"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Classify each transaction as taxable or not
    Classify(cmd::classify::ClassifyCommand),
    /// Totals, taxable amount and flat-rate tax due
    Summary(cmd::summary::SummaryCommand),
    /// List transactions the rules could not classify cleanly
    Validate(cmd::validate::ValidateCommand),
    /// Interactive HTML report
    Html(cmd::html_report::HtmlCommand),
    /// Print the expected input formats
    Schema(cmd::schema::SchemaCommand),
    /// Show a saved FIFO/LIFO/HIFO strategy comparison
    Strategies(cmd::strategies::StrategiesCommand),
    /// Show the outcome of a saved tax settlement
    Settlement(cmd::settlement::SettlementCommand),
}

fn main() -> anyhow::Result<()> {
    pretty_env_logger::init();

    let cli = Cli::parse();
    match cli.command {
        Command::Classify(cmd) => cmd.exec(),
        Command::Summary(cmd) => cmd.exec(),
        Command::Validate(cmd) => cmd.exec(),
        Command::Html(cmd) => cmd.exec(),
        Command::Schema(cmd) => cmd.exec(),
        Command::Strategies(cmd) => cmd.exec(),
        Command::Settlement(cmd) => cmd.exec(),
    }
}
