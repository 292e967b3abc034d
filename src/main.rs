use std::io;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use log::debug;

mod config;
mod console;
mod datetime;
mod duration;
mod error;
mod logging;
mod period;
mod project;
mod report;
mod report_command;
mod slip;
mod store;
mod tracker;

use config::Config;
use console::{ConsoleAgenda, ConsolePresenter, ConsoleReportCard};
use duration::Duration;
use report_command::{ReportArgs, ReportCommand};
use store::FileStore;
use tracker::Tracker;

/// プロジェクト・タスクごとの作業時間を記録するCLIアプリケーション。
///
/// # Examples
/// ```
/// $ cargo run -- start MyProject.Design
/// $ cargo run -- pause
/// $ cargo run -- adjust -n 15m
/// $ cargo run -- done "Sketched the landing page"
/// $ cargo run -- report -p w
/// ```
#[derive(Debug, Parser)]
#[clap(version, about)]
struct Args {
    #[clap(
        short = 'v',
        long = "verbose",
        global = true,
        parse(from_occurrences),
        help = "Increase logging verbosity (-v, -vv, -vvv)"
    )]
    verbose: u64,

    #[clap(subcommand)]
    subcommand: SubCommands,
}

/// サブコマンドを表す列挙型。
#[derive(Debug, Subcommand)]
enum SubCommands {
    /// Start a new timeslip for `Project` or `Project.Task` (`.Task` uses the current project)
    #[clap(alias = "s")]
    Start { name: String },

    /// Pause the timeslip in progress
    #[clap(alias = "p")]
    Pause,

    /// Resume a paused timeslip
    #[clap(alias = "r")]
    Resume,

    /// Adjust +/- the time worked on the pending timeslip
    Adjust(AdjustArgs),

    /// Mark the pending timeslip as completed
    #[clap(alias = "d")]
    Done { description: String },

    /// Delete the pending timeslip without saving it
    Delete,

    /// Complete the pending timeslip and start a new one
    #[clap(alias = "sw")]
    Switch { name: String },

    /// Set or show the current project
    #[clap(alias = "pr")]
    Project { name: Option<String> },

    /// Show the time worked per project, or per task for a single project
    Report(ReportArgs),

    /// Show the time worked as a Mermaid gantt chart
    Agenda(ReportArgs),
}

/// `adjust`サブコマンドの引数。
///
/// `-75m`のような負の時間を受け取るため、時間の位置引数はハイフンで始まる値も受け付ける。
/// その場合は`-n`も値として渡されるので、`delta`で取り除く。
#[derive(Debug, clap::Args)]
struct AdjustArgs {
    #[clap(
        required = true,
        allow_hyphen_values = true,
        multiple_values = true,
        value_name = "DURATION",
        help = "Duration such as 72m, 2h or 130s; a leading '-' subtracts"
    )]
    duration: Vec<String>,

    #[clap(short = 'n', long = "negative", help = "Subtract the duration")]
    negative: bool,
}

impl AdjustArgs {
    /// 調整する時間を返す。`--negative`が指定された場合は減算する。
    fn delta(&self) -> Result<Duration> {
        let (flags, values): (Vec<&str>, Vec<&str>) = self
            .duration
            .iter()
            .map(String::as_str)
            .partition(|value| NEGATIVE_FLAGS.contains(value));

        let input = match values.as_slice() {
            [input] => *input,
            _ => bail!("Expected exactly one duration, got {}", values.len()),
        };
        let duration: Duration = input
            .parse()
            .with_context(|| format!("Invalid duration: {}", input))?;

        let negative = self.negative || !flags.is_empty();
        if negative && duration.to_seconds() > 0 {
            Ok(Duration::from_seconds(-duration.to_seconds()))
        } else {
            Ok(duration)
        }
    }
}

const NEGATIVE_FLAGS: [&str; 2] = ["-n", "--negative"];

fn main() -> Result<()> {
    let args = Args::parse();
    logging::setup(args.verbose)?;

    let config = Config::from_env().context("Failed to resolve the data directory")?;
    config.ensure_layout()?;
    debug!("Using data directory {}", config.data_dir().display());

    let store = FileStore::new(config);
    let tracker = Tracker::new(&store);

    match args.subcommand {
        SubCommands::Start { name } => println!("{}", tracker.start(&name)?),
        SubCommands::Pause => println!("{}", tracker.pause()?),
        SubCommands::Resume => println!("{}", tracker.resume()?),
        SubCommands::Adjust(adjust) => println!("{}", tracker.adjust_pending(&adjust.delta()?)?),
        SubCommands::Done { description } => println!("{}", tracker.done(&description)?),
        SubCommands::Delete => {
            tracker.delete()?;
            println!("Deleted!");
        }
        SubCommands::Switch { name } => println!("{}", tracker.switch(&name)?),
        SubCommands::Project { name: Some(name) } => {
            tracker.set_current_project(&name)?;
            println!("Project set to: {}", name);
        }
        SubCommands::Project { name: None } => match tracker.current_project()? {
            Some(project) => println!("Current project: {}", project),
            None => println!("No project set"),
        },
        SubCommands::Report(report) => {
            let report = ReportCommand::new(&store).run(report)?;
            let mut stdout = io::stdout().lock();
            ConsoleReportCard::new(&mut stdout).show_report(&report)?;
        }
        SubCommands::Agenda(report) => {
            let report = ReportCommand::new(&store).run(report)?;
            let mut stdout = io::stdout().lock();
            ConsoleAgenda::new(&mut stdout).show_report(&report)?;
        }
    }

    Ok(())
}
