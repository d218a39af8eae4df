use clap::{ArgAction, Parser};
use jira_testgen::config::{Config, get_config_dir, show_config};
use jira_testgen::logging::{self, LogLevel};
use jira_testgen::pipeline::{Pipeline, RunOptions};
use jira_testgen::{Result, TestGenError};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{debug, error};

#[derive(Parser, Debug)]
#[command(name = "jira-testgen")]
#[command(about = "utility for generating test cases from jira tickets")]
#[command(version, disable_version_flag = true)]
#[command(arg = clap::Arg::new("version")
    .short('v')
    .long("version")
    .action(ArgAction::Version)
    .help("Print version"))]
struct Cli {
    /// The jira ticket id
    #[arg(short, long, value_name = "ticket", required_unless_present = "show_config")]
    ticket: Option<String>,

    /// The model to use for generating code
    #[arg(short, long, value_name = "model")]
    model: Option<String>,

    /// The output folder
    #[arg(short, long, value_name = "folder")]
    output_folder: Option<PathBuf>,

    /// Set the log level
    #[arg(short, long, value_enum, default_value_t = LogLevel::Info)]
    log_level: LogLevel,

    /// The number of helper methods to query for
    #[arg(short = 'H', long, value_name = "methods")]
    helper_methods: Option<usize>,

    /// The jira ticket qa field
    #[arg(short, long, value_name = "field")]
    field: Option<String>,

    /// Do not generate code
    #[arg(long, conflicts_with = "no_test_cases")]
    no_code: bool,

    /// Do not generate test cases
    #[arg(long)]
    no_test_cases: bool,

    /// Split test cases and code into separate files
    #[arg(short, long)]
    split: bool,

    /// Read config.toml from this directory instead of the user config dir
    #[arg(long, value_name = "dir")]
    config_dir: Option<PathBuf>,

    /// Print the effective configuration and exit
    #[arg(long)]
    show_config: bool,
}

impl Cli {
    fn run_options(&self) -> Result<RunOptions> {
        let ticket = self
            .ticket
            .clone()
            .ok_or_else(|| TestGenError::InvalidInput("a ticket id is required".to_string()))?;

        Ok(RunOptions {
            ticket,
            field: self.field.clone(),
            model: self.model.clone(),
            output_folder: self.output_folder.clone(),
            helper_methods: self.helper_methods,
            no_test_cases: self.no_test_cases,
            no_code: self.no_code,
            split: self.split,
        })
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.log_level);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    let config_dir = match &cli.config_dir {
        Some(dir) => dir.clone(),
        None => get_config_dir()?,
    };
    debug!("Loading configuration from {}", config_dir.display());
    let config = Config::load_with_env(&config_dir)?;

    if cli.show_config {
        show_config(&config);
        return Ok(());
    }

    let options = cli.run_options()?;
    let pipeline = Pipeline::from_config(config, &options)?;
    pipeline.run(&options)?;

    Ok(())
}
