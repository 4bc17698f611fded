//! asyncro - parallel suite runner for Robot Framework style engines
//!
//! Everything on the command line except `--n[=<count>]` is engine syntax
//! and is forwarded to the dry run and to every suite process.

use asyncro::cli::Invocation;
use asyncro::common::config::Config;
use asyncro::common::logging;
use asyncro::runner;
use clap::Parser;

#[derive(Parser)]
#[command(name = "asyncro", about = "Run test suites in parallel and merge their results")]
#[command(version, long_about = None, disable_version_flag = true)]
struct Cli {
    /// Print version
    // `-V` belongs to the engine (--variablefile)
    #[allow(dead_code)]
    #[arg(long, action = clap::ArgAction::Version)]
    version: Option<bool>,

    /// [--n[=<count>]] [engine options...] <datasource>...
    #[arg(
        value_name = "ARGS",
        trailing_var_arg = true,
        allow_hyphen_values = true
    )]
    args: Vec<String>,
}

#[tokio::main]
async fn main() {
    logging::init_cli();

    let cli = Cli::parse();

    match run(cli.args).await {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}

async fn run(args: Vec<String>) -> asyncro::Result<i32> {
    let workdir = std::env::current_dir()?;
    let config = Config::load(&workdir)?;
    let invocation = Invocation::parse(args, &config.run)?;
    let summary = runner::run(invocation, &config, &workdir).await?;
    Ok(summary.exit_code())
}
