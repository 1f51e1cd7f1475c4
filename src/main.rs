use std::env;
use std::path::PathBuf;
use std::process;
use std::time::Duration;

use clap::Parser;
use log::{error, info};

use projedit::commands::{self, Command};
use projedit::context::{EditContext, PROJECT_ENV, ProbeSettings};
use projedit::logging;

#[derive(Parser, Debug)]
#[command(name = "projedit", version, about = "Edit .csproj and .sln files from the command line")]
struct Cli {
    /// Working directory (defaults to the current directory)
    #[arg(long, global = true)]
    dir: Option<PathBuf>,

    /// Project file to edit (defaults to $PROJEDIT_PROJECT, then the only *.csproj)
    #[arg(long, global = true)]
    project: Option<PathBuf>,

    /// Solution file (defaults to the only *.sln)
    #[arg(long, global = true)]
    solution: Option<PathBuf>,

    /// Read assembly identities in this process instead of a child process
    #[arg(long, global = true)]
    in_process_probe: bool,

    /// Seconds before a child probe is killed
    #[arg(long, global = true, default_value_t = 10)]
    probe_timeout: u64,

    #[command(subcommand)]
    command: Command,
}

fn build_context(cli: &Cli) -> std::io::Result<EditContext> {
    let working_dir = match &cli.dir {
        Some(dir) => dir.clone(),
        None => env::current_dir()?,
    };
    let project = cli
        .project
        .clone()
        .or_else(|| env::var_os(PROJECT_ENV).map(PathBuf::from));

    Ok(EditContext::new(working_dir, project, cli.solution.clone()).with_probe(ProbeSettings {
        isolated: !cli.in_process_probe,
        timeout: Duration::from_secs(cli.probe_timeout),
    }))
}

fn main() {
    let cli = Cli::parse();

    // A missing log file must not stop an edit
    if let Err(e) = logging::init_logger() {
        eprintln!("Failed to initialize logger: {}", e);
    }
    info!("projedit starting: {:?}", cli);

    let ctx = match build_context(&cli) {
        Ok(ctx) => ctx,
        Err(e) => {
            eprintln!("Cannot determine working directory: {}", e);
            process::exit(1);
        }
    };

    match commands::run(&ctx, cli.command) {
        Ok(response) => {
            let text = response.text();
            if !text.is_empty() {
                println!("{}", text);
            }
            process::exit(response.exit_code);
        }
        Err(e) => {
            error!("Command failed: {}", e);
            eprintln!("{}", e);
            process::exit(1);
        }
    }
}
