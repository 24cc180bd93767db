use crate::demo::{run_adjudication_demo, run_sections_demo, SectionsArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use trial_curation::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Criteria Curation Service",
    about = "Run the eligibility-criteria curation service from the command line",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Run workflow demos against the in-memory registry
    Demo {
        #[command(subcommand)]
        command: DemoCommand,
    },
}

#[derive(Subcommand, Debug)]
enum DemoCommand {
    /// Walk a staging criterion through save, publish, and accept
    Adjudication,
    /// Render a raw eligibility payload into the six display sections
    Sections(SectionsArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    /// Serve against the seeded in-memory registry instead of the
    /// configured one
    #[arg(long)]
    pub(crate) in_memory: bool,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Demo {
            command: DemoCommand::Adjudication,
        } => run_adjudication_demo().await,
        Command::Demo {
            command: DemoCommand::Sections(args),
        } => run_sections_demo(args),
    }
}
