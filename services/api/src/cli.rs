use crate::demo::{run_demo, run_fee_quote, DemoArgs, FeeQuoteArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use greenland_leasing::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Greenland Leasing Service",
    about = "Run and demonstrate the rental application and payment confirmation service",
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
    /// Inspect the application fee schedule
    Fees {
        #[command(subcommand)]
        command: FeesCommand,
    },
    /// Run an end-to-end demo of the submission and payment pipeline
    Demo(DemoArgs),
}

#[derive(Subcommand, Debug)]
enum FeesCommand {
    /// Quote the application fee for a household
    Quote(FeeQuoteArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Fees {
            command: FeesCommand::Quote(args),
        } => run_fee_quote(args),
        Command::Demo(args) => run_demo(args).await,
    }
}
