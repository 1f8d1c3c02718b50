mod cmd;
mod output;

use clap::{ArgAction, Parser, Subcommand};
use cmd::config::ConfigSubcommand;
use cmd::{GenerateArgs, InputArgs, PackArgs};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "cpack",
    about = "Pack ISM control mappings into AWS Config conformance pack templates",
    version,
    propagate_version = true
)]
struct Cli {
    /// Config file
    #[arg(long, global = true, env = "CPACK_CONFIG", default_value = "cpack.yaml")]
    config: PathBuf,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(long, short = 'v', global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Pack, compile and write conformance pack templates
    Generate {
        #[command(flatten)]
        input: InputArgs,
        #[command(flatten)]
        pack: PackArgs,
        #[command(flatten)]
        output: GenerateArgs,
    },

    /// Show how rules would be split into packs without writing anything
    Plan {
        #[command(flatten)]
        input: InputArgs,
        #[command(flatten)]
        pack: PackArgs,
    },

    /// Show the template identifiers derived from names
    Ident {
        #[arg(required = true)]
        text: Vec<String>,
    },

    /// Show or validate the configuration
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

fn main() {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        _ => tracing::Level::DEBUG,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Generate {
            input,
            pack,
            output,
        } => cmd::generate::run(&cli.config, &input, &pack, &output, cli.json),
        Commands::Plan { input, pack } => cmd::plan::run(&cli.config, &input, &pack, cli.json),
        Commands::Ident { text } => cmd::ident::run(&text, cli.json),
        Commands::Config { subcommand } => cmd::config::run(&cli.config, subcommand, cli.json),
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
