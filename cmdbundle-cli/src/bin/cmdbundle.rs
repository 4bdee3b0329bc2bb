use clap::{Parser, Subcommand};
use cmdbundle_cli::session::{self, Session, SessionArgs};
use cmdbundle_core::directive::parse_directive;
use cmdbundle_core::eval::evaluate_expression;
use cmdbundle_core::resolver::replace_math;
use cmdbundle_core::{Error, InternalResult};
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to engine config file
    #[arg(short, long, default_value = "config.yml", global = true)]
    config: PathBuf,

    /// Path to the bundle catalogue
    #[arg(
        short,
        long,
        default_value = "commands.yml",
        env = "CMDBUNDLE_BUNDLES",
        global = true
    )]
    bundles: PathBuf,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Invoke a bundle from the catalogue
    Run(RunArgs),

    /// Run raw directive lines without a catalogue
    Exec(ExecArgs),

    /// Show how a directive is parsed
    Parse {
        directive: String,
    },

    /// Evaluate a math or range expression, or a text with `{math:...}` tokens
    Math {
        expression: String,
    },

    /// List the bundles in the catalogue
    List,
}

#[derive(Parser)]
struct RunArgs {
    /// Bundle name
    bundle: String,

    /// Arguments passed to the bundle (use `--` before arguments starting with `-`)
    args: Vec<String>,

    #[command(flatten)]
    session: SessionArgs,
}

#[derive(Parser)]
struct ExecArgs {
    /// Directive lines, run in order
    #[arg(required = true)]
    directives: Vec<String>,

    /// Invocation argument (repeatable)
    #[arg(short, long = "arg")]
    args: Vec<String>,

    #[command(flatten)]
    session: SessionArgs,
}

async fn run(cli: &Cli) -> InternalResult<()> {
    match &cli.command {
        Commands::Run(args) => {
            let config = session::load_config(&cli.config)?;
            let catalog = session::load_catalog(&cli.bundles)?;
            debug!(bundles = catalog.len(), "catalogue loaded");
            let session = Session::new(config, &args.session)?;
            session.run_bundle(&catalog, &args.bundle, &args.args).await
        }
        Commands::Exec(args) => {
            let config = session::load_config(&cli.config)?;
            let session = Session::new(config, &args.session)?;
            session.run_directives(&args.directives, &args.args).await;
            Ok(())
        }
        Commands::Parse { directive } => {
            let parsed = parse_directive(directive);
            let output = serde_json::to_string_pretty(&parsed)
                .map_err(|e| Error::internal(format!("JSON serialization error: {}", e)))?;
            println!("{}", output);
            Ok(())
        }
        Commands::Math { expression } => {
            if expression.contains("{math:") {
                println!("{}", replace_math(expression));
            } else {
                println!("{}", evaluate_expression(expression));
            }
            Ok(())
        }
        Commands::List => {
            let catalog = session::load_catalog(&cli.bundles)?;
            for name in catalog.names() {
                println!("{}", name);
            }
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into())
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(e) = run(&cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
