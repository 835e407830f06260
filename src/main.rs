use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use payee_reconciler::cli::{
    handle_alias_command, handle_audit_command, handle_cache_command, handle_extract_command,
    handle_links_command, handle_lookup_command, handle_run_command, AliasCommands, CacheCommands,
    RunArgs,
};
use payee_reconciler::config::{ReconPaths, Settings};
use payee_reconciler::storage::Storage;

#[derive(Parser)]
#[command(
    name = "payrec",
    version,
    about = "Reconcile bank-statement transactions against a contact directory",
    long_about = "payrec attaches statement transactions to known contacts using the \
                  (possibly masked) CPF/CNPJ and payee name, resolves unknown companies \
                  through the CNPJ registry, and proposes links between registry names \
                  and contacts for review."
)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug); RUST_LOG takes precedence
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full reconciliation pipeline
    Run(RunArgs),

    /// Look up one CNPJ in the registry (cache first)
    Lookup {
        /// Company identifier, formatted or not
        tax_id: String,
        /// Print the record as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show what the scanner finds in a statement description
    Extract {
        /// Description text
        description: String,
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Alias file operations
    #[command(subcommand)]
    Aliases(AliasCommands),

    /// Rebuild the candidate link report from the registry cache
    Links {
        /// Number of links to print
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Registry cache operations
    #[command(subcommand)]
    Cache(CacheCommands),

    /// Show recent audit log entries
    Audit {
        /// Number of entries to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
        /// Print entries as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show configuration and paths
    Config,

    /// Create the data directories and a default settings file
    Init,
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let paths = ReconPaths::new()?;
    let settings = Settings::load_or_create(&paths)?;

    match cli.command {
        Some(Commands::Run(args)) => {
            let storage = Storage::new(paths)?;
            handle_run_command(&storage, &settings, args)?;
        }
        Some(Commands::Lookup { tax_id, json }) => {
            let storage = Storage::new(paths)?;
            handle_lookup_command(&storage, &settings, &tax_id, json)?;
        }
        Some(Commands::Extract { description, json }) => {
            handle_extract_command(&description, json)?;
        }
        Some(Commands::Aliases(cmd)) => {
            let storage = Storage::new(paths)?;
            handle_alias_command(&storage, &settings, cmd)?;
        }
        Some(Commands::Links { limit }) => {
            let storage = Storage::new(paths)?;
            handle_links_command(&storage, &settings, limit)?;
        }
        Some(Commands::Cache(cmd)) => {
            let storage = Storage::new(paths)?;
            handle_cache_command(&storage, cmd)?;
        }
        Some(Commands::Audit { limit, json }) => {
            let storage = Storage::new(paths)?;
            handle_audit_command(&storage, limit, json)?;
        }
        Some(Commands::Config) => {
            println!("payee-reconciler Configuration");
            println!("==============================");
            println!("Base directory:   {}", paths.base_dir().display());
            println!("Contacts:         {}", paths.contacts_file().display());
            println!("Aliases:          {}", paths.aliases_file().display());
            println!("Transactions:     {}", paths.transactions_file().display());
            println!("Registry cache:   {}", paths.registry_cache_file().display());
            println!("Output directory: {}", paths.output_dir().display());
            println!();
            println!("Settings:");
            println!(
                "{}",
                serde_json::to_string_pretty(&settings).context("Failed to render settings")?
            );
        }
        Some(Commands::Init) => {
            println!("Initializing payee-reconciler at: {}", paths.base_dir().display());
            let storage = Storage::new(paths)?;
            if storage.is_initialized() {
                println!("Settings already present, left unchanged.");
            } else {
                settings.save(storage.paths())?;
                println!("Default settings written to {}", storage.paths().settings_file().display());
            }
            println!();
            println!("Place the contact export at {}", storage.paths().contacts_file().display());
            println!(
                "and the parsed statement at {}, then run 'payrec run'.",
                storage.paths().transactions_file().display()
            );
        }
        None => {
            println!("payrec - bank-statement reconciliation");
            println!();
            println!("Run 'payrec --help' for usage information.");
        }
    }

    Ok(())
}
