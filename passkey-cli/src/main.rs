//! Passkey CLI - inspect and exercise WebAuthn passkey payloads.

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use passkey_core::AttestationFormat;
use tracing_subscriber::{fmt, EnvFilter};

mod commands;
mod exit_codes;
mod utils;

use exit_codes::ExitCode;

const EXIT_CODES_HELP: &str = "\
Exit codes:
  0   Success
  1   General error
  65  Malformed payload or failed check
  66  Input file missing or unreadable
  74  Output error";

#[derive(Parser)]
#[command(name = "passkey")]
#[command(author, version, about = "Inspect and verify WebAuthn passkey payloads", long_about = None)]
#[command(after_help = EXIT_CODES_HELP)]
struct Cli {
    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Only print the essential result
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Enable debug logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// When to use colors
    #[arg(long, global = true, value_enum, default_value = "auto")]
    color: ColorChoice,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum ColorChoice {
    Auto,
    Always,
    Never,
}

#[derive(Clone, Copy, ValueEnum)]
enum AttestationArg {
    None,
    Packed,
}

impl From<AttestationArg> for AttestationFormat {
    fn from(arg: AttestationArg) -> Self {
        match arg {
            AttestationArg::None => AttestationFormat::None,
            AttestationArg::Packed => AttestationFormat::Packed,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Decode a CBOR item and report how many bytes it used
    Cbor {
        /// Hex or base64url payload (a path with --file)
        #[arg(value_name = "INPUT")]
        input: String,

        /// Read the payload from a file
        #[arg(long)]
        file: bool,
    },

    /// Parse raw authenticator data
    AuthData {
        /// Hex or base64url payload (a path with --file)
        #[arg(value_name = "INPUT")]
        input: String,

        /// Read the payload from a file
        #[arg(long)]
        file: bool,

        /// Check rpIdHash against this relying party id
        #[arg(long, value_name = "RP_ID")]
        rp_id: Option<String>,
    },

    /// Decode clientDataJSON
    ClientData {
        /// base64url clientDataJSON (a path with --file)
        #[arg(value_name = "INPUT")]
        input: String,

        /// Read the payload from a file
        #[arg(long)]
        file: bool,
    },

    /// Decode an attestationObject and classify its statement
    Attestation {
        /// Hex or base64url payload (a path with --file)
        #[arg(value_name = "INPUT")]
        input: String,

        /// Read the payload from a file
        #[arg(long)]
        file: bool,

        /// base64url clientDataJSON from the same response, needed to check the statement
        #[arg(long, value_name = "CLIENT_DATA")]
        client_data: Option<String>,
    },

    /// Run a registration and sign-in with a software authenticator
    Ceremony {
        /// Relying party id
        #[arg(long, default_value = "localhost")]
        rp_id: String,

        /// Origin reported in client data
        #[arg(long, default_value = "http://localhost:3000")]
        origin: String,

        /// Attestation format produced at registration
        #[arg(long, value_enum, default_value = "none")]
        attestation: AttestationArg,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "passkey_core=debug,passkey=debug,info"
    } else {
        "error"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(verbose)
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.color {
        ColorChoice::Always => colored::control::set_override(true),
        ColorChoice::Never => colored::control::set_override(false),
        ColorChoice::Auto => {}
    }

    let output = commands::Output {
        json: cli.json,
        quiet: cli.quiet,
    };

    let result = match cli.command {
        Commands::Cbor { input, file } => commands::cbor::execute(&input, file, &output),
        Commands::AuthData { input, file, rp_id } => {
            commands::auth_data::execute(&input, file, rp_id.as_deref(), &output)
        }
        Commands::ClientData { input, file } => {
            commands::client_data::execute(&input, file, &output)
        }
        Commands::Attestation {
            input,
            file,
            client_data,
        } => commands::attestation::execute(&input, file, client_data.as_deref(), &output),
        Commands::Ceremony {
            rp_id,
            origin,
            attestation,
        } => commands::ceremony::execute(&rp_id, &origin, attestation.into(), &output).await,
    };

    let exit = match result {
        Ok(()) => ExitCode::success(),
        Err(e) => ExitCode::from_anyhow(&e),
    };
    if let Some(message) = &exit.message {
        eprintln!("{} {}", "error:".red().bold(), message);
    }
    std::process::exit(exit.code);
}
