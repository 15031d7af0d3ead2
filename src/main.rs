use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use log::{error, info};

use cert_ledger::blockchain::DEFAULT_DIFFICULTY;
use cert_ledger::certificate::{self, CertificateRequest, Verification};
use cert_ledger::config::{LedgerConfig, DEFAULT_SNAPSHOT_PATH};

/// Blockchain based certificate validation
#[derive(Parser, Debug)]
#[command(name = "cert-ledger", version, about, long_about = None)]
struct Cli {
    /// Ledger snapshot file
    #[arg(long, global = true, env = "CERT_LEDGER_PATH", default_value = DEFAULT_SNAPSHOT_PATH)]
    ledger: PathBuf,

    /// Required proof-of-work difficulty; an existing ledger must match it
    #[arg(
        long,
        global = true,
        env = "CERT_LEDGER_DIFFICULTY",
        default_value_t = DEFAULT_DIFFICULTY
    )]
    difficulty: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Record a certificate in a new block
    Issue(IssueArgs),

    /// Check whether a certificate document is recorded unmodified
    Verify(VerifyArgs),

    /// Check hashes, links and proof of work of the whole chain
    Validate,

    /// Print every block of the chain
    Show,
}

#[derive(Args, Debug)]
struct IssueArgs {
    /// Roll number of the certificate holder
    #[arg(long)]
    roll_no: String,

    /// Name of the certificate holder
    #[arg(long)]
    name: String,

    /// Ten digit contact number
    #[arg(long)]
    contact: String,

    /// Certificate document
    #[arg(long)]
    file: PathBuf,
}

#[derive(Args, Debug)]
struct VerifyArgs {
    /// Certificate document
    #[arg(long)]
    file: PathBuf,
}

fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let config = LedgerConfig {
        snapshot_path: cli.ledger,
        difficulty: cli.difficulty,
    };

    let mut blockchain = config
        .open()
        .with_context(|| format!("failed to open ledger {}", config.snapshot_path.display()))?;
    info!(
        "Opened ledger {} with {} blocks",
        config.snapshot_path.display(),
        blockchain.len()
    );

    match cli.command {
        Commands::Issue(args) => {
            let request = CertificateRequest::new(args.roll_no, args.name, args.contact);
            let receipt =
                certificate::issue(&mut blockchain, &request, &args.file, &config.snapshot_path)
                    .context("failed to issue certificate")?;

            println!("Blockchain Previous Hash : {}", receipt.previous_hash);
            println!("Block No : {}", receipt.block_index);
            println!("Current Hash : {}", receipt.block_hash);
            println!("Certificate Digital Signature : {}", receipt.digest);
            println!("Certificate saved with digital signature!");
        }
        Commands::Verify(args) => match certificate::verify(&blockchain, &args.file)? {
            Verification::Verified(transaction) => {
                println!("Uploaded Certificate Validation Successful");
                println!("Details extracted from Blockchain after Validation");
                println!();
                println!("Roll No : {}", transaction.roll_no);
                println!("Student Name : {}", transaction.name);
                println!("Contact No   : {}", transaction.contact);
                println!("Digital Sign : {}", transaction.digest);
            }
            Verification::NotFound => {
                println!("Verification failed or certificate modified");
                return Ok(ExitCode::from(2));
            }
        },
        Commands::Validate => {
            blockchain.validate_chain()?;
            println!(
                "Ledger is valid: {} blocks, difficulty {}",
                blockchain.len(),
                blockchain.difficulty()
            );
        }
        Commands::Show => {
            for block in blockchain.chain() {
                println!("Block No : {}", block.index());
                println!("  Timestamp     : {}", block.timestamp().to_rfc3339());
                println!("  Previous Hash : {}", block.previous_hash());
                println!("  Current Hash  : {}", block.hash());
                println!("  Nonce         : {}", block.nonce());
                for transaction in block.transactions() {
                    println!("  Transaction   : {}", transaction);
                }
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn main() -> ExitCode {
    // Initialize logger
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    match run(Cli::parse()) {
        Ok(code) => code,
        Err(err) => {
            error!("{:#}", err);
            ExitCode::FAILURE
        }
    }
}
