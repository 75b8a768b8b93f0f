use std::path::PathBuf;

use clap::{Parser, Subcommand};
use solavia::keys::DEFAULT_KEY_FILE;
use solavia::{RuntimeConfig, StorageBackend};
use solavia_cli::commands::{keygen, run, snapshot, verify};
use solavia_cli::{open_runtime, output_path, DEFAULT_PROOF_FILE};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "solavia")]
#[command(about = "SolaVia - tamper-evident provenance for deterministic pipelines", long_about = None)]
struct Cli {
    /// Storage backend: `memory` or a SQLite path (overrides SOLAVIA_STORAGE)
    #[arg(long, global = true)]
    storage: Option<StorageBackend>,

    /// Output directory for proofs and signatures (overrides SOLAVIA_OUTPUT_DIR)
    #[arg(long, global = true)]
    output_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a pipeline and record every stage.
    /// PIPELINE is `example` or a JSON file of recorded stages.
    Run {
        pipeline: String,

        /// Seed recorded in the proof (overrides SEED)
        #[arg(long)]
        seed: Option<u32>,

        /// Export a proof, optionally to FILE
        #[arg(long, value_name = "FILE", require_equals = true, num_args = 0..=1)]
        prove: Option<Option<PathBuf>>,

        /// Sign the Merkle root, optionally with key FILE
        #[arg(long, value_name = "FILE", require_equals = true, num_args = 0..=1)]
        sign: Option<Option<PathBuf>>,

        /// Where to write the signature document
        #[arg(long, value_name = "FILE")]
        signature: Option<PathBuf>,
    },
    /// Verify a proof and, optionally, its signature
    Verify {
        /// Proof file (defaults to the output directory's proof)
        proof: Option<PathBuf>,

        /// Signature document to check against the proof root
        #[arg(long)]
        signature: Option<PathBuf>,

        /// Public key file
        #[arg(long)]
        pubkey: Option<PathBuf>,
    },
    /// Snapshot the persisted state
    Snapshot {
        #[arg(default_value = "manual")]
        name: String,
    },
    /// Restore the snapshot stored at ADDRESS
    Rollback { address: String },
    /// Generate an Ed25519 key pair
    Keygen {
        #[arg(long, default_value = DEFAULT_KEY_FILE)]
        out: PathBuf,

        /// Overwrite an existing key
        #[arg(long)]
        force: bool,
    },
}

fn init_tracing(default_level: &str) {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| default_level.into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = RuntimeConfig::from_env()?;
    if let Some(storage) = cli.storage {
        config.storage = Some(storage);
    }
    if let Some(dir) = cli.output_dir {
        config.output_dir = dir;
    }
    init_tracing(&config.log_level);

    let result = dispatch(cli.command, config).await;
    if let Err(e) = &result {
        tracing::error!(error = %e, "command failed");
    }
    result
}

async fn dispatch(command: Commands, mut config: RuntimeConfig) -> anyhow::Result<()> {
    match command {
        Commands::Run {
            pipeline,
            seed,
            prove,
            sign,
            signature,
        } => {
            if let Some(seed) = seed {
                config.seed = seed;
            }
            let runtime = open_runtime(config).await?;
            let result = run::run(
                &runtime,
                run::RunOptions {
                    pipeline,
                    prove,
                    sign,
                    signature,
                },
            )
            .await;
            runtime.stop().await;
            result
        }
        Commands::Verify {
            proof,
            signature,
            pubkey,
        } => {
            let proof = output_path(&config, proof, DEFAULT_PROOF_FILE);
            verify::run(&proof, signature, pubkey)
        }
        Commands::Snapshot { name } => {
            let runtime = open_runtime(config).await?;
            let result = snapshot::create(&runtime, &name).await.map(|_| ());
            runtime.stop().await;
            result
        }
        Commands::Rollback { address } => {
            let runtime = open_runtime(config).await?;
            let result = snapshot::rollback(&runtime, &address).await;
            runtime.stop().await;
            result
        }
        Commands::Keygen { out, force } => keygen::run(&out, force),
    }
}
