//! Demo driver for the Merit incentive core.
//!
//! Runs the full decision pipeline in memory: admission, rewards, and
//! validator rotation. Persistence and networking are out of scope —
//! every invocation is a fresh session.

mod config;
mod engine;

use anyhow::Context;
use clap::{Parser, Subcommand};
use merit_core::admission::AdmissionConfig;
use merit_core::validators::{Validator, MINIMUM_STAKE};
use merit_core::work::{mine, WorkProof};
use merit_core::{now_ms, IdentityKey, MessageRecord, MessageScope};
use rand::RngCore;
use sha2::{Digest, Sha256};
use tracing::info;

use crate::config::Config;
use crate::engine::{Engine, Verdict};

#[derive(Parser)]
#[command(name = "merit", about = "Demo driver for the Merit incentive core")]
struct Cli {
    /// Sender address for message commands.
    #[arg(long, default_value = "MRT-LOCAL")]
    from: String,

    /// Proof-of-message-work difficulty in leading zero bits (0 = off).
    #[arg(long, default_value = "0")]
    difficulty: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate a fresh participant address.
    Create,

    /// Send a message through the admission + reward pipeline.
    Send {
        text: String,
        /// Credit the reply bonus on top of the send reward.
        #[arg(long)]
        reply: bool,
    },

    /// Simulate a burst of sends and print the earned ledger as JSON.
    Rewards {
        /// Number of messages to simulate.
        #[arg(long, default_value = "12")]
        sends: u32,
    },

    /// Register as a validator with the given stake and run rotations.
    Validate {
        stake: f64,
        /// Number of selection rounds.
        #[arg(long, default_value = "100")]
        rounds: u32,
    },

    /// Seal a message for a recipient, verify the round-trip, and send.
    NetworkSend { recipient: String, text: String },
}

/// Derive a demo shared key from both addresses. A real deployment
/// gets this from its key-exchange layer.
fn derive_demo_key(sender: &str, recipient: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(b"merit-demo-shared-key");
    hasher.update(sender.as_bytes());
    hasher.update(recipient.as_bytes());
    hasher.finalize().into()
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::from_env();
    info!(
        data_dir = %config.data_dir.display(),
        validator_addr = %config.validator_addr,
        relay_addr = %config.relay_addr,
        "session config"
    );

    let admission = AdmissionConfig {
        work_difficulty: cli.difficulty,
        ..AdmissionConfig::default()
    };
    let engine = Engine::new(admission);
    let sender = IdentityKey::from(cli.from.as_str());

    match cli.command {
        Command::Create => {
            let mut key_material = [0u8; 32];
            rand::rng().fill_bytes(&mut key_material);
            println!("{}", IdentityKey::derive(&key_material));
        }

        Command::Send { text, reply } => {
            let verdict = send_one(&engine, &sender, None, &text, reply, cli.difficulty)?;
            print_verdict(&verdict);
        }

        Command::Rewards { sends } => {
            let mut accepted = 0u32;
            for n in 0..sends {
                let text = format!("simulated message {n}");
                if let Verdict::Accepted { .. } =
                    send_one(&engine, &sender, None, &text, false, cli.difficulty)?
                {
                    accepted += 1;
                }
            }
            eprintln!("{accepted}/{sends} sends admitted");
            let totals: Vec<_> = engine
                .earned_totals()
                .into_iter()
                .map(|(address, earned)| serde_json::json!({ "address": address, "earned": earned }))
                .collect();
            println!("{}", serde_json::to_string_pretty(&totals)?);
        }

        Command::Validate { stake, rounds } => {
            engine.register_validator(Validator::new(sender.clone(), stake, now_ms()));
            // Two baseline peers so rotation has competition.
            let joined = now_ms();
            engine.register_validator(Validator::new(
                IdentityKey::from("MRT-PEER-1"),
                MINIMUM_STAKE,
                joined,
            ));
            engine.register_validator(Validator::new(
                IdentityKey::from("MRT-PEER-2"),
                MINIMUM_STAKE * 1.5,
                joined,
            ));

            let mut rng = rand::rng();
            let mut wins = 0u32;
            for _ in 0..rounds {
                let selected = engine
                    .rotate(&mut rng, now_ms())
                    .context("no eligible validators")?;
                if selected == sender {
                    wins += 1;
                }
            }
            println!("selected {wins}/{rounds} rounds as {sender}");
            for (address, score) in engine.top_validators(10, now_ms()) {
                println!("  {address}  priority {score:.4}");
            }
        }

        Command::NetworkSend { recipient, text } => {
            let key = derive_demo_key(sender.as_str(), &recipient);
            let sealed = merit_message::seal(text.as_bytes(), &key)?;
            let opened = merit_message::open(&sealed, &key)?;
            anyhow::ensure!(opened == text.as_bytes(), "seal/open round-trip mismatch");
            println!(
                "sealed {} plaintext bytes into {} wire bytes",
                text.len(),
                sealed.to_bytes()?.len()
            );

            let verdict = send_one(
                &engine,
                &sender,
                Some(IdentityKey::from(recipient.as_str())),
                &text,
                false,
                cli.difficulty,
            )?;
            print_verdict(&verdict);
        }
    }

    Ok(())
}

fn send_one(
    engine: &Engine,
    sender: &IdentityKey,
    receiver: Option<IdentityKey>,
    text: &str,
    reply: bool,
    difficulty: u8,
) -> anyhow::Result<Verdict> {
    let now = now_ms();
    let scope = MessageScope::Private {
        receiver: receiver.unwrap_or_else(|| IdentityKey::from("MRT-PEER-1")),
    };
    let record = MessageRecord::new(sender.clone(), scope, text.as_bytes(), now);

    let proof = if difficulty > 0 {
        mine(&record.content_hash, difficulty).context("proof-of-message-work search failed")?
    } else {
        WorkProof { nonce: 0 }
    };

    Ok(engine.submit(&record, &proof, reply, now))
}

fn print_verdict(verdict: &Verdict) {
    match verdict {
        Verdict::Accepted { reward } => println!("accepted, reward {reward} tokens"),
        Verdict::Rejected { reason } => println!("rejected: {reason}"),
    }
}
