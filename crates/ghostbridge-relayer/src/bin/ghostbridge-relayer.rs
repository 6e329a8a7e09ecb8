//! ghostbridge-relayer
//!
//! Runs a relay orchestrator against two in-process ledgers (devnet).
//!
//! 1. Load config (first CLI argument, JSON) or use defaults
//! 2. Bring up origin and target ledgers, each with its own proof oracle
//! 3. Enable this relayer's key as the validator and start the orchestrator
//! 4. Submit one demo transfer and report when it settles
//! 5. Run until Ctrl-C

use std::{sync::Arc, time::Duration};

use anyhow::Context;
use ghostbridge_relayer::{Devnet, RelayerConfig, RelayerIdentity, init_tracing};
use ghostbridge_types::{DestinationAddress, InitiateRequest, QuorumConfig, SystemClock, TokenId};
use tokio::sync::watch;
use tracing::{info, warn};

const DEMO_AMOUNT: u64 = 100;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = match std::env::args().nth(1) {
        Some(path) => RelayerConfig::load(&path).with_context(|| format!("loading {path}"))?,
        None => RelayerConfig::default(),
    };
    init_tracing(config.json_logs)?;

    let identity = match &config.validator_key_hex {
        Some(seed) => RelayerIdentity::from_hex_seed(seed)?,
        None => {
            let fresh = RelayerIdentity::generate();
            warn!("no validator_key_hex configured; using an ephemeral key");
            fresh
        }
    };
    let validator = identity.address();
    info!(
        validator = %validator,
        origin = %config.origin_ledger,
        target = %config.target_ledger,
        "starting ghostbridge-relayer"
    );

    let devnet = Devnet::new(
        &config,
        &QuorumConfig::default(),
        validator,
        Arc::new(SystemClock),
    )?;
    devnet.enable_validator(validator)?;
    let orchestrator = Arc::new(devnet.orchestrator(&config, validator).await?);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let relay = tokio::spawn(Arc::clone(&orchestrator).run(shutdown_rx));

    // Demo transfer: fund a user on the origin and bridge to a fresh recipient.
    let user = RelayerIdentity::generate().address();
    let recipient = RelayerIdentity::generate().address();
    let source_token = TokenId([0x51; 32]);
    let dest_token = TokenId([0xD5; 32]);
    let id = {
        let mut origin = devnet.origin.lock().await;
        origin.fund(user, &source_token, 1_000)?;
        origin.initiate(
            user,
            InitiateRequest {
                source_token,
                dest_token,
                dest_ledger: config.target_ledger,
                dest_address: DestinationAddress::from(recipient),
                local_destination: None,
                amount: DEMO_AMOUNT,
                amount_commitment: None,
            },
        )?
    };
    info!(ghost = %id, amount = DEMO_AMOUNT, "demo transfer initiated");

    let watcher = {
        let origin = Arc::clone(&devnet.origin);
        let target = Arc::clone(&devnet.target);
        tokio::spawn(async move {
            loop {
                let retired = origin.lock().await.retirement(&id);
                if let Some(retired) = retired {
                    let balance = target.lock().await.balance(&recipient, &dest_token);
                    info!(ghost = %id, ?retired, recipient_balance = balance, "demo transfer closed");
                    break;
                }
                tokio::time::sleep(Duration::from_millis(200)).await;
            }
        })
    };

    tokio::signal::ctrl_c().await?;
    info!("shutting down relayer...");
    watcher.abort();
    // The orchestrator may already have stopped on a closed stream.
    let _ = shutdown_tx.send(true);
    relay.await?;

    for node in [&devnet.origin, &devnet.target] {
        if let Err(err) = node.lock().await.verify_supply() {
            warn!(error = %err, "supply check failed at shutdown");
        }
    }
    Ok(())
}
