//! End-to-end relay scenarios over two in-process ledgers.

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use ghostbridge_ledger::{Ballot, VoteOutcome};
use ghostbridge_relayer::{
    Devnet, Endpoint, LedgerClient, LocalLedger, Progress, RelayOrchestrator, RelayerConfig,
    RetryPolicy,
};
use ghostbridge_types::*;
use tokio::sync::{broadcast, watch};

const SRC: TokenId = TokenId([0x51; 32]);
const DST: TokenId = TokenId([0xD5; 32]);

fn devnet(threshold: usize) -> Devnet {
    devnet_with_clock(threshold, Arc::new(ManualClock::at_unix(1_700_000_000)))
}

fn devnet_with_clock(threshold: usize, clock: Arc<ManualClock>) -> Devnet {
    Devnet::new(
        &RelayerConfig::default(),
        &QuorumConfig {
            threshold,
            max_validators: 16,
        },
        Address::random(),
        clock,
    )
    .unwrap()
}

/// Origin client that can drop the recipient from records it returns and
/// refuse acknowledgements, as a ledger with older records or a dropped
/// connection would.
struct Degraded {
    inner: LocalLedger,
    hide_recipient: bool,
    refuse_ack: AtomicBool,
}

impl Degraded {
    fn new(inner: LocalLedger) -> Self {
        Self {
            inner,
            hide_recipient: false,
            refuse_ack: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl LedgerClient for Degraded {
    fn ledger_id(&self) -> LedgerId {
        self.inner.ledger_id()
    }

    fn validator(&self) -> Address {
        self.inner.validator()
    }

    async fn ghost(&self, id: &GhostId) -> Result<Option<Ghost>> {
        let ghost = self.inner.ghost(id).await?;
        if !self.hide_recipient {
            return Ok(ghost);
        }
        Ok(ghost.map(|mut g| {
            g.local_destination = None;
            g.dest_address = Some(DestinationAddress::new(vec![7u8; 20]).unwrap());
            g
        }))
    }

    async fn retirement(&self, id: &GhostId) -> Result<Option<Retirement>> {
        self.inner.retirement(id).await
    }

    async fn ballot(&self, id: &GhostId, step: Stage) -> Result<Option<Ballot>> {
        self.inner.ballot(id, step).await
    }

    async fn recent_ghost_ids(&self, limit: usize) -> Result<Vec<GhostId>> {
        self.inner.recent_ghost_ids(limit).await
    }

    async fn bind_proof(&self, id: GhostId, stage: Stage, payload: &[u8]) -> Result<ProofRef> {
        self.inner.bind_proof(id, stage, payload).await
    }

    async fn approve_step(&self, id: GhostId, step: Stage, payload: &[u8]) -> Result<VoteOutcome> {
        self.inner.approve_step(id, step, payload).await
    }

    async fn submit_mirror(&self, instruction: &[u8]) -> Result<GhostId> {
        self.inner.submit_mirror(instruction).await
    }

    async fn confirm_remote_ack(&self, id: GhostId) -> Result<()> {
        if self.refuse_ack.load(Ordering::SeqCst) {
            return Err(BridgeError::LedgerUnavailable {
                ledger: self.inner.ledger_id(),
                reason: "connection reset".to_string(),
            });
        }
        self.inner.confirm_remote_ack(id).await
    }

    async fn settle(&self, id: GhostId) -> Result<Retirement> {
        self.inner.settle(id).await
    }

    async fn subscribe(&self) -> broadcast::Receiver<LedgerEvent> {
        self.inner.subscribe().await
    }
}

/// Orchestrator whose origin endpoint goes through `degrade`.
async fn degraded_relayer(
    net: &Devnet,
    degrade: impl FnOnce(&mut Degraded),
) -> (RelayOrchestrator, Arc<Degraded>) {
    let validator = Address::random();
    net.enable_validator(validator).unwrap();
    let (origin, target) = net.endpoints(validator).await;
    let local = LocalLedger::attach(Arc::clone(&net.origin), validator).await;
    let mut client = Degraded::new(local);
    degrade(&mut client);
    let client = Arc::new(client);
    let origin = Endpoint {
        ledger: client.clone(),
        oracle: origin.oracle,
    };
    let relay = RelayOrchestrator::new(&RelayerConfig::default(), origin, target)
        .unwrap()
        .with_retry(RetryPolicy::immediate(3));
    (relay, client)
}

async fn relayer(net: &Devnet, config: &RelayerConfig) -> RelayOrchestrator {
    let validator = Address::random();
    net.enable_validator(validator).unwrap();
    net.orchestrator(config, validator)
        .await
        .unwrap()
        .with_retry(RetryPolicy::immediate(3))
}

/// Fund a user and initiate `amount` toward a fresh recipient on the target.
async fn initiate(net: &Devnet, amount: u64) -> (GhostId, Address) {
    let user = Address::random();
    let recipient = Address::random();
    let mut origin = net.origin.lock().await;
    origin.fund(user, &SRC, 1_000).unwrap();
    let id = origin
        .initiate(
            user,
            InitiateRequest {
                source_token: SRC,
                dest_token: DST,
                dest_ledger: LedgerId(2),
                dest_address: DestinationAddress::from(recipient),
                local_destination: None,
                amount,
                amount_commitment: None,
            },
        )
        .unwrap();
    (id, recipient)
}

#[tokio::test]
async fn transfer_settles_on_both_ledgers() {
    let net = devnet(1);
    let relay = relayer(&net, &RelayerConfig::default()).await;
    let (id, recipient) = initiate(&net, 100).await;

    assert_eq!(relay.reconcile(id).await.unwrap(), Progress::Completed);

    let origin = net.origin.lock().await;
    let target = net.target.lock().await;
    assert_eq!(target.balance(&recipient, &DST), 100);
    assert!(origin.ghost(&id).is_none());
    assert!(target.ghost(&id).is_none());
    assert_eq!(origin.retirement(&id), Some(Retirement::Settled { minted: false }));
    assert_eq!(target.retirement(&id), Some(Retirement::Settled { minted: true }));
    assert_eq!(origin.quorum().open_ballots(), 0);
    assert_eq!(target.quorum().open_ballots(), 0);
    assert_eq!(origin.ledger().custody().destroyed(&SRC), 100);
    origin.verify_supply().unwrap();
    target.verify_supply().unwrap();
    drop((origin, target));

    assert!(relay.is_processed(&id).await);
    assert_eq!(relay.reconcile(id).await.unwrap(), Progress::AlreadyProcessed);
}

#[tokio::test]
async fn target_oracle_outage_leaves_origin_burned_and_retry_safe() {
    let net = devnet(1);
    let relay = relayer(&net, &RelayerConfig::default()).await;
    let (id, recipient) = initiate(&net, 100).await;

    net.target_oracle.set_outage(true);
    let err = relay.reconcile(id).await.unwrap_err();
    assert_eq!(err, BridgeError::ProofRetriesExhausted { attempts: 3 });
    assert!(err.is_retryable());

    {
        let mut origin = net.origin.lock().await;
        let ghost = origin.ghost(&id).unwrap();
        assert_eq!(ghost.state, GhostState::Burned);
        assert!(!ghost.remote_ack);
        // A burned origin record is past reclaim.
        let err = origin.reclaim(id).unwrap_err();
        assert!(matches!(err, BridgeError::InvalidState { .. }));
    }
    assert_eq!(net.target.lock().await.state(&id), GhostState::Burned);
    assert!(!relay.is_processed(&id).await);

    // A second failed pass changes nothing.
    assert!(relay.reconcile(id).await.is_err());
    assert_eq!(net.origin.lock().await.state(&id), GhostState::Burned);

    net.target_oracle.set_outage(false);
    assert_eq!(relay.reconcile(id).await.unwrap(), Progress::Completed);

    let target = net.target.lock().await;
    assert_eq!(target.balance(&recipient, &DST), 100);
    assert_eq!(target.ledger().custody().supply().total_created(&DST), 100);
}

#[tokio::test]
async fn flaky_origin_verification_is_ridden_out() {
    let net = devnet(1);
    let relay = relayer(&net, &RelayerConfig::default()).await;
    let (id, recipient) = initiate(&net, 40).await;

    net.origin_oracle.fail_next_verifies(2);
    assert_eq!(relay.reconcile(id).await.unwrap(), Progress::Completed);
    assert_eq!(net.target.lock().await.balance(&recipient, &DST), 40);
}

#[tokio::test]
async fn threshold_two_needs_two_relayers() {
    let net = devnet(2);
    let config = RelayerConfig::default();
    let a = relayer(&net, &config).await;
    let b = relayer(&net, &config).await;
    let (id, recipient) = initiate(&net, 100).await;

    assert_eq!(a.reconcile(id).await.unwrap(), Progress::AwaitingQuorum(Stage::Lock));
    // Re-running without new votes is a no-op.
    assert_eq!(a.reconcile(id).await.unwrap(), Progress::AwaitingQuorum(Stage::Lock));
    assert_eq!(b.reconcile(id).await.unwrap(), Progress::AwaitingQuorum(Stage::Burn));
    assert_eq!(a.reconcile(id).await.unwrap(), Progress::AwaitingQuorum(Stage::Mint));
    assert_eq!(net.target.lock().await.balance(&recipient, &DST), 0);

    assert_eq!(b.reconcile(id).await.unwrap(), Progress::Completed);
    assert_eq!(
        a.reconcile(id).await.unwrap(),
        Progress::Retired(Retirement::Settled { minted: false })
    );
    assert_eq!(net.target.lock().await.balance(&recipient, &DST), 100);
}

#[tokio::test]
async fn short_destination_refused_before_escrow() {
    let net = devnet(1);
    let user = Address::random();
    let mut origin = net.origin.lock().await;
    origin.fund(user, &SRC, 1_000).unwrap();
    let err = origin
        .initiate(
            user,
            InitiateRequest {
                source_token: SRC,
                dest_token: DST,
                dest_ledger: LedgerId(2),
                dest_address: DestinationAddress::new(vec![7u8; 20]).unwrap(),
                local_destination: None,
                amount: 100,
                amount_commitment: None,
            },
        )
        .unwrap_err();
    assert!(matches!(err, BridgeError::InvalidTransfer { .. }));
    assert_eq!(origin.balance(&user, &SRC), 1_000);
    assert_eq!(origin.ledger().custody().escrowed(&SRC), 0);
}

#[tokio::test]
async fn transfer_without_recipient_stops_before_lock_and_stays_reclaimable() {
    let clock = Arc::new(ManualClock::at_unix(1_700_000_000));
    let net = devnet_with_clock(1, Arc::clone(&clock));
    let (relay, _) = degraded_relayer(&net, |c| c.hide_recipient = true).await;
    let (id, _) = initiate(&net, 100).await;

    assert_eq!(relay.reconcile(id).await.unwrap(), Progress::Unroutable);
    assert_eq!(relay.reconcile(id).await.unwrap(), Progress::AlreadyProcessed);

    let mut origin = net.origin.lock().await;
    assert_eq!(origin.state(&id), GhostState::Created);
    assert!(origin.ballot(&id, Stage::Lock).is_none());
    assert_eq!(origin.ledger().custody().destroyed(&SRC), 0);
    assert!(net.target.lock().await.ghost(&id).is_none());

    clock.advance_secs(i64::try_from(constants::DEFAULT_GHOST_TIMEOUT_SECS).unwrap() + 1);
    origin.reclaim(id).unwrap();
    assert_eq!(origin.retirement(&id), Some(Retirement::Reclaimed));
    origin.verify_supply().unwrap();
}

#[tokio::test]
async fn target_settled_before_origin_ack_and_ack_recovered() {
    let net = devnet(1);
    let (relay, client) = degraded_relayer(&net, |c| c.refuse_ack = AtomicBool::new(true)).await;
    let (id, recipient) = initiate(&net, 100).await;

    let err = relay.reconcile(id).await.unwrap_err();
    assert!(matches!(err, BridgeError::LedgerUnavailable { .. }));
    assert_eq!(
        net.target.lock().await.retirement(&id),
        Some(Retirement::Settled { minted: true })
    );
    {
        let origin = net.origin.lock().await;
        let ghost = origin.ghost(&id).unwrap();
        assert_eq!(ghost.state, GhostState::Burned);
        assert!(!ghost.remote_ack);
    }

    client.refuse_ack.store(false, Ordering::SeqCst);
    assert_eq!(relay.reconcile(id).await.unwrap(), Progress::Completed);
    assert_eq!(
        net.origin.lock().await.retirement(&id),
        Some(Retirement::Settled { minted: false })
    );
    let target = net.target.lock().await;
    assert_eq!(target.balance(&recipient, &DST), 100);
    assert_eq!(target.ledger().custody().supply().total_created(&DST), 100);
}

#[tokio::test]
async fn unknown_id_is_reported_not_failed() {
    let net = devnet(1);
    let relay = relayer(&net, &RelayerConfig::default()).await;
    assert_eq!(
        relay.reconcile(GhostId([0xEE; 32])).await.unwrap(),
        Progress::Unknown
    );
}

#[tokio::test]
async fn run_loop_settles_from_notifications() {
    let net = devnet(1);
    let config = RelayerConfig {
        scan_interval_ms: 50,
        ..RelayerConfig::default()
    };
    let relay = Arc::new(relayer(&net, &config).await);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let handle = tokio::spawn(Arc::clone(&relay).run(shutdown_rx));

    let (id, recipient) = initiate(&net, 75).await;
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if net.origin.lock().await.retirement(&id).is_some() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();

    assert_eq!(net.target.lock().await.balance(&recipient, &DST), 75);
    shutdown_tx.send(true).unwrap();
    handle.await.unwrap();
}

#[tokio::test]
async fn mismatched_endpoint_config_rejected() {
    let net = devnet(1);
    let validator = Address::random();
    net.enable_validator(validator).unwrap();
    let config = RelayerConfig {
        origin_ledger: LedgerId(5),
        ..RelayerConfig::default()
    };
    let err = net.orchestrator(&config, validator).await.unwrap_err();
    assert!(matches!(err, BridgeError::Configuration(_)));
}
