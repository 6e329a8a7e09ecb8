//! Protocol-wide constants for GhostBridge.

/// Default reclaim deadline, measured from creation (24 hours).
pub const DEFAULT_GHOST_TIMEOUT_SECS: u64 = 86_400;

/// Default mint admissibility window, measured from burn (1 hour).
pub const DEFAULT_ATOMIC_WINDOW_SECS: u64 = 3_600;

/// Number of recently created/mirrored ghost ids a ledger keeps for re-scans.
pub const DEFAULT_RECENT_WINDOW: usize = 1_024;

/// Maximum width of an opaque destination address. Matches the widest
/// address format the destination program accepts.
pub const MAX_DESTINATION_ADDRESS_LEN: usize = 64;

/// Default quorum threshold (distinct agreeing validators per step).
pub const DEFAULT_QUORUM_THRESHOLD: usize = 1;

/// Default cap on the number of enabled validators.
pub const DEFAULT_MAX_VALIDATORS: usize = 16;

/// Default number of request-then-verify attempts around the proof oracle.
pub const DEFAULT_PROOF_MAX_ATTEMPTS: u32 = 5;

/// Default delay between proof attempts in milliseconds.
pub const DEFAULT_PROOF_RETRY_DELAY_MS: u64 = 2_000;

/// Default relayer sweep interval in milliseconds.
pub const DEFAULT_SCAN_INTERVAL_MS: u64 = 15_000;

/// Default number of recent ghost ids re-read per sweep.
pub const DEFAULT_SCAN_WINDOW: usize = 256;

/// Default number of transfer pipelines the relayer runs concurrently.
pub const DEFAULT_MAX_CONCURRENT_PIPELINES: usize = 8;

/// Default capacity of the relayer's in-memory processed set.
pub const DEFAULT_PROCESSED_CACHE_SIZE: usize = 10_000;

/// Default time the relayer waits for a destination mint to confirm.
pub const DEFAULT_MINT_CONFIRM_TIMEOUT_MS: u64 = 30_000;

/// Capacity of a ledger's notification fan-out channel.
pub const EVENT_CHANNEL_CAPACITY: usize = 4_096;

/// Version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Protocol name.
pub const PROTOCOL_NAME: &str = "GhostBridge";
