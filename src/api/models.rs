use crate::blockchain::{Block, Blockchain, CancelToken};
use crate::ledger::{CheckReport, Ledger, LedgerBlock};
use crate::transaction::{CoinRef, Location, Tx};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;
use std::time::Instant;

/// Shared application state: the proof-of-work chain, the authority ledger
/// and the registry of background mining jobs.
pub struct AppState {
    pub blockchain: Mutex<Blockchain>,
    pub ledger: Mutex<Ledger>,
    pub mining_jobs: Mutex<HashMap<String, MiningJob>>,
}

impl AppState {
    pub fn new(blockchain: Blockchain, ledger: Ledger) -> Self {
        Self {
            blockchain: Mutex::new(blockchain),
            ledger: Mutex::new(ledger),
            mining_jobs: Mutex::new(HashMap::new()),
        }
    }
}

/// A nonce search running on the blocking pool.
#[derive(Clone)]
pub struct MiningJob {
    pub job_id: String,
    pub index: u64,
    pub bits: u32,
    pub status: JobStatus,
    pub cancel: CancelToken,
    pub finished_at: Option<Instant>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum JobStatus {
    Running,
    Sealed { hash: String, nonce: u64 },
    Cancelled { attempts: u64 },
    Failed { reason: String },
}

/* ---------- Mining API Models ---------- */

#[derive(Serialize)]
pub struct JobResponse {
    pub job_id: String,
    pub index: u64,
    pub bits: u32,
    #[serde(flatten)]
    pub status: JobStatus,
}

impl From<&MiningJob> for JobResponse {
    fn from(job: &MiningJob) -> Self {
        Self {
            job_id: job.job_id.clone(),
            index: job.index,
            bits: job.bits,
            status: job.status.clone(),
        }
    }
}

/* ---------- Chain API Models ---------- */

#[derive(Serialize)]
pub struct ChainResponse<'a> {
    pub length: usize,
    pub bits: u32,
    pub difficulty: Option<f64>,
    pub chain: &'a [Block],
}

#[derive(Serialize)]
pub struct ValidateResponse {
    pub valid: bool,
    pub length: usize,
    pub bits: u32,
}

#[derive(Serialize)]
pub struct DifficultyResponse {
    pub bits: u32,
    pub bits_hex: String,
    pub difficulty: Option<f64>,
    pub target_block_time_secs: f64,
    pub retarget_window: usize,
}

#[derive(Deserialize)]
pub struct SetTargetTimeRequest {
    pub target_block_time_secs: u64,
}

/* ---------- Ledger API Models ---------- */

#[derive(Deserialize)]
pub struct CreateCoinsRequest {
    pub receivers: BTreeMap<String, u64>,
}

#[derive(Deserialize)]
pub struct SubmitTxRequest {
    pub transaction: Tx,
    /// Compressed or uncompressed SEC1 public key of the sender, hex.
    pub public_key: String,
}

#[derive(Serialize)]
pub struct SubmitTxResponse {
    pub hash: String,
    pub pending: usize,
}

#[derive(Serialize)]
pub struct CheckTxResponse {
    pub hash: String,
    pub valid: bool,
    pub reason: Option<String>,
    pub failures: Vec<String>,
    pub checks: CheckReport,
}

#[derive(Serialize)]
pub struct LedgerChainResponse<'a> {
    pub length: usize,
    pub valid: bool,
    pub authority: &'a str,
    pub authority_public_key: String,
    pub chain: &'a [LedgerBlock],
}

#[derive(Serialize)]
pub struct PendingResponse<'a> {
    pub size: usize,
    pub transactions: &'a [Tx],
}

#[derive(Serialize)]
pub struct BalanceResponse {
    pub address: String,
    pub balance: i128,
    pub coins: usize,
}

#[derive(Serialize)]
pub struct CoinsResponse {
    pub address: String,
    pub coins: Vec<CoinRef>,
}

/* ---------- Wallet API Models (dev) ---------- */

#[derive(Serialize)]
pub struct NewWalletResponse {
    pub private_key: String,
    pub public_key: String,
    pub address: String,
}

#[derive(Deserialize)]
pub struct SendRequest {
    pub private_key: String,
    pub receivers: BTreeMap<String, u64>,
    pub location: Location,
}

#[derive(Serialize)]
pub struct SendResponse {
    pub public_key: String,
    pub transaction: Tx,
}

#[derive(Serialize)]
pub struct StatsResponse {
    pub height: usize,
    pub bits: u32,
    pub difficulty: Option<f64>,
    pub target_block_time_secs: f64,
    pub retarget_window: usize,
    pub last_interval_secs: Option<f64>,
    pub avg_interval_secs: Option<f64>,
    pub running_jobs: usize,
    pub ledger_height: usize,
    pub pending_size: usize,
}
