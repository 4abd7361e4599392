//! JSON scenario replay.
//!
//! A scenario describes a vault's config, initial registry, token balances
//! and a list of steps. Steps run in order against an in-memory token and a
//! manual clock; each step's outcome is recorded rather than aborting the
//! run, unless the caller asks for strict mode.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use poolshare_core::crypto::KeyPair;
use poolshare_core::error::VaultError;
use poolshare_core::traits::Clock;
use poolshare_core::types::{Address, Amount, ClaimRequest, Weight};
use poolshare_ledger::{
    ManualClock, MemoryToken, RecordingSink, SystemClock, Vault, VaultConfig, VaultInit, VaultSnapshot,
};

type SimVault = Vault<MemoryToken, RecordingSink, ManualClock>;

/// A funded, fully approved depositor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Funding {
    pub account: Address,
    pub amount: Amount,
}

/// One scripted vault operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    /// Pull `amount` from `from`.
    // u64: internally tagged variants decode through a buffer without u128.
    Deposit { from: Address, amount: u64 },
    Claim { caller: Address, recipient: Address },
    /// Sign with `secret` and submit through `relayer`.
    ClaimSigned {
        relayer: Address,
        secret: String,
        recipient: Address,
        deadline: u64,
        /// Sign over this nonce instead of the live one.
        #[serde(default)]
        nonce: Option<u64>,
    },
    SetWeights { caller: Address, accounts: Vec<Address>, weights: Vec<Weight> },
    Pause { caller: Address },
    Unpause { caller: Address },
    RotateGuardian { caller: Address, new: Address },
    RotateGovernor { caller: Address, new: Address },
    AuthorizeUpgrade { caller: Address, implementation: Address },
    AdvanceClock { secs: u64 },
}

impl Step {
    fn name(&self) -> &'static str {
        match self {
            Self::Deposit { .. } => "deposit",
            Self::Claim { .. } => "claim",
            Self::ClaimSigned { .. } => "claim_signed",
            Self::SetWeights { .. } => "set_weights",
            Self::Pause { .. } => "pause",
            Self::Unpause { .. } => "unpause",
            Self::RotateGuardian { .. } => "rotate_guardian",
            Self::RotateGovernor { .. } => "rotate_governor",
            Self::AuthorizeUpgrade { .. } => "authorize_upgrade",
            Self::AdvanceClock { .. } => "advance_clock",
        }
    }
}

/// A complete replayable history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub config: VaultConfig,
    pub init: VaultInit,
    /// Unix seconds the manual clock starts at; defaults to now.
    #[serde(default)]
    pub start_time: Option<u64>,
    #[serde(default)]
    pub funding: Vec<Funding>,
    #[serde(default)]
    pub steps: Vec<Step>,
}

impl Scenario {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("invalid scenario JSON")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read scenario {}", path.display()))?;
        Self::from_json(&json)
    }
}

/// What one step did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepReport {
    pub index: usize,
    pub op: &'static str,
    /// Delta for deposits, payout for claims.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<u128>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub events: Vec<String>,
}

/// Final state of a replayed scenario.
#[derive(Debug, Clone, Serialize)]
pub struct SimReport {
    pub steps: Vec<StepReport>,
    pub failed_steps: usize,
    pub vault_balance: Amount,
    pub balances: BTreeMap<Address, Amount>,
    pub pending: BTreeMap<Address, Amount>,
    pub snapshot: VaultSnapshot,
}

/// Run every step of `scenario`. In strict mode the first failing step
/// aborts the replay.
pub fn replay(scenario: Scenario, strict: bool) -> Result<SimReport> {
    let token = MemoryToken::new();
    for f in &scenario.funding {
        token.mint(&f.account, f.amount);
        token.approve(&f.account, Amount::MAX);
    }
    let start = scenario.start_time.unwrap_or_else(|| SystemClock.now());
    let vault = Vault::initialize(
        scenario.config,
        scenario.init,
        token,
        RecordingSink::new(),
        ManualClock::new(start),
    )
    .context("vault initialization failed")?;
    vault.events().take();
    info!(steps = scenario.steps.len(), start, "replaying scenario");

    let mut reports = Vec::with_capacity(scenario.steps.len());
    for (index, step) in scenario.steps.iter().enumerate() {
        let outcome = run_step(&vault, step)?;
        let events: Vec<String> = vault
            .events()
            .take()
            .iter()
            .map(|e| e.name().to_string())
            .collect();

        let report = match outcome {
            Ok(value) => {
                debug!(index, op = step.name(), ?value, "step ok");
                StepReport { index, op: step.name(), value, error: None, events }
            }
            Err(e) => {
                warn!(index, op = step.name(), error = %e, "step failed");
                if strict {
                    bail!("step {index} ({}) failed: {e}", step.name());
                }
                StepReport { index, op: step.name(), value: None, error: Some(e.to_string()), events }
            }
        };
        reports.push(report);
    }

    Ok(summarize(&vault, reports))
}

/// Outer `Result` is a malformed step; inner is the vault's verdict.
fn run_step(vault: &SimVault, step: &Step) -> Result<Result<Option<u128>, VaultError>> {
    let outcome = match step {
        Step::Deposit { from, amount } => vault.deposit(from, Amount::from(*amount)).map(Some),
        Step::Claim { caller, recipient } => vault.claim(caller, recipient).map(Some),
        Step::ClaimSigned { relayer, secret, recipient, deadline, nonce } => {
            let kp = parse_secret(secret)?;
            let request = sign_claim(vault, &kp, *recipient, *deadline, *nonce)?;
            vault.claim_with_signature(relayer, &request).map(Some)
        }
        Step::SetWeights { caller, accounts, weights } => {
            vault.set_weights(caller, accounts, weights).map(|_| None)
        }
        Step::Pause { caller } => vault.pause(caller).map(|_| None),
        Step::Unpause { caller } => vault.unpause(caller).map(|_| None),
        Step::RotateGuardian { caller, new } => vault.rotate_guardian(caller, *new).map(|_| None),
        Step::RotateGovernor { caller, new } => vault.rotate_governor(caller, *new).map(|_| None),
        Step::AuthorizeUpgrade { caller, implementation } => {
            vault.authorize_upgrade(caller, *implementation).map(|_| None)
        }
        Step::AdvanceClock { secs } => {
            vault.clock().advance(*secs);
            Ok(None)
        }
    };
    Ok(outcome)
}

fn sign_claim(
    vault: &SimVault,
    kp: &KeyPair,
    recipient: Address,
    deadline: u64,
    nonce: Option<u64>,
) -> Result<ClaimRequest> {
    let beneficiary = kp.address();
    let nonce = nonce.unwrap_or_else(|| vault.nonce_of(&beneficiary));
    let digest = vault.claim_digest(beneficiary, recipient, nonce, deadline);
    let signature = kp.sign_prehash(&digest).context("signing failed")?;
    Ok(ClaimRequest { beneficiary, recipient, deadline, signature })
}

fn summarize(vault: &SimVault, steps: Vec<StepReport>) -> SimReport {
    let snapshot = vault.snapshot();
    let balances = vault
        .token()
        .balances()
        .into_iter()
        .filter(|(_, b)| *b > 0)
        .collect();
    let pending = snapshot
        .weights
        .keys()
        .filter_map(|a| vault.pending(a).ok().map(|p| (*a, p)))
        .collect();

    SimReport {
        failed_steps: steps.iter().filter(|s| s.error.is_some()).count(),
        steps,
        vault_balance: vault.token().vault_balance(),
        balances,
        pending,
        snapshot,
    }
}

/// Parse a `0x`-prefixed or bare 32-byte hex secret key.
pub fn parse_secret(secret: &str) -> Result<KeyPair> {
    let raw = secret.strip_prefix("0x").unwrap_or(secret);
    let bytes = hex::decode(raw).context("secret key is not hex")?;
    let Ok(bytes) = <[u8; 32]>::try_from(bytes.as_slice()) else {
        bail!("secret key must be exactly 32 bytes, got {}", bytes.len());
    };
    KeyPair::from_secret_bytes(bytes).context("secret key is not a valid secp256k1 scalar")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const ALICE: &str = "0xa1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1";
    const BOB: &str = "0xb2b2b2b2b2b2b2b2b2b2b2b2b2b2b2b2b2b2b2b2";
    const GUARDIAN: &str = "0xe1e1e1e1e1e1e1e1e1e1e1e1e1e1e1e1e1e1e1e1";
    const GOVERNOR: &str = "0xe2e2e2e2e2e2e2e2e2e2e2e2e2e2e2e2e2e2e2e2";
    const FUNDER: &str = "0xd0d0d0d0d0d0d0d0d0d0d0d0d0d0d0d0d0d0d0d0";
    const SECRET_ONE: &str = "0x0000000000000000000000000000000000000000000000000000000000000001";
    const SECRET_ONE_ADDRESS: &str = "0x7e5f4552091a69125d5dfcb7b8c2659029395bdf";

    fn a(s: &str) -> Address {
        s.parse().unwrap()
    }

    fn scenario_json(steps: &str) -> String {
        format!(
            r#"{{
                "init": {{
                    "guardian": "{GUARDIAN}",
                    "governor": "{GOVERNOR}",
                    "accounts": ["{ALICE}", "{BOB}", "{SECRET_ONE_ADDRESS}"],
                    "weights": [100, 200, 300]
                }},
                "start_time": 1000,
                "funding": [{{"account": "{FUNDER}", "amount": 10000}}],
                "steps": {steps}
            }}"#
        )
    }

    #[test]
    fn even_split_replay() {
        let json = scenario_json(&format!(
            r#"[
                {{"op": "deposit", "from": "{FUNDER}", "amount": 600}},
                {{"op": "claim", "caller": "{ALICE}", "recipient": "{ALICE}"}},
                {{"op": "claim", "caller": "{BOB}", "recipient": "{BOB}"}}
            ]"#
        ));
        let report = replay(Scenario::from_json(&json).unwrap(), true).unwrap();
        assert_eq!(report.failed_steps, 0);
        assert_eq!(report.steps[1].value, Some(100));
        assert_eq!(report.steps[2].value, Some(200));
        assert_eq!(report.balances.get(&a(ALICE)), Some(&100));
        assert_eq!(report.vault_balance, 300);
        assert_eq!(report.pending.get(&a(SECRET_ONE_ADDRESS)), Some(&300));
        assert_eq!(report.steps[0].events, vec!["deposited"]);
    }

    #[test]
    fn signed_claim_and_replay_attempt() {
        let json = scenario_json(&format!(
            r#"[
                {{"op": "deposit", "from": "{FUNDER}", "amount": 600}},
                {{"op": "claim_signed", "relayer": "{BOB}", "secret": "{SECRET_ONE}",
                  "recipient": "{ALICE}", "deadline": 2000}},
                {{"op": "claim_signed", "relayer": "{BOB}", "secret": "{SECRET_ONE}",
                  "recipient": "{ALICE}", "deadline": 2000, "nonce": 0}}
            ]"#
        ));
        let report = replay(Scenario::from_json(&json).unwrap(), false).unwrap();
        assert_eq!(report.steps[1].value, Some(300));
        assert!(report.steps[2].error.is_some());
        assert_eq!(report.failed_steps, 1);
        assert_eq!(report.snapshot.nonces.get(&a(SECRET_ONE_ADDRESS)), Some(&1));
    }

    #[test]
    fn clock_advance_expires_requests() {
        let json = scenario_json(&format!(
            r#"[
                {{"op": "deposit", "from": "{FUNDER}", "amount": 600}},
                {{"op": "advance_clock", "secs": 1001}},
                {{"op": "claim_signed", "relayer": "{BOB}", "secret": "{SECRET_ONE}",
                  "recipient": "{ALICE}", "deadline": 2000}}
            ]"#
        ));
        let report = replay(Scenario::from_json(&json).unwrap(), false).unwrap();
        assert!(report.steps[2].error.as_deref().unwrap().contains("expired"));
    }

    #[test]
    fn strict_mode_stops_at_first_failure() {
        let json = scenario_json(&format!(
            r#"[
                {{"op": "pause", "caller": "{GUARDIAN}"}},
                {{"op": "deposit", "from": "{FUNDER}", "amount": 600}}
            ]"#
        ));
        let err = replay(Scenario::from_json(&json).unwrap(), true).unwrap_err();
        assert!(err.to_string().contains("step 1 (deposit)"));
    }

    #[test]
    fn paused_governance_still_applies() {
        let json = scenario_json(&format!(
            r#"[
                {{"op": "pause", "caller": "{GUARDIAN}"}},
                {{"op": "set_weights", "caller": "{GOVERNOR}", "accounts": ["{ALICE}"], "weights": [1]}},
                {{"op": "deposit", "from": "{FUNDER}", "amount": 1}}
            ]"#
        ));
        let report = replay(Scenario::from_json(&json).unwrap(), false).unwrap();
        assert!(report.steps[1].error.is_none());
        assert_eq!(report.steps[1].events, vec!["weight_changed"]);
        assert!(report.steps[2].error.is_some());
        assert_eq!(report.snapshot.total_weight, 501);
        assert!(report.snapshot.paused);
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(scenario_json("[]").as_bytes()).unwrap();
        let scenario = Scenario::load(file.path()).unwrap();
        assert_eq!(scenario.init.weights, vec![100, 200, 300]);
        assert_eq!(scenario.start_time, Some(1000));
    }

    #[test]
    fn missing_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let err = Scenario::load(&dir.path().join("absent.json")).unwrap_err();
        assert!(err.to_string().contains("absent.json"));
    }

    #[test]
    fn duplicate_init_accounts_fail_replay() {
        let json = format!(
            r#"{{"init": {{"guardian": "{GUARDIAN}", "governor": "{GOVERNOR}",
                 "accounts": ["{ALICE}", "{ALICE}"], "weights": [1, 2]}}}}"#
        );
        assert!(replay(Scenario::from_json(&json).unwrap(), false).is_err());
    }

    #[test]
    fn secret_parsing() {
        assert_eq!(parse_secret(SECRET_ONE).unwrap().address(), a(SECRET_ONE_ADDRESS));
        assert!(parse_secret("0x1234").is_err());
        assert!(parse_secret("zz").is_err());
        assert!(parse_secret(&"00".repeat(32)).is_err());
    }
}
