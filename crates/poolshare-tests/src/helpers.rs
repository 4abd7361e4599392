//! Shared fixtures for scenario and adversarial tests.

use std::sync::{Arc, Mutex, OnceLock, Weak};

use poolshare_core::crypto::KeyPair;
use poolshare_core::error::{TransferError, VaultError};
use poolshare_core::traits::{Clock, EventSink, TokenTransfer};
use poolshare_core::types::{Address, Amount, ClaimRequest, Weight};
use poolshare_ledger::{ManualClock, MemoryToken, RecordingSink, Vault, VaultConfig, VaultInit};

/// Fixed wall-clock start for every fixture.
pub const NOW: u64 = 1_700_000_000;

/// Balance minted to [`depositor`] in every fixture.
pub const DEPOSITOR_FUNDS: Amount = 1_000_000_000_000;

pub type TestVault = Vault<MemoryToken, RecordingSink, ManualClock>;

/// Deterministic address from a seed byte.
pub fn addr(seed: u8) -> Address {
    Address::repeat_byte(seed)
}

pub fn guardian() -> Address {
    addr(0xe1)
}

pub fn governor() -> Address {
    addr(0xe2)
}

pub fn depositor() -> Address {
    addr(0xd0)
}

pub fn relayer() -> Address {
    addr(0x5e)
}

fn init(participants: &[(Address, Weight)]) -> VaultInit {
    participants
        .iter()
        .fold(VaultInit::new(guardian(), governor()), |init, (a, w)| {
            init.with_participant(*a, *w)
        })
}

fn funded_token() -> MemoryToken {
    let token = MemoryToken::new();
    token.mint(&depositor(), DEPOSITOR_FUNDS);
    token.approve(&depositor(), Amount::MAX);
    token
}

/// A vault with the default config and a funded, fully approved depositor.
pub fn vault(participants: &[(Address, Weight)]) -> TestVault {
    vault_with_config(VaultConfig::default(), participants)
}

pub fn vault_with_config(config: VaultConfig, participants: &[(Address, Weight)]) -> TestVault {
    Vault::initialize(
        config,
        init(participants),
        funded_token(),
        RecordingSink::new(),
        ManualClock::new(NOW),
    )
    .unwrap()
}

/// Sign a claim for `kp` at its live nonce.
pub fn signed_request<T, E, C>(
    vault: &Vault<T, E, C>,
    kp: &KeyPair,
    recipient: Address,
    deadline: u64,
) -> ClaimRequest
where
    T: TokenTransfer,
    E: EventSink,
    C: Clock,
{
    let nonce = vault.nonce_of(&kp.address());
    signed_request_at(vault, kp, recipient, nonce, deadline)
}

/// Sign a claim for `kp` at an explicit nonce.
pub fn signed_request_at<T, E, C>(
    vault: &Vault<T, E, C>,
    kp: &KeyPair,
    recipient: Address,
    nonce: u64,
    deadline: u64,
) -> ClaimRequest
where
    T: TokenTransfer,
    E: EventSink,
    C: Clock,
{
    let digest = vault.claim_digest(kp.address(), recipient, nonce, deadline);
    ClaimRequest {
        beneficiary: kp.address(),
        recipient,
        deadline,
        signature: kp.sign_prehash(&digest).unwrap(),
    }
}

/// Sum of token balances held by `accounts`.
pub fn paid_to(vault: &TestVault, accounts: &[Address]) -> Amount {
    accounts.iter().map(|a| vault.token().balance_of(a)).sum()
}

// ---------------------------------------------------------------------------
// Re-entering token
// ---------------------------------------------------------------------------

/// Nested operation a [`HookedToken`] attempts from inside a transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reentry {
    Deposit,
    Claim,
    SetWeights,
    Pause,
}

pub type HookedVault = Vault<Arc<HookedToken>, RecordingSink, ManualClock>;

/// A token that calls back into its vault during pull or push and records
/// what the nested call returned.
#[derive(Debug, Default)]
pub struct HookedToken {
    inner: MemoryToken,
    vault: OnceLock<Weak<HookedVault>>,
    on_pull: Mutex<Option<Reentry>>,
    on_push: Mutex<Option<Reentry>>,
    nested: Mutex<Vec<Result<(), VaultError>>>,
}

impl HookedToken {
    pub fn inner(&self) -> &MemoryToken {
        &self.inner
    }

    pub fn on_pull(&self, hook: Reentry) {
        *self.on_pull.lock().unwrap() = Some(hook);
    }

    pub fn on_push(&self, hook: Reentry) {
        *self.on_push.lock().unwrap() = Some(hook);
    }

    /// Results of every nested call attempted so far.
    pub fn nested_results(&self) -> Vec<Result<(), VaultError>> {
        self.nested.lock().unwrap().clone()
    }

    fn fire(&self, hook: Option<Reentry>) {
        let Some(hook) = hook else { return };
        let Some(vault) = self.vault.get().and_then(Weak::upgrade) else {
            return;
        };
        let attacker = addr(0xaa);
        let result = match hook {
            Reentry::Deposit => vault.deposit(&depositor(), 1).map(|_| ()),
            Reentry::Claim => vault.claim(&attacker, &attacker).map(|_| ()),
            Reentry::SetWeights => vault.set_weights(&governor(), &[attacker], &[1_000]),
            Reentry::Pause => vault.pause(&guardian()),
        };
        self.nested.lock().unwrap().push(result);
    }
}

impl TokenTransfer for HookedToken {
    fn pull(&self, from: &Address, amount: Amount) -> Result<(), TransferError> {
        let hook = *self.on_pull.lock().unwrap();
        self.fire(hook);
        self.inner.pull(from, amount)
    }

    fn push(&self, to: &Address, amount: Amount) -> Result<(), TransferError> {
        let hook = *self.on_push.lock().unwrap();
        self.fire(hook);
        self.inner.push(to, amount)
    }
}

/// A vault wired to a [`HookedToken`] that points back at it.
pub fn hooked_vault(participants: &[(Address, Weight)]) -> (Arc<HookedVault>, Arc<HookedToken>) {
    let token = Arc::new(HookedToken::default());
    token.inner.mint(&depositor(), DEPOSITOR_FUNDS);
    token.inner.approve(&depositor(), Amount::MAX);
    let vault = Arc::new(
        Vault::initialize(
            VaultConfig::default(),
            init(participants),
            Arc::clone(&token),
            RecordingSink::new(),
            ManualClock::new(NOW),
        )
        .unwrap(),
    );
    let _ = token.vault.set(Arc::downgrade(&vault));
    (vault, token)
}
