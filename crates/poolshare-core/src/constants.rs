//! Ledger constants. All amounts are in the distributed token's smallest unit.

/// Fixed-point scale of the per-weight accumulator.
///
/// `acc_per_weight` is cumulative payout per unit of weight multiplied by
/// `SCALE`; a deposit equal to the total weight advances it by exactly `SCALE`.
pub const SCALE: u128 = 1_000_000_000_000_000_000;

/// EIP-712 domain type string.
pub const EIP712_DOMAIN_TYPE: &str =
    "EIP712Domain(string name,string version,uint256 chainId,address verifyingContract)";

/// EIP-712 type string of the delegated claim message.
pub const CLAIM_TYPE: &str =
    "Claim(address beneficiary,address recipient,uint256 nonce,uint256 deadline)";

/// Prefix bytes of an EIP-712 typed-data digest.
pub const EIP712_PREFIX: [u8; 2] = [0x19, 0x01];

/// Default signing-domain name.
pub const DEFAULT_DOMAIN_NAME: &str = "PoolShare";

/// Default signing-domain version.
pub const DEFAULT_DOMAIN_VERSION: &str = "1";

/// Default chain identifier (Ethereum mainnet).
pub const DEFAULT_CHAIN_ID: u64 = 1;

/// Length of a recoverable `r || s || v` signature.
pub const SIGNATURE_LEN: usize = 65;
