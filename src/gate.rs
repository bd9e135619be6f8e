// 🔐 Access Gate - single shared-secret unlock per session
// LOCKED → UNLOCKED on a matching credential; UNLOCKED is terminal

use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fmt;
use std::sync::Arc;
use subtle::{Choice, ConstantTimeEq};
use tracing::{info, warn};
use zeroize::Zeroizing;

/// Width of every comparison the gate performs, independent of input length
pub const DIGEST_LEN: usize = 32;

/// Configured access secret. Wiped on drop, redacted in `Debug`.
#[derive(Clone)]
pub struct Secret(Zeroizing<String>);

impl Secret {
    pub fn new(value: String) -> Self {
        Self(Zeroizing::new(value))
    }

    pub fn expose(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

/// Fixed-width digest both sides are reduced to before comparing
pub fn credential_digest(bytes: &[u8]) -> Zeroizing<[u8; DIGEST_LEN]> {
    let mut out = Zeroizing::new([0u8; DIGEST_LEN]);
    out.copy_from_slice(&Sha256::digest(bytes));
    out
}

/// Compare two digests without branching on their contents.
///
/// Every byte pair is visited, in order, whatever the result; `visit` is
/// called once per pair.
pub fn digests_match(
    expected: &[u8; DIGEST_LEN],
    submitted: &[u8; DIGEST_LEN],
    mut visit: impl FnMut(usize),
) -> Choice {
    let mut equal = Choice::from(1u8);
    for (i, (a, b)) in expected.iter().zip(submitted.iter()).enumerate() {
        equal &= a.ct_eq(b);
        visit(i);
    }
    equal
}

/// Timing-safe equality: both inputs are hashed to 32 bytes and compared
/// with `subtle`, so neither the mismatch position nor the lengths leak.
pub fn secrets_match(expected: &[u8], submitted: &[u8]) -> bool {
    let expected = credential_digest(expected);
    let submitted = credential_digest(submitted);
    bool::from(digests_match(&expected, &submitted, |_| {}))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GateState {
    Locked,
    Unlocked,
}

#[derive(Debug, Clone)]
pub struct AccessGate {
    secret: Arc<Secret>,
    state: GateState,
}

impl AccessGate {
    pub fn new(secret: Arc<Secret>) -> Self {
        Self {
            secret,
            state: GateState::Locked,
        }
    }

    pub fn state(&self) -> GateState {
        self.state
    }

    pub fn is_unlocked(&self) -> bool {
        self.state == GateState::Unlocked
    }

    /// Check a submitted credential. The credential is consumed and wiped
    /// before this returns, whatever the outcome.
    pub fn check(&mut self, credential: String) -> bool {
        let credential = Zeroizing::new(credential);

        if self.is_unlocked() {
            return true;
        }

        if secrets_match(self.secret.expose().as_bytes(), credential.as_bytes()) {
            self.state = GateState::Unlocked;
            info!("session unlocked");
            true
        } else {
            warn!("incorrect password submitted");
            false
        }
    }
}
