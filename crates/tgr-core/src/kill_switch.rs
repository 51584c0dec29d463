use std::sync::atomic::{AtomicBool, Ordering};

use sha2::{Digest, Sha256};

use crate::{errors::Error, Result};

/// Password-gated disable flag.
///
/// Only the SHA-256 digest of the password is kept in memory.
#[derive(Debug)]
pub struct KillSwitch {
    digest: Option<[u8; 32]>,
    disabled: AtomicBool,
}

impl KillSwitch {
    pub fn new(password: Option<&str>, start_disabled: bool) -> Self {
        Self {
            digest: password.map(hash),
            disabled: AtomicBool::new(start_disabled),
        }
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled.load(Ordering::SeqCst)
    }

    /// Flip the flag if `password` matches; returns the new state.
    pub fn toggle(&self, password: &str) -> Result<bool> {
        self.check(password)?;
        let previous = self.disabled.fetch_xor(true, Ordering::SeqCst);
        Ok(!previous)
    }

    fn check(&self, password: &str) -> Result<()> {
        let Some(expected) = &self.digest else {
            return Err(Error::Unauthorized);
        };
        if !digests_equal(expected, &hash(password)) {
            return Err(Error::Unauthorized);
        }
        Ok(())
    }
}

fn hash(password: &str) -> [u8; 32] {
    Sha256::digest(password.as_bytes()).into()
}

fn digests_equal(a: &[u8; 32], b: &[u8; 32]) -> bool {
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toggles_with_correct_password() {
        let ks = KillSwitch::new(Some("open sesame"), false);
        assert!(!ks.is_disabled());
        assert!(ks.toggle("open sesame").unwrap());
        assert!(ks.is_disabled());
        assert!(!ks.toggle("open sesame").unwrap());
        assert!(!ks.is_disabled());
    }

    #[test]
    fn wrong_password_leaves_state() {
        let ks = KillSwitch::new(Some("right"), true);
        assert!(matches!(ks.toggle("wrong"), Err(Error::Unauthorized)));
        assert!(matches!(ks.toggle(""), Err(Error::Unauthorized)));
        assert!(ks.is_disabled());
    }

    #[test]
    fn unconfigured_switch_refuses_everything() {
        let ks = KillSwitch::new(None, false);
        assert!(matches!(ks.toggle(""), Err(Error::Unauthorized)));
        assert!(matches!(ks.toggle("anything"), Err(Error::Unauthorized)));
        assert!(!ks.is_disabled());
    }
}
