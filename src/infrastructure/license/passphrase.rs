//! Shared admin passphrase

use sha2::{Digest, Sha256};

/// Admin passphrase, held only as a SHA-256 digest
#[derive(Clone)]
pub struct AdminPassphrase {
    digest: Option<[u8; 32]>,
}

impl AdminPassphrase {
    /// An empty passphrase disables admin access entirely
    pub fn new(passphrase: &str) -> Self {
        let digest = (!passphrase.is_empty()).then(|| digest(passphrase));
        Self { digest }
    }

    pub fn is_configured(&self) -> bool {
        self.digest.is_some()
    }

    /// Check a presented passphrase without leaking timing information
    pub fn verify(&self, presented: &str) -> bool {
        match &self.digest {
            Some(expected) => constant_time_compare(expected, &digest(presented)),
            None => false,
        }
    }
}

impl std::fmt::Debug for AdminPassphrase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminPassphrase")
            .field("configured", &self.is_configured())
            .finish()
    }
}

fn digest(value: &str) -> [u8; 32] {
    Sha256::digest(value.as_bytes()).into()
}

fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
