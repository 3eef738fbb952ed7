//! License key generation
//!
//! Keys stay human-shareable: the local hour, five random capitals, the
//! local date and four random digits, e.g. `14QWERT190120261234`.

use std::collections::HashSet;

use chrono::{DateTime, Local, Utc};
use rand::Rng;

const PLAIN_LETTERS: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const ACCENTED_LETTERS: &str = "ÀÂÇÉÈÊËÎÏÔÙÛÜ";
const LETTER_COUNT: usize = 5;

/// Generator for license keys
#[derive(Debug, Clone)]
pub struct LicenseKeyGenerator {
    alphabet: Vec<char>,
}

impl LicenseKeyGenerator {
    /// Generator drawing from `A`-`Z`
    pub fn new() -> Self {
        Self {
            alphabet: PLAIN_LETTERS.chars().collect(),
        }
    }

    /// Generator drawing from `A`-`Z` plus accented capitals
    pub fn accented() -> Self {
        Self {
            alphabet: PLAIN_LETTERS.chars().chain(ACCENTED_LETTERS.chars()).collect(),
        }
    }

    /// Generate a key stamped with `now` in local time
    pub fn generate(&self, now: DateTime<Utc>) -> String {
        let local = now.with_timezone(&Local);
        let mut rng = rand::thread_rng();

        let letters: String = (0..LETTER_COUNT)
            .map(|_| self.alphabet[rng.gen_range(0..self.alphabet.len())])
            .collect();
        let digits = rng.gen_range(0..10_000u32);

        format!(
            "{}{}{}{:04}",
            local.format("%H"),
            letters,
            local.format("%d%m%Y"),
            digits
        )
    }

    /// Generate a key not present in `existing`
    pub fn generate_unique(&self, now: DateTime<Utc>, existing: &HashSet<String>) -> String {
        loop {
            let key = self.generate(now);

            if !existing.contains(&key) {
                return key;
            }
        }
    }
}

impl Default for LicenseKeyGenerator {
    fn default() -> Self {
        Self::new()
    }
}
