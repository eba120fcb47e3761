//! Short unique identifiers for templates.
//!
//! Components and pages often need an identifier that is unique across the
//! whole generated site, e.g. to scope a `<style>` block or to wire a label
//! to an input. Every component render and every page render gets one as the
//! `unique_id` template variable, and templates can ask for more with the
//! `gen_unique_id()` function.
//!
//! An id is 10 bytes from the operating system's CSPRNG, encoded as unpadded
//! URL-safe base64 (14 characters). Collisions are astronomically unlikely
//! but still checked: the issuer remembers every id it handed out during the
//! run and draws again on a repeat.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngCore;
use rand::rngs::OsRng;
use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};

/// Number of random bytes behind each identifier.
const ID_BYTES: usize = 10;

/// Issues identifiers that are unique for the lifetime of the issuer.
///
/// There is no way to release an id. The set is behind a mutex only because
/// the template engine requires its functions to be `Send + Sync`; the build
/// itself issues ids from a single thread.
#[derive(Debug, Default)]
pub struct UniqueIds {
    issued: Mutex<HashSet<String>>,
}

impl UniqueIds {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return a fresh identifier never returned before by this issuer.
    pub fn issue(&self) -> String {
        self.issue_with(random_id)
    }

    /// Number of identifiers issued so far.
    pub fn len(&self) -> usize {
        self.issued
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Draw candidates from `generate` until one is unused, then record it.
    fn issue_with(&self, mut generate: impl FnMut() -> String) -> String {
        let mut issued = self.issued.lock().unwrap_or_else(PoisonError::into_inner);
        loop {
            let id = generate();
            if issued.insert(id.clone()) {
                return id;
            }
        }
    }
}

fn random_id() -> String {
    let mut bytes = [0u8; ID_BYTES];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}
