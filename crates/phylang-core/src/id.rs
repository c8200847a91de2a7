//! Stable identifier newtype for variables.
//!
//! Every binder in the typed IR carries a `UniqId` assigned by the type
//! checker's fresh-name generator. The interpreter's heap is keyed by
//! `UniqId`, never by source name, so shadowing never merges scopes.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Unique variable identity within one elaborated expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UniqId(pub u32);

impl fmt::Display for UniqId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
