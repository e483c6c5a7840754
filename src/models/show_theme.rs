//! Show theme model

use serde::{Deserialize, Serialize};

/// A label attached to astronomy shows ("Stars", "Black holes", ...).
///
/// Shows and themes are many-to-many; the filter query `genres` matches
/// against theme ids.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ShowTheme {
    pub id: i64,
    /// Unique name
    pub name: String,
}

impl ShowTheme {
    /// Create a new theme; the ID is assigned by the database.
    pub fn new(name: String) -> Self {
        Self { id: 0, name }
    }
}
