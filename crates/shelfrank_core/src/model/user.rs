//! User domain model.

use serde::{Deserialize, Serialize};

/// Owner of a reading history.
///
/// Current scope ships a single implicit user ("me"), but the model keys
/// every reading by user id so multiple profiles stay representable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Stable external identifier, e.g. `me`.
    pub id: String,
    /// Display name.
    pub name: String,
}
