use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// CardIdentity - the (name, number) pair used for cross-site matching
// ---------------------------------------------------------------------------

/// Identity of a physical card as extracted from a marketplace title.
///
/// `number` is a decimal digit string or empty. Leading zeros carry no
/// meaning: `"080"` and `"80"` name the same card number.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CardIdentity {
    pub name: String,
    pub number: String,
}

impl CardIdentity {
    pub fn new(name: impl Into<String>, number: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            number: number.into(),
        }
    }

    /// The number with leading zeros removed (`""` and `"000"` become `"0"`).
    pub fn normalized_number(&self) -> &str {
        crate::matching::normalize_number(&self.number)
    }
}
