use serde::{Deserialize, Serialize};

use crate::Amount;

/// One row of the fundraiser's donor table.
///
/// There is no donation id on the source page, so the full tuple is the
/// identity: two records are the same donation iff every field matches.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DonationRecord {
    pub donor_name: String,
    pub location: String,
    pub amount: Amount,
    /// May span several lines, or be empty.
    pub message: String,
}

impl DonationRecord {
    pub fn new(
        donor_name: impl Into<String>,
        location: impl Into<String>,
        amount: Amount,
        message: impl Into<String>,
    ) -> Self {
        Self {
            donor_name: donor_name.into(),
            location: location.into(),
            amount,
            message: message.into(),
        }
    }

    pub fn qualifies(&self, minimum: Amount) -> bool {
        self.amount.exceeds(minimum)
    }
}
