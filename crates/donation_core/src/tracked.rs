use crate::{Decision, DonationRecord};

/// Donations already claimed for notification, in claim order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TrackedSet {
    records: Vec<DonationRecord>,
}

impl TrackedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a set from stored records; later duplicates are dropped.
    pub fn from_records(records: impl IntoIterator<Item = DonationRecord>) -> Self {
        let mut set = Self::new();
        for record in records {
            set.claim(record);
        }
        set
    }

    pub fn contains(&self, record: &DonationRecord) -> bool {
        self.records.contains(record)
    }

    /// Appends `record` unless already present. Returns whether it was appended.
    pub fn claim(&mut self, record: DonationRecord) -> bool {
        if self.contains(&record) {
            return false;
        }
        self.records.push(record);
        true
    }

    /// Removes `record` if present. Returns whether anything was removed.
    pub fn retract(&mut self, record: &DonationRecord) -> bool {
        match self.records.iter().position(|r| r == record) {
            Some(idx) => {
                self.records.remove(idx);
                true
            }
            None => false,
        }
    }

    /// Applies one planned decision. Returns whether the set changed.
    pub fn apply(&mut self, decision: &Decision) -> bool {
        match decision {
            Decision::Retract(record) => self.retract(record),
            Decision::Claim(record) => self.claim(record.clone()),
        }
    }

    pub fn records(&self) -> &[DonationRecord] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DonationRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl<'a> IntoIterator for &'a TrackedSet {
    type Item = &'a DonationRecord;
    type IntoIter = std::slice::Iter<'a, DonationRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
