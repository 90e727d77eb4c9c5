use std::fmt;
use std::str::FromStr;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

/// Non-negative donation amount held as whole cents.
///
/// Parsing and formatting both use a plain decimal with at most two
/// fractional digits, so a value survives a save/load cycle unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Amount {
    cents: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AmountError {
    #[error("amount is empty")]
    Empty,
    #[error("invalid amount {0:?}")]
    Invalid(String),
    #[error("amount {0:?} has more than two decimal places")]
    TooPrecise(String),
    #[error("amount {0:?} is out of range")]
    OutOfRange(String),
}

impl Amount {
    pub const ZERO: Amount = Amount { cents: 0 };

    pub const fn from_cents(cents: u64) -> Self {
        Self { cents }
    }

    pub const fn from_dollars(dollars: u64) -> Self {
        Self {
            cents: dollars.saturating_mul(100),
        }
    }

    pub const fn cents(self) -> u64 {
        self.cents
    }

    pub const fn whole_dollars(self) -> u64 {
        self.cents / 100
    }

    /// Strict comparison used for qualification: equal is not enough.
    pub fn exceeds(self, minimum: Amount) -> bool {
        self > minimum
    }

    /// Least whole-dollar amount that exceeds `self`.
    pub fn smallest_whole_dollar_above(self) -> Amount {
        let dollars = self.cents / 100;
        Amount::from_dollars(dollars.saturating_add(1))
    }

    /// Converts a floating point dollar value, rounding to the nearest cent.
    pub fn from_dollars_f64(value: f64) -> Option<Amount> {
        if !value.is_finite() || value < 0.0 {
            return None;
        }
        let cents = (value * 100.0).round();
        if cents > u64::MAX as f64 {
            return None;
        }
        Some(Amount::from_cents(cents as u64))
    }
}

impl FromStr for Amount {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(AmountError::Empty);
        }
        let (grouped, frac) = trimmed.split_once('.').unwrap_or((trimmed, ""));
        let whole = ungroup(grouped).ok_or_else(|| AmountError::Invalid(trimmed.to_string()))?;

        let all_digits = |part: &str| part.chars().all(|c| c.is_ascii_digit());
        if (whole.is_empty() && frac.is_empty()) || !all_digits(&whole) || !all_digits(frac) {
            return Err(AmountError::Invalid(trimmed.to_string()));
        }
        if frac.len() > 2 {
            return Err(AmountError::TooPrecise(trimmed.to_string()));
        }

        let out_of_range = || AmountError::OutOfRange(trimmed.to_string());
        let whole_cents = if whole.is_empty() {
            0
        } else {
            whole
                .parse::<u64>()
                .ok()
                .and_then(|w| w.checked_mul(100))
                .ok_or_else(out_of_range)?
        };
        let frac_cents = match frac.len() {
            0 => 0,
            1 => frac.parse::<u64>().map_err(|_| out_of_range())? * 10,
            _ => frac.parse::<u64>().map_err(|_| out_of_range())?,
        };
        whole_cents
            .checked_add(frac_cents)
            .map(Amount::from_cents)
            .ok_or_else(out_of_range)
    }
}

/// Strips thousands separators from the whole part. Commas are accepted only
/// between three-digit groups (`1,234,567`), never at the edges or in groups
/// of another width.
fn ungroup(whole: &str) -> Option<String> {
    if !whole.contains(',') {
        return Some(whole.to_string());
    }
    let mut groups = whole.split(',');
    let lead = groups.next()?;
    if lead.is_empty() || lead.len() > 3 {
        return None;
    }
    let mut digits = lead.to_string();
    for group in groups {
        if group.len() != 3 {
            return None;
        }
        digits.push_str(group);
    }
    Some(digits)
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.cents / 100, self.cents % 100)
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}
