//! Domain identifier types with validation
//!
//! Newtype wrappers keep job identifiers and municipality geocodes from being
//! confused with arbitrary strings and integers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Upload job identifier
///
/// Names every artifact the ledger writes for a job, so it must be stable
/// and filesystem-safe. The simple (hyphen-less) UUID form is used on disk.
///
/// # Examples
///
/// ```
/// use sinan_ingest::domain::ids::JobId;
/// use std::str::FromStr;
///
/// let id = JobId::from_str("7d44b88c-4199-4bad-97dc-d78268e01398").unwrap();
/// assert_eq!(id.as_file_stem(), "7d44b88c41994bad97dcd78268e01398");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(Uuid);

impl JobId {
    /// Creates a fresh random job identifier
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the underlying UUID
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// Hyphen-less form used for artifact file names and staging table names
    pub fn as_file_stem(&self) -> String {
        self.0.simple().to_string()
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for JobId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|e| format!("Invalid job ID '{s}': {e}"))
    }
}

/// IBGE municipality geocode (7 digits, last one a verifier digit)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Geocode(i32);

impl Geocode {
    /// Weights applied to the six leading digits when computing the verifier
    const WEIGHTS: [u32; 6] = [1, 2, 1, 2, 1, 2];

    /// Builds a geocode from its textual form
    ///
    /// Seven digits are taken as is. Six digits are the legacy form without
    /// verifier, so the digit is computed and appended.
    pub fn parse(digits: &str) -> Result<Self, String> {
        let digits = digits.trim();
        if !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(format!("Geocode '{digits}' must contain only digits"));
        }
        match digits.len() {
            7 => digits
                .parse::<i32>()
                .map(Self)
                .map_err(|e| format!("Invalid geocode '{digits}': {e}")),
            6 => {
                let dv = Self::verifier_digit(digits)?;
                format!("{digits}{dv}")
                    .parse::<i32>()
                    .map(Self)
                    .map_err(|e| format!("Invalid geocode '{digits}': {e}"))
            }
            n => Err(format!("Geocode '{digits}' has {n} digits, expected 6 or 7")),
        }
    }

    /// Computes the IBGE verifier digit for a six digit municipality code
    pub fn verifier_digit(six_digits: &str) -> Result<u32, String> {
        if six_digits.len() != 6 {
            return Err(format!("Expected 6 digits, got '{six_digits}'"));
        }
        let mut sum = 0;
        for (c, weight) in six_digits.chars().zip(Self::WEIGHTS) {
            let digit = c
                .to_digit(10)
                .ok_or_else(|| format!("Non-digit character in '{six_digits}'"))?;
            let value = digit * weight;
            sum += if value > 9 { value / 10 + value % 10 } else { value };
        }
        Ok((10 - sum % 10) % 10)
    }

    /// Two-digit IBGE code of the federative unit this municipality belongs to
    pub fn uf_code(&self) -> u8 {
        (self.0 / 100_000) as u8
    }

    pub fn value(&self) -> i32 {
        self.0
    }
}

impl fmt::Display for Geocode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_id_roundtrip_through_display() {
        let id = JobId::new();
        let parsed = JobId::from_str(&id.to_string()).unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_job_id_invalid() {
        assert!(JobId::from_str("not-a-uuid").is_err());
    }

    #[test]
    fn test_geocode_seven_digits_kept() {
        let geocode = Geocode::parse("3304557").unwrap();
        assert_eq!(geocode.value(), 3304557);
        assert_eq!(geocode.uf_code(), 33);
    }

    #[test]
    fn test_geocode_six_digits_gets_verifier() {
        assert_eq!(Geocode::parse("330455").unwrap().value(), 3304557);
        assert_eq!(Geocode::parse("355030").unwrap().value(), 3550308);
    }

    #[test]
    fn test_verifier_digit_zero_when_sum_is_multiple_of_ten() {
        // 1*1 + 2*2 + 1*1 + 2*2 + 0 + 0 = 10
        assert_eq!(Geocode::verifier_digit("121200").unwrap(), 0);
    }

    #[test]
    fn test_geocode_rejects_bad_input() {
        assert!(Geocode::parse("33045").is_err());
        assert!(Geocode::parse("33O4557").is_err());
        assert!(Geocode::parse("").is_err());
    }
}
