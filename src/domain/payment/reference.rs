//! Human-readable payment reference numbers (`PAY-20240115-0001`).

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::foundation::{Timestamp, ValidationError};

const PREFIX: &str = "PAY";

/// Minimum width of the sequence part; larger sequences simply grow.
const SEQUENCE_WIDTH: usize = 4;

/// Globally unique reference printed on receipts and emails.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReferenceNumber(String);

impl ReferenceNumber {
    /// Formats a reference from the creation date and a sequence value.
    pub fn generate(created_at: &Timestamp, sequence: u64) -> Self {
        Self(format!(
            "{}-{}-{:0width$}",
            PREFIX,
            created_at.compact_date(),
            sequence,
            width = SEQUENCE_WIDTH
        ))
    }

    /// Wraps a stored reference, checking its shape.
    pub fn parse(value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = value.into();
        let mut parts = value.splitn(3, '-');
        let valid = matches!(
            (parts.next(), parts.next(), parts.next()),
            (Some(PREFIX), Some(date), Some(seq))
                if date.len() == 8
                    && date.chars().all(|c| c.is_ascii_digit())
                    && seq.len() >= SEQUENCE_WIDTH
                    && seq.chars().all(|c| c.is_ascii_digit())
        );
        if !valid {
            return Err(ValidationError::invalid_format(
                "reference_number",
                "expected PAY-YYYYMMDD-NNNN",
            ));
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ReferenceNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
