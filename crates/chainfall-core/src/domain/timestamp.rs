use std::fmt::{Display, Formatter};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::ValidationError;

/// Wall-clock instant pinned to UTC.
///
/// Circuit cool-downs and envelope metadata compare these values directly,
/// so a non-UTC offset is rejected at the boundary instead of normalized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UtcDateTime(OffsetDateTime);

impl UtcDateTime {
    pub fn now() -> Self {
        Self(OffsetDateTime::now_utc())
    }

    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let instant = OffsetDateTime::parse(input, &Rfc3339).map_err(|_| {
            ValidationError::MalformedTimestamp {
                value: input.to_owned(),
            }
        })?;

        let offset = instant.offset();
        if !offset.is_utc() {
            return Err(ValidationError::TimestampNotUtc {
                value: input.to_owned(),
                offset: offset.to_string(),
            });
        }

        Ok(Self(instant))
    }

    /// Moves forward by `duration`, clamping at the largest representable instant.
    pub fn saturating_add(self, duration: Duration) -> Self {
        let step = time::Duration::try_from(duration).unwrap_or(time::Duration::MAX);
        Self(self.0.saturating_add(step))
    }

    /// Signed milliseconds elapsed since `earlier`.
    pub fn millis_since(self, earlier: Self) -> i128 {
        (self.0 - earlier.0).whole_milliseconds()
    }

    pub fn format_rfc3339(self) -> String {
        // Only years past 9999 fail RFC3339 formatting; a saturated clock can get there.
        match self.0.format(&Rfc3339) {
            Ok(text) => text,
            Err(_) => self.0.to_string(),
        }
    }
}

impl Display for UtcDateTime {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.format_rfc3339())
    }
}

impl TryFrom<String> for UtcDateTime {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<UtcDateTime> for String {
    fn from(value: UtcDateTime) -> Self {
        value.format_rfc3339()
    }
}
