//! CNNVD identifier parsing and ordering
//!
//! Implements the identifier format `CNNVD-YYYYMM-NNNN` and the `(year, month)`
//! [`Window`] used to query the listing endpoint.

use chrono::{DateTime, Datelike, Utc};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Identifier prefix used by every CNNVD record
pub const PREFIX: &str = "CNNVD";

/// Oldest year the database holds records for
pub const MIN_YEAR: i32 = 1988;

/// First month of a year
pub const MIN_MONTH: u32 = 1;

/// Last month of a year
pub const MAX_MONTH: u32 = 12;

/// Longest sequence accepted (keeps the numeric value inside `u32`)
const MAX_SEQUENCE_DIGITS: usize = 9;

/// A `(year, month)` query scope
///
/// Field order matters: the derived ordering compares year first, then month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Window {
    /// Year (>= 1988)
    pub year: i32,
    /// Month (1-12)
    pub month: u32,
}

impl Window {
    /// Create a window, validating the database bounds
    pub fn new(year: i32, month: u32) -> Result<Self, IdentifierError> {
        if year < MIN_YEAR {
            return Err(IdentifierError::OutOfRange(format!(
                "year {year} is before {MIN_YEAR}"
            )));
        }
        if !(MIN_MONTH..=MAX_MONTH).contains(&month) {
            return Err(IdentifierError::OutOfRange(format!(
                "month {month} is outside {MIN_MONTH}-{MAX_MONTH}"
            )));
        }
        Ok(Self { year, month })
    }

    /// The oldest window the database can contain (1988-01)
    pub const fn floor() -> Self {
        Self {
            year: MIN_YEAR,
            month: MIN_MONTH,
        }
    }

    /// Window containing the given instant
    pub fn containing(now: DateTime<Utc>) -> Self {
        Self {
            year: now.year(),
            month: now.month(),
        }
    }

    /// The month following this one
    pub fn next(&self) -> Self {
        if self.month == MAX_MONTH {
            Self {
                year: self.year + 1,
                month: MIN_MONTH,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }

    /// Keyword the listing endpoint expects for "all records in this month"
    ///
    /// ```
    /// use cnnvd_harvester::identifier::Window;
    ///
    /// let window = Window::new(2023, 4).unwrap();
    /// assert_eq!(window.keyword(), "CNNVD-202304");
    /// ```
    pub fn keyword(&self) -> String {
        format!("{PREFIX}-{:04}{:02}", self.year, self.month)
    }
}

impl fmt::Display for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// CNNVD vulnerability identifier, e.g. `CNNVD-202304-0662`
///
/// The sequence part is optional so a bare `CNNVD-202304` can stand for a
/// whole month. Chronological comparisons look only at `(year, month)`; two
/// identifiers from the same month are "the same window" even when their
/// sequences differ.
///
/// # Examples
///
/// ```
/// use cnnvd_harvester::identifier::CnnvdIdentifier;
///
/// let id = CnnvdIdentifier::parse("CNNVD-202212-0099").unwrap();
/// assert_eq!(id.year(), 2022);
/// assert_eq!(id.month(), 12);
/// assert_eq!(id.sequence(), Some(99));
/// assert_eq!(id.to_string(), "CNNVD-202212-0099");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CnnvdIdentifier {
    window: Window,
    sequence: Option<String>,
}

impl CnnvdIdentifier {
    /// Parse an identifier string
    ///
    /// Input is case-insensitive and surrounding whitespace is ignored.
    ///
    /// # Errors
    ///
    /// Returns [`IdentifierError::Malformed`] if the string does not have the
    /// shape `CNNVD-YYYYMM[-NNNN]`, or [`IdentifierError::OutOfRange`] if the
    /// year or month fall outside the database bounds.
    pub fn parse(s: &str) -> Result<Self, IdentifierError> {
        let normalized = s.trim().to_uppercase();
        let parts: Vec<&str> = normalized.split('-').collect();
        if parts.len() < 2 || parts.len() > 3 {
            return Err(IdentifierError::Malformed(format!(
                "'{s}': expected {PREFIX}-YYYYMM-NNNN"
            )));
        }

        if parts[0] != PREFIX {
            return Err(IdentifierError::Malformed(format!(
                "'{s}': prefix must be {PREFIX}"
            )));
        }

        let date = parts[1];
        if date.len() != 6 || !date.bytes().all(|b| b.is_ascii_digit()) {
            return Err(IdentifierError::Malformed(format!(
                "'{s}': date part must be six digits (YYYYMM)"
            )));
        }
        // Both slices are ASCII digits, so parsing cannot fail
        let year: i32 = date[..4]
            .parse()
            .map_err(|_| IdentifierError::Malformed(format!("'{s}': invalid year")))?;
        let month: u32 = date[4..]
            .parse()
            .map_err(|_| IdentifierError::Malformed(format!("'{s}': invalid month")))?;
        let window = Window::new(year, month)?;

        let sequence = match parts.get(2) {
            None => None,
            Some(seq) => {
                if seq.is_empty()
                    || seq.len() > MAX_SEQUENCE_DIGITS
                    || !seq.bytes().all(|b| b.is_ascii_digit())
                {
                    return Err(IdentifierError::Malformed(format!(
                        "'{s}': sequence must be 1-{MAX_SEQUENCE_DIGITS} digits"
                    )));
                }
                Some((*seq).to_string())
            }
        };

        Ok(Self { window, sequence })
    }

    /// Parse a stored "latest identifier" value
    ///
    /// An empty string means no record has been seen yet and resolves to
    /// [`CnnvdIdentifier::oldest`] instead of failing.
    pub fn parse_or_oldest(s: &str) -> Result<Self, IdentifierError> {
        if s.trim().is_empty() {
            return Ok(Self::oldest());
        }
        Self::parse(s)
    }

    /// Sentinel identifier dated to the database's oldest month
    pub fn oldest() -> Self {
        Self::from_window(Window::floor())
    }

    /// Identifier that stands for a whole month (no sequence)
    pub fn from_window(window: Window) -> Self {
        Self {
            window,
            sequence: None,
        }
    }

    /// The `(year, month)` this identifier belongs to
    pub fn window(&self) -> Window {
        self.window
    }

    /// Year component
    pub fn year(&self) -> i32 {
        self.window.year
    }

    /// Month component (1-12)
    pub fn month(&self) -> u32 {
        self.window.month
    }

    /// Sequence number within the month, if present
    pub fn sequence(&self) -> Option<u32> {
        self.sequence.as_deref().and_then(|s| s.parse().ok())
    }

    /// Keyword the listing endpoint expects for this identifier's month
    pub fn keyword(&self) -> String {
        self.window.keyword()
    }

    /// Chronological comparison on `(year, month)` only
    pub fn compare(&self, other: &Self) -> Ordering {
        self.window.cmp(&other.window)
    }

    /// Strictly later month than `other`
    pub fn is_after(&self, other: &Self) -> bool {
        self.compare(other) == Ordering::Greater
    }
}

impl fmt::Display for CnnvdIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.window.keyword())?;
        if let Some(seq) = &self.sequence {
            write!(f, "-{seq}")?;
        }
        Ok(())
    }
}

impl FromStr for CnnvdIdentifier {
    type Err = IdentifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Errors that can occur during identifier parsing
///
/// Both variants mean the input is not a usable CNNVD identifier; they only
/// differ in what is wrong with it. Callers that need a single "malformed"
/// check should use [`IdentifierError::is_malformed`].
#[derive(Debug, thiserror::Error)]
pub enum IdentifierError {
    /// String does not have the identifier shape
    #[error("malformed identifier {0}")]
    Malformed(String),

    /// Well-formed, but the year or month is outside the database bounds
    #[error("identifier out of range: {0}")]
    OutOfRange(String),
}

impl IdentifierError {
    /// True for every parse failure, bad shape and out-of-bounds date alike
    pub fn is_malformed(&self) -> bool {
        matches!(self, IdentifierError::Malformed(_) | IdentifierError::OutOfRange(_))
    }
}
