//! Cron expression parsing and evaluation
//!
//! Provides the six-field cron dialect used by the scheduler: second, minute,
//! hour, day-of-month, month, weekday (Sunday = 0). Expressions with five
//! fields omit the seconds slot, which is canonicalized to a literal `"00"`.
//!
//! Supported token forms per field:
//! - `*` matches any value
//! - `*/n` (divisor form) matches when `value % n == 0`; a timestamp
//!   component of zero is substituted with the field's natural modulus first,
//!   so a zero-valued unit is treated as "on the boundary" rather than always
//!   divisible
//! - explicit values, comma lists, and inclusive ranges (`a-b`), in any
//!   combination (`1,3,9-17`)
//!
//! Anything else fails parsing; evaluation never guesses.
//!
//! # Examples
//!
//! ```
//! use chrono::{TimeZone, Utc};
//! use tempo_common::time::cron::CronSchedule;
//!
//! // 00:00 on the 1st of each month
//! let cron = CronSchedule::parse("0 0 1 * *").unwrap();
//! let dt = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
//! assert!(cron.is_due(&dt));
//!
//! // Every 15 seconds
//! let cron = CronSchedule::parse("*/15 * * * * *").unwrap();
//! ```

use std::fmt;

use chrono::{DateTime, Datelike, Timelike, Utc};
use thiserror::Error;

/// Error type for cron parsing
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CronParseError {
    /// Wrong token count or an empty token; names the offending input.
    #[error("Malformed cron expression: {0}")]
    MalformedExpression(String),

    /// A field token that matches no supported form.
    #[error("Invalid field: {0}")]
    InvalidField(String),

    /// A `*/n` divisor that is non-numeric or zero.
    #[error("Invalid divisor: {0}")]
    InvalidDivisor(String),

    /// A value or range outside the field's bounds.
    #[error("Invalid range: {0}")]
    InvalidRange(String),
}

/// One of the six logical cron slots, with its natural modulus and bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Second,
    Minute,
    Hour,
    DayOfMonth,
    Month,
    Weekday,
}

impl Slot {
    /// The field's natural modulus, used for zero substitution in divisor
    /// matching.
    const fn modulus(self) -> u32 {
        match self {
            Self::Second | Self::Minute => 60,
            Self::Hour => 24,
            Self::DayOfMonth => 31,
            Self::Month => 12,
            Self::Weekday => 7,
        }
    }

    const fn min(self) -> u32 {
        match self {
            Self::DayOfMonth | Self::Month => 1,
            _ => 0,
        }
    }

    const fn max(self) -> u32 {
        match self {
            Self::DayOfMonth | Self::Month => self.modulus(),
            _ => self.modulus() - 1,
        }
    }
}

/// A single parsed atom of the generic list/range matcher.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Atom {
    Single(u32),
    Range(u32, u32),
}

impl Atom {
    fn contains(&self, value: u32) -> bool {
        match self {
            Self::Single(v) => *v == value,
            Self::Range(start, end) => value >= *start && value <= *end,
        }
    }
}

/// Parsed form of one field token.
#[derive(Debug, Clone, PartialEq, Eq)]
enum FieldExpr {
    Any,
    Divisor(u32),
    Set(Vec<Atom>),
}

/// One cron field: raw text, natural modulus, and its parsed form.
///
/// Constructed once at parse time and immutable thereafter; the raw text is
/// retained for display and for programmatic weekday composition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CronField {
    text: String,
    modulus: u32,
    expr: FieldExpr,
}

impl CronField {
    fn parse(text: &str, slot: Slot) -> Result<Self, CronParseError> {
        if text.is_empty() {
            return Err(CronParseError::InvalidField(text.to_string()));
        }

        let expr = if text == "*" {
            FieldExpr::Any
        } else if let Some(divisor_text) = text.strip_prefix("*/") {
            let divisor: u32 = divisor_text
                .parse()
                .map_err(|_| CronParseError::InvalidDivisor(text.to_string()))?;
            if divisor == 0 {
                return Err(CronParseError::InvalidDivisor(text.to_string()));
            }
            FieldExpr::Divisor(divisor)
        } else {
            FieldExpr::Set(Self::parse_set(text, slot)?)
        };

        Ok(Self { text: text.to_string(), modulus: slot.modulus(), expr })
    }

    /// Generic multi-value matcher: single integers, comma lists, and
    /// inclusive `a-b` ranges.
    fn parse_set(text: &str, slot: Slot) -> Result<Vec<Atom>, CronParseError> {
        let mut atoms = Vec::new();

        for part in text.split(',') {
            if part.is_empty() {
                return Err(CronParseError::InvalidField(text.to_string()));
            }

            if let Some((start_text, end_text)) = part.split_once('-') {
                let start: u32 = start_text
                    .parse()
                    .map_err(|_| CronParseError::InvalidRange(part.to_string()))?;
                let end: u32 = end_text
                    .parse()
                    .map_err(|_| CronParseError::InvalidRange(part.to_string()))?;

                if start > end || start < slot.min() || end > slot.max() {
                    return Err(CronParseError::InvalidRange(format!(
                        "{} not valid in range {}-{}",
                        part,
                        slot.min(),
                        slot.max()
                    )));
                }
                atoms.push(Atom::Range(start, end));
            } else {
                let value: u32 =
                    part.parse().map_err(|_| CronParseError::InvalidField(text.to_string()))?;

                if value < slot.min() || value > slot.max() {
                    return Err(CronParseError::InvalidRange(format!(
                        "{} not in range {}-{}",
                        value,
                        slot.min(),
                        slot.max()
                    )));
                }
                atoms.push(Atom::Single(value));
            }
        }

        Ok(atoms)
    }

    /// Check whether a timestamp component satisfies this field.
    pub fn matches(&self, value: u32) -> bool {
        match &self.expr {
            FieldExpr::Any => true,
            FieldExpr::Divisor(divisor) => {
                // A zero-valued unit is "on the boundary": substitute the
                // field's modulus before the modulo test.
                let value = if value == 0 { self.modulus } else { value };
                value % divisor == 0
            }
            FieldExpr::Set(atoms) => atoms.iter().any(|atom| atom.contains(value)),
        }
    }

    /// The raw text this field was parsed from.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// The field's natural modulus (60, 60, 24, 31, 12, or 7).
    pub fn modulus(&self) -> u32 {
        self.modulus
    }
}

impl fmt::Display for CronField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// A parsed cron schedule: six fields evaluated conjunctively.
///
/// Created once at job-registration time, immutable (apart from
/// [`append_weekday`](Self::append_weekday)), and reusable across repeated
/// evaluations. Parsing is eager, so a malformed expression fails at
/// construction rather than at first evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CronSchedule {
    second: CronField,
    minute: CronField,
    hour: CronField,
    day: CronField,
    month: CronField,
    weekday: CronField,
}

impl CronSchedule {
    /// Parse a cron expression from a string.
    ///
    /// Accepts six space-separated fields, or five with the seconds slot
    /// omitted; the five-field form is canonicalized by inserting a literal
    /// `"00"` seconds field.
    ///
    /// # Errors
    ///
    /// Returns [`CronParseError::MalformedExpression`] for a wrong token
    /// count or any empty token, and the finer-grained variants for a token
    /// that fails field parsing.
    pub fn parse(expr: &str) -> Result<Self, CronParseError> {
        let mut tokens: Vec<&str> = expr.split(' ').collect();

        if tokens.iter().any(|token| token.is_empty()) {
            return Err(CronParseError::MalformedExpression(expr.to_string()));
        }
        if tokens.len() < 5 || tokens.len() > 6 {
            return Err(CronParseError::MalformedExpression(expr.to_string()));
        }

        // Canonicalize the five-field form to six.
        if tokens.len() == 5 {
            tokens.insert(0, "00");
        }

        Ok(Self {
            second: CronField::parse(tokens[0], Slot::Second)?,
            minute: CronField::parse(tokens[1], Slot::Minute)?,
            hour: CronField::parse(tokens[2], Slot::Hour)?,
            day: CronField::parse(tokens[3], Slot::DayOfMonth)?,
            month: CronField::parse(tokens[4], Slot::Month)?,
            weekday: CronField::parse(tokens[5], Slot::Weekday)?,
        })
    }

    /// Check whether a timestamp satisfies all six fields.
    ///
    /// Weekdays are numbered with Sunday = 0.
    pub fn is_due(&self, dt: &DateTime<Utc>) -> bool {
        self.second.matches(dt.second())
            && self.minute.matches(dt.minute())
            && self.hour.matches(dt.hour())
            && self.day.matches(dt.day())
            && self.month.matches(dt.month())
            && self.weekday.matches(dt.weekday().num_days_from_sunday())
    }

    /// Add one more day-of-week value to the weekday field.
    ///
    /// Used to build composite "weekday OR weekday" schedules
    /// programmatically rather than by re-parsing expression text. The
    /// existing weekday field must be an explicit value list; appending to a
    /// wildcard or divisor field fails.
    ///
    /// # Errors
    ///
    /// Returns [`CronParseError::InvalidRange`] when `weekday` exceeds 6 and
    /// [`CronParseError::InvalidField`] when the current field cannot carry a
    /// list.
    pub fn append_weekday(&mut self, weekday: u32) -> Result<(), CronParseError> {
        if weekday > Slot::Weekday.max() {
            return Err(CronParseError::InvalidRange(format!(
                "{} not in range 0-{}",
                weekday,
                Slot::Weekday.max()
            )));
        }
        if matches!(self.weekday.expr, FieldExpr::Any) {
            return Err(CronParseError::InvalidField(format!(
                "cannot append weekday to '{}'",
                self.weekday.text
            )));
        }

        let composed = format!("{},{}", self.weekday.text, weekday);
        self.weekday = CronField::parse(&composed, Slot::Weekday)?;
        Ok(())
    }
}

impl fmt::Display for CronSchedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {} {} {}",
            self.second, self.minute, self.hour, self.day, self.month, self.weekday
        )
    }
}
