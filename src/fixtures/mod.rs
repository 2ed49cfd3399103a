//! # Fixtures
//!
//! Randomized, constraint-satisfying values used as request inputs. A
//! [`FixtureGenerator`] owns its random source; give it a seed to make a run
//! reproducible, otherwise it is seeded from entropy once per run.

pub mod booking;

use std::fmt::{self, Display};

use chrono::{DateTime, TimeDelta, Utc};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::error::{HarnessError, Result};

pub use booking::{Booking, BookingDates, BookingNames, User};

const MAX_DECIMALS: u32 = 6;
/// Largest integer an `f64` holds exactly (2^53).
const MAX_EXACT_UNITS: f64 = 9_007_199_254_740_992.0;

const FIRST_NAMES: &[&str] = &[
    "Carol", "James", "Mary", "Susan", "Mark", "Eric", "Sally", "Jim", "Linda", "Paul", "Grace",
    "Oliver", "Amelia", "Noah", "Emma", "Lucas", "Mia", "Hugo", "Nora", "Felix",
];

const LAST_NAMES: &[&str] = &[
    "Brown", "Smith", "Jones", "Wilson", "Ericsson", "Jackson", "Taylor", "Clarke", "Walker",
    "Wright", "Green", "Hall", "Lewis", "Young", "King", "Scott", "Baker", "Hughes",
];

const NOTES: &[&str] = &[
    "Breakfast",
    "Late checkout",
    "Extra pillows",
    "Airport transfer",
    "",
];

const PASSWORD_CHARS: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Unit of a relative date window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeUnit {
    Seconds,
    Minutes,
    Hours,
    Days,
}

impl TimeUnit {
    fn millis(self) -> i64 {
        match self {
            TimeUnit::Seconds => 1_000,
            TimeUnit::Minutes => 60_000,
            TimeUnit::Hours => 3_600_000,
            TimeUnit::Days => 86_400_000,
        }
    }
}

/// What to generate, together with its constraints.
#[derive(Debug, Clone, PartialEq)]
pub enum FixtureKind {
    FirstName,
    LastName,
    Username,
    Email,
    Password { min_len: usize, max_len: usize },
    Phone,
    /// A date strictly before or after "now" by at most `|offset|` units.
    /// Negative offsets point to the past, positive ones to the future.
    Date { offset: i64, unit: TimeUnit },
    Amount { min: f64, max: f64, decimals: u32 },
    Digits { count: usize },
    Flag,
    /// Short free-text remark, possibly empty.
    Note,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FixtureValue {
    Text(String),
    Date(DateTime<Utc>),
    Amount(f64),
    Flag(bool),
}

impl FixtureValue {
    pub fn into_text(self) -> Result<String> {
        match self {
            FixtureValue::Text(text) => Ok(text),
            other => Err(HarnessError::config(format!("expected a text fixture, got `{other}`"))),
        }
    }

    pub fn into_date(self) -> Result<DateTime<Utc>> {
        match self {
            FixtureValue::Date(date) => Ok(date),
            other => Err(HarnessError::config(format!("expected a date fixture, got `{other}`"))),
        }
    }

    pub fn into_amount(self) -> Result<f64> {
        match self {
            FixtureValue::Amount(amount) => Ok(amount),
            other => Err(HarnessError::config(format!(
                "expected an amount fixture, got `{other}`"
            ))),
        }
    }
}

impl Display for FixtureValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FixtureValue::Text(text) => write!(f, "{text}"),
            FixtureValue::Date(date) => write!(f, "{}", date.format("%Y-%m-%d")),
            FixtureValue::Amount(amount) => write!(f, "{amount}"),
            FixtureValue::Flag(flag) => write!(f, "{flag}"),
        }
    }
}

pub struct FixtureGenerator {
    rng: StdRng,
}

impl FixtureGenerator {
    /// Seeded generators replay the same sequence of values.
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self { rng }
    }

    pub fn generate(&mut self, kind: &FixtureKind) -> Result<FixtureValue> {
        match kind {
            FixtureKind::FirstName => Ok(FixtureValue::Text(self.pick(FIRST_NAMES))),
            FixtureKind::LastName => Ok(FixtureValue::Text(self.pick(LAST_NAMES))),
            FixtureKind::Username => Ok(FixtureValue::Text(self.username())),
            FixtureKind::Email => Ok(FixtureValue::Text(format!("{}@example.com", self.username()))),
            FixtureKind::Password { min_len, max_len } => {
                self.password(*min_len, *max_len).map(FixtureValue::Text)
            }
            FixtureKind::Phone => Ok(FixtureValue::Text(self.phone())),
            FixtureKind::Date { offset, unit } => self.date(*offset, *unit).map(FixtureValue::Date),
            FixtureKind::Amount { min, max, decimals } => {
                self.amount(*min, *max, *decimals).map(FixtureValue::Amount)
            }
            FixtureKind::Digits { count } => self.digits(*count).map(FixtureValue::Text),
            FixtureKind::Flag => Ok(FixtureValue::Flag(self.rng.gen_bool(0.5))),
            FixtureKind::Note => Ok(FixtureValue::Text(self.pick(NOTES))),
        }
    }

    pub fn text(&mut self, kind: &FixtureKind) -> Result<String> {
        self.generate(kind)?.into_text()
    }

    fn pick(&mut self, words: &[&str]) -> String {
        words.choose(&mut self.rng).copied().unwrap_or("Anon").to_string()
    }

    fn username(&mut self) -> String {
        let first = self.pick(FIRST_NAMES).to_lowercase();
        let last = self.pick(LAST_NAMES).to_lowercase();
        let suffix: u16 = self.rng.gen_range(10..100);
        format!("{first}.{last}{suffix}")
    }

    fn password(&mut self, min_len: usize, max_len: usize) -> Result<String> {
        if min_len == 0 {
            return Err(HarnessError::config("password min_len must be at least 1"));
        }
        if min_len > max_len {
            return Err(HarnessError::config(format!(
                "password min_len {min_len} exceeds max_len {max_len}"
            )));
        }
        let len = self.rng.gen_range(min_len..=max_len);
        let password = (0..len)
            .map(|_| PASSWORD_CHARS[self.rng.gen_range(0..PASSWORD_CHARS.len())] as char)
            .collect();
        Ok(password)
    }

    fn phone(&mut self) -> String {
        let area: u16 = self.rng.gen_range(200..1000);
        let exchange: u16 = self.rng.gen_range(200..1000);
        let line: u16 = self.rng.gen_range(0..10_000);
        format!("({area}) {exchange}-{line:04}")
    }

    fn date(&mut self, offset: i64, unit: TimeUnit) -> Result<DateTime<Utc>> {
        if offset == 0 {
            return Err(HarnessError::config("date offset must be non-zero"));
        }
        let window_ms = offset
            .checked_abs()
            .and_then(|units| units.checked_mul(unit.millis()))
            .ok_or_else(|| HarnessError::config(format!("date offset {offset} is out of range")))?;

        // At least one millisecond away from now keeps the ordering strict.
        let shift_ms = self.rng.gen_range(1..=window_ms);
        let shift = TimeDelta::try_milliseconds(shift_ms)
            .ok_or_else(|| HarnessError::config(format!("date offset {offset} is out of range")))?;

        let now = Utc::now();
        let date = if offset < 0 {
            now.checked_sub_signed(shift)
        } else {
            now.checked_add_signed(shift)
        };
        date.ok_or_else(|| HarnessError::config(format!("date offset {offset} is out of range")))
    }

    fn amount(&mut self, min: f64, max: f64, decimals: u32) -> Result<f64> {
        if !min.is_finite() || !max.is_finite() {
            return Err(HarnessError::config("amount bounds must be finite"));
        }
        if min > max {
            return Err(HarnessError::config(format!("amount min {min} exceeds max {max}")));
        }
        if decimals > MAX_DECIMALS {
            return Err(HarnessError::config(format!(
                "amount decimals {decimals} exceeds {MAX_DECIMALS}"
            )));
        }
        if !(max - min).is_finite() {
            return Err(HarnessError::config(format!(
                "amount range {min}..={max} is too wide"
            )));
        }

        // Draw whole units of the last decimal place so the precision is exact.
        let scale = 10f64.powi(decimals as i32);
        let lo = (min * scale).ceil();
        let hi = (max * scale).floor();
        if lo > hi {
            return Err(HarnessError::config(format!(
                "no amount in {min}..={max} has at most {decimals} decimals"
            )));
        }
        if lo < -MAX_EXACT_UNITS || hi > MAX_EXACT_UNITS {
            return Err(HarnessError::config(format!(
                "amount range {min}..={max} is too large for {decimals} decimals"
            )));
        }

        let units = self.rng.gen_range(lo as i64..=hi as i64);
        Ok(units as f64 / scale)
    }

    fn digits(&mut self, count: usize) -> Result<String> {
        if count == 0 {
            return Err(HarnessError::config("digit count must be at least 1"));
        }
        Ok((0..count)
            .map(|_| char::from(b'0' + self.rng.gen_range(0..10u8)))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digits_have_exact_length() {
        let mut generator = FixtureGenerator::new(Some(7));
        for count in 1..40 {
            let value = generator.text(&FixtureKind::Digits { count }).unwrap();
            assert_eq!(value.len(), count);
            assert!(value.chars().all(|c| c.is_ascii_digit()), "{value}");
        }
    }

    #[test]
    fn zero_digits_is_a_configuration_error() {
        let mut generator = FixtureGenerator::new(None);
        let err = generator.generate(&FixtureKind::Digits { count: 0 }).unwrap_err();
        assert!(matches!(err, HarnessError::Configuration(_)));
    }

    #[test]
    fn past_dates_are_strictly_earlier() {
        let mut generator = FixtureGenerator::new(None);
        for unit in [TimeUnit::Seconds, TimeUnit::Minutes, TimeUnit::Days] {
            for _ in 0..50 {
                let date = generator
                    .generate(&FixtureKind::Date { offset: -1, unit })
                    .unwrap()
                    .into_date()
                    .unwrap();
                assert!(date < Utc::now());
            }
        }
    }

    #[test]
    fn future_dates_are_strictly_later() {
        let mut generator = FixtureGenerator::new(None);
        for _ in 0..50 {
            let before = Utc::now();
            let date = generator
                .generate(&FixtureKind::Date {
                    offset: 1,
                    unit: TimeUnit::Seconds,
                })
                .unwrap()
                .into_date()
                .unwrap();
            assert!(date > before);
        }
    }

    #[test]
    fn zero_date_offset_is_rejected() {
        let mut generator = FixtureGenerator::new(None);
        assert!(
            generator
                .generate(&FixtureKind::Date {
                    offset: 0,
                    unit: TimeUnit::Days
                })
                .is_err()
        );
    }

    #[test]
    fn password_respects_bounds() {
        let mut generator = FixtureGenerator::new(Some(3));
        for _ in 0..100 {
            let password = generator
                .text(&FixtureKind::Password {
                    min_len: 8,
                    max_len: 10,
                })
                .unwrap();
            assert!((8..=10).contains(&password.len()), "{password}");
        }
    }

    #[test]
    fn inverted_bounds_fail_immediately() {
        let mut generator = FixtureGenerator::new(None);
        let err = generator
            .generate(&FixtureKind::Password {
                min_len: 10,
                max_len: 8,
            })
            .unwrap_err();
        assert!(matches!(err, HarnessError::Configuration(_)));

        let err = generator
            .generate(&FixtureKind::Amount {
                min: 100.0,
                max: 50.0,
                decimals: 2,
            })
            .unwrap_err();
        assert!(matches!(err, HarnessError::Configuration(_)));
    }

    #[test]
    fn amounts_stay_in_range_with_fixed_precision() {
        let mut generator = FixtureGenerator::new(Some(11));
        for _ in 0..200 {
            let amount = generator
                .generate(&FixtureKind::Amount {
                    min: 50.0,
                    max: 100_000.0,
                    decimals: 2,
                })
                .unwrap()
                .into_amount()
                .unwrap();
            assert!((50.0..=100_000.0).contains(&amount));
            assert!(((amount * 100.0).round() - amount * 100.0).abs() < 1e-6);
        }
    }

    fn amount(min: f64, max: f64, decimals: u32) -> Result<f64> {
        FixtureGenerator::new(Some(5))
            .generate(&FixtureKind::Amount { min, max, decimals })?
            .into_amount()
    }

    #[test]
    fn narrow_ranges_keep_the_requested_precision() {
        assert_eq!(amount(50.001, 50.019, 2).unwrap(), 50.01);
        assert_eq!(amount(0.5, 0.5, 1).unwrap(), 0.5);

        let err = amount(50.001, 50.004, 2).unwrap_err();
        assert!(matches!(err, HarnessError::Configuration(_)));
    }

    #[test]
    fn huge_amount_ranges_are_configuration_errors() {
        let err = amount(-f64::MAX, f64::MAX, 0).unwrap_err();
        assert!(matches!(err, HarnessError::Configuration(_)));

        let err = amount(0.0, 1e300, 2).unwrap_err();
        assert!(matches!(err, HarnessError::Configuration(_)));

        let err = amount(0.0, f64::INFINITY, 2).unwrap_err();
        assert!(matches!(err, HarnessError::Configuration(_)));
    }

    #[test]
    fn same_seed_replays_values() {
        let mut a = FixtureGenerator::new(Some(42));
        let mut b = FixtureGenerator::new(Some(42));
        for kind in [FixtureKind::Username, FixtureKind::Email, FixtureKind::Phone] {
            assert_eq!(a.generate(&kind).unwrap(), b.generate(&kind).unwrap());
        }
    }

    #[test]
    fn email_looks_like_an_address() {
        let mut generator = FixtureGenerator::new(None);
        let email = generator.text(&FixtureKind::Email).unwrap();
        let (local, domain) = email.split_once('@').unwrap();
        assert!(!local.is_empty());
        assert_eq!(domain, "example.com");
    }
}
