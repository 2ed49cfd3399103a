//! Composite fixtures for the booking service, assembled from the primitive
//! generators.

use serde::{Deserialize, Serialize};

use super::{FixtureGenerator, FixtureKind, FixtureValue, TimeUnit};
use crate::error::Result;

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    pub phone: String,
}

impl User {
    pub fn generate(generator: &mut FixtureGenerator) -> Result<Self> {
        Ok(Self {
            username: generator.text(&FixtureKind::Username)?,
            first_name: generator.text(&FixtureKind::FirstName)?,
            last_name: generator.text(&FixtureKind::LastName)?,
            email: generator.text(&FixtureKind::Email)?,
            password: generator.text(&FixtureKind::Password {
                min_len: 8,
                max_len: 10,
            })?,
            phone: generator.text(&FixtureKind::Phone)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookingDates {
    pub checkin: String,
    pub checkout: String,
}

impl BookingDates {
    /// Check-in within the last day, check-out within the next one.
    pub fn generate(generator: &mut FixtureGenerator) -> Result<Self> {
        let checkin = generator
            .generate(&FixtureKind::Date {
                offset: -1,
                unit: TimeUnit::Days,
            })?
            .into_date()?;
        let checkout = generator
            .generate(&FixtureKind::Date {
                offset: 1,
                unit: TimeUnit::Days,
            })?
            .into_date()?;
        Ok(Self {
            checkin: checkin.format(DATE_FORMAT).to_string(),
            checkout: checkout.format(DATE_FORMAT).to_string(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Booking {
    pub firstname: String,
    pub lastname: String,
    pub totalprice: f64,
    pub depositpaid: bool,
    pub bookingdates: BookingDates,
    pub additionalneeds: String,
}

impl Booking {
    pub fn generate(generator: &mut FixtureGenerator) -> Result<Self> {
        let user = User::generate(generator)?;
        Self::for_user(generator, &user)
    }

    pub fn for_user(generator: &mut FixtureGenerator, user: &User) -> Result<Self> {
        let totalprice = generator
            .generate(&FixtureKind::Amount {
                min: 50.0,
                max: 100_000.0,
                decimals: 2,
            })?
            .into_amount()?;
        let depositpaid = matches!(generator.generate(&FixtureKind::Flag)?, FixtureValue::Flag(true));
        let additionalneeds = generator.text(&FixtureKind::Note)?;

        Ok(Self {
            firstname: user.first_name.clone(),
            lastname: user.last_name.clone(),
            totalprice,
            depositpaid,
            bookingdates: BookingDates::generate(generator)?,
            additionalneeds,
        })
    }
}

/// Body of a partial update: only the guest's names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookingNames {
    pub firstname: String,
    pub lastname: String,
}

impl BookingNames {
    pub fn generate(generator: &mut FixtureGenerator) -> Result<Self> {
        Ok(Self {
            firstname: generator.text(&FixtureKind::FirstName)?,
            lastname: generator.text(&FixtureKind::LastName)?,
        })
    }
}
