//! Cases for the hotel-booking service: create, authenticate, read, search,
//! update, partially update and delete a booking, then a health check.
//!
//! The booking the first case creates is the one every later case reads,
//! updates and deletes; its id travels through shared state.

use serde_json::json;

use crate::auth::AuthMode;
use crate::config::HarnessConfig;
use crate::error::Result;
use crate::fixtures::{Booking, BookingNames, FixtureGenerator, User};
use crate::http::RequestTemplate;
use crate::sequencer::TestCase;
use crate::testing::{Assertion, FieldCheck, StaticSchemaLoader};

pub const CREATE_BOOKING_SCHEMA: &str = "create_booking_response";

pub const BOOKING_ID: &str = "booking_id";
pub const BOOKING_FIRSTNAME: &str = "booking_firstname";
pub const BOOKING_TOTALPRICE: &str = "booking_totalprice";
pub const TOKEN: &str = "token";

const MAX_CREATE_LATENCY_MS: u64 = 2000;

/// Schemas the suite refers to, compiled into the binary.
pub fn schemas() -> StaticSchemaLoader {
    StaticSchemaLoader::new().with_schema(
        CREATE_BOOKING_SCHEMA,
        include_str!("../../schemas/create_booking_response.json"),
    )
}

pub fn booking_suite(config: &HarnessConfig, generator: &mut FixtureGenerator) -> Result<Vec<TestCase>> {
    let guest = User::generate(generator)?;
    let booking = Booking::for_user(generator, &guest)?;
    let replacement = Booking::generate(generator)?;
    let renamed = BookingNames::generate(generator)?;
    let booking_path = format!("/booking/{{{{{BOOKING_ID}}}}}");

    Ok(vec![
        TestCase::new("create_booking", 1, RequestTemplate::post("/booking").json(&booking)?)
            .expect(Assertion::schema(CREATE_BOOKING_SCHEMA))
            .expect(Assertion::status(200))
            .expect(Assertion::json())
            .expect(Assertion::latency_below(MAX_CREATE_LATENCY_MS))
            .writes(BOOKING_ID, "bookingid")
            .writes(BOOKING_FIRSTNAME, "booking.firstname")
            .writes(BOOKING_TOTALPRICE, "booking.totalprice"),
        TestCase::new(
            "create_auth_token",
            2,
            RequestTemplate::post("/auth").json_value(json!({
                "username": config.credentials.username,
                "password": config.credentials.password,
            })),
        )
        .expect(Assertion::status(200))
        .writes(TOKEN, "token"),
        TestCase::new("list_booking_ids", 3, RequestTemplate::get("/booking"))
            .expect(Assertion::status(200)),
        TestCase::new("get_booking_by_id", 4, RequestTemplate::get(&booking_path))
            .expect(Assertion::status(200)),
        TestCase::new(
            "find_bookings_by_first_name",
            5,
            RequestTemplate::get("/booking")
                .query("firstname", format!("{{{{{BOOKING_FIRSTNAME}}}}}")),
        )
        .expect(Assertion::status(200))
        .expect(Assertion::json())
        .expect(Assertion::field("results", FieldCheck::SizeGreaterThan(0))),
        TestCase::new(
            "find_bookings_by_price",
            6,
            RequestTemplate::get("/booking")
                .query("totalprice", format!("{{{{{BOOKING_TOTALPRICE}}}}}")),
        )
        .expect(Assertion::status(200))
        .expect(Assertion::json())
        .expect(Assertion::field("results", FieldCheck::SizeGreaterThan(0))),
        TestCase::new(
            "update_booking",
            7,
            RequestTemplate::put(&booking_path).json(&replacement)?,
        )
        .expect(Assertion::status(200)),
        TestCase::new(
            "partial_update_booking",
            8,
            RequestTemplate::patch(&booking_path).json(&renamed)?,
        )
        .expect(Assertion::status(200)),
        TestCase::new(
            "delete_booking",
            9,
            RequestTemplate::delete(&booking_path).auth(AuthMode::cookie("token", TOKEN)),
        )
        .expect(Assertion::status(201)),
        TestCase::new("health_check", 10, RequestTemplate::get("/ping"))
            .expect(Assertion::status(201)),
    ])
}
