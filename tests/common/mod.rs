//! Shared setup for the integration tests. Each test gets its own sled
//! database under a temp dir, since sled holds a file lock per database.
#![allow(dead_code)]

use std::sync::Arc;

use anyhow::Context;
use freight_booking::container::{Container, ContainerSize, ContainerType};
use freight_booking::directory::{Agent, Customer};
use freight_booking::pricing::PricingResolver;
use freight_booking::types::TimeStamp;
use freight_booking::voyage::{Voyage, VoyageDraft};
use freight_booking::{BookingService, BookingSettings, NewOrder};
use rust_decimal_macros::dec;
use tempfile::TempDir;

pub struct Fixture {
    pub service: BookingService,
    pub voyage: Voyage,
    pub customer: Customer,
    pub agent: Agent,
    pub container: Container,
    next_code: std::sync::atomic::AtomicU32,
    _dir: TempDir,
}

pub fn fixture(max_capacity_teu: u32) -> anyhow::Result<Fixture> {
    fixture_with(max_capacity_teu, BookingSettings::default())
}

pub fn fixture_with(max_capacity_teu: u32, settings: BookingSettings) -> anyhow::Result<Fixture> {
    build(max_capacity_teu, settings, None)
}

/// Same seed data, but base prices come from `pricing` instead of the price book.
pub fn fixture_priced_by(
    max_capacity_teu: u32,
    pricing: Arc<dyn PricingResolver>,
) -> anyhow::Result<Fixture> {
    build(max_capacity_teu, BookingSettings::default(), Some(pricing))
}

fn build(
    max_capacity_teu: u32,
    settings: BookingSettings,
    pricing: Option<Arc<dyn PricingResolver>>,
) -> anyhow::Result<Fixture> {
    let dir = tempfile::tempdir()?;
    let db = Arc::new(sled::open(dir.path().join("booking.db"))?);
    let mut service = BookingService::new(db, settings)?;
    if let Some(pricing) = pricing {
        service = service.with_pricing(pricing);
    }

    let departure = TimeStamp::now().plus_days(3);
    let voyage = service
        .register_voyage(
            VoyageDraft::new()
                .set_voyage_number("VOY-001")
                .set_vessel_name("MV Test")
                .set_route("AEJEA", "CNSHA")
                .set_schedule(departure, departure.plus_days(7))
                .set_max_capacity_teu(max_capacity_teu),
        )
        .context("voyage registration failed")?;

    service.set_price(&voyage.id, ContainerSize::TwentyFoot, dec!(1000))?;

    let customer = service.register_customer("Test Customer Inc.", "John Doe", "john@test.com")?;
    let agent = service.register_agent("Test Agent", "agent@somewhere.com", dec!(10))?;
    let container = service.register_container("TSTU1234567", ContainerSize::TwentyFoot, ContainerType::Dry)?;

    Ok(Fixture {
        service,
        voyage,
        customer,
        agent,
        container,
        next_code: std::sync::atomic::AtomicU32::new(1),
        _dir: dir,
    })
}

impl Fixture {
    /// Registers a fresh container with a unique code.
    pub fn new_container(&self, size: ContainerSize) -> anyhow::Result<Container> {
        let n = self
            .next_code
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        Ok(self
            .service
            .register_container(&format!("FBKU{n:07}"), size, ContainerType::Dry)?)
    }

    pub fn request(&self, container: &Container) -> NewOrder {
        NewOrder::new(&self.voyage.id, &container.id, &self.customer.id, "tester")
            .set_agent(&self.agent.id)
    }

    pub fn price_forty_foot(&self) -> anyhow::Result<()> {
        self.service
            .set_price(&self.voyage.id, ContainerSize::FortyFoot, dec!(1500))?;
        Ok(())
    }

    pub fn load(&self) -> anyhow::Result<u32> {
        Ok(self.service.capacity(&self.voyage.id)?.load_teu)
    }

    pub fn booking_open(&self) -> anyhow::Result<bool> {
        Ok(self.service.voyage(&self.voyage.id)?.booking_open)
    }
}
