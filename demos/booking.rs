// Walks one voyage from empty to auto cutoff against an on-disk database.
//
//   cargo run --example booking

use std::sync::Arc;

use freight_booking::container::{ContainerSize, ContainerType};
use freight_booking::order::OrderStatus;
use freight_booking::telemetry::init_tracing;
use freight_booking::types::TimeStamp;
use freight_booking::voyage::VoyageDraft;
use freight_booking::{BookingService, BookingSettings, NewOrder};
use rust_decimal_macros::dec;

fn main() -> anyhow::Result<()> {
    init_tracing("info,freight_booking=debug");

    let settings = BookingSettings::from_env();
    let db = Arc::new(sled::open(&settings.db_path)?);
    let service = BookingService::new(db.clone(), settings)?;

    let departure = TimeStamp::now().plus_days(2);
    let voyage_number = format!("DEMO-{}", departure.to_datetime_utc().format("%Y%m%d%H%M%S"));
    let voyage = service.register_voyage(
        VoyageDraft::new()
            .set_voyage_number(&voyage_number)
            .set_vessel_name("MV Northern Star")
            .set_route("NLRTM", "SGSIN")
            .set_schedule(departure, departure.plus_days(24))
            .set_max_capacity_teu(8),
    )?;
    service.set_price(&voyage.id, ContainerSize::TwentyFoot, dec!(1200))?;
    service.set_price(&voyage.id, ContainerSize::FortyFoot, dec!(2100))?;

    let customer = service.register_customer("Harbour Goods Ltd", "Mina Osei", "mina@harbour.example")?;
    let agent = service.register_agent("Blue Quay Agency", "desk@bluequay.example", dec!(5))?;

    let stamp = departure.to_datetime_utc().timestamp() % 1_000_000;
    let mut booked = Vec::new();
    for (n, size) in [
        ContainerSize::FortyFoot,
        ContainerSize::TwentyFoot,
        ContainerSize::FortyFoot,
        ContainerSize::TwentyFoot,
        ContainerSize::FortyFoot,
    ]
    .into_iter()
    .enumerate()
    {
        let code = format!("DEMU{:07}", stamp * 10 + n as i64);
        let container = service.register_container(&code, size, ContainerType::Dry)?;
        let request = NewOrder::new(&voyage.id, &container.id, &customer.id, "demo")
            .set_agent(&agent.id)
            .set_discount(dec!(12.5), Some("launch customer"));

        match service.create_order(request) {
            Ok(order) => {
                println!("booked {code} ({:?}) for {} USD", size, order.final_price());
                booked.push(order);
            }
            Err(e) => println!("rejected {code}: {e} [{:?}]", e.kind()),
        }
        let load = service.capacity(&voyage.id)?;
        println!(
            "  load {}/{} TEU, booking open: {}",
            load.load_teu, load.max_capacity_teu, load.booking_open
        );
    }

    if let Some(first) = booked.first() {
        service.update_order_status(&first.id, OrderStatus::Cancelled)?;
        let load = service.capacity(&voyage.id)?;
        println!("cancelled {}, {} TEU remaining", first.id, load.remaining_teu);
    }

    db.flush()?;
    Ok(())
}
