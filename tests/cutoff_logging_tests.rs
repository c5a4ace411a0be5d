//! The auto cutoff is an operational event: it must be logged exactly once,
//! at warn level, when admission closes a voyage.
mod common;

use std::io;
use std::sync::{Arc, Mutex};

use common::fixture_with;
use freight_booking::BookingSettings;
use freight_booking::container::ContainerSize;

#[derive(Clone, Default)]
struct SharedBuf(Arc<Mutex<Vec<u8>>>);

impl SharedBuf {
    fn contents(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }
}

impl io::Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn capture<T>(f: impl FnOnce() -> T) -> (T, String) {
    let buf = SharedBuf::default();
    let writer = buf.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::INFO)
        .finish();
    let out = tracing::subscriber::with_default(subscriber, f);
    (out, buf.contents())
}

#[test]
fn cutoff_is_logged_once_with_voyage_and_threshold() -> anyhow::Result<()> {
    let settings = BookingSettings::default().with_auto_cutoff_percent(50)?;
    let f = fixture_with(4, settings)?;
    let containers = (0..3)
        .map(|_| f.new_container(ContainerSize::TwentyFoot))
        .collect::<anyhow::Result<Vec<_>>>()?;

    let (results, logs) = capture(|| {
        containers
            .iter()
            .map(|c| f.service.create_order(f.request(c)))
            .collect::<Vec<_>>()
    });

    // 25%, then 50% closes, then the third is turned away
    assert!(results[0].is_ok());
    assert!(results[1].is_ok());
    assert!(results[2].is_err());

    let expected = format!("Auto cutoff triggered for voyage {} (threshold: 50%)", f.voyage.id);
    assert_eq!(logs.matches("Auto cutoff triggered").count(), 1, "{logs}");
    let line = logs
        .lines()
        .find(|l| l.contains("Auto cutoff triggered"))
        .unwrap();
    assert!(line.contains("WARN"), "{line}");
    assert!(line.contains(&expected), "{line}");
    assert!(line.contains("load_teu=2"), "{line}");
    assert!(line.contains("capacity_teu=4"), "{line}");
    Ok(())
}

#[test]
fn manual_close_is_not_reported_as_cutoff() -> anyhow::Result<()> {
    let f = common::fixture(4)?;

    let (result, logs) = capture(|| {
        f.service.set_booking_open(&f.voyage.id, false)?;
        f.service.set_booking_open(&f.voyage.id, true)?;
        f.service.create_order(f.request(&f.container))
    });

    result?;
    assert!(!logs.contains("Auto cutoff triggered"), "{logs}");
    assert!(logs.contains("Booking status changed manually"), "{logs}");
    Ok(())
}

#[test]
fn rejected_booking_logs_no_cutoff() -> anyhow::Result<()> {
    let f = common::fixture(1)?;
    f.price_forty_foot()?;
    let forty = f.new_container(ContainerSize::FortyFoot)?;

    let (result, logs) = capture(|| f.service.create_order(f.request(&forty)));

    assert!(result.is_err());
    assert!(!logs.contains("Auto cutoff triggered"), "{logs}");
    assert!(f.booking_open()?);
    Ok(())
}
