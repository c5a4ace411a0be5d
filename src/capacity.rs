//! Capacity arithmetic for voyage admission. Pure functions, no I/O.
use crate::order::FreightOrder;
use crate::voyage::{Voyage, VoyageStatus};

/// Why a candidate booking was turned away.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    #[error("Voyage {voyage_id} is cancelled")]
    VoyageCancelled { voyage_id: String },
    #[error("Booking is closed for voyage {voyage_id}")]
    BookingClosed { voyage_id: String },
    #[error("Remaining capacity: {remaining} TEU, requires {requested} TEU")]
    InsufficientCapacity {
        voyage_id: String,
        remaining: i64,
        requested: u32,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    Admit,
    Reject(Rejection),
}

/// Sum of TEU over the orders that still hold space.
pub fn current_load_teu<'a>(orders: impl IntoIterator<Item = &'a FreightOrder>) -> u32 {
    orders
        .into_iter()
        .filter(|o| o.status.holds_capacity())
        .map(FreightOrder::teu)
        .sum()
}

/// May go negative as a diagnostic when capacity was edited below load elsewhere.
pub fn remaining_capacity(voyage: &Voyage, current_load: u32) -> i64 {
    i64::from(voyage.max_capacity_teu) - i64::from(current_load)
}

pub fn can_admit(voyage: &Voyage, current_load: u32, candidate_teu: u32) -> Admission {
    if voyage.status == VoyageStatus::Cancelled {
        return Admission::Reject(Rejection::VoyageCancelled {
            voyage_id: voyage.id.clone(),
        });
    }
    if !voyage.booking_open {
        return Admission::Reject(Rejection::BookingClosed {
            voyage_id: voyage.id.clone(),
        });
    }

    let remaining = remaining_capacity(voyage, current_load);
    if i64::from(candidate_teu) > remaining {
        return Admission::Reject(Rejection::InsufficientCapacity {
            voyage_id: voyage.id.clone(),
            remaining,
            requested: candidate_teu,
        });
    }

    Admission::Admit
}

/// `load / capacity >= threshold%`, compared by cross multiplication.
pub fn should_auto_cutoff(voyage: &Voyage, post_booking_load: u32, threshold_percent: u8) -> bool {
    voyage.booking_open
        && u64::from(post_booking_load) * 100
            >= u64::from(voyage.max_capacity_teu) * u64::from(threshold_percent)
}
