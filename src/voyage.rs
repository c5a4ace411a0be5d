//! Voyages, their schedule and the booking window
use crate::error::{BookingError, Result};
use crate::types::TimeStamp;
use crate::utils::{VOYAGE_HRP, new_id};

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VoyageStatus {
    #[n(0)]
    Scheduled,
    #[n(1)]
    Departed,
    #[n(2)]
    Arrived,
    #[n(3)]
    Cancelled,
}

impl VoyageStatus {
    /// Progression is one way; cancellation is only possible before arrival.
    pub fn can_transition_to(&self, next: VoyageStatus) -> bool {
        use VoyageStatus::*;
        matches!(
            (self, next),
            (Scheduled, Departed) | (Departed, Arrived) | (Scheduled | Departed, Cancelled)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, VoyageStatus::Arrived | VoyageStatus::Cancelled)
    }
}

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq, Eq)]
pub struct Voyage {
    #[n(0)]
    pub id: String,
    #[n(1)]
    pub voyage_number: String,
    #[n(2)]
    pub vessel_name: String,
    #[n(3)]
    pub departure_port: String,
    #[n(4)]
    pub arrival_port: String,
    #[n(5)]
    pub departure_time: TimeStamp,
    #[n(6)]
    pub arrival_time: TimeStamp,
    #[n(7)]
    pub max_capacity_teu: u32,
    #[n(8)]
    pub booking_open: bool,
    #[n(9)]
    pub status: VoyageStatus,
    #[n(10)]
    pub created_at: TimeStamp,
    #[n(11)]
    pub updated_at: TimeStamp,
}

impl Voyage {
    pub(crate) fn touch(&mut self) {
        self.updated_at = TimeStamp::now();
    }
}

// used for constructing voyages before they are registered
#[derive(Debug, Default, Clone)]
pub struct VoyageDraft {
    voyage_number: Option<String>,
    vessel_name: Option<String>,
    departure_port: Option<String>,
    arrival_port: Option<String>,
    departure_time: Option<TimeStamp>,
    arrival_time: Option<TimeStamp>,
    max_capacity_teu: u32,
    booking_open: bool,
}

impl VoyageDraft {
    pub fn new() -> Self {
        Self {
            booking_open: true,
            ..Self::default()
        }
    }
    pub fn set_voyage_number(mut self, number: &str) -> Self {
        self.voyage_number = Some(number.trim().to_string());
        self
    }
    pub fn set_vessel_name(mut self, name: &str) -> Self {
        self.vessel_name = Some(name.to_string());
        self
    }
    pub fn set_route(mut self, departure_port: &str, arrival_port: &str) -> Self {
        self.departure_port = Some(departure_port.to_string());
        self.arrival_port = Some(arrival_port.to_string());
        self
    }
    pub fn set_schedule(mut self, departure: TimeStamp, arrival: TimeStamp) -> Self {
        self.departure_time = Some(departure);
        self.arrival_time = Some(arrival);
        self
    }
    pub fn set_max_capacity_teu(mut self, teu: u32) -> Self {
        self.max_capacity_teu = teu;
        self
    }
    pub fn set_booking_open(mut self, open: bool) -> Self {
        self.booking_open = open;
        self
    }

    /// Checks fields and produces a scheduled voyage with a fresh id.
    pub fn validate_and_finalise(self) -> Result<Voyage> {
        let voyage_number = required(self.voyage_number, "Voyage number")?;
        let departure_port = required(self.departure_port, "Departure port")?;
        let arrival_port = required(self.arrival_port, "Arrival port")?;

        if departure_port == arrival_port {
            return Err(BookingError::BadRequest(
                "Departure and arrival ports must differ".into(),
            ));
        }

        let (departure_time, arrival_time) = match (self.departure_time, self.arrival_time) {
            (Some(d), Some(a)) if d < a => (d, a),
            (Some(_), Some(_)) => {
                return Err(BookingError::BadRequest(
                    "Departure time must be before arrival time".into(),
                ));
            }
            _ => return Err(BookingError::BadRequest("Voyage schedule is not set".into())),
        };

        if self.max_capacity_teu == 0 {
            return Err(BookingError::BadRequest(
                "Max capacity must be a positive number of TEU".into(),
            ));
        }

        let now = TimeStamp::now();
        Ok(Voyage {
            id: new_id(VOYAGE_HRP)?,
            voyage_number,
            vessel_name: self.vessel_name.unwrap_or_default(),
            departure_port,
            arrival_port,
            departure_time,
            arrival_time,
            max_capacity_teu: self.max_capacity_teu,
            booking_open: self.booking_open,
            status: VoyageStatus::Scheduled,
            created_at: now,
            updated_at: now,
        })
    }
}

fn required(value: Option<String>, field: &str) -> Result<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(BookingError::BadRequest(format!("{field} is required"))),
    }
}
