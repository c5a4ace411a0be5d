pub mod capacity;
pub mod config;
pub mod container;
pub mod directory;
pub mod error;
pub mod lock;
pub mod order;
pub mod pricing;
pub mod service;
pub mod store;
pub mod telemetry;
pub mod types;
pub mod utils;
pub mod voyage;

pub use config::BookingSettings;
pub use error::{BookingError, ErrorKind};
pub use service::{BookingService, NewOrder, VoyageLoad};
