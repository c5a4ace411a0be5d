//! Containers and their TEU footprint
use crate::error::{BookingError, Result};
use crate::types::TimeStamp;
use crate::utils::{CONTAINER_HRP, new_id};

/// Standard ISO container sizes.
#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ContainerSize {
    #[n(0)]
    TwentyFoot,
    #[n(1)]
    FortyFoot,
}

impl ContainerSize {
    pub const ALL: [ContainerSize; 2] = [ContainerSize::TwentyFoot, ContainerSize::FortyFoot];

    pub fn teu(&self) -> u32 {
        match self {
            ContainerSize::TwentyFoot => 1,
            ContainerSize::FortyFoot => 2,
        }
    }

    /// Stable name used in storage keys.
    pub fn code(&self) -> &'static str {
        match self {
            ContainerSize::TwentyFoot => "TWENTY_FOOT",
            ContainerSize::FortyFoot => "FORTY_FOOT",
        }
    }
}

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerType {
    #[n(0)]
    Dry,
    #[n(1)]
    Reefer,
    #[n(2)]
    OpenTop,
    #[n(3)]
    FlatRack,
    #[n(4)]
    Tank,
}

/// A shipping container identified by its ISO 6346 code (e.g. MSCU1234567).
#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq, Eq)]
pub struct Container {
    #[n(0)]
    pub id: String,
    #[n(1)]
    pub code: String,
    #[n(2)]
    pub size: ContainerSize,
    #[n(3)]
    pub container_type: ContainerType,
    #[n(4)]
    pub created_at: TimeStamp,
}

impl Container {
    pub fn new(code: &str, size: ContainerSize, container_type: ContainerType) -> Result<Self> {
        if !is_iso6346_shaped(code) {
            return Err(BookingError::BadRequest(format!(
                "Container code '{code}' must be 4 uppercase letters followed by 7 digits"
            )));
        }

        Ok(Self {
            id: new_id(CONTAINER_HRP)?,
            code: code.to_string(),
            size,
            container_type,
            created_at: TimeStamp::now(),
        })
    }

    // derived from size, never stored on its own
    pub fn teu(&self) -> u32 {
        self.size.teu()
    }
}

// owner code + category (4 letters), serial (6 digits), check digit
fn is_iso6346_shaped(code: &str) -> bool {
    let bytes = code.as_bytes();
    bytes.len() == 11
        && bytes[..4].iter().all(u8::is_ascii_uppercase)
        && bytes[4..].iter().all(u8::is_ascii_digit)
}
