//! Freight orders and discount pricing
use rust_decimal::Decimal;

use crate::container::ContainerSize;
use crate::error::{BookingError, Result};
use crate::types::{TimeStamp, round_currency};

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrderStatus {
    #[n(0)]
    Pending,
    #[n(1)]
    Confirmed,
    #[n(2)]
    Delivered,
    #[n(3)]
    Cancelled,
}

impl OrderStatus {
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Pending, Confirmed) | (Confirmed, Delivered) | (Pending | Confirmed, Cancelled)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }

    /// Whether the order still occupies space on its voyage.
    pub fn holds_capacity(&self) -> bool {
        *self != OrderStatus::Cancelled
    }
}

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq, Eq)]
pub struct FreightOrder {
    #[n(0)]
    pub id: String,
    #[n(1)]
    pub voyage_id: String,
    #[n(2)]
    pub container_id: String,
    #[n(3)]
    pub container_size: ContainerSize, // snapshot, the TEU source for load sums
    #[n(4)]
    pub customer_id: String,
    #[n(5)]
    pub agent_id: Option<String>,
    #[n(6)]
    pub ordered_by: String,
    #[n(7)]
    #[cbor(with = "crate::types::decimal")]
    base_price_usd: Decimal,
    #[n(8)]
    #[cbor(with = "crate::types::decimal")]
    discount_percent: Decimal,
    #[n(9)]
    discount_reason: Option<String>,
    #[n(10)]
    #[cbor(with = "crate::types::decimal")]
    final_price: Decimal,
    #[n(11)]
    pub status: OrderStatus,
    #[n(12)]
    pub created_at: TimeStamp,
    #[n(13)]
    pub updated_at: TimeStamp,
}

impl FreightOrder {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new_pending(
        id: String,
        voyage_id: String,
        container_id: String,
        container_size: ContainerSize,
        customer_id: String,
        agent_id: Option<String>,
        ordered_by: String,
        base_price_usd: Decimal,
        discount: Discount,
    ) -> Self {
        let now = TimeStamp::now();
        Self {
            id,
            voyage_id,
            container_id,
            container_size,
            customer_id,
            agent_id,
            ordered_by,
            final_price: final_price(base_price_usd, discount.percent),
            base_price_usd,
            discount_percent: discount.percent,
            discount_reason: discount.reason,
            status: OrderStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn teu(&self) -> u32 {
        self.container_size.teu()
    }
    pub fn base_price_usd(&self) -> Decimal {
        self.base_price_usd
    }
    pub fn discount_percent(&self) -> Decimal {
        self.discount_percent
    }
    pub fn discount_reason(&self) -> Option<&str> {
        self.discount_reason.as_deref()
    }
    pub fn final_price(&self) -> Decimal {
        self.final_price
    }

    /// Replaces the discount and recomputes the final price from the snapshotted base price.
    pub(crate) fn apply_discount(&mut self, discount: Discount) -> Result<()> {
        if self.status == OrderStatus::Cancelled {
            return Err(BookingError::IllegalState(format!(
                "Cannot update discount on cancelled order {}",
                self.id
            )));
        }
        self.final_price = final_price(self.base_price_usd, discount.percent);
        self.discount_percent = discount.percent;
        self.discount_reason = discount.reason;
        self.updated_at = TimeStamp::now();
        Ok(())
    }

    pub(crate) fn transition_to(&mut self, next: OrderStatus) -> Result<()> {
        if self.status == next {
            return Ok(());
        }
        if !self.status.can_transition_to(next) {
            return Err(BookingError::IllegalState(format!(
                "Order {} cannot move from {:?} to {:?}",
                self.id, self.status, next
            )));
        }
        self.status = next;
        self.updated_at = TimeStamp::now();
        Ok(())
    }
}

/// A validated discount: percent within [0, 100] plus an optional reason.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Discount {
    percent: Decimal,
    reason: Option<String>,
}

impl Discount {
    pub fn none() -> Self {
        Self::default()
    }

    /// Out of range values are rejected, never clamped.
    pub fn new(percent: Decimal, reason: Option<String>) -> Result<Self> {
        if percent < Decimal::ZERO || percent > Decimal::ONE_HUNDRED {
            return Err(BookingError::BadRequest(format!(
                "Discount percent must be between 0 and 100, got {percent}"
            )));
        }
        Ok(Self { percent, reason })
    }
}

/// `base * (1 - percent / 100)` at currency scale.
pub fn final_price(base_price_usd: Decimal, discount_percent: Decimal) -> Decimal {
    let factor = Decimal::ONE - discount_percent / Decimal::ONE_HUNDRED;
    round_currency(base_price_usd * factor)
}
