//! Base prices per voyage and container size
use rust_decimal::Decimal;
use sled::{Db, Tree};

use crate::container::ContainerSize;
use crate::error::{BookingError, Result};
use crate::store::{decode, encode};
use crate::types::TimeStamp;

/// Looks up the base price for a (voyage, container size) pair.
pub trait PricingResolver: Send + Sync {
    fn find_price(&self, voyage_id: &str, size: ContainerSize) -> Result<Option<Decimal>>;
}

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq, Eq)]
pub struct VoyagePrice {
    #[n(0)]
    pub voyage_id: String,
    #[n(1)]
    pub container_size: ContainerSize,
    #[n(2)]
    #[cbor(with = "crate::types::decimal")]
    pub base_price_usd: Decimal,
    #[n(3)]
    pub updated_at: TimeStamp,
}

/// sled backed price list keyed by `voyage_id/SIZE`.
pub struct VoyagePriceBook {
    prices: Tree,
}

fn price_key(voyage_id: &str, size: ContainerSize) -> String {
    format!("{voyage_id}/{}", size.code())
}

impl VoyagePriceBook {
    pub fn open(db: &Db) -> Result<Self> {
        Ok(Self {
            prices: db.open_tree("voyage_prices")?,
        })
    }

    /// Sets or replaces the price. Existing orders keep the price they were booked at.
    pub fn set_price(
        &self,
        voyage_id: &str,
        size: ContainerSize,
        base_price_usd: Decimal,
    ) -> Result<VoyagePrice> {
        if base_price_usd <= Decimal::ZERO {
            return Err(BookingError::BadRequest(format!(
                "Base price must be positive, got {base_price_usd}"
            )));
        }
        let price = VoyagePrice {
            voyage_id: voyage_id.to_string(),
            container_size: size,
            base_price_usd,
            updated_at: TimeStamp::now(),
        };
        self.prices
            .insert(price_key(voyage_id, size).as_bytes(), encode(&price)?)?;
        Ok(price)
    }

    pub fn remove_price(&self, voyage_id: &str, size: ContainerSize) -> Result<bool> {
        Ok(self
            .prices
            .remove(price_key(voyage_id, size).as_bytes())?
            .is_some())
    }

    /// Every size with a price on this voyage, in size order.
    pub fn prices_for_voyage(&self, voyage_id: &str) -> Result<Vec<VoyagePrice>> {
        let mut found = Vec::new();
        for size in ContainerSize::ALL {
            if let Some(raw) = self.prices.get(price_key(voyage_id, size).as_bytes())? {
                found.push(decode(&raw)?);
            }
        }
        Ok(found)
    }
}

impl PricingResolver for VoyagePriceBook {
    fn find_price(&self, voyage_id: &str, size: ContainerSize) -> Result<Option<Decimal>> {
        self.prices
            .get(price_key(voyage_id, size).as_bytes())?
            .map(|raw| decode::<VoyagePrice>(&raw).map(|p| p.base_price_usd))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn prices_are_per_voyage_and_size() {
        let dir = tempfile::tempdir().unwrap();
        let db = sled::open(dir.path().join("prices.db")).unwrap();
        let book = VoyagePriceBook::open(&db).unwrap();

        book.set_price("voyage_1", ContainerSize::TwentyFoot, dec!(1000)).unwrap();
        book.set_price("voyage_1", ContainerSize::FortyFoot, dec!(1500)).unwrap();
        book.set_price("voyage_1", ContainerSize::FortyFoot, dec!(1600)).unwrap();

        assert_eq!(
            book.find_price("voyage_1", ContainerSize::FortyFoot).unwrap(),
            Some(dec!(1600))
        );
        assert_eq!(book.find_price("voyage_2", ContainerSize::TwentyFoot).unwrap(), None);
        let sizes: Vec<_> = book
            .prices_for_voyage("voyage_1")
            .unwrap()
            .into_iter()
            .map(|p| p.container_size)
            .collect();
        assert_eq!(sizes, ContainerSize::ALL);

        assert!(book.remove_price("voyage_1", ContainerSize::TwentyFoot).unwrap());
        assert_eq!(book.find_price("voyage_1", ContainerSize::TwentyFoot).unwrap(), None);
    }

    #[test]
    fn non_positive_price_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let db = sled::open(dir.path().join("prices.db")).unwrap();
        let book = VoyagePriceBook::open(&db).unwrap();

        assert!(matches!(
            book.set_price("voyage_1", ContainerSize::TwentyFoot, dec!(0)),
            Err(BookingError::BadRequest(_))
        ));
    }
}
