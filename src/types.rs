use std::fmt;

use chrono::{DateTime, Duration, TimeZone, Utc};
use rust_decimal::Decimal;

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Copy)]
pub struct TimeStamp(DateTime<Utc>);

impl TimeStamp {
    pub fn now() -> Self {
        Self(Utc::now())
    }
    /// `None` when the components do not name a valid UTC instant.
    pub fn new_with(year: i32, month: u32, day: u32, hour: u32, min: u32, sec: u32) -> Option<Self> {
        Utc.with_ymd_and_hms(year, month, day, hour, min, sec)
            .single()
            .map(Self)
    }
    pub fn plus_days(&self, days: i64) -> Self {
        Self(self.0 + Duration::days(days))
    }
    pub fn to_datetime_utc(&self) -> DateTime<Utc> {
        self.0
    }
}

impl From<DateTime<Utc>> for TimeStamp {
    fn from(value: DateTime<Utc>) -> Self {
        TimeStamp(value)
    }
}

impl fmt::Display for TimeStamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

impl<C> minicbor::Encode<C> for TimeStamp {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        _: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        if let Some(nsec) = self.0.timestamp_nanos_opt() {
            return e.i64(nsec)?.ok();
        }

        Err(minicbor::encode::Error::message(
            "failed to encode timestamp. timestamp_nanos_opt returned None",
        ))
    }
}

impl<'b, C> minicbor::Decode<'b, C> for TimeStamp {
    fn decode(d: &mut minicbor::Decoder<'b>, _: &mut C) -> Result<Self, minicbor::decode::Error> {
        let nsecs = d.i64()?;

        Ok(TimeStamp(DateTime::from_timestamp_nanos(nsecs)))
    }
}

/// CBOR codec for `Decimal` fields, stored as the 16 byte packed form.
pub mod decimal {
    use minicbor::decode::Error as DecodeError;
    use minicbor::encode::{Error as EncodeError, Write};
    use minicbor::{Decoder, Encoder};
    use rust_decimal::Decimal;

    pub fn encode<Ctx, W: Write>(
        v: &Decimal,
        e: &mut Encoder<W>,
        _: &mut Ctx,
    ) -> Result<(), EncodeError<W::Error>> {
        e.bytes(&v.serialize())?.ok()
    }

    pub fn decode<'b, Ctx>(d: &mut Decoder<'b>, _: &mut Ctx) -> Result<Decimal, DecodeError> {
        let raw: [u8; 16] = d
            .bytes()?
            .try_into()
            .map_err(|_| DecodeError::message("decimal must be 16 bytes"))?;

        Ok(Decimal::deserialize(raw))
    }
}

/// Currency amounts are held to cents.
pub const CURRENCY_SCALE: u32 = 2;

pub fn round_currency(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(
        CURRENCY_SCALE,
        rust_decimal::RoundingStrategy::MidpointAwayFromZero,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[derive(minicbor::Encode, minicbor::Decode, Debug, PartialEq)]
    struct Priced {
        #[n(0)]
        #[cbor(with = "crate::types::decimal")]
        amount: Decimal,
    }

    #[test]
    fn timestamp_encoding() {
        let original = TimeStamp::now();

        let encoding = minicbor::to_vec(original).unwrap();
        let decode: TimeStamp = minicbor::decode(&encoding).unwrap();

        assert_eq!(original, decode);
    }

    #[test]
    fn decimal_keeps_scale() {
        let original = Priced {
            amount: Decimal::from_str("1234.50").unwrap(),
        };

        let encoding = minicbor::to_vec(&original).unwrap();
        let decode: Priced = minicbor::decode(&encoding).unwrap();

        assert_eq!(decode.amount.to_string(), "1234.50");
    }

    #[test]
    fn decimal_rejects_short_payload() {
        let mut e = minicbor::Encoder::new(Vec::new());
        e.array(1).unwrap().bytes(&[0u8; 8]).unwrap();
        let buf = e.into_writer();

        let err = minicbor::decode::<Priced>(&buf).unwrap_err();
        assert!(err.to_string().contains("decimal must be 16 bytes"));
    }

    #[test]
    fn rounding_is_half_away_from_zero() {
        assert_eq!(
            round_currency(Decimal::from_str("10.005").unwrap()),
            Decimal::from_str("10.01").unwrap()
        );
        assert_eq!(
            round_currency(Decimal::from_str("10.004").unwrap()),
            Decimal::from_str("10.00").unwrap()
        );
    }

    #[test]
    fn invalid_calendar_date_is_rejected() {
        assert!(TimeStamp::new_with(2024, 2, 30, 0, 0, 0).is_none());
        assert!(TimeStamp::new_with(2024, 2, 29, 0, 0, 0).is_some());
    }
}
