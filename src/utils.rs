//! Identifier minting

use bech32::{Bech32m, Hrp};
use uuid7::uuid7;

use crate::error::Result;

pub const VOYAGE_HRP: Hrp = Hrp::parse_unchecked("voyage_");
pub const ORDER_HRP: Hrp = Hrp::parse_unchecked("order_");
pub const CONTAINER_HRP: Hrp = Hrp::parse_unchecked("container_");
pub const CUSTOMER_HRP: Hrp = Hrp::parse_unchecked("customer_");
pub const AGENT_HRP: Hrp = Hrp::parse_unchecked("agent_");

// construct a unique, time ordered id then encode using bech32m
pub fn new_id(hrp: Hrp) -> Result<String> {
    Ok(bech32::encode::<Bech32m>(hrp, uuid7().as_bytes())?)
}
