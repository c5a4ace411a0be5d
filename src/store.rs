//! sled backed voyage and order records
//!
//! Every record is CBOR encoded and keyed by its id. Secondary lookups live in
//! their own trees: voyage number -> voyage id, and `voyage_id/order_id` -> ()
//! for the order set of a voyage.
use std::time::Duration;

use sled::transaction::{ConflictableTransactionError, TransactionalTree};
use sled::{Db, Transactional, Tree};

use crate::capacity;
use crate::error::{BookingError, Result, abort};
use crate::lock::{VoyageGuard, VoyageLocks};
use crate::order::{FreightOrder, OrderStatus};
use crate::voyage::{Voyage, VoyageStatus};

type TxResult<T> = std::result::Result<T, ConflictableTransactionError<BookingError>>;

pub(crate) fn decode<T>(bytes: &[u8]) -> Result<T>
where
    T: for<'b> minicbor::Decode<'b, ()>,
{
    Ok(minicbor::decode(bytes)?)
}

pub(crate) fn encode<T: minicbor::Encode<()>>(value: &T) -> Result<Vec<u8>> {
    Ok(minicbor::to_vec(value)?)
}

// encoding inside a transaction aborts it instead of returning
pub(crate) fn encode_tx<T: minicbor::Encode<()>>(value: &T) -> TxResult<Vec<u8>> {
    encode(value).map_err(ConflictableTransactionError::Abort)
}

fn voyage_order_key(voyage_id: &str, order_id: &str) -> String {
    format!("{voyage_id}/{order_id}")
}

pub struct VoyageStore {
    pub(crate) voyages: Tree,
    numbers: Tree,
}

impl VoyageStore {
    pub fn open(db: &Db) -> Result<Self> {
        Ok(Self {
            voyages: db.open_tree("voyages")?,
            numbers: db.open_tree("voyage_numbers")?,
        })
    }

    /// Stores a new voyage; voyage numbers are unique.
    pub fn insert(&self, voyage: &Voyage) -> Result<()> {
        (&self.voyages, &self.numbers).transaction(|(voyages, numbers)| {
            if numbers.get(voyage.voyage_number.as_bytes())?.is_some() {
                return abort(BookingError::IllegalState(format!(
                    "Voyage number {} already exists",
                    voyage.voyage_number
                )));
            }
            numbers.insert(voyage.voyage_number.as_bytes(), voyage.id.as_bytes())?;
            voyages.insert(voyage.id.as_bytes(), encode_tx(voyage)?)?;
            Ok(())
        })?;
        Ok(())
    }

    pub fn save(&self, voyage: &Voyage) -> Result<()> {
        self.voyages.insert(voyage.id.as_bytes(), encode(voyage)?)?;
        Ok(())
    }

    pub(crate) fn stage(tx: &TransactionalTree, voyage: &Voyage) -> TxResult<()> {
        tx.insert(voyage.id.as_bytes(), encode_tx(voyage)?)?;
        Ok(())
    }

    pub fn find_by_id(&self, voyage_id: &str) -> Result<Option<Voyage>> {
        self.voyages
            .get(voyage_id.as_bytes())?
            .map(|raw| decode(&raw))
            .transpose()
    }

    pub fn get(&self, voyage_id: &str) -> Result<Voyage> {
        self.find_by_id(voyage_id)?
            .ok_or_else(|| BookingError::not_found("Voyage", voyage_id))
    }

    /// Takes the voyage's exclusive lock, then reads the voyage under it.
    pub fn get_for_exclusive_access<'l>(
        &self,
        locks: &'l VoyageLocks,
        voyage_id: &str,
        wait: Duration,
    ) -> Result<(VoyageGuard<'l>, Voyage)> {
        let guard = locks.acquire(voyage_id, wait)?;
        let voyage = self.get(voyage_id)?;
        Ok((guard, voyage))
    }

    pub fn find_by_number(&self, voyage_number: &str) -> Result<Option<Voyage>> {
        match self.numbers.get(voyage_number.as_bytes())? {
            Some(id) => self.find_by_id(&String::from_utf8_lossy(&id)),
            None => Ok(None),
        }
    }

    pub fn find_by_status(&self, status: VoyageStatus) -> Result<Vec<Voyage>> {
        let mut found = Vec::new();
        for entry in self.voyages.iter() {
            let (_, raw) = entry?;
            let voyage: Voyage = decode(&raw)?;
            if voyage.status == status {
                found.push(voyage);
            }
        }
        Ok(found)
    }
}

pub struct OrderStore {
    pub(crate) orders: Tree,
    pub(crate) by_voyage: Tree,
}

impl OrderStore {
    pub fn open(db: &Db) -> Result<Self> {
        Ok(Self {
            orders: db.open_tree("freight_orders")?,
            by_voyage: db.open_tree("voyage_orders")?,
        })
    }

    pub fn save(&self, order: &FreightOrder) -> Result<()> {
        (&self.orders, &self.by_voyage).transaction(|(orders, by_voyage)| {
            Self::stage(orders, by_voyage, order)
        })?;
        Ok(())
    }

    pub(crate) fn stage(
        orders: &TransactionalTree,
        by_voyage: &TransactionalTree,
        order: &FreightOrder,
    ) -> TxResult<()> {
        orders.insert(order.id.as_bytes(), encode_tx(order)?)?;
        by_voyage.insert(
            voyage_order_key(&order.voyage_id, &order.id).as_bytes(),
            &[] as &[u8],
        )?;
        Ok(())
    }

    pub fn find_by_id(&self, order_id: &str) -> Result<Option<FreightOrder>> {
        self.orders
            .get(order_id.as_bytes())?
            .map(|raw| decode(&raw))
            .transpose()
    }

    pub fn get(&self, order_id: &str) -> Result<FreightOrder> {
        self.find_by_id(order_id)?
            .ok_or_else(|| BookingError::not_found("Order", order_id))
    }

    /// Every order ever placed on the voyage, oldest first.
    pub fn find_by_voyage(&self, voyage_id: &str) -> Result<Vec<FreightOrder>> {
        let prefix = voyage_order_key(voyage_id, "");
        let mut found = Vec::new();
        for entry in self.by_voyage.scan_prefix(prefix.as_bytes()) {
            let (key, _) = entry?;
            let order_id = String::from_utf8_lossy(&key[prefix.len()..]).into_owned();
            found.push(self.get(&order_id)?);
        }
        Ok(found)
    }

    /// Live TEU load of the voyage, read from the order records themselves.
    pub fn sum_teu_for_voyage(&self, voyage_id: &str) -> Result<u32> {
        let orders = self.find_by_voyage(voyage_id)?;
        Ok(capacity::current_load_teu(&orders))
    }

    pub fn find_by_status(&self, status: OrderStatus) -> Result<Vec<FreightOrder>> {
        self.scan(|o| o.status == status)
    }

    pub fn find_by_agent(&self, agent_id: &str) -> Result<Vec<FreightOrder>> {
        self.scan(|o| o.agent_id.as_deref() == Some(agent_id))
    }

    pub fn find_by_ordered_by(&self, ordered_by: &str) -> Result<Vec<FreightOrder>> {
        self.scan(|o| o.ordered_by == ordered_by)
    }

    fn scan(&self, keep: impl Fn(&FreightOrder) -> bool) -> Result<Vec<FreightOrder>> {
        let mut found = Vec::new();
        for entry in self.orders.iter() {
            let (_, raw) = entry?;
            let order: FreightOrder = decode(&raw)?;
            if keep(&order) {
                found.push(order);
            }
        }
        Ok(found)
    }

    /// Atomic read-modify-write of one order. The current record is re-read
    /// inside the transaction, so `mutate` always sees the latest status.
    pub fn update(
        &self,
        order_id: &str,
        mutate: impl Fn(&mut FreightOrder) -> Result<()>,
    ) -> Result<FreightOrder> {
        let updated = self.orders.transaction(|tx| {
            let Some(raw) = tx.get(order_id.as_bytes())? else {
                return abort(BookingError::not_found("Order", order_id));
            };
            let mut order: FreightOrder = match decode(&raw) {
                Ok(order) => order,
                Err(e) => return abort(e),
            };
            if let Err(e) = mutate(&mut order) {
                return abort(e);
            }
            tx.insert(order_id.as_bytes(), encode_tx(&order)?)?;
            Ok(order)
        })?;
        Ok(updated)
    }
}
