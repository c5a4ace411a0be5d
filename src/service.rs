//! Service layer API for voyage booking
//!
//! [`BookingService`] owns the admission protocol: every decision that can add
//! load to a voyage runs while holding that voyage's exclusive lock, reads the
//! live order set, and commits the new order together with any auto cutoff in
//! one sled transaction.
use std::sync::Arc;

use rust_decimal::Decimal;
use sled::{Db, Transactional};
use tracing::{info, warn};

use crate::capacity::{self, Admission};
use crate::config::BookingSettings;
use crate::container::{Container, ContainerSize, ContainerType};
use crate::directory::{Agent, Customer, Directory};
use crate::error::{BookingError, Result};
use crate::lock::VoyageLocks;
use crate::order::{Discount, FreightOrder, OrderStatus};
use crate::pricing::{PricingResolver, VoyagePrice, VoyagePriceBook};
use crate::store::{OrderStore, VoyageStore};
use crate::utils::{ORDER_HRP, new_id};
use crate::voyage::{Voyage, VoyageDraft, VoyageStatus};

/// A booking request for one container on one voyage.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub voyage_id: String,
    pub container_id: String,
    pub customer_id: String,
    pub agent_id: Option<String>,
    pub discount_percent: Option<Decimal>,
    pub discount_reason: Option<String>,
    pub ordered_by: String,
}

impl NewOrder {
    pub fn new(voyage_id: &str, container_id: &str, customer_id: &str, ordered_by: &str) -> Self {
        Self {
            voyage_id: voyage_id.to_string(),
            container_id: container_id.to_string(),
            customer_id: customer_id.to_string(),
            agent_id: None,
            discount_percent: None,
            discount_reason: None,
            ordered_by: ordered_by.to_string(),
        }
    }
    pub fn set_agent(mut self, agent_id: &str) -> Self {
        self.agent_id = Some(agent_id.to_string());
        self
    }
    pub fn set_discount(mut self, percent: Decimal, reason: Option<&str>) -> Self {
        self.discount_percent = Some(percent);
        self.discount_reason = reason.map(str::to_string);
        self
    }
}

/// Point in time view of a voyage's load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoyageLoad {
    pub voyage_id: String,
    pub max_capacity_teu: u32,
    pub load_teu: u32,
    pub remaining_teu: i64,
    pub booking_open: bool,
}

pub struct BookingService {
    voyages: VoyageStore,
    orders: OrderStore,
    directory: Directory,
    prices: Arc<VoyagePriceBook>,
    pricing: Arc<dyn PricingResolver>,
    locks: VoyageLocks,
    settings: BookingSettings,
}

impl BookingService {
    pub fn new(instance: Arc<Db>, settings: BookingSettings) -> Result<Self> {
        let prices = Arc::new(VoyagePriceBook::open(&instance)?);
        Ok(Self {
            voyages: VoyageStore::open(&instance)?,
            orders: OrderStore::open(&instance)?,
            directory: Directory::open(&instance)?,
            pricing: prices.clone(),
            prices,
            locks: VoyageLocks::new(),
            settings,
        })
    }

    /// Resolve base prices somewhere other than the built in price book.
    pub fn with_pricing(mut self, pricing: Arc<dyn PricingResolver>) -> Self {
        self.pricing = pricing;
        self
    }

    pub fn settings(&self) -> &BookingSettings {
        &self.settings
    }

    pub fn voyage_locks(&self) -> &VoyageLocks {
        &self.locks
    }

    /// Admit a container onto a voyage, or say precisely why not.
    #[tracing::instrument(skip(self, request), fields(voyage_id = %request.voyage_id))]
    pub fn create_order(&self, request: NewOrder) -> Result<FreightOrder> {
        let discount = match request.discount_percent {
            Some(percent) => Discount::new(percent, request.discount_reason.clone())?,
            None => Discount::none(),
        };

        // held until the order and any cutoff are committed
        let (_guard, mut voyage) = self.voyages.get_for_exclusive_access(
            &self.locks,
            &request.voyage_id,
            self.settings.lock_wait,
        )?;

        let container = self.directory.container(&request.container_id)?;
        self.directory.customer(&request.customer_id)?;
        if let Some(agent_id) = &request.agent_id {
            let agent = self.directory.agent(agent_id)?;
            if !agent.active {
                return Err(BookingError::BadRequest(format!(
                    "Agent {agent_id} is not active"
                )));
            }
        }

        let base_price = self
            .pricing
            .find_price(&voyage.id, container.size)?
            .ok_or_else(|| {
                BookingError::BadRequest(format!(
                    "No price defined for voyage {} and container size {}",
                    voyage.voyage_number,
                    container.size.code()
                ))
            })?;

        let booked = self.orders.find_by_voyage(&voyage.id)?;
        let current_load = capacity::current_load_teu(&booked);
        let candidate_teu = container.teu();

        if let Admission::Reject(reason) = capacity::can_admit(&voyage, current_load, candidate_teu) {
            return Err(reason.into());
        }
        if booked
            .iter()
            .any(|o| o.container_id == container.id && o.status.holds_capacity())
        {
            return Err(BookingError::IllegalState(format!(
                "Container {} is already booked on voyage {}",
                container.code, voyage.voyage_number
            )));
        }

        let order = FreightOrder::new_pending(
            new_id(ORDER_HRP)?,
            voyage.id.clone(),
            container.id.clone(),
            container.size,
            request.customer_id,
            request.agent_id,
            request.ordered_by,
            base_price,
            discount,
        );

        let post_booking_load = current_load + candidate_teu;
        let threshold_percent = self.settings.auto_cutoff_percent();
        let cutoff = capacity::should_auto_cutoff(&voyage, post_booking_load, threshold_percent);
        if cutoff {
            voyage.booking_open = false;
            voyage.touch();
        }

        (&self.orders.orders, &self.orders.by_voyage, &self.voyages.voyages).transaction(
            |(orders, by_voyage, voyages)| {
                OrderStore::stage(orders, by_voyage, &order)?;
                if cutoff {
                    VoyageStore::stage(voyages, &voyage)?;
                }
                Ok(())
            },
        )?;

        info!(
            order_id = %order.id,
            voyage_id = %voyage.id,
            teu = candidate_teu,
            load_teu = post_booking_load,
            final_price = %order.final_price(),
            "Freight order created"
        );
        if cutoff {
            warn!(
                voyage_id = %voyage.id,
                threshold_percent,
                load_teu = post_booking_load,
                capacity_teu = voyage.max_capacity_teu,
                "Auto cutoff triggered for voyage {} (threshold: {}%)",
                voyage.id,
                threshold_percent
            );
        }

        Ok(order)
    }

    /// Reprice an order. Does not touch capacity, so no voyage lock is taken.
    pub fn update_discount(
        &self,
        order_id: &str,
        discount_percent: Decimal,
        reason: Option<&str>,
    ) -> Result<FreightOrder> {
        let discount = Discount::new(discount_percent, reason.map(str::to_string))?;
        let order = self
            .orders
            .update(order_id, |order| order.apply_discount(discount.clone()))?;

        info!(
            order_id,
            discount_percent = %order.discount_percent(),
            final_price = %order.final_price(),
            "Discount updated"
        );
        Ok(order)
    }

    /// Manual open or close of bookings. Reopening is allowed at any load; the
    /// auto cutoff only fires again on a later booking. Only a scheduled
    /// voyage can be opened.
    pub fn set_booking_open(&self, voyage_id: &str, open: bool) -> Result<Voyage> {
        let (_guard, mut voyage) =
            self.voyages
                .get_for_exclusive_access(&self.locks, voyage_id, self.settings.lock_wait)?;

        if open && voyage.status != VoyageStatus::Scheduled {
            return Err(BookingError::IllegalState(format!(
                "Cannot open booking on voyage {} in status {:?}",
                voyage.voyage_number, voyage.status
            )));
        }
        if voyage.booking_open != open {
            voyage.booking_open = open;
            voyage.touch();
            self.voyages.save(&voyage)?;
            info!(voyage_id, booking_open = open, "Booking status changed manually");
        }
        Ok(voyage)
    }

    /// Moves the voyage along its lifecycle. Leaving `Scheduled` closes bookings.
    pub fn update_voyage_status(&self, voyage_id: &str, status: VoyageStatus) -> Result<Voyage> {
        let (_guard, mut voyage) =
            self.voyages
                .get_for_exclusive_access(&self.locks, voyage_id, self.settings.lock_wait)?;

        if voyage.status == status {
            return Ok(voyage);
        }
        if !voyage.status.can_transition_to(status) {
            return Err(BookingError::IllegalState(format!(
                "Voyage {} cannot move from {:?} to {:?}",
                voyage.voyage_number, voyage.status, status
            )));
        }

        voyage.status = status;
        voyage.booking_open = false;
        voyage.touch();
        self.voyages.save(&voyage)?;

        info!(voyage_id, status = ?status, "Voyage status updated");
        Ok(voyage)
    }

    /// Capacity edits may never drop below what is already booked.
    pub fn update_max_capacity(&self, voyage_id: &str, max_capacity_teu: u32) -> Result<Voyage> {
        if max_capacity_teu == 0 {
            return Err(BookingError::BadRequest(
                "Max capacity must be a positive number of TEU".into(),
            ));
        }
        let (_guard, mut voyage) =
            self.voyages
                .get_for_exclusive_access(&self.locks, voyage_id, self.settings.lock_wait)?;

        let load = self.orders.sum_teu_for_voyage(voyage_id)?;
        if max_capacity_teu < load {
            return Err(BookingError::IllegalState(format!(
                "Cannot reduce capacity of voyage {} to {} TEU, {} TEU already booked",
                voyage.voyage_number, max_capacity_teu, load
            )));
        }

        voyage.max_capacity_teu = max_capacity_teu;
        voyage.touch();
        self.voyages.save(&voyage)?;
        Ok(voyage)
    }

    pub fn capacity(&self, voyage_id: &str) -> Result<VoyageLoad> {
        let voyage = self.voyages.get(voyage_id)?;
        let load_teu = self.orders.sum_teu_for_voyage(voyage_id)?;
        Ok(VoyageLoad {
            remaining_teu: capacity::remaining_capacity(&voyage, load_teu),
            voyage_id: voyage.id,
            max_capacity_teu: voyage.max_capacity_teu,
            load_teu,
            booking_open: voyage.booking_open,
        })
    }

    /// Cancelling releases the order's TEU; the per-order transaction keeps it
    /// atomic with a concurrent discount update.
    pub fn update_order_status(&self, order_id: &str, status: OrderStatus) -> Result<FreightOrder> {
        let order = self
            .orders
            .update(order_id, |order| order.transition_to(status))?;
        info!(order_id, status = ?status, "Order status updated");
        Ok(order)
    }

    pub fn register_voyage(&self, draft: VoyageDraft) -> Result<Voyage> {
        let voyage = draft.validate_and_finalise()?;
        self.voyages.insert(&voyage)?;
        info!(voyage_id = %voyage.id, voyage_number = %voyage.voyage_number, "Voyage registered");
        Ok(voyage)
    }

    pub fn voyage(&self, voyage_id: &str) -> Result<Voyage> {
        self.voyages.get(voyage_id)
    }

    pub fn voyage_by_number(&self, voyage_number: &str) -> Result<Voyage> {
        self.voyages
            .find_by_number(voyage_number)?
            .ok_or_else(|| BookingError::not_found("Voyage", voyage_number))
    }

    pub fn voyages_by_status(&self, status: VoyageStatus) -> Result<Vec<Voyage>> {
        self.voyages.find_by_status(status)
    }

    pub fn set_price(
        &self,
        voyage_id: &str,
        size: ContainerSize,
        base_price_usd: Decimal,
    ) -> Result<VoyagePrice> {
        self.voyages.get(voyage_id)?;
        self.prices.set_price(voyage_id, size, base_price_usd)
    }

    pub fn remove_price(&self, voyage_id: &str, size: ContainerSize) -> Result<bool> {
        self.prices.remove_price(voyage_id, size)
    }

    pub fn prices_for_voyage(&self, voyage_id: &str) -> Result<Vec<VoyagePrice>> {
        self.prices.prices_for_voyage(voyage_id)
    }

    pub fn register_container(
        &self,
        code: &str,
        size: ContainerSize,
        container_type: ContainerType,
    ) -> Result<Container> {
        let container = Container::new(code, size, container_type)?;
        self.directory.register_container(&container)?;
        Ok(container)
    }

    pub fn container_by_code(&self, code: &str) -> Result<Option<Container>> {
        self.directory.container_by_code(code)
    }

    pub fn register_customer(&self, company_name: &str, contact_name: &str, email: &str) -> Result<Customer> {
        let customer = Customer::new(company_name, contact_name, email)?;
        self.directory.register_customer(&customer)?;
        Ok(customer)
    }

    pub fn register_agent(&self, name: &str, email: &str, commission_percent: Decimal) -> Result<Agent> {
        let agent = Agent::new(name, email, commission_percent)?;
        self.directory.register_agent(&agent)?;
        Ok(agent)
    }

    pub fn set_agent_active(&self, agent_id: &str, active: bool) -> Result<Agent> {
        let agent = self.directory.set_agent_active(agent_id, active)?;
        info!(agent_id, active, "Agent activation changed");
        Ok(agent)
    }

    pub fn order(&self, order_id: &str) -> Result<FreightOrder> {
        self.orders.get(order_id)
    }

    pub fn orders_for_voyage(&self, voyage_id: &str) -> Result<Vec<FreightOrder>> {
        self.orders.find_by_voyage(voyage_id)
    }

    pub fn orders_by_status(&self, status: OrderStatus) -> Result<Vec<FreightOrder>> {
        self.orders.find_by_status(status)
    }

    pub fn orders_by_agent(&self, agent_id: &str) -> Result<Vec<FreightOrder>> {
        self.orders.find_by_agent(agent_id)
    }

    pub fn orders_by_ordered_by(&self, ordered_by: &str) -> Result<Vec<FreightOrder>> {
        self.orders.find_by_ordered_by(ordered_by)
    }
}
