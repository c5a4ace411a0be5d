//! Reference records an order points at: containers, customers and agents.
use rust_decimal::Decimal;
use sled::{Db, Transactional, Tree};

use crate::container::Container;
use crate::error::{BookingError, Result, abort};
use crate::store::{decode, encode, encode_tx};
use crate::types::TimeStamp;
use crate::utils::{AGENT_HRP, CUSTOMER_HRP, new_id};

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq, Eq)]
pub struct Customer {
    #[n(0)]
    pub id: String,
    #[n(1)]
    pub company_name: String,
    #[n(2)]
    pub contact_name: String,
    #[n(3)]
    pub email: String,
    #[n(4)]
    pub created_at: TimeStamp,
}

impl Customer {
    pub fn new(company_name: &str, contact_name: &str, email: &str) -> Result<Self> {
        if company_name.trim().is_empty() {
            return Err(BookingError::BadRequest("Company name is required".into()));
        }
        check_email(email)?;
        Ok(Self {
            id: new_id(CUSTOMER_HRP)?,
            company_name: company_name.to_string(),
            contact_name: contact_name.to_string(),
            email: email.to_string(),
            created_at: TimeStamp::now(),
        })
    }
}

/// A booking agent earning commission on the orders they place.
#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq, Eq)]
pub struct Agent {
    #[n(0)]
    pub id: String,
    #[n(1)]
    pub name: String,
    #[n(2)]
    pub email: String,
    #[n(3)]
    #[cbor(with = "crate::types::decimal")]
    pub commission_percent: Decimal,
    #[n(4)]
    pub active: bool,
    #[n(5)]
    pub created_at: TimeStamp,
}

impl Agent {
    pub fn new(name: &str, email: &str, commission_percent: Decimal) -> Result<Self> {
        if name.trim().is_empty() {
            return Err(BookingError::BadRequest("Agent name is required".into()));
        }
        check_email(email)?;
        if commission_percent < Decimal::ZERO || commission_percent > Decimal::ONE_HUNDRED {
            return Err(BookingError::BadRequest(format!(
                "Commission percent must be between 0 and 100, got {commission_percent}"
            )));
        }
        Ok(Self {
            id: new_id(AGENT_HRP)?,
            name: name.to_string(),
            email: email.to_string(),
            commission_percent,
            active: true,
            created_at: TimeStamp::now(),
        })
    }
}

fn check_email(email: &str) -> Result<()> {
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(()),
        _ => Err(BookingError::BadRequest(format!("Invalid email address '{email}'"))),
    }
}

pub struct Directory {
    containers: Tree,
    container_codes: Tree,
    customers: Tree,
    agents: Tree,
}

impl Directory {
    pub fn open(db: &Db) -> Result<Self> {
        Ok(Self {
            containers: db.open_tree("containers")?,
            container_codes: db.open_tree("container_codes")?,
            customers: db.open_tree("customers")?,
            agents: db.open_tree("agents")?,
        })
    }

    /// Container codes are unique across the fleet.
    pub fn register_container(&self, container: &Container) -> Result<()> {
        let raw = encode(container)?;
        (&self.containers, &self.container_codes).transaction(|(containers, codes)| {
            if codes.get(container.code.as_bytes())?.is_some() {
                return abort(BookingError::IllegalState(format!(
                    "Container {} is already registered",
                    container.code
                )));
            }
            codes.insert(container.code.as_bytes(), container.id.as_bytes())?;
            containers.insert(container.id.as_bytes(), raw.clone())?;
            Ok(())
        })?;
        Ok(())
    }

    pub fn container(&self, container_id: &str) -> Result<Container> {
        lookup(&self.containers, container_id, "Container")
    }

    pub fn container_by_code(&self, code: &str) -> Result<Option<Container>> {
        match self.container_codes.get(code.as_bytes())? {
            Some(id) => self.container(&String::from_utf8_lossy(&id)).map(Some),
            None => Ok(None),
        }
    }

    pub fn register_customer(&self, customer: &Customer) -> Result<()> {
        self.customers.insert(customer.id.as_bytes(), encode(customer)?)?;
        Ok(())
    }

    pub fn customer(&self, customer_id: &str) -> Result<Customer> {
        lookup(&self.customers, customer_id, "Customer")
    }

    pub fn register_agent(&self, agent: &Agent) -> Result<()> {
        self.agents.insert(agent.id.as_bytes(), encode(agent)?)?;
        Ok(())
    }

    pub fn agent(&self, agent_id: &str) -> Result<Agent> {
        lookup(&self.agents, agent_id, "Agent")
    }

    /// Flips the active flag on the latest stored record.
    pub fn set_agent_active(&self, agent_id: &str, active: bool) -> Result<Agent> {
        let agent = self.agents.transaction(|tx| {
            let Some(raw) = tx.get(agent_id.as_bytes())? else {
                return abort(BookingError::not_found("Agent", agent_id));
            };
            let mut agent: Agent = match decode(&raw) {
                Ok(agent) => agent,
                Err(e) => return abort(e),
            };
            agent.active = active;
            tx.insert(agent_id.as_bytes(), encode_tx(&agent)?)?;
            Ok(agent)
        })?;
        Ok(agent)
    }
}

fn lookup<T>(tree: &Tree, id: &str, entity: &'static str) -> Result<T>
where
    T: for<'b> minicbor::Decode<'b, ()>,
{
    match tree.get(id.as_bytes())? {
        Some(raw) => decode(&raw),
        None => Err(BookingError::not_found(entity, id)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::{ContainerSize, ContainerType};
    use rust_decimal_macros::dec;

    #[test]
    fn container_codes_are_unique() {
        let dir = tempfile::tempdir().unwrap();
        let db = sled::open(dir.path().join("directory.db")).unwrap();
        let directory = Directory::open(&db).unwrap();

        let c = Container::new("MSCU1234567", ContainerSize::TwentyFoot, ContainerType::Reefer).unwrap();
        directory.register_container(&c).unwrap();

        let dup = Container::new("MSCU1234567", ContainerSize::FortyFoot, ContainerType::Dry).unwrap();
        assert!(matches!(
            directory.register_container(&dup),
            Err(BookingError::IllegalState(_))
        ));

        assert_eq!(directory.container(&c.id).unwrap(), c);
        assert_eq!(directory.container_by_code("MSCU1234567").unwrap(), Some(c));
        assert!(matches!(
            directory.container(&dup.id),
            Err(BookingError::NotFound { entity: "Container", .. })
        ));
    }

    #[test]
    fn agent_activation_keeps_other_fields() {
        let dir = tempfile::tempdir().unwrap();
        let db = sled::open(dir.path().join("directory.db")).unwrap();
        let directory = Directory::open(&db).unwrap();

        let agent = Agent::new("Test Agent", "agent@somewhere.com", dec!(7.5)).unwrap();
        directory.register_agent(&agent).unwrap();

        let paused = directory.set_agent_active(&agent.id, false).unwrap();
        assert!(!paused.active);
        assert_eq!(paused.commission_percent, dec!(7.5));
        assert_eq!(directory.agent(&agent.id).unwrap(), paused);

        assert!(directory.set_agent_active(&agent.id, true).unwrap().active);
        assert!(matches!(
            directory.set_agent_active("agent_missing", true),
            Err(BookingError::NotFound { entity: "Agent", .. })
        ));
    }

    #[test]
    fn concurrent_activation_toggles_do_not_lose_the_record() {
        let dir = tempfile::tempdir().unwrap();
        let db = sled::open(dir.path().join("directory.db")).unwrap();
        let directory = Directory::open(&db).unwrap();
        let agent = Agent::new("Test Agent", "agent@somewhere.com", dec!(10)).unwrap();
        directory.register_agent(&agent).unwrap();

        std::thread::scope(|s| {
            for i in 0..8 {
                let directory = &directory;
                let id = agent.id.as_str();
                s.spawn(move || directory.set_agent_active(id, i % 2 == 0).unwrap());
            }
        });

        let stored = directory.agent(&agent.id).unwrap();
        assert_eq!(stored.name, agent.name);
        assert_eq!(stored.commission_percent, agent.commission_percent);
    }

    #[test]
    fn party_validation() {
        assert!(Customer::new("Test Customer Inc.", "John Doe", "john@test.com").is_ok());
        assert!(Customer::new("", "John Doe", "john@test.com").is_err());
        assert!(Customer::new("Acme", "John Doe", "not-an-email").is_err());

        let agent = Agent::new("Test Agent", "agent@somewhere.com", dec!(10)).unwrap();
        assert!(agent.active);
        assert!(Agent::new("Test Agent", "agent@somewhere.com", dec!(120)).is_err());
    }
}
