//! A known peer: an [Id] and the address it is reachable at.
use std::{
    hash::{Hash, Hasher},
    net::SocketAddr,
};

use crate::common::Id;

#[derive(Debug, Clone, Copy)]
/// Contact entry used by lookups.
///
/// Two contacts are the same node iff their ids match, the address is not
/// part of the identity.
pub struct Contact {
    pub id: Id,
    pub address: SocketAddr,
}

impl Contact {
    /// Creates a new Contact from an id and socket address.
    pub fn new(id: Id, address: SocketAddr) -> Contact {
        Contact { id, address }
    }

    /// Creates a contact with a random Id at an unspecified address.
    pub fn random() -> Contact {
        Contact {
            id: Id::random(),
            address: SocketAddr::from(([0, 0, 0, 0], 0)),
        }
    }

    // === Getters ===

    pub fn id(&self) -> &Id {
        &self.id
    }

    pub fn address(&self) -> SocketAddr {
        self.address
    }
}

impl PartialEq for Contact {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Contact {}

impl Hash for Contact {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}
