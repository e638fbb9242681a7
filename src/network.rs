//! Seams to the routing table and the RPC transport.
//!
//! Lookups only need two things from the rest of a node: the contacts it
//! already knows closest to a target, and a way to fire requests at remote
//! nodes. Responses to those requests come back asynchronously on the
//! [Responses] channels, one channel per response kind.

use std::net::SocketAddr;
use std::sync::Arc;

use flume::{Receiver, Sender};

use crate::common::{ClosestContacts, Contact, File, FilePacket, Id};

/// Local knowledge of the network.
pub trait RoutingTable: Send + Sync {
    /// Up to `count` known contacts closest to `target`, sorted by distance.
    fn find_closest_contacts(&self, target: &Id, count: usize) -> Vec<Contact>;
}

/// Outbound RPCs.
///
/// Every method dispatches a single request and returns immediately. Contacts
/// from find node (and find data misses) are delivered on
/// [ResponseSenders::contacts], found values on [ResponseSenders::values].
/// Unresponsive nodes simply never deliver anything.
pub trait Transport: Send + Sync {
    fn send_find_node(&self, address: SocketAddr, target: Id);

    fn send_find_data(&self, address: SocketAddr, key: Id);

    fn send_store(&self, address: SocketAddr, file: File);
}

impl<T: RoutingTable + ?Sized> RoutingTable for Arc<T> {
    fn find_closest_contacts(&self, target: &Id, count: usize) -> Vec<Contact> {
        (**self).find_closest_contacts(target, count)
    }
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn send_find_node(&self, address: SocketAddr, target: Id) {
        (**self).send_find_node(address, target)
    }

    fn send_find_data(&self, address: SocketAddr, key: Id) {
        (**self).send_find_data(address, key)
    }

    fn send_store(&self, address: SocketAddr, file: File) {
        (**self).send_store(address, file)
    }
}

/// Receiving side of the response channels, owned by [crate::Kademlia].
#[derive(Debug)]
pub struct Responses {
    pub(crate) contacts: Receiver<Contact>,
    pub(crate) values: Receiver<FilePacket>,
}

impl Responses {
    /// Discard responses that arrived after their lookup was over.
    ///
    /// Returns the number of dropped responses.
    pub(crate) fn drain(&self) -> usize {
        self.contacts.drain().count() + self.values.drain().count()
    }
}

/// Sending side of the response channels, owned by the transport.
#[derive(Debug, Clone)]
pub struct ResponseSenders {
    pub contacts: Sender<Contact>,
    pub values: Sender<FilePacket>,
}

impl ResponseSenders {
    /// Deliver a contact returned by a remote node.
    ///
    /// Returns `false` if the receiving [crate::Kademlia] was dropped.
    pub fn contact(&self, contact: Contact) -> bool {
        self.contacts.send(contact).is_ok()
    }

    /// Deliver a value returned by a remote node.
    ///
    /// Returns `false` if the receiving [crate::Kademlia] was dropped.
    pub fn value(&self, packet: FilePacket) -> bool {
        self.values.send(packet).is_ok()
    }
}

/// Create the unbounded response channels shared by a transport and a
/// [crate::Kademlia] instance.
pub fn response_channels() -> (ResponseSenders, Responses) {
    let (contacts_tx, contacts_rx) = flume::unbounded();
    let (values_tx, values_rx) = flume::unbounded();

    (
        ResponseSenders {
            contacts: contacts_tx,
            values: values_tx,
        },
        Responses {
            contacts: contacts_rx,
            values: values_rx,
        },
    )
}

/// A fixed set of known contacts.
#[derive(Debug, Clone, Default)]
pub struct StaticRoutingTable {
    contacts: Vec<Contact>,
}

impl StaticRoutingTable {
    pub fn new(contacts: Vec<Contact>) -> Self {
        Self { contacts }
    }

    pub fn contacts(&self) -> &[Contact] {
        &self.contacts
    }
}

impl RoutingTable for StaticRoutingTable {
    fn find_closest_contacts(&self, target: &Id, count: usize) -> Vec<Contact> {
        ClosestContacts::with_contacts(*target, count, self.contacts.iter().copied()).into()
    }
}
