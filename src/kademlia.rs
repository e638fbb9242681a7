//! Kademlia node lookups, value lookups and stores.

mod config;
mod lookup;
mod republish;

use std::fmt::{self, Debug, Formatter};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use bytes::Bytes;
use tracing::{debug, info};

use crate::common::{Contact, File, Id};
use crate::network::{Responses, RoutingTable, Transport};
use crate::Result;

pub use config::{
    Config, DEFAULT_ALPHA, DEFAULT_K, DEFAULT_NODE_ROUND_TIMEOUT, DEFAULT_REPUBLISH_INTERVAL,
    DEFAULT_VALUE_ROUND_TIMEOUT,
};

use lookup::Lookup;
use republish::Republisher;

/// Lookup and store operations over a Kademlia overlay.
///
/// Cheap to clone, all clones share the same response channels and
/// republish tasks.
///
/// All lookups of one instance are serialized: they drain the same response
/// channels, so only one may be running at a time. Stores and republishes run
/// a node lookup first and wait for the lock like any other lookup.
#[derive(Clone)]
pub struct Kademlia(pub(crate) Arc<Inner>);

pub(crate) struct Inner {
    config: Config,
    routing_table: Box<dyn RoutingTable>,
    transport: Box<dyn Transport>,
    /// Also the lookup lock.
    responses: Mutex<Responses>,
    republisher: Republisher,
}

impl Kademlia {
    /// Create a new instance with the default [Config].
    pub fn new(
        routing_table: impl RoutingTable + 'static,
        transport: impl Transport + 'static,
        responses: Responses,
    ) -> Self {
        Self::with_config(Config::default(), routing_table, transport, responses)
    }

    fn with_config(
        config: Config,
        routing_table: impl RoutingTable + 'static,
        transport: impl Transport + 'static,
        responses: Responses,
    ) -> Self {
        Kademlia(Arc::new(Inner {
            config,
            routing_table: Box::new(routing_table),
            transport: Box::new(transport),
            responses: Mutex::new(responses),
            republisher: Republisher::default(),
        }))
    }

    /// Returns a builder to edit settings before creating a Kademlia instance.
    pub fn builder() -> KademliaBuilder {
        KademliaBuilder::default()
    }

    // === Getters ===

    pub fn config(&self) -> &Config {
        &self.0.config
    }

    /// Keys currently being republished.
    pub fn republishing(&self) -> Vec<Id> {
        self.0.republisher.keys()
    }

    // === Public Methods ===

    /// Find the `k` closest contacts to `target` in the network.
    pub fn lookup_contact(&self, target: Id) -> Vec<Contact> {
        self.0.lookup_contact(target)
    }

    /// Find a value by its key, returns `None` if no queried node had it.
    pub fn lookup_data(&self, key: Id) -> Option<Bytes> {
        self.0.lookup_data(key)
    }

    /// Store `data` at the closest nodes to its content key, and keep
    /// republishing it until [Self::stop_republishing] or [Self::shutdown].
    ///
    /// Returns the key without waiting for any acknowledgement.
    pub fn store(&self, data: impl Into<Bytes>) -> Id {
        self.store_file(File::new(data))
    }

    /// Same as [Self::store] with an explicit key.
    pub fn store_file(&self, file: File) -> Id {
        let key = file.key;

        let stored_at = self.0.publish(&file);
        debug!(?key, stored_at, "Stored");

        self.0
            .republisher
            .start(Arc::downgrade(&self.0), file, self.0.config.republish_interval);

        key
    }

    /// Stop republishing a key. Returns `false` if it wasn't being republished.
    pub fn stop_republishing(&self, key: &Id) -> bool {
        self.0.republisher.stop(key)
    }

    /// Stop every republish task.
    pub fn shutdown(&self) {
        info!(tasks = self.0.republisher.keys().len(), "Stopping republish tasks");
        self.0.republisher.stop_all();
    }
}

impl Inner {
    fn lookup_contact(&self, target: Id) -> Vec<Contact> {
        let responses = self.responses.lock().unwrap_or_else(PoisonError::into_inner);
        let seed = self
            .routing_table
            .find_closest_contacts(&target, self.config.k);

        Lookup::new(&self.config, self.transport.as_ref(), &responses, target, seed).find_node()
    }

    fn lookup_data(&self, key: Id) -> Option<Bytes> {
        let responses = self.responses.lock().unwrap_or_else(PoisonError::into_inner);
        let seed = self.routing_table.find_closest_contacts(&key, self.config.k);

        Lookup::new(&self.config, self.transport.as_ref(), &responses, key, seed)
            .find_value()
            .map(|packet| packet.data)
    }

    /// Send a store request to each of the current closest nodes to the file's key.
    ///
    /// Returns the number of nodes the request was sent to.
    fn publish(&self, file: &File) -> usize {
        let closest = self.lookup_contact(file.key);

        for contact in &closest {
            self.transport.send_store(contact.address, file.clone());
        }

        closest.len()
    }
}

impl Debug for Kademlia {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Kademlia")
            .field("config", &self.0.config)
            .field("republishing", &self.0.republisher.keys().len())
            .finish()
    }
}

#[derive(Debug, Default, Clone)]
/// Kademlia settings builder
pub struct KademliaBuilder(Config);

impl KademliaBuilder {
    /// Set the closest set size `k`.
    pub fn k(&mut self, k: usize) -> &mut Self {
        self.0.k = k;

        self
    }

    /// Set the round fan-out `alpha`.
    pub fn alpha(&mut self, alpha: usize) -> &mut Self {
        self.0.alpha = alpha;

        self
    }

    /// Set how long each find node round collects responses.
    pub fn node_round_timeout(&mut self, timeout: Duration) -> &mut Self {
        self.0.node_round_timeout = timeout;

        self
    }

    /// Set how long each find data round collects responses.
    pub fn value_round_timeout(&mut self, timeout: Duration) -> &mut Self {
        self.0.value_round_timeout = timeout;

        self
    }

    /// Set the period between republishes of stored values.
    pub fn republish_interval(&mut self, interval: Duration) -> &mut Self {
        self.0.republish_interval = interval;

        self
    }

    /// Create a Kademlia instance with the builder's settings.
    pub fn build(
        &self,
        routing_table: impl RoutingTable + 'static,
        transport: impl Transport + 'static,
        responses: Responses,
    ) -> Result<Kademlia> {
        self.0.validate()?;

        Ok(Kademlia::with_config(
            self.0.clone(),
            routing_table,
            transport,
            responses,
        ))
    }
}
