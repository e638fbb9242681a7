//! AsyncKademlia client.

use std::thread;

use bytes::Bytes;

use crate::common::{Contact, File, Id};
use crate::error::KademliaWasShutdown;
use crate::kademlia::{Config, Kademlia};

impl Kademlia {
    /// Return an async version of the Kademlia client.
    pub fn as_async(self) -> AsyncKademlia {
        AsyncKademlia(self)
    }
}

#[derive(Debug, Clone)]
/// Async version of the Kademlia client.
///
/// Every operation runs the blocking lookup on a worker thread and awaits its
/// result, so lookups never block the executor.
pub struct AsyncKademlia(Kademlia);

impl AsyncKademlia {
    // === Getters ===

    pub fn config(&self) -> &Config {
        self.0.config()
    }

    pub fn republishing(&self) -> Vec<Id> {
        self.0.republishing()
    }

    /// Return the blocking client.
    pub fn as_blocking(&self) -> Kademlia {
        self.0.clone()
    }

    // === Public Methods ===

    /// Async version of [Kademlia::lookup_contact].
    pub async fn lookup_contact(&self, target: Id) -> Result<Vec<Contact>, KademliaWasShutdown> {
        self.run(move |kademlia| kademlia.lookup_contact(target))
            .await
    }

    /// Async version of [Kademlia::lookup_data].
    pub async fn lookup_data(&self, key: Id) -> Result<Option<Bytes>, KademliaWasShutdown> {
        self.run(move |kademlia| kademlia.lookup_data(key)).await
    }

    /// Async version of [Kademlia::store].
    pub async fn store(&self, data: impl Into<Bytes>) -> Result<Id, KademliaWasShutdown> {
        let file = File::new(data);

        self.store_file(file).await
    }

    /// Async version of [Kademlia::store_file].
    pub async fn store_file(&self, file: File) -> Result<Id, KademliaWasShutdown> {
        self.run(move |kademlia| kademlia.store_file(file)).await
    }

    pub fn stop_republishing(&self, key: &Id) -> bool {
        self.0.stop_republishing(key)
    }

    pub fn shutdown(&self) {
        self.0.shutdown()
    }

    // === Private Methods ===

    async fn run<T, F>(&self, operation: F) -> Result<T, KademliaWasShutdown>
    where
        T: Send + 'static,
        F: FnOnce(Kademlia) -> T + Send + 'static,
    {
        let (sender, receiver) = flume::bounded::<T>(1);
        let kademlia = self.0.clone();

        thread::spawn(move || {
            let _ = sender.send(operation(kademlia));
        });

        receiver.recv_async().await.map_err(|_| KademliaWasShutdown)
    }
}
