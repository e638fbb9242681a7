//! In-process simulated overlay.
//!
//! A [Testnet] is a set of simulated peers that answer find node, find data
//! and store requests from their own knowledge of the overlay. Every request
//! is served on its own short-lived thread, after an optional latency, so
//! responses arrive concurrently and in no particular order, and offline
//! peers never answer at all.

use std::collections::HashMap;
use std::net::{Ipv4Addr, SocketAddr};
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::Duration;

use bytes::Bytes;
use lru::LruCache;
use rand::seq::SliceRandom;
use tracing::trace;

use crate::common::{ClosestContacts, Contact, File, FilePacket, Id};
use crate::kademlia::{Kademlia, KademliaBuilder, DEFAULT_K};
use crate::network::{response_channels, ResponseSenders, Responses, StaticRoutingTable, Transport};
use crate::Result;

/// Values each peer keeps before evicting the least recently used.
const MAX_VALUES: usize = 1000;
const PORT: u16 = 6881;

#[derive(Debug)]
struct Peer {
    contact: Contact,
    known: Vec<Contact>,
    values: Mutex<LruCache<Id, Bytes>>,
    online: AtomicBool,
}

impl Peer {
    fn closest(&self, target: &Id, count: usize) -> Vec<Contact> {
        ClosestContacts::with_contacts(*target, count, self.known.iter().copied()).into()
    }

    fn get(&self, key: &Id) -> Option<Bytes> {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn put(&self, file: File) {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .put(file.key, file.data);
    }

    fn online(&self) -> bool {
        self.online.load(Ordering::Relaxed)
    }
}

#[derive(Debug)]
struct Overlay {
    peers: HashMap<SocketAddr, Peer>,
    /// Contacts returned per find node response.
    answer_size: usize,
    latency: Duration,
}

/// Simulated overlay of peers to run lookups against.
#[derive(Debug, Clone)]
pub struct Testnet {
    overlay: Arc<Overlay>,
}

impl Testnet {
    /// Create a testnet of `size` peers where every peer knows every other peer.
    pub fn new(size: usize) -> Self {
        TestnetBuilder::default().size(size).build()
    }

    pub fn builder() -> TestnetBuilder {
        TestnetBuilder::default()
    }

    // === Getters ===

    pub fn size(&self) -> usize {
        self.overlay.peers.len()
    }

    /// Every peer in the overlay.
    pub fn contacts(&self) -> Vec<Contact> {
        self.overlay.peers.values().map(|p| p.contact).collect()
    }

    /// The actual `count` closest peers to `target`, online or not.
    pub fn closest(&self, target: &Id, count: usize) -> Vec<Contact> {
        ClosestContacts::with_contacts(*target, count, self.contacts()).into()
    }

    /// Peers currently holding a value for `key`.
    pub fn holders(&self, key: &Id) -> Vec<Contact> {
        self.overlay
            .peers
            .values()
            .filter(|peer| peer.get(key).is_some())
            .map(|peer| peer.contact)
            .collect()
    }

    // === Public Methods ===

    /// Take a peer offline, or bring it back. Returns `false` for unknown addresses.
    pub fn set_online(&self, address: SocketAddr, online: bool) -> bool {
        match self.overlay.peers.get(&address) {
            Some(peer) => {
                peer.online.store(online, Ordering::Relaxed);
                true
            }
            None => false,
        }
    }

    /// Store a value directly at a peer, bypassing the network.
    pub fn put(&self, address: SocketAddr, file: File) -> bool {
        match self.overlay.peers.get(&address) {
            Some(peer) => {
                peer.put(file);
                true
            }
            None => false,
        }
    }

    /// A transport into this testnet and the responses it delivers.
    pub fn transport(&self) -> (TestnetTransport, Responses) {
        let (senders, responses) = response_channels();

        (
            TestnetTransport {
                overlay: self.overlay.clone(),
                senders,
            },
            responses,
        )
    }

    /// A routing table of `count` random peers.
    pub fn bootstrap(&self, count: usize) -> StaticRoutingTable {
        let mut contacts = self.contacts();
        contacts.shuffle(&mut rand::thread_rng());
        contacts.truncate(count);

        StaticRoutingTable::new(contacts)
    }

    /// A client with default settings, knowing `bootstrap` random peers.
    pub fn client(&self, bootstrap: usize) -> Kademlia {
        let (transport, responses) = self.transport();

        Kademlia::new(self.bootstrap(bootstrap), transport, responses)
    }

    /// A client with custom settings, knowing `bootstrap` random peers.
    pub fn client_with(&self, builder: &KademliaBuilder, bootstrap: usize) -> Result<Kademlia> {
        let (transport, responses) = self.transport();

        builder.build(self.bootstrap(bootstrap), transport, responses)
    }
}

#[derive(Debug, Clone)]
/// Testnet settings builder
pub struct TestnetBuilder {
    size: usize,
    neighbours: Option<usize>,
    answer_size: usize,
    latency: Duration,
}

impl Default for TestnetBuilder {
    fn default() -> Self {
        Self {
            size: 20,
            neighbours: None,
            answer_size: DEFAULT_K,
            latency: Duration::ZERO,
        }
    }
}

impl TestnetBuilder {
    /// Number of peers.
    pub fn size(&mut self, size: usize) -> &mut Self {
        self.size = size;

        self
    }

    /// Make each peer know only its `count` closest peers plus `count`
    /// random ones, instead of the whole overlay.
    pub fn neighbours(&mut self, count: usize) -> &mut Self {
        self.neighbours = Some(count);

        self
    }

    /// Number of contacts in each find node answer.
    pub fn answer_size(&mut self, count: usize) -> &mut Self {
        self.answer_size = count;

        self
    }

    /// Delay before each peer answers.
    pub fn latency(&mut self, latency: Duration) -> &mut Self {
        self.latency = latency;

        self
    }

    pub fn build(&self) -> Testnet {
        let contacts = (0..self.size)
            .map(|i| {
                let ip = Ipv4Addr::from(u32::from(Ipv4Addr::new(127, 0, 0, 1)) + i as u32);
                Contact::new(Id::random(), SocketAddr::from((ip, PORT)))
            })
            .collect::<Vec<_>>();

        let capacity = NonZeroUsize::new(MAX_VALUES).unwrap_or(NonZeroUsize::MIN);
        let mut rng = rand::thread_rng();

        let peers = contacts
            .iter()
            .map(|contact| {
                let others = contacts.iter().filter(|c| c.id != contact.id).copied();

                let known: Vec<Contact> = match self.neighbours {
                    None => others.collect(),
                    Some(count) => {
                        let mut known: Vec<Contact> =
                            ClosestContacts::with_contacts(contact.id, count, others).into();

                        for random in contacts.choose_multiple(&mut rng, count) {
                            if random.id != contact.id && !known.contains(random) {
                                known.push(*random);
                            }
                        }

                        known
                    }
                };

                let peer = Peer {
                    contact: *contact,
                    known,
                    values: Mutex::new(LruCache::new(capacity)),
                    online: AtomicBool::new(true),
                };

                (contact.address, peer)
            })
            .collect();

        Testnet {
            overlay: Arc::new(Overlay {
                peers,
                answer_size: self.answer_size,
                latency: self.latency,
            }),
        }
    }
}

/// [Transport] delivering requests to [Testnet] peers.
#[derive(Debug, Clone)]
pub struct TestnetTransport {
    overlay: Arc<Overlay>,
    senders: ResponseSenders,
}

impl TestnetTransport {
    /// Serve a request on its own thread, if the peer is reachable.
    fn serve<F>(&self, address: SocketAddr, handle: F)
    where
        F: FnOnce(&Overlay, &Peer, &ResponseSenders) + Send + 'static,
    {
        let overlay = self.overlay.clone();
        let senders = self.senders.clone();

        thread::spawn(move || {
            if !overlay.latency.is_zero() {
                thread::sleep(overlay.latency);
            }

            match overlay.peers.get(&address) {
                Some(peer) if peer.online() => handle(&overlay, peer, &senders),
                _ => trace!(?address, "Request to unreachable peer"),
            }
        });
    }
}

impl Transport for TestnetTransport {
    fn send_find_node(&self, address: SocketAddr, target: Id) {
        self.serve(address, move |overlay, peer, senders| {
            for contact in peer.closest(&target, overlay.answer_size) {
                senders.contact(contact);
            }
        });
    }

    fn send_find_data(&self, address: SocketAddr, key: Id) {
        self.serve(address, move |overlay, peer, senders| match peer.get(&key) {
            Some(data) => {
                senders.value(FilePacket::new(key, data, peer.contact.id));
            }
            None => {
                for contact in peer.closest(&key, overlay.answer_size) {
                    senders.contact(contact);
                }
            }
        });
    }

    fn send_store(&self, address: SocketAddr, file: File) {
        self.serve(address, move |_, peer, _| peer.put(file));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn peers_answer_find_node() {
        let testnet = Testnet::new(10);
        let (transport, responses) = testnet.transport();

        let peer = testnet.contacts()[0];
        let target = Id::random();

        transport.send_find_node(peer.address, target);

        let mut returned = vec![];
        for _ in 0..DEFAULT_K {
            returned.push(
                responses
                    .contacts
                    .recv_timeout(Duration::from_secs(1))
                    .unwrap(),
            );
        }

        let expected: Vec<Contact> = ClosestContacts::with_contacts(
            target,
            DEFAULT_K,
            testnet.contacts().into_iter().filter(|c| c.id != peer.id),
        )
        .into();

        returned.sort_by_key(|c| c.id.distance(&target));
        assert_eq!(returned, expected);
    }

    #[test]
    fn offline_peers_stay_silent() {
        let testnet = Testnet::new(5);
        let (transport, responses) = testnet.transport();

        let peer = testnet.contacts()[0];
        assert!(testnet.set_online(peer.address, false));

        transport.send_find_node(peer.address, Id::random());

        assert!(responses
            .contacts
            .recv_timeout(Duration::from_millis(100))
            .is_err());
    }

    #[test]
    fn store_then_find_data() {
        let testnet = Testnet::new(5);
        let (transport, responses) = testnet.transport();

        let peer = testnet.contacts()[0];
        let file = File::new(&b"testnet"[..]);

        transport.send_store(peer.address, file.clone());
        thread::sleep(Duration::from_millis(50));

        assert_eq!(testnet.holders(&file.key), vec![peer]);

        transport.send_find_data(peer.address, file.key);

        let packet = responses
            .values
            .recv_timeout(Duration::from_secs(1))
            .unwrap();

        assert_eq!(packet, FilePacket::new(file.key, file.data, peer.id));
    }

    #[test]
    fn neighbours_limit_knowledge() {
        let testnet = Testnet::builder().size(30).neighbours(4).build();

        for peer in testnet.overlay.peers.values() {
            assert!(peer.known.len() <= 8);
            assert!(peer.known.len() >= 4);
            assert!(!peer.known.contains(&peer.contact));
        }
    }
}
