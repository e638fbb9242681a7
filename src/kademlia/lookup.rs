//! Iterative node and value lookups.

use std::collections::HashSet;
use std::time::Instant;

use flume::Selector;
use tracing::{debug, trace};

use crate::common::{ClosestContacts, Contact, File, FilePacket, Id};
use crate::network::{Responses, Transport};

use super::config::Config;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LookupKind {
    FindNode,
    FindData,
}

enum Received {
    Contact(Contact),
    Value(FilePacket),
}

/// State of one lookup: the closest contacts seen so far, the contacts
/// already queried, and the frontier to query next round.
///
/// Every round sends one request per frontier contact, then collects the
/// responses arriving within the round timeout. The next frontier is taken
/// from the unqueried members of the closest set; `alpha` of them if the
/// round changed the closest set, `k` of them otherwise. Since frontier
/// contacts are always unqueried, and always queried once picked, the
/// lookup ends once the closest set holds no unqueried contact.
pub(crate) struct Lookup<'a> {
    config: &'a Config,
    transport: &'a dyn Transport,
    responses: &'a Responses,
    target: Id,
    /// Closest set before any query was sent.
    initial: Vec<Contact>,
    closest: ClosestContacts,
    queried: HashSet<Id>,
    frontier: Vec<Contact>,
    round: usize,
}

impl<'a> Lookup<'a> {
    /// Callers must hold the lock over `responses` for as long as the lookup runs.
    pub fn new(
        config: &'a Config,
        transport: &'a dyn Transport,
        responses: &'a Responses,
        target: Id,
        seed: Vec<Contact>,
    ) -> Self {
        let closest = ClosestContacts::with_contacts(target, config.k, seed);
        let frontier = closest.contacts().iter().take(config.alpha).copied().collect();

        Self {
            config,
            transport,
            responses,
            target,
            initial: closest.contacts().to_vec(),
            closest,
            queried: HashSet::new(),
            frontier,
            round: 0,
        }
    }

    // === Public Methods ===

    /// Run rounds until no unqueried contact is left among the closest set.
    pub fn find_node(mut self) -> Vec<Contact> {
        self.discard_stale();

        while !self.frontier.is_empty() {
            let before = self.closest.ids();

            self.dispatch(LookupKind::FindNode);
            let received = self.collect_contacts();

            let improved = self.closest.ids() != before;
            self.finish_round(received, improved);
        }

        debug!(
            id = ?self.target,
            rounds = self.round,
            queried = self.queried.len(),
            closest = self.closest.len(),
            "Node lookup done"
        );

        self.closest.into()
    }

    /// Same rounds as [Self::find_node], stopping after the first round that
    /// returned a value for the target.
    ///
    /// A found value is also stored at the closest initially known contact
    /// that didn't return it.
    pub fn find_value(mut self) -> Option<FilePacket> {
        self.discard_stale();

        while !self.frontier.is_empty() {
            let before = self.closest.ids();

            self.dispatch(LookupKind::FindData);
            let (received, found) = self.collect_values();

            if let Some(packet) = found {
                debug!(
                    id = ?self.target,
                    rounds = self.round + 1,
                    source = ?packet.source,
                    "Value lookup found value"
                );

                self.cache(&packet);

                return Some(packet);
            }

            let improved = self.closest.ids() != before;
            self.finish_round(received, improved);
        }

        debug!(
            id = ?self.target,
            rounds = self.round,
            queried = self.queried.len(),
            "Value lookup found nothing"
        );

        None
    }

    // === Private Methods ===

    fn discard_stale(&self) {
        let stale = self.responses.drain();

        if stale > 0 {
            trace!(id = ?self.target, stale, "Discarded responses from previous lookups");
        }
    }

    /// Send a request to every contact in the frontier and mark them queried.
    fn dispatch(&mut self, kind: LookupKind) {
        for contact in &self.frontier {
            match kind {
                LookupKind::FindNode => self.transport.send_find_node(contact.address, self.target),
                LookupKind::FindData => self.transport.send_find_data(contact.address, self.target),
            }

            self.queried.insert(contact.id);
        }

        trace!(id = ?self.target, round = self.round, ?kind, frontier = self.frontier.len(), "Dispatched round");
    }

    /// Absorb returned contacts until the node round timeout elapses.
    fn collect_contacts(&mut self) -> usize {
        // `None` if the timeout can't be represented, wait until disconnected.
        let deadline = Instant::now().checked_add(self.config.node_round_timeout);
        let mut received = 0;

        loop {
            let response = match deadline {
                Some(deadline) => self.responses.contacts.recv_deadline(deadline).ok(),
                None => self.responses.contacts.recv().ok(),
            };

            let Some(contact) = response else {
                break;
            };

            received += 1;
            self.absorb(contact);
        }

        received
    }

    /// Absorb returned contacts and values until the value round timeout elapses.
    fn collect_values(&mut self) -> (usize, Option<FilePacket>) {
        let deadline = Instant::now().checked_add(self.config.value_round_timeout);
        let mut received = 0;
        let mut found: Option<FilePacket> = None;

        loop {
            let selector = Selector::new()
                .recv(&self.responses.contacts, |r| r.map(Received::Contact))
                .recv(&self.responses.values, |r| r.map(Received::Value));

            let response = match deadline {
                Some(deadline) => selector.wait_deadline(deadline),
                None => Ok(selector.wait()),
            };

            match response {
                Ok(Ok(Received::Contact(contact))) => {
                    received += 1;
                    self.absorb(contact);
                }
                Ok(Ok(Received::Value(packet))) => {
                    received += 1;

                    if packet.key != self.target {
                        trace!(id = ?self.target, key = ?packet.key, source = ?packet.source, "Dropped value for another key");
                    } else if found.is_none() {
                        found = Some(packet);
                    }
                }
                // Transport dropped its senders, nothing more will come.
                Ok(Err(_)) => break,
                // Round timeout
                Err(_) => break,
            }
        }

        (received, found)
    }

    fn absorb(&mut self, contact: Contact) {
        if self.closest.contains(&contact) {
            trace!(id = ?self.target, contact = ?contact.id, "Contact already among closest");
            return;
        }

        if self.closest.insert(contact) {
            trace!(id = ?self.target, contact = ?contact.id, address = ?contact.address, "Contact added to closest");
        }
    }

    /// Pick the next frontier among unqueried closest contacts.
    fn finish_round(&mut self, received: usize, improved: bool) {
        let limit = if improved {
            self.config.alpha
        } else {
            self.config.k
        };

        self.frontier = self
            .closest
            .contacts()
            .iter()
            .filter(|contact| !self.queried.contains(&contact.id))
            .take(limit)
            .copied()
            .collect();

        debug!(
            id = ?self.target,
            round = self.round,
            received,
            improved,
            next = self.frontier.len(),
            "Lookup round done"
        );

        self.round += 1;
    }

    /// Store a found value at the first initially known contact that isn't its source.
    fn cache(&self, packet: &FilePacket) {
        if let Some(contact) = self.initial.iter().find(|c| c.id != packet.source) {
            trace!(key = ?packet.key, at = ?contact.id, "Caching found value");

            self.transport
                .send_store(contact.address, File::with_key(packet.key, packet.data.clone()));
        }
    }
}
