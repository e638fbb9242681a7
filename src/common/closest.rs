use std::vec::IntoIter;

use crate::common::{Contact, Id};

/// Bounded list of contacts sorted by distance to a target.
///
/// Holds at most `capacity` contacts (K) after every [Self::insert]. The
/// lower level [Self::insert_sorted] may grow the list past capacity until
/// [Self::truncate] is called.
#[derive(Debug, Clone)]
pub struct ClosestContacts {
    target: Id,
    capacity: usize,
    contacts: Vec<Contact>,
}

impl ClosestContacts {
    pub fn new(target: Id, capacity: usize) -> Self {
        Self {
            target,
            capacity,
            contacts: Vec::with_capacity(capacity + 1),
        }
    }

    /// Seed with contacts (e.g. from the local routing table), keeping the
    /// closest `capacity` of them.
    pub fn with_contacts<I: IntoIterator<Item = Contact>>(
        target: Id,
        capacity: usize,
        contacts: I,
    ) -> Self {
        let mut closest = Self::new(target, capacity);

        for contact in contacts {
            closest.insert(contact);
        }

        closest
    }

    // === Getters ===

    pub fn target(&self) -> &Id {
        &self.target
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn contacts(&self) -> &[Contact] {
        &self.contacts
    }

    pub fn len(&self) -> usize {
        self.contacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contacts.is_empty()
    }

    /// Snapshot of the ids currently in the set, in distance order.
    pub fn ids(&self) -> Vec<Id> {
        self.contacts.iter().map(|c| c.id).collect()
    }

    // === Public Methods ===

    pub fn contains(&self, contact: &Contact) -> bool {
        contains_contact(&self.contacts, contact)
    }

    /// Insert a contact before the first contact that is not closer to the
    /// target than it is. Does not deduplicate nor truncate.
    pub fn insert_sorted(&mut self, contact: Contact) -> usize {
        insert_contact_sorted(contact, &mut self.contacts, &self.target)
    }

    /// Drop the farthest contacts until the set is back to capacity.
    pub fn truncate(&mut self) {
        self.contacts.truncate(self.capacity);
    }

    /// Add a contact if it is not already known and is among the `capacity`
    /// closest to the target.
    ///
    /// Returns `true` if the contact is part of the set afterwards.
    pub fn insert(&mut self, contact: Contact) -> bool {
        if self.contains(&contact) {
            return false;
        }

        let position = self.insert_sorted(contact);
        self.truncate();

        position < self.capacity
    }
}

/// Linear membership test by [Id], addresses are ignored.
pub fn contains_contact(contacts: &[Contact], contact: &Contact) -> bool {
    contacts.iter().any(|c| c.id == contact.id)
}

/// Insert `contact` into `list`, which is sorted by distance to `target`,
/// returning the position it was inserted at.
pub fn insert_contact_sorted(contact: Contact, list: &mut Vec<Contact>, target: &Id) -> usize {
    let distance = contact.id.distance(target);

    let index = list
        .iter()
        .position(|current| distance.less(&current.id.distance(target)))
        .unwrap_or(list.len());

    list.insert(index, contact);

    index
}

impl IntoIterator for ClosestContacts {
    type Item = Contact;
    type IntoIter = IntoIter<Contact>;

    fn into_iter(self) -> Self::IntoIter {
        self.contacts.into_iter()
    }
}

impl<'a> IntoIterator for &'a ClosestContacts {
    type Item = &'a Contact;
    type IntoIter = std::slice::Iter<'a, Contact>;

    fn into_iter(self) -> Self::IntoIter {
        self.contacts.iter()
    }
}

impl From<ClosestContacts> for Vec<Contact> {
    fn from(closest: ClosestContacts) -> Self {
        closest.contacts
    }
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;

    use super::*;

    fn random_contacts(n: usize) -> Vec<Contact> {
        (0..n).map(|_| Contact::random()).collect()
    }

    fn is_sorted(closest: &ClosestContacts) -> bool {
        let distances = closest
            .contacts()
            .iter()
            .map(|c| c.id.distance(closest.target()))
            .collect::<Vec<_>>();

        let mut sorted = distances.clone();
        sorted.sort();

        sorted == distances
    }

    #[test]
    fn insert_keeps_order_and_capacity() {
        let target = Id::random();
        let mut closest = ClosestContacts::new(target, 5);

        for contact in random_contacts(50) {
            closest.insert(contact);

            assert!(closest.len() <= 5);
            assert!(is_sorted(&closest));
        }

        assert_eq!(closest.len(), 5);
    }

    #[test]
    fn insert_ignores_duplicates() {
        let target = Id::random();
        let mut closest = ClosestContacts::new(target, 3);

        let contact = Contact::random();

        assert!(closest.insert(contact));
        assert!(!closest.insert(Contact::new(
            contact.id,
            SocketAddr::from(([1, 2, 3, 4], 5))
        )));
        assert_eq!(closest.len(), 1);
    }

    #[test]
    fn insert_order_does_not_matter() {
        let target = Id::random();
        let contacts = random_contacts(40);

        let mut one_by_one = ClosestContacts::new(target, 8);
        for contact in contacts.iter().rev() {
            one_by_one.insert(*contact);
        }

        let mut all_at_once = contacts.clone();
        all_at_once.sort_by_key(|c| c.id.distance(&target));
        all_at_once.truncate(8);

        assert_eq!(one_by_one.ids(), all_at_once.iter().map(|c| c.id).collect::<Vec<_>>());
    }

    #[test]
    fn insert_reports_eviction() {
        let target = Id::from([0; 20]);

        let id = |last: u8| {
            let mut bytes = [0; 20];
            bytes[19] = last;
            Contact::new(Id::from(bytes), SocketAddr::from(([127, 0, 0, 1], last as u16)))
        };

        let mut closest = ClosestContacts::with_contacts(target, 2, [id(2), id(4)]);

        // Farther than everything in a full set.
        assert!(!closest.insert(id(9)));
        assert_eq!(closest.ids(), vec![id(2).id, id(4).id]);

        // Closer, evicts the farthest.
        assert!(closest.insert(id(1)));
        assert_eq!(closest.ids(), vec![id(1).id, id(2).id]);
    }

    #[test]
    fn insert_sorted_does_not_truncate() {
        let target = Id::random();
        let mut closest = ClosestContacts::new(target, 2);

        for contact in random_contacts(4) {
            closest.insert_sorted(contact);
        }

        assert_eq!(closest.len(), 4);
        assert!(is_sorted(&closest));

        closest.truncate();
        assert_eq!(closest.len(), 2);
    }

    #[test]
    fn contains_ignores_address() {
        let contacts = random_contacts(3);
        let same_id = Contact::new(contacts[1].id, SocketAddr::from(([8, 8, 8, 8], 53)));

        assert!(contains_contact(&contacts, &same_id));
        assert!(!contains_contact(&contacts, &Contact::random()));
    }
}
