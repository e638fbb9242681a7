//! Kademlia node Id, content key, and the XOR distance between them.
use rand::Rng;
use std::{
    fmt::{self, Debug, Display, Formatter},
    str::FromStr,
};

use crate::{Error, Result};

/// The size of node IDs in bytes.
pub const ID_SIZE: usize = 20;

#[derive(Clone, Copy, PartialEq, Ord, PartialOrd, Eq, Hash)]
/// Kademlia node Id or a lookup target
pub struct Id([u8; ID_SIZE]);

impl Id {
    pub fn random() -> Id {
        let mut rng = rand::thread_rng();
        let random_bytes: [u8; ID_SIZE] = rng.gen();

        Id(random_bytes)
    }

    /// Create a new Id from some bytes. Returns Err if `bytes` is not of length
    /// [ID_SIZE].
    pub fn from_bytes<T: AsRef<[u8]>>(bytes: T) -> Result<Id> {
        let bytes = bytes.as_ref();
        if bytes.len() != ID_SIZE {
            return Err(Error::InvalidIdSize(bytes.len()));
        }

        let mut tmp: [u8; ID_SIZE] = [0; ID_SIZE];
        tmp.copy_from_slice(bytes);

        Ok(Id(tmp))
    }

    pub fn as_bytes(&self) -> &[u8; ID_SIZE] {
        &self.0
    }

    /// XOR distance between this Id and a target Id.
    pub fn distance(&self, other: &Id) -> Distance {
        let mut xor = [0_u8; ID_SIZE];

        for (i, byte) in xor.iter_mut().enumerate() {
            *byte = self.0[i] ^ other.0[i];
        }

        Distance(xor)
    }
}

impl From<[u8; ID_SIZE]> for Id {
    fn from(bytes: [u8; ID_SIZE]) -> Id {
        Id(bytes)
    }
}

impl Display for Id {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for byte in self.0 {
            write!(f, "{:02x}", byte)?;
        }

        Ok(())
    }
}

impl Debug for Id {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "Id({})", self)
    }
}

impl FromStr for Id {
    type Err = Error;

    fn from_str(s: &str) -> Result<Id> {
        if s.len() != ID_SIZE * 2 || !s.is_ascii() {
            return Err(Error::InvalidIdHex(s.to_string()));
        }

        let mut bytes = [0_u8; ID_SIZE];

        for (i, byte) in bytes.iter_mut().enumerate() {
            *byte = u8::from_str_radix(&s[i * 2..i * 2 + 2], 16)
                .map_err(|_| Error::InvalidIdHex(s.to_string()))?;
        }

        Ok(Id(bytes))
    }
}

/// XOR distance between two [Id]s.
///
/// Ordered by big-endian magnitude, so two distinct ids never have the same
/// distance to a given target.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Distance([u8; ID_SIZE]);

impl Distance {
    /// Distance from an id to itself.
    pub const ZERO: Distance = Distance([0; ID_SIZE]);

    /// Returns `true` if this distance is strictly smaller than `other`.
    pub fn less(&self, other: &Distance) -> bool {
        self < other
    }

    pub fn as_bytes(&self) -> &[u8; ID_SIZE] {
        &self.0
    }
}

impl Debug for Distance {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "Distance({})", Id(self.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_to_self_is_zero() {
        let id = Id::random();

        assert_eq!(id.distance(&id), Distance::ZERO);
    }

    #[test]
    fn distance_is_symmetric() {
        let a = Id::random();
        let b = Id::random();

        assert_eq!(a.distance(&b), b.distance(&a));
    }

    #[test]
    fn less_is_antisymmetric() {
        for _ in 0..100 {
            let target = Id::random();
            let a = Id::random();
            let b = Id::random();

            let da = a.distance(&target);
            let db = b.distance(&target);

            assert!(!(da.less(&db) && db.less(&da)));

            if a != b {
                assert!(da.less(&db) ^ db.less(&da));
            } else {
                assert!(!da.less(&db));
            }
        }
    }

    #[test]
    fn distance_compares_most_significant_byte_first() {
        let target = Id::from([0; ID_SIZE]);

        let mut near = [0; ID_SIZE];
        near[ID_SIZE - 1] = 0xff;
        let mut far = [0; ID_SIZE];
        far[0] = 0x01;

        let near = Id::from(near).distance(&target);
        let far = Id::from(far).distance(&target);

        assert!(near.less(&far));
    }

    #[test]
    fn from_bytes_rejects_wrong_size() {
        assert_eq!(Id::from_bytes([0; 19]), Err(Error::InvalidIdSize(19)));
        assert!(Id::from_bytes([7; ID_SIZE]).is_ok());
    }

    #[test]
    fn hex_string_form() {
        let id = Id::from_str("4238af8aff56cf6e0007d9d2003bf23d33eea7c3").unwrap();

        assert_eq!(id.to_string(), "4238af8aff56cf6e0007d9d2003bf23d33eea7c3");
        assert_eq!(id.as_bytes()[0], 0x42);
        assert_eq!(id.to_string().parse::<Id>().unwrap(), id);

        assert!(Id::from_str("4238af").is_err());
        assert!(Id::from_str("zz38af8aff56cf6e0007d9d2003bf23d33eea7c3").is_err());
    }
}
