//! Content addressed values stored in the network.

use bytes::Bytes;
use sha1_smol::Sha1;

use crate::common::Id;

#[derive(Debug, Clone, PartialEq, Eq)]
/// A value to store at the closest nodes to its key.
pub struct File {
    pub key: Id,
    pub data: Bytes,
}

impl File {
    /// Create a file keyed by the SHA-1 hash of its content.
    pub fn new(data: impl Into<Bytes>) -> Self {
        let data = data.into();

        File {
            key: content_key(&data),
            data,
        }
    }

    /// Create a file with an explicit key, e.g. when republishing.
    pub fn with_key(key: Id, data: impl Into<Bytes>) -> Self {
        File {
            key,
            data: data.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// A value returned by a remote node in response to a find data request.
pub struct FilePacket {
    pub key: Id,
    pub data: Bytes,
    /// Id of the node that returned this value.
    pub source: Id,
}

impl FilePacket {
    pub fn new(key: Id, data: impl Into<Bytes>, source: Id) -> Self {
        FilePacket {
            key,
            data: data.into(),
            source,
        }
    }

    pub fn into_file(self) -> File {
        File::with_key(self.key, self.data)
    }
}

/// Derive the key a value is stored under.
pub fn content_key(data: &[u8]) -> Id {
    let mut hasher = Sha1::new();
    hasher.update(data);

    hasher.digest().bytes().into()
}
