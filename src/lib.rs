#![doc = include_str!("../README.md")]
//! ## Feature flags
#![doc = document_features::document_features!()]
//!

// Public modules
mod common;
mod error;

#[cfg(feature = "async")]
pub mod async_kademlia;
pub mod kademlia;
pub mod network;
pub mod testnet;

pub use crate::common::{
    contains_contact, content_key, insert_contact_sorted, ClosestContacts, Contact, Distance,
    File, FilePacket, Id, ID_SIZE,
};
pub use bytes::Bytes;
pub use error::{Error, Result};
pub use kademlia::{Config, Kademlia, KademliaBuilder};
pub use network::{response_channels, ResponseSenders, Responses, RoutingTable, Transport};
pub use testnet::Testnet;

#[cfg(feature = "async")]
pub use error::KademliaWasShutdown;
