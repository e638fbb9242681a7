//! Miscellaneous common structs used throughout the library.

mod closest;
mod contact;
mod file;
mod id;

pub use closest::*;
pub use contact::*;
pub use file::*;
pub use id::*;
