//! Cluster identifiers.
//!
//! Node and object identifiers are opaque fixed-size byte strings. Their
//! text form is lowercase hex, which is also how they are serialized.

use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use rand::RngCore;
use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize, Serializer};

use crate::protocol::error::{PeerlinkError, Result};

/// Size in bytes of every cluster identifier.
pub const UNIQUE_ID_SIZE: usize = 28;

macro_rules! unique_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name([u8; UNIQUE_ID_SIZE]);

        impl $name {
            /// The all-zero id.
            pub const fn nil() -> Self {
                Self([0u8; UNIQUE_ID_SIZE])
            }

            pub const fn from_bytes(bytes: [u8; UNIQUE_ID_SIZE]) -> Self {
                Self(bytes)
            }

            /// Builds an id from a slice that must be exactly
            /// [`UNIQUE_ID_SIZE`] bytes long.
            pub fn from_slice(bytes: &[u8]) -> Result<Self> {
                let bytes: [u8; UNIQUE_ID_SIZE] = bytes.try_into().map_err(|_| {
                    PeerlinkError::InvalidId(format!(
                        "expected {} bytes, got {}",
                        UNIQUE_ID_SIZE,
                        bytes.len()
                    ))
                })?;
                Ok(Self(bytes))
            }

            /// Generates a fresh id from the thread-local random generator.
            pub fn from_random() -> Self {
                Self(random_bytes())
            }

            /// Parses the hex text form; either letter case is accepted.
            pub fn from_hex(text: &str) -> Result<Self> {
                Ok(Self(decode_hex(text)?))
            }

            pub fn to_hex(&self) -> String {
                hex::encode(self.0)
            }

            pub fn as_bytes(&self) -> &[u8; UNIQUE_ID_SIZE] {
                &self.0
            }

            pub fn is_nil(&self) -> bool {
                self.0.iter().all(|b| *b == 0)
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::nil()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.to_hex())
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.to_hex())
            }
        }

        impl FromStr for $name {
            type Err = PeerlinkError;

            fn from_str(s: &str) -> Result<Self> {
                Self::from_hex(s)
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.to_hex())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
                struct HexVisitor;

                impl<'de> Visitor<'de> for HexVisitor {
                    type Value = $name;

                    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                        write!(f, "a {}-character hex string", UNIQUE_ID_SIZE * 2)
                    }

                    fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<$name, E> {
                        $name::from_hex(v).map_err(E::custom)
                    }
                }

                deserializer.deserialize_str(HexVisitor)
            }
        }
    };
}

unique_id! {
    /// Stable logical identity of a cluster peer, independent of the network
    /// address it currently listens on.
    NodeId
}

unique_id! {
    /// Identity of an object held by a peer's object manager.
    ObjectId
}

impl NodeId {
    /// Derives a stable id from a bare `ip:port` endpoint.
    ///
    /// Used to key peers whose address does not carry a node id. The same
    /// endpoint always yields the same id within a build of this crate.
    pub fn for_endpoint(ip_address: &str, port: u16) -> Self {
        let mut bytes = [0u8; UNIQUE_ID_SIZE];
        for (salt, chunk) in bytes.chunks_mut(8).enumerate() {
            let mut hasher = DefaultHasher::new();
            salt.hash(&mut hasher);
            ip_address.hash(&mut hasher);
            port.hash(&mut hasher);
            let word = hasher.finish().to_be_bytes();
            chunk.copy_from_slice(&word[..chunk.len()]);
        }
        Self(bytes)
    }
}

fn random_bytes() -> [u8; UNIQUE_ID_SIZE] {
    let mut bytes = [0u8; UNIQUE_ID_SIZE];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes
}

fn decode_hex(text: &str) -> Result<[u8; UNIQUE_ID_SIZE]> {
    let mut bytes = [0u8; UNIQUE_ID_SIZE];
    hex::decode_to_slice(text, &mut bytes)
        .map_err(|e| PeerlinkError::InvalidId(format!("'{}': {}", text, e)))?;
    Ok(bytes)
}
