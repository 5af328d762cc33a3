//! Cryptographic primitives for NGDP/CASC content retrieval
//!
//! - **Digests**: MD5 content keys and encoding keys
//! - **Key management**: additive TACT key store consulted by the BLTE decoder
//! - **Ciphers**: the CASC Salsa20 variant and ARC4 for encrypted BLTE chunks
//! - **Hashing**: Jenkins96 (`hashlittle2`) for root file name hashes
//!
//! # Examples
//!
//! ```
//! use cascfetch_crypto::{ContentKey, TactKey, TactKeyStore};
//!
//! let key = ContentKey::from_data(b"Hello, World!");
//! assert_eq!(key.to_hex(), "65a8e27d8879283831b664bd8b7f0ad4");
//!
//! let mut store = TactKeyStore::empty();
//! store.add(TactKey::new(0xFA50_5078_126A_CB3E, [0x11; 16]));
//! assert!(store.get(0xFA50_5078_126A_CB3E).is_some());
//! ```

#![warn(missing_docs)]

pub mod arc4;
pub mod error;
pub mod jenkins;
pub mod keys;
pub mod md5;
pub mod salsa20;

pub use error::CryptoError;

pub use arc4::Arc4Cipher;
pub use jenkins::{Jenkins96, hashlittle2};
pub use keys::{TactKey, TactKeyStore};
pub use md5::{ContentKey, EncodingKey};
pub use salsa20::Salsa20Cipher;
