//! The remote record-keeping system: an XML-RPC client and the
//! [`RemoteSync`] state machine that reconciles records with it.

pub mod client;
pub mod error;
pub mod sync;
pub mod xmlrpc;

pub use client::{DomainTerm, RemoteRecord, RemoteStore, XmlRpcStore};
pub use error::{RemoteError, SyncError};
pub use sync::RemoteSync;
pub use xmlrpc::Value;
