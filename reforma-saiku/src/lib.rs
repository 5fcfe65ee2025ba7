//! OLAP backend adapter for reforma.
//!
//! The remote service (Saiku) is queried over HTTP JSON: a session is
//! established per `{reportName}_{connectionName}`, level members are listed
//! through the metadata endpoint, and queries go through an axis/hierarchy/
//! level model. An optional per-request routing postfix switches the backing
//! connection, catalog and schema consistently for every call.

mod client;
mod executor;
pub mod model;

pub use self::client::SaikuClient;
pub use self::executor::SaikuExecutor;
