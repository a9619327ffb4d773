mod wifi;

pub use wifi::{AccessPointConfig, Credentials, ScanRecord};

/// Identifier the transport collaborator assigns to a duplex session.
pub type SessionId = u32;
