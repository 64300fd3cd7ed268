pub mod transport;
pub mod heartbeat;
pub mod client;

pub use transport::{HttpTransport, RegistryTransport, TransportError};
pub use heartbeat::{HeartbeatHandle, HeartbeatOutcome};
pub use client::{ClientPhase, RegistryClient};
