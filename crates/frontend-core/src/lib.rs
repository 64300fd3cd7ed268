pub mod config;
pub mod instance;
pub mod health;
pub mod errors;

pub use config::{RegistryClientConfig, ServerConfig};
pub use instance::{InstanceDescriptor, InstanceStatus, RegistrationRequest};
pub use health::{HealthReport, ServiceBanner};
pub use errors::ConfigError;
