//! Instance descriptor sent to the discovery registry on registration.
//!
//! Field names and value encodings follow the registry's JSON instance
//! document, including its `$`/`@`-prefixed keys and stringly-typed flags.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::config::RegistryClientConfig;

/// Seconds between lease renewals. The heartbeat timer uses this period.
pub const RENEWAL_INTERVAL_SECS: u64 = 30;
/// Seconds the registry keeps the lease alive without a renewal.
pub const LEASE_DURATION_SECS: u64 = 90;

const SECURE_PORT: u16 = 443;
const COUNTRY_ID: u32 = 1;
const DATA_CENTER_CLASS: &str = "com.netflix.appinfo.InstanceInfo$DefaultDataCenterInfo";
const DATA_CENTER_NAME: &str = "MyOwn";
const EMPTY_METADATA_CLASS: &str = "java.util.Collections$EmptyMap";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InstanceStatus {
    Up,
    Down,
    Starting,
    OutOfService,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortBinding {
    #[serde(rename = "$")]
    pub port: u16,
    #[serde(rename = "@enabled")]
    pub enabled: String,
}

impl PortBinding {
    fn new(port: u16, enabled: bool) -> Self {
        Self {
            port,
            enabled: enabled.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataCenterInfo {
    #[serde(rename = "@class")]
    pub class: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaseInfo {
    pub renewal_interval_in_secs: u64,
    pub duration_in_secs: u64,
    pub registration_timestamp: u64,
    pub last_renewal_timestamp: u64,
    pub eviction_timestamp: u64,
    pub service_up_timestamp: u64,
}

impl LeaseInfo {
    pub fn renewal_interval(&self) -> Duration {
        Duration::from_secs(self.renewal_interval_in_secs)
    }

    pub fn duration(&self) -> Duration {
        Duration::from_secs(self.duration_in_secs)
    }
}

impl Default for LeaseInfo {
    fn default() -> Self {
        Self {
            renewal_interval_in_secs: RENEWAL_INTERVAL_SECS,
            duration_in_secs: LEASE_DURATION_SECS,
            registration_timestamp: 0,
            last_renewal_timestamp: 0,
            eviction_timestamp: 0,
            service_up_timestamp: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceMetadata {
    #[serde(rename = "@class")]
    pub class: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceDescriptor {
    pub host_name: String,
    pub app: String,
    pub ip_addr: String,
    pub status: InstanceStatus,
    #[serde(rename = "overriddenstatus")]
    pub overridden_status: InstanceStatus,
    pub port: PortBinding,
    pub secure_port: PortBinding,
    pub country_id: u32,
    pub data_center_info: DataCenterInfo,
    pub lease_info: LeaseInfo,
    pub metadata: InstanceMetadata,
    pub home_page_url: String,
    pub status_page_url: String,
    pub health_check_url: String,
    pub vip_address: String,
    pub secure_vip_address: String,
    pub is_coordinating_discovery_server: String,
    pub last_updated_timestamp: String,
    pub last_dirty_timestamp: String,
    pub action_type: String,
}

impl InstanceDescriptor {
    /// Builds the descriptor advertised for `config`. Pure; the same config
    /// always yields an identical descriptor.
    pub fn from_config(config: &RegistryClientConfig) -> Self {
        let base = format!("http://{}:{}", config.host_name, config.port);

        Self {
            host_name: config.host_name.clone(),
            app: config.service_name.clone(),
            ip_addr: config.host_name.clone(),
            status: InstanceStatus::Up,
            overridden_status: InstanceStatus::Unknown,
            port: PortBinding::new(config.port, true),
            secure_port: PortBinding::new(SECURE_PORT, false),
            country_id: COUNTRY_ID,
            data_center_info: DataCenterInfo {
                class: DATA_CENTER_CLASS.to_string(),
                name: DATA_CENTER_NAME.to_string(),
            },
            lease_info: LeaseInfo::default(),
            metadata: InstanceMetadata {
                class: EMPTY_METADATA_CLASS.to_string(),
            },
            home_page_url: format!("{base}/"),
            status_page_url: format!("{base}/health"),
            health_check_url: format!("{base}/health"),
            vip_address: config.service_name.clone(),
            secure_vip_address: config.service_name.clone(),
            is_coordinating_discovery_server: "false".to_string(),
            last_updated_timestamp: "0".to_string(),
            last_dirty_timestamp: "0".to_string(),
            action_type: "ADDED".to_string(),
        }
    }

    pub fn renewal_interval(&self) -> Duration {
        self.lease_info.renewal_interval()
    }
}

/// Wire envelope for the registration call: `{"instance": {...}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationRequest {
    pub instance: InstanceDescriptor,
}

impl From<InstanceDescriptor> for RegistrationRequest {
    fn from(instance: InstanceDescriptor) -> Self {
        Self { instance }
    }
}
