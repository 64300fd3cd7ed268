use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::instance::InstanceStatus;

/// Body of the health endpoints polled by the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct HealthReport {
    pub status: InstanceStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(example = "frontend")]
    pub service: Option<String>,
}

impl HealthReport {
    pub fn up() -> Self {
        Self {
            status: InstanceStatus::Up,
            service: None,
        }
    }

    pub fn with_service(mut self, service: impl Into<String>) -> Self {
        self.service = Some(service.into());
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ServiceBanner {
    #[schema(example = "Frontend Service is running")]
    pub message: String,
}
