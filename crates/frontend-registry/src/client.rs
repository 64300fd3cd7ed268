//! Client side of the discovery registry handshake.
//!
//! A [`RegistryClient`] registers this instance once and then keeps its
//! lease alive with a periodic heartbeat until it is stopped:
//!
//! ```text
//! Unregistered --register()--> Registered --start_heartbeat()--> HeartbeatActive
//!                                   \                                  |
//!                                    `------- stop_heartbeat() ------> Stopped
//! ```
//!
//! Registry failures are never fatal. They are logged and surface as `false`
//! or a [`HeartbeatOutcome`]. A failed registration is not retried, and a
//! lease that lapses because heartbeats keep failing is not re-registered.

use std::sync::Arc;
use std::time::Duration;

use frontend_core::{InstanceDescriptor, RegistrationRequest, RegistryClientConfig};
use reqwest::StatusCode;

use crate::heartbeat::{self, HeartbeatHandle, HeartbeatOutcome, LeaseTarget};
use crate::transport::{HttpTransport, RegistryTransport, TransportError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientPhase {
    Unregistered,
    Registered,
    HeartbeatActive,
    Stopped,
}

#[derive(Debug)]
enum Phase {
    Unregistered,
    Registered,
    HeartbeatActive(HeartbeatHandle),
    Stopped,
}

pub struct RegistryClient<T = HttpTransport> {
    config: RegistryClientConfig,
    transport: Arc<T>,
    /// Replaces the descriptor's renewal interval as the timer period.
    heartbeat_period: Option<Duration>,
    phase: Phase,
}

impl RegistryClient<HttpTransport> {
    pub fn from_config(config: RegistryClientConfig) -> Result<Self, TransportError> {
        let transport = HttpTransport::new(config.registry_url.clone())?;
        Ok(Self::with_transport(config, transport))
    }
}

impl<T: RegistryTransport> RegistryClient<T> {
    pub fn with_transport(config: RegistryClientConfig, transport: T) -> Self {
        Self {
            config,
            transport: Arc::new(transport),
            heartbeat_period: None,
            phase: Phase::Unregistered,
        }
    }

    /// Renews every `period` instead of the advertised renewal interval.
    /// The registry still sees the advertised lease parameters, so only use
    /// this against registries that do not enforce them.
    pub fn with_heartbeat_period(mut self, period: Duration) -> Self {
        self.heartbeat_period = Some(period);
        self
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn phase(&self) -> ClientPhase {
        match self.phase {
            Phase::Unregistered => ClientPhase::Unregistered,
            Phase::Registered => ClientPhase::Registered,
            Phase::HeartbeatActive(_) => ClientPhase::HeartbeatActive,
            Phase::Stopped => ClientPhase::Stopped,
        }
    }

    pub fn is_heartbeat_active(&self) -> bool {
        matches!(self.phase, Phase::HeartbeatActive(_))
    }

    /// The descriptor a registration attempt would send right now.
    pub fn descriptor(&self) -> InstanceDescriptor {
        InstanceDescriptor::from_config(&self.config)
    }

    /// Makes a single registration attempt. Returns `true` only when the
    /// registry answers 204 No Content.
    pub async fn register(&mut self) -> bool {
        if matches!(self.phase, Phase::Stopped) {
            tracing::warn!(app = %self.config.service_name, "registry client is stopped, not registering");
            return false;
        }

        let request = RegistrationRequest::from(self.descriptor());
        match self.transport.register(&self.config.service_name, &request).await {
            Ok(StatusCode::NO_CONTENT) => {
                tracing::info!("Successfully registered with Eureka at {}", self.config.registry_url);
                metrics::counter!("frontend_registry_registrations_total", "outcome" => "registered").increment(1);
                if matches!(self.phase, Phase::Unregistered) {
                    self.phase = Phase::Registered;
                }
                true
            }
            Ok(status) => {
                tracing::error!("Failed to register with Eureka: {}", status);
                metrics::counter!("frontend_registry_registrations_total", "outcome" => "rejected").increment(1);
                false
            }
            Err(e) => {
                tracing::error!("Error registering with Eureka: {}", e);
                metrics::counter!("frontend_registry_registrations_total", "outcome" => "failed").increment(1);
                false
            }
        }
    }

    /// Renews the lease once. Failures are logged and reported, never raised.
    pub async fn send_heartbeat(&self) -> HeartbeatOutcome {
        heartbeat::renew_lease(self.transport.as_ref(), &self.lease_target()).await
    }

    /// Starts renewing the lease every renewal interval. Returns whether a
    /// timer is running afterwards.
    ///
    /// Refused before a successful registration and after
    /// [`stop_heartbeat`](Self::stop_heartbeat). Calling it while a timer is
    /// already running replaces that timer; there is never more than one.
    pub fn start_heartbeat(&mut self) -> bool {
        match self.phase {
            Phase::Unregistered => {
                tracing::warn!(app = %self.config.service_name, "not registered, heartbeat not started");
                return false;
            }
            Phase::Stopped => {
                tracing::warn!(app = %self.config.service_name, "registry client is stopped, heartbeat not started");
                return false;
            }
            Phase::HeartbeatActive(_) => {
                tracing::debug!(app = %self.config.service_name, "re-arming heartbeat timer");
            }
            Phase::Registered => {}
        }

        // Dropping the previous handle cancels its timer before the new one is armed.
        self.phase = Phase::Registered;

        let period = self
            .heartbeat_period
            .unwrap_or_else(|| self.descriptor().renewal_interval());
        let handle = HeartbeatHandle::spawn(self.transport.clone(), self.lease_target(), period);
        self.phase = Phase::HeartbeatActive(handle);

        tracing::info!("Started Eureka heartbeat");
        true
    }

    /// Cancels the heartbeat timer, if any, and retires the client.
    /// Idempotent.
    pub fn stop_heartbeat(&mut self) {
        match std::mem::replace(&mut self.phase, Phase::Stopped) {
            Phase::HeartbeatActive(handle) => {
                handle.stop();
                tracing::info!("Stopped Eureka heartbeat");
            }
            Phase::Stopped => {}
            Phase::Unregistered | Phase::Registered => {
                tracing::debug!(app = %self.config.service_name, "no heartbeat running");
            }
        }
    }

    fn lease_target(&self) -> LeaseTarget {
        LeaseTarget {
            app: self.config.service_name.clone(),
            host: self.config.host_name.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Clone, Copy)]
    enum Reply {
        Status(StatusCode),
        Unreachable,
    }

    impl Reply {
        fn into_result(self) -> Result<StatusCode, TransportError> {
            match self {
                Reply::Status(status) => Ok(status),
                Reply::Unreachable => Err(TransportError::Unavailable("connection refused".into())),
            }
        }
    }

    /// In-memory registry that answers with fixed replies and records calls.
    struct ScriptedRegistry {
        register_reply: Reply,
        renew_reply: Reply,
        registrations: Mutex<Vec<(String, RegistrationRequest)>>,
        renewals: Mutex<Vec<(String, String)>>,
        renew_calls: AtomicUsize,
    }

    impl ScriptedRegistry {
        fn new(register_reply: Reply, renew_reply: Reply) -> Self {
            Self {
                register_reply,
                renew_reply,
                registrations: Mutex::new(Vec::new()),
                renewals: Mutex::new(Vec::new()),
                renew_calls: AtomicUsize::new(0),
            }
        }

        fn healthy() -> Self {
            Self::new(Reply::Status(StatusCode::NO_CONTENT), Reply::Status(StatusCode::OK))
        }

        fn renew_count(&self) -> usize {
            self.renew_calls.load(Ordering::SeqCst)
        }
    }

    impl RegistryTransport for ScriptedRegistry {
        async fn register(&self, app: &str, request: &RegistrationRequest) -> Result<StatusCode, TransportError> {
            self.registrations
                .lock()
                .unwrap()
                .push((app.to_string(), request.clone()));
            self.register_reply.into_result()
        }

        async fn renew(&self, app: &str, host: &str) -> Result<StatusCode, TransportError> {
            self.renewals
                .lock()
                .unwrap()
                .push((app.to_string(), host.to_string()));
            self.renew_calls.fetch_add(1, Ordering::SeqCst);
            self.renew_reply.into_result()
        }
    }

    const PERIOD: Duration = Duration::from_secs(30);

    fn config() -> RegistryClientConfig {
        RegistryClientConfig::new("FRONTEND", "frontend-1", 3000, "http://eureka:8761")
    }

    fn client(registry: ScriptedRegistry) -> RegistryClient<ScriptedRegistry> {
        RegistryClient::with_transport(config(), registry)
    }

    async fn registered_client(registry: ScriptedRegistry) -> RegistryClient<ScriptedRegistry> {
        let mut client = client(registry);
        assert!(client.register().await);
        client
    }

    #[tokio::test]
    async fn register_succeeds_on_no_content() {
        let mut client = client(ScriptedRegistry::healthy());

        assert_eq!(client.phase(), ClientPhase::Unregistered);
        assert!(client.register().await);
        assert_eq!(client.phase(), ClientPhase::Registered);
        assert!(!client.is_heartbeat_active());

        let registrations = client.transport().registrations.lock().unwrap();
        assert_eq!(registrations.len(), 1);
        let (app, request) = &registrations[0];
        assert_eq!(app, "FRONTEND");
        assert_eq!(request.instance, InstanceDescriptor::from_config(&config()));
    }

    #[tokio::test]
    async fn register_fails_on_other_statuses() {
        for status in [
            StatusCode::OK,
            StatusCode::BAD_REQUEST,
            StatusCode::NOT_FOUND,
            StatusCode::INTERNAL_SERVER_ERROR,
        ] {
            let mut client = client(ScriptedRegistry::new(Reply::Status(status), Reply::Status(StatusCode::OK)));
            assert!(!client.register().await, "status {status} must not count as registered");
            assert_eq!(client.phase(), ClientPhase::Unregistered);
        }
    }

    #[tokio::test]
    async fn register_fails_when_registry_unreachable() {
        let mut client = client(ScriptedRegistry::new(Reply::Unreachable, Reply::Unreachable));
        assert!(!client.register().await);
        assert_eq!(client.phase(), ClientPhase::Unregistered);
        assert_eq!(client.transport().registrations.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn send_heartbeat_reports_outcome() {
        let ok = client(ScriptedRegistry::healthy());
        assert_eq!(ok.send_heartbeat().await, HeartbeatOutcome::Renewed);
        assert_eq!(
            ok.transport().renewals.lock().unwrap().as_slice(),
            &[("FRONTEND".to_string(), "frontend-1".to_string())]
        );

        let rejected = client(ScriptedRegistry::new(
            Reply::Status(StatusCode::NO_CONTENT),
            Reply::Status(StatusCode::NOT_FOUND),
        ));
        assert_eq!(rejected.send_heartbeat().await, HeartbeatOutcome::Rejected(StatusCode::NOT_FOUND));

        let unreachable = client(ScriptedRegistry::new(Reply::Status(StatusCode::NO_CONTENT), Reply::Unreachable));
        assert_eq!(unreachable.send_heartbeat().await, HeartbeatOutcome::Failed);
    }

    #[tokio::test(start_paused = true)]
    async fn heartbeat_fires_once_per_period() {
        let mut client = registered_client(ScriptedRegistry::healthy()).await;
        assert!(client.start_heartbeat());
        assert_eq!(client.phase(), ClientPhase::HeartbeatActive);

        tokio::time::sleep(PERIOD - Duration::from_secs(1)).await;
        assert_eq!(client.transport().renew_count(), 0);

        tokio::time::sleep(PERIOD * 4 + Duration::from_secs(2)).await;
        assert_eq!(client.transport().renew_count(), 5);

        let renewals = client.transport().renewals.lock().unwrap();
        assert!(renewals.iter().all(|(app, host)| app == "FRONTEND" && host == "frontend-1"));
    }

    #[tokio::test(start_paused = true)]
    async fn stop_prevents_further_heartbeats() {
        let mut client = registered_client(ScriptedRegistry::healthy()).await;
        client.start_heartbeat();

        tokio::time::sleep(PERIOD * 2 + Duration::from_secs(1)).await;
        assert_eq!(client.transport().renew_count(), 2);

        client.stop_heartbeat();
        assert_eq!(client.phase(), ClientPhase::Stopped);

        tokio::time::sleep(PERIOD * 10).await;
        assert_eq!(client.transport().renew_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_is_idempotent() {
        let mut client = registered_client(ScriptedRegistry::healthy()).await;
        client.start_heartbeat();

        client.stop_heartbeat();
        client.stop_heartbeat();
        assert_eq!(client.phase(), ClientPhase::Stopped);

        tokio::time::sleep(PERIOD * 3).await;
        assert_eq!(client.transport().renew_count(), 0);
    }

    #[tokio::test]
    async fn stop_without_timer_is_noop() {
        let mut client = client(ScriptedRegistry::healthy());
        client.stop_heartbeat();
        client.stop_heartbeat();
        assert_eq!(client.phase(), ClientPhase::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn restarting_keeps_a_single_timer() {
        let mut client = registered_client(ScriptedRegistry::healthy()).await;
        client.start_heartbeat();

        tokio::time::sleep(PERIOD / 2).await;
        assert!(client.start_heartbeat());

        // Re-armed at t=15s: renewals at 45s, 75s and 105s only.
        tokio::time::sleep(PERIOD * 3 + Duration::from_secs(1)).await;
        assert_eq!(client.transport().renew_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn custom_heartbeat_period() {
        let mut client = registered_client(ScriptedRegistry::healthy())
            .await
            .with_heartbeat_period(Duration::from_secs(5));
        client.start_heartbeat();

        tokio::time::sleep(Duration::from_secs(21)).await;
        assert_eq!(client.transport().renew_count(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_heartbeats_keep_timer_running() {
        for reply in [Reply::Status(StatusCode::INTERNAL_SERVER_ERROR), Reply::Unreachable] {
            let mut client = registered_client(ScriptedRegistry::new(Reply::Status(StatusCode::NO_CONTENT), reply)).await;
            client.start_heartbeat();

            tokio::time::sleep(PERIOD * 3 + Duration::from_secs(1)).await;
            assert_eq!(client.transport().renew_count(), 3);
            assert!(client.is_heartbeat_active());

            client.stop_heartbeat();
        }
    }

    #[tokio::test(start_paused = true)]
    async fn heartbeat_requires_registration() {
        let mut client = client(ScriptedRegistry::new(
            Reply::Status(StatusCode::SERVICE_UNAVAILABLE),
            Reply::Status(StatusCode::OK),
        ));
        assert!(!client.register().await);
        assert!(!client.start_heartbeat());
        assert_eq!(client.phase(), ClientPhase::Unregistered);

        tokio::time::sleep(PERIOD * 2).await;
        assert_eq!(client.transport().renew_count(), 0);
    }

    #[tokio::test]
    async fn stopped_client_is_terminal() {
        let mut client = registered_client(ScriptedRegistry::healthy()).await;
        client.stop_heartbeat();

        assert!(!client.register().await);
        assert!(!client.start_heartbeat());
        assert_eq!(client.phase(), ClientPhase::Stopped);
        assert_eq!(client.transport().registrations.lock().unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_client_cancels_timer() {
        let registry = Arc::new(ScriptedRegistry::healthy());
        let mut client = RegistryClient::with_transport(config(), SharedRegistry(registry.clone()));
        assert!(client.register().await);
        client.start_heartbeat();
        drop(client);

        tokio::time::sleep(PERIOD * 3).await;
        assert_eq!(registry.renew_count(), 0);
    }

    struct SharedRegistry(Arc<ScriptedRegistry>);

    impl RegistryTransport for SharedRegistry {
        async fn register(&self, app: &str, request: &RegistrationRequest) -> Result<StatusCode, TransportError> {
            self.0.register(app, request).await
        }

        async fn renew(&self, app: &str, host: &str) -> Result<StatusCode, TransportError> {
            self.0.renew(app, host).await
        }
    }
}
