//! Connection lifecycle dispatch.
//!
//! One [`ConnectionState`] is tracked per logical request id and only the
//! dispatcher transitions it. Connect and disconnect are idempotent:
//! repeat calls while a transition is in flight are no-ops, not errors.
//! Transitions on different ids are independent. The state lock is never
//! held across a transport await; instead each transition re-checks the
//! state after the await and discards its result if another transition
//! completed in the meantime, so a stale connect can never overwrite a
//! finished disconnect.

pub mod canonical;
pub mod error;

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use log::{debug, warn};

use crate::models::ResolvedRequest;

pub use canonical::{build_connect_instruction, ConnectInstruction};
pub use error::{DispatchError, TransportError};

/// Lifecycle state of one logical request's connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// No connection and none in progress
    #[default]
    Idle,
    /// A connect instruction has been emitted, awaiting confirmation
    Connecting,
    /// The connection is established
    Open,
    /// A disconnect instruction has been emitted, awaiting closure
    Closing,
}

/// The transport boundary the dispatcher emits instructions to.
///
/// The core never implements the socket protocol itself; the surrounding
/// application supplies a transport. `connect` returns once the connection
/// is established, `disconnect` once closure is confirmed.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Opens a connection for the given canonical request.
    async fn connect(&self, instruction: ConnectInstruction) -> Result<(), TransportError>;

    /// Closes the connection belonging to the given request id.
    async fn disconnect(&self, request_id: &str) -> Result<(), TransportError>;
}

/// Drives connect/disconnect transitions and owns the per-request states.
pub struct ConnectionDispatcher {
    transport: Arc<dyn Transport>,
    states: Mutex<HashMap<String, ConnectionState>>,
}

impl ConnectionDispatcher {
    /// Creates a dispatcher over the given transport.
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            states: Mutex::new(HashMap::new()),
        }
    }

    fn states(&self) -> MutexGuard<'_, HashMap<String, ConnectionState>> {
        // A poisoned lock only means a panicked test thread; the map itself
        // stays usable.
        self.states.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Current lifecycle state for a request id.
    pub fn state(&self, request_id: &str) -> ConnectionState {
        self.states().get(request_id).copied().unwrap_or_default()
    }

    /// Drops lifecycle tracking for a discarded request.
    pub fn remove(&self, request_id: &str) {
        self.states().remove(request_id);
    }

    /// Opens a connection for a resolved request.
    ///
    /// The canonical request is derived before any state changes, so a
    /// preparation failure leaves the lifecycle untouched and emits
    /// nothing. If the request is already connecting, open or closing,
    /// the call is an idempotent no-op. On transport failure the state
    /// returns to [`ConnectionState::Idle`] and the error is reported on
    /// the transport channel. If a disconnect completed while the
    /// transport call was pending, its outcome stands and this result is
    /// discarded.
    pub async fn connect(&self, resolved: &ResolvedRequest) -> Result<(), DispatchError> {
        let instruction = build_connect_instruction(resolved)?;

        {
            let mut states = self.states();
            match states.get(&resolved.id).copied().unwrap_or_default() {
                ConnectionState::Idle => {
                    states.insert(resolved.id.clone(), ConnectionState::Connecting);
                }
                busy => {
                    debug!("connect ignored for '{}': state is {:?}", resolved.id, busy);
                    return Ok(());
                }
            }
        }

        debug!("connecting '{}' to {}", resolved.id, instruction.url);
        let result = self.transport.connect(instruction).await;

        // Only this attempt's Connecting entry may be finalized. Anything
        // else means another transition won while the transport call was
        // pending, and this result is stale.
        let mut states = self.states();
        let current = states.get(&resolved.id).copied().unwrap_or_default();
        match result {
            Ok(()) => {
                if current == ConnectionState::Connecting {
                    states.insert(resolved.id.clone(), ConnectionState::Open);
                } else {
                    debug!(
                        "stale connect result for '{}' discarded: state is {:?}",
                        resolved.id, current
                    );
                }
                Ok(())
            }
            Err(err) => {
                warn!("transport connect failed for '{}': {}", resolved.id, err);
                if current == ConnectionState::Connecting {
                    states.insert(resolved.id.clone(), ConnectionState::Idle);
                }
                Err(err.into())
            }
        }
    }

    /// Closes the connection for a request id.
    ///
    /// A no-op when the request is idle or already closing. The state
    /// becomes [`ConnectionState::Idle`] once the transport confirms
    /// closure, and also on transport failure.
    pub async fn disconnect(&self, request_id: &str) -> Result<(), DispatchError> {
        {
            let mut states = self.states();
            match states.get(request_id).copied().unwrap_or_default() {
                ConnectionState::Connecting | ConnectionState::Open => {
                    states.insert(request_id.to_string(), ConnectionState::Closing);
                }
                other => {
                    debug!("disconnect ignored for '{}': state is {:?}", request_id, other);
                    return Ok(());
                }
            }
        }

        debug!("disconnecting '{}'", request_id);
        let result = self.transport.disconnect(request_id).await;
        {
            let mut states = self.states();
            if states.get(request_id).copied().unwrap_or_default() == ConnectionState::Closing {
                states.insert(request_id.to_string(), ConnectionState::Idle);
            }
        }

        match result {
            Ok(()) => Ok(()),
            Err(err) => {
                warn!("transport disconnect failed for '{}': {}", request_id, err);
                Err(err.into())
            }
        }
    }
}

impl std::fmt::Debug for ConnectionDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionDispatcher")
            .field("states", &*self.states())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AuthDescriptor;
    use crate::cookies::CookieJar;
    use std::sync::Mutex as StdMutex;

    /// Transport double that records every instruction it receives.
    #[derive(Default)]
    struct RecordingTransport {
        connects: StdMutex<Vec<ConnectInstruction>>,
        disconnects: StdMutex<Vec<String>>,
        fail_connect: bool,
    }

    #[async_trait]
    impl Transport for RecordingTransport {
        async fn connect(&self, instruction: ConnectInstruction) -> Result<(), TransportError> {
            if self.fail_connect {
                return Err(TransportError::ConnectionFailed(
                    "connection refused".to_string(),
                ));
            }
            self.connects.lock().unwrap().push(instruction);
            Ok(())
        }

        async fn disconnect(&self, request_id: &str) -> Result<(), TransportError> {
            self.disconnects.lock().unwrap().push(request_id.to_string());
            Ok(())
        }
    }

    fn resolved(id: &str) -> ResolvedRequest {
        ResolvedRequest {
            id: id.to_string(),
            url: "wss://example.com/chat".to_string(),
            headers: Vec::new(),
            parameters: Vec::new(),
            authentication: AuthDescriptor::None,
            cookies: CookieJar::new(),
        }
    }

    #[tokio::test]
    async fn test_connect_transitions_to_open() {
        let transport = Arc::new(RecordingTransport::default());
        let dispatcher = ConnectionDispatcher::new(transport.clone());

        dispatcher.connect(&resolved("r1")).await.unwrap();
        assert_eq!(dispatcher.state("r1"), ConnectionState::Open);
        assert_eq!(transport.connects.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_repeat_connect_is_noop() {
        let transport = Arc::new(RecordingTransport::default());
        let dispatcher = ConnectionDispatcher::new(transport.clone());

        dispatcher.connect(&resolved("r1")).await.unwrap();
        dispatcher.connect(&resolved("r1")).await.unwrap();

        // Second call while open: no error, no second instruction.
        assert_eq!(transport.connects.lock().unwrap().len(), 1);
        assert_eq!(dispatcher.state("r1"), ConnectionState::Open);
    }

    #[tokio::test]
    async fn test_transport_failure_returns_to_idle() {
        let transport = Arc::new(RecordingTransport {
            fail_connect: true,
            ..Default::default()
        });
        let dispatcher = ConnectionDispatcher::new(transport.clone());

        let err = dispatcher.connect(&resolved("r1")).await.unwrap_err();
        assert!(matches!(err, DispatchError::Transport(_)));
        assert_eq!(dispatcher.state("r1"), ConnectionState::Idle);
    }

    #[tokio::test]
    async fn test_preparation_failure_never_touches_lifecycle() {
        let transport = Arc::new(RecordingTransport::default());
        let dispatcher = ConnectionDispatcher::new(transport.clone());

        let mut bad = resolved("r1");
        bad.url = "not a url".to_string();

        let err = dispatcher.connect(&bad).await.unwrap_err();
        assert!(matches!(err, DispatchError::Render(_)));
        assert_eq!(dispatcher.state("r1"), ConnectionState::Idle);
        assert!(transport.connects.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_disconnect_idle_is_noop() {
        let transport = Arc::new(RecordingTransport::default());
        let dispatcher = ConnectionDispatcher::new(transport.clone());

        dispatcher.disconnect("r1").await.unwrap();
        assert!(transport.disconnects.lock().unwrap().is_empty());
        assert_eq!(dispatcher.state("r1"), ConnectionState::Idle);
    }

    #[tokio::test]
    async fn test_disconnect_open_emits_one_instruction() {
        let transport = Arc::new(RecordingTransport::default());
        let dispatcher = ConnectionDispatcher::new(transport.clone());

        dispatcher.connect(&resolved("r1")).await.unwrap();
        dispatcher.disconnect("r1").await.unwrap();

        assert_eq!(*transport.disconnects.lock().unwrap(), vec!["r1"]);
        assert_eq!(dispatcher.state("r1"), ConnectionState::Idle);

        // A second disconnect is a no-op.
        dispatcher.disconnect("r1").await.unwrap();
        assert_eq!(transport.disconnects.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_independent_request_ids() {
        let transport = Arc::new(RecordingTransport::default());
        let dispatcher = ConnectionDispatcher::new(transport.clone());

        dispatcher.connect(&resolved("r1")).await.unwrap();
        assert_eq!(dispatcher.state("r1"), ConnectionState::Open);
        assert_eq!(dispatcher.state("r2"), ConnectionState::Idle);

        dispatcher.connect(&resolved("r2")).await.unwrap();
        dispatcher.disconnect("r1").await.unwrap();
        assert_eq!(dispatcher.state("r1"), ConnectionState::Idle);
        assert_eq!(dispatcher.state("r2"), ConnectionState::Open);
    }

    /// Transport whose connect suspends until the test releases it.
    struct GatedTransport {
        gate: tokio::sync::Notify,
        connect_calls: StdMutex<u32>,
        disconnects: StdMutex<Vec<String>>,
    }

    impl GatedTransport {
        fn new() -> Self {
            Self {
                gate: tokio::sync::Notify::new(),
                connect_calls: StdMutex::new(0),
                disconnects: StdMutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Transport for GatedTransport {
        async fn connect(&self, _instruction: ConnectInstruction) -> Result<(), TransportError> {
            *self.connect_calls.lock().unwrap() += 1;
            self.gate.notified().await;
            Ok(())
        }

        async fn disconnect(&self, request_id: &str) -> Result<(), TransportError> {
            self.disconnects.lock().unwrap().push(request_id.to_string());
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_connect_while_connecting_is_noop() {
        let transport = Arc::new(GatedTransport::new());
        let dispatcher = Arc::new(ConnectionDispatcher::new(transport.clone()));

        let pending = tokio::spawn({
            let dispatcher = Arc::clone(&dispatcher);
            async move { dispatcher.connect(&resolved("r1")).await }
        });
        while dispatcher.state("r1") != ConnectionState::Connecting {
            tokio::task::yield_now().await;
        }

        // Second connect while the first is still pending: no error, no
        // second instruction.
        dispatcher.connect(&resolved("r1")).await.unwrap();
        assert_eq!(*transport.connect_calls.lock().unwrap(), 1);
        assert_eq!(dispatcher.state("r1"), ConnectionState::Connecting);

        transport.gate.notify_one();
        pending.await.unwrap().unwrap();
        assert_eq!(dispatcher.state("r1"), ConnectionState::Open);
    }

    #[tokio::test]
    async fn test_completed_disconnect_outlives_stale_connect() {
        let transport = Arc::new(GatedTransport::new());
        let dispatcher = Arc::new(ConnectionDispatcher::new(transport.clone()));

        let pending = tokio::spawn({
            let dispatcher = Arc::clone(&dispatcher);
            async move { dispatcher.connect(&resolved("r1")).await }
        });
        while dispatcher.state("r1") != ConnectionState::Connecting {
            tokio::task::yield_now().await;
        }

        // Disconnect runs to completion while the connect is still pending.
        dispatcher.disconnect("r1").await.unwrap();
        assert_eq!(dispatcher.state("r1"), ConnectionState::Idle);
        assert_eq!(*transport.disconnects.lock().unwrap(), vec!["r1"]);

        // The stalled connect resolves afterwards; its result is stale and
        // must not revive the closed connection.
        transport.gate.notify_one();
        pending.await.unwrap().unwrap();
        assert_eq!(dispatcher.state("r1"), ConnectionState::Idle);
    }

    #[tokio::test]
    async fn test_remove_drops_tracking() {
        let transport = Arc::new(RecordingTransport::default());
        let dispatcher = ConnectionDispatcher::new(transport.clone());

        dispatcher.connect(&resolved("r1")).await.unwrap();
        dispatcher.remove("r1");
        assert_eq!(dispatcher.state("r1"), ConnectionState::Idle);
    }
}
