//! Payment gateway seam and in-memory test double.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use domain::Money;
use thiserror::Error;

/// Settlement currency for gateway sessions.
pub const CURRENCY: &str = "INR";

/// A gateway-side order session awaiting out-of-band completion.
#[derive(Debug, Clone)]
pub struct GatewaySession {
    /// The session/order identifier assigned by the gateway.
    pub session_id: String,
}

/// Error from the external payment gateway.
#[derive(Debug, Error)]
#[error("gateway error: {0}")]
pub struct GatewayError(pub String);

/// Trait for the external payment gateway.
///
/// Only session creation happens in-process; the charge itself completes
/// out-of-band and the gateway calls back with a payment identifier.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Opens a charge session for the given amount.
    ///
    /// Callers must never hold a store transaction across this call.
    async fn create_session(
        &self,
        amount: Money,
        currency: &str,
        receipt: &str,
    ) -> Result<GatewaySession, GatewayError>;
}

#[derive(Debug, Default)]
struct InMemoryGatewayState {
    sessions: HashMap<String, (Money, String)>,
    next_id: u32,
    fail_on_create: bool,
}

/// In-memory payment gateway for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryGateway {
    state: Arc<RwLock<InMemoryGatewayState>>,
}

impl InMemoryGateway {
    /// Creates a new in-memory gateway.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the gateway to fail on the next create call.
    pub fn set_fail_on_create(&self, fail: bool) {
        self.state.write().unwrap().fail_on_create = fail;
    }

    /// Returns the number of sessions opened.
    pub fn session_count(&self) -> usize {
        self.state.read().unwrap().sessions.len()
    }

    /// Returns the amount a session was opened for, if it exists.
    pub fn session_amount(&self, session_id: &str) -> Option<Money> {
        self.state
            .read()
            .unwrap()
            .sessions
            .get(session_id)
            .map(|(amount, _)| *amount)
    }
}

#[async_trait]
impl PaymentGateway for InMemoryGateway {
    async fn create_session(
        &self,
        amount: Money,
        currency: &str,
        receipt: &str,
    ) -> Result<GatewaySession, GatewayError> {
        let mut state = self.state.write().unwrap();

        if state.fail_on_create {
            return Err(GatewayError("session creation refused".to_string()));
        }

        state.next_id += 1;
        let session_id = format!("SES-{:04}", state.next_id);
        state
            .sessions
            .insert(session_id.clone(), (amount, format!("{currency}/{receipt}")));

        Ok(GatewaySession { session_id })
    }
}
