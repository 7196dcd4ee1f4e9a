//! External prediction service seam

use serde::{Deserialize, Serialize};

use crate::error::ServiceError;

/// Login state reported by the service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuthState {
    /// Still restoring a previous session
    Loading,
    LoggedOut,
    /// Device code issued, waiting for the user
    WaitingForCode,
    LoggedIn,
}

/// Where the user has to go to finish logging in
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthInfo {
    pub uri: String,
}

/// What viewers get to vote on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredictionDefinition {
    pub title: String,
    /// Voting window
    pub window_secs: u32,
    pub outcomes: Vec<String>,
}

/// Receipt for a submitted prediction that is not usable yet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Ticket(pub u64);

/// Service-side identity of a live prediction
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PredictionHandle {
    pub id: String,
}

/// Authenticated wagering service
///
/// Every call returns immediately. Slow work (login, creating the
/// prediction) is observed by polling.
pub trait PredictionService {
    fn auth_state(&mut self) -> AuthState;

    fn authentication_info(&mut self, scope: &str) -> Result<AuthInfo, ServiceError>;

    fn submit_prediction(
        &mut self,
        definition: &PredictionDefinition,
    ) -> Result<Ticket, ServiceError>;

    /// `Ok(None)` while the service is still creating the prediction
    fn poll_prediction(&mut self, ticket: Ticket) -> Result<Option<PredictionHandle>, ServiceError>;

    fn resolve(&mut self, handle: &PredictionHandle, outcome: &str) -> Result<(), ServiceError>;

    fn cancel(&mut self, handle: &PredictionHandle) -> Result<(), ServiceError>;
}
