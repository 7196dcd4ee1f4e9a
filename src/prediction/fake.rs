//! Deterministic in-process prediction service
//!
//! Used by the headless runner and the tests. Auth states are scripted, a
//! prediction becomes available after a fixed number of polls and every call
//! is recorded for inspection.

use std::collections::{HashMap, VecDeque};

use super::service::{
    AuthInfo, AuthState, PredictionDefinition, PredictionHandle, PredictionService, Ticket,
};
use crate::error::ServiceError;

/// One recorded service call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceCall {
    AuthenticationInfo { scope: String },
    Submit(PredictionDefinition),
    Poll(Ticket),
    Resolve { handle: PredictionHandle, outcome: String },
    Cancel { handle: PredictionHandle },
}

#[derive(Debug, Clone)]
pub struct FakeService {
    /// Popped one per query; the last state sticks
    auth_states: VecDeque<AuthState>,
    uri: String,
    /// Polls needed before a ticket turns into a handle; `None` never does
    polls_until_ready: Option<u32>,
    tickets: HashMap<Ticket, u32>,
    next_ticket: u64,
    fail_resolve: bool,
    pub calls: Vec<ServiceCall>,
}

impl Default for FakeService {
    fn default() -> Self {
        Self::logged_in()
    }
}

impl FakeService {
    /// Logged in, predictions ready on the first poll
    pub fn logged_in() -> Self {
        Self::with_auth_states(vec![AuthState::LoggedIn])
    }

    pub fn with_auth_states(states: Vec<AuthState>) -> Self {
        Self {
            auth_states: states.into(),
            uri: "https://example.invalid/activate".to_string(),
            polls_until_ready: Some(1),
            tickets: HashMap::new(),
            next_ticket: 1,
            fail_resolve: false,
            calls: Vec::new(),
        }
    }

    pub fn ready_after(mut self, polls: u32) -> Self {
        self.polls_until_ready = Some(polls.max(1));
        self
    }

    /// Submitted predictions never become available
    pub fn never_ready(mut self) -> Self {
        self.polls_until_ready = None;
        self
    }

    /// `resolve` reports the service as unavailable
    pub fn failing_resolve(mut self) -> Self {
        self.fail_resolve = true;
        self
    }

    /// Outcomes passed to `resolve`, in call order
    pub fn resolved(&self) -> Vec<&str> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                ServiceCall::Resolve { outcome, .. } => Some(outcome.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn cancelled(&self) -> usize {
        self.calls
            .iter()
            .filter(|call| matches!(call, ServiceCall::Cancel { .. }))
            .count()
    }

    pub fn submitted(&self) -> Vec<&PredictionDefinition> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                ServiceCall::Submit(definition) => Some(definition),
                _ => None,
            })
            .collect()
    }
}

impl PredictionService for FakeService {
    fn auth_state(&mut self) -> AuthState {
        if self.auth_states.len() > 1 {
            self.auth_states.pop_front().unwrap_or(AuthState::LoggedOut)
        } else {
            self.auth_states.front().copied().unwrap_or(AuthState::LoggedOut)
        }
    }

    fn authentication_info(&mut self, scope: &str) -> Result<AuthInfo, ServiceError> {
        self.calls.push(ServiceCall::AuthenticationInfo {
            scope: scope.to_string(),
        });
        Ok(AuthInfo {
            uri: self.uri.clone(),
        })
    }

    fn submit_prediction(
        &mut self,
        definition: &PredictionDefinition,
    ) -> Result<Ticket, ServiceError> {
        self.calls.push(ServiceCall::Submit(definition.clone()));
        if definition.outcomes.len() < 2 {
            return Err(ServiceError::Rejected(
                "a prediction needs at least two outcomes".to_string(),
            ));
        }
        let ticket = Ticket(self.next_ticket);
        self.next_ticket += 1;
        self.tickets
            .insert(ticket, self.polls_until_ready.unwrap_or(u32::MAX));
        Ok(ticket)
    }

    fn poll_prediction(&mut self, ticket: Ticket) -> Result<Option<PredictionHandle>, ServiceError> {
        self.calls.push(ServiceCall::Poll(ticket));
        let never = self.polls_until_ready.is_none();
        let Some(remaining) = self.tickets.get_mut(&ticket) else {
            return Err(ServiceError::Rejected(format!("unknown ticket {}", ticket.0)));
        };
        if never {
            return Ok(None);
        }
        *remaining = remaining.saturating_sub(1);
        if *remaining == 0 {
            Ok(Some(PredictionHandle {
                id: format!("prediction-{}", ticket.0),
            }))
        } else {
            Ok(None)
        }
    }

    fn resolve(&mut self, handle: &PredictionHandle, outcome: &str) -> Result<(), ServiceError> {
        self.calls.push(ServiceCall::Resolve {
            handle: handle.clone(),
            outcome: outcome.to_string(),
        });
        if self.fail_resolve {
            return Err(ServiceError::Unavailable("connection reset".to_string()));
        }
        Ok(())
    }

    fn cancel(&mut self, handle: &PredictionHandle) -> Result<(), ServiceError> {
        self.calls.push(ServiceCall::Cancel {
            handle: handle.clone(),
        });
        Ok(())
    }
}
