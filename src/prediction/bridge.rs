//! Keeps one external prediction in lockstep with the race
//!
//! The bridge owns the service and drives it through scheduled polls on its
//! own real-time clock. At most one wager exists at a time, and every wager
//! that reaches the service is resolved or cancelled exactly once.

use serde::{Deserialize, Serialize};

use super::service::{
    AuthInfo, AuthState, PredictionDefinition, PredictionHandle, PredictionService, Ticket,
};
use crate::error::PredictionError;
use crate::race::scheduler::Scheduler;
use crate::settings::PredictionSettings;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PredictionStatus {
    Open,
    Resolved,
    Cancelled,
}

/// A wager the service has accepted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prediction {
    pub handle: PredictionHandle,
    /// Racer names captured at creation
    pub outcomes: Vec<String>,
    pub status: PredictionStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PollKind {
    Auth,
    Wager,
}

#[derive(Debug, Clone)]
struct PendingWager {
    ticket: Ticket,
    outcomes: Vec<String>,
    /// Race ended before the handle arrived
    discard_on_arrival: bool,
    polls: u32,
}

pub struct PredictionBridge<S> {
    service: S,
    settings: PredictionSettings,
    /// Real seconds, independent of the race time scale
    clock: f32,
    polls: Scheduler<PollKind>,
    login: Option<AuthInfo>,
    pending: Option<PendingWager>,
    open: Option<Prediction>,
    last: Option<Prediction>,
    status: String,
}

impl<S: PredictionService> PredictionBridge<S> {
    pub fn new(service: S, settings: PredictionSettings) -> Self {
        Self {
            service,
            settings,
            clock: 0.0,
            polls: Scheduler::new(),
            login: None,
            pending: None,
            open: None,
            last: None,
            status: String::new(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.settings.enabled
    }

    /// Start a wager over `outcomes`
    pub fn create_prediction(&mut self, outcomes: &[String]) -> Result<(), PredictionError> {
        if self.pending.as_ref().is_some_and(|p| p.discard_on_arrival) {
            log::warn!("Dropping a discarded prediction that never arrived");
            self.abandon_pending();
        }
        if self.pending.is_some() || self.open.is_some() {
            return Err(PredictionError::AlreadyActive);
        }

        match self.service.auth_state() {
            AuthState::Loading => {
                self.status = "Prediction service is starting up".to_string();
                Err(PredictionError::NotReady)
            }
            AuthState::LoggedOut | AuthState::WaitingForCode => {
                if self.login.is_none() {
                    let info = self.service.authentication_info(&self.settings.auth_scope)?;
                    log::info!("Prediction login required at {}", info.uri);
                    self.login = Some(info);
                }
                let uri = self.login_uri().unwrap_or_default().to_string();
                self.status = format!("Log in at {} to enable predictions", uri);
                self.polls.renew();
                self.schedule_poll(PollKind::Auth);
                Err(PredictionError::AuthenticationRequired { uri })
            }
            AuthState::LoggedIn => {
                let definition = PredictionDefinition {
                    title: self.settings.title.clone(),
                    window_secs: self.settings.window_secs,
                    outcomes: outcomes.to_vec(),
                };
                let ticket = match self.service.submit_prediction(&definition) {
                    Ok(ticket) => ticket,
                    Err(e) => {
                        self.status = format!("Prediction failed: {}", e);
                        return Err(e.into());
                    }
                };
                log::info!("Prediction submitted with {} outcomes", outcomes.len());
                self.pending = Some(PendingWager {
                    ticket,
                    outcomes: definition.outcomes,
                    discard_on_arrival: false,
                    polls: 0,
                });
                self.status = "Creating prediction".to_string();
                self.polls.renew();
                self.schedule_poll(PollKind::Wager);
                Ok(())
            }
        }
    }

    /// Advance the poll clock by `dt` real seconds
    pub fn update(&mut self, dt: f32) {
        self.clock += dt;
        while let Some(kind) = self.polls.pop_due(self.clock) {
            match kind {
                PollKind::Auth => self.poll_auth(),
                PollKind::Wager => self.poll_wager(),
            }
        }
    }

    /// Settle the open wager against the race winner
    pub fn end_prediction(&mut self, winner: &str) {
        if let Some(pending) = self.pending.as_mut() {
            pending.discard_on_arrival = true;
            self.status = "Prediction will be cancelled once created".to_string();
            return;
        }
        let Some(prediction) = self.open.take() else {
            return;
        };

        if prediction.outcomes.iter().any(|o| o == winner) {
            self.close(prediction, Some(winner));
            self.status = format!("Prediction resolved: {} won", winner);
        } else {
            log::warn!("Winner {} is not an outcome of the open prediction", winner);
            self.close(prediction, None);
            self.status = format!("Prediction cancelled: {} was not an outcome", winner);
        }
    }

    /// Cancel the open wager, if any
    pub fn cancel_prediction(&mut self) {
        if let Some(pending) = self.pending.as_mut() {
            pending.discard_on_arrival = true;
            return;
        }
        if let Some(prediction) = self.open.take() {
            self.close(prediction, None);
            self.status = "Prediction cancelled".to_string();
        }
    }

    /// Stop waiting for the user to log in
    pub fn abandon_login(&mut self) {
        if self.login.take().is_some() {
            self.polls.renew();
            self.status = "Login abandoned".to_string();
            log::info!("Prediction login abandoned");
        }
    }

    pub fn shutdown(&mut self) {
        self.cancel_prediction();
        if self.pending.is_some() {
            log::warn!("Shutting down with a prediction still being created");
            self.abandon_pending();
        }
        self.polls.renew();
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn open_prediction(&self) -> Option<&Prediction> {
        self.open.as_ref()
    }

    /// Most recently settled wager
    pub fn last_prediction(&self) -> Option<&Prediction> {
        self.last.as_ref()
    }

    pub fn is_busy(&self) -> bool {
        self.pending.is_some() || self.open.is_some()
    }

    pub fn login_uri(&self) -> Option<&str> {
        self.login.as_ref().map(|info| info.uri.as_str())
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    fn schedule_poll(&mut self, kind: PollKind) {
        let wake_at = self.clock + self.settings.poll_interval;
        self.polls.schedule(wake_at, kind);
    }

    fn poll_auth(&mut self) {
        match self.service.auth_state() {
            AuthState::LoggedIn => {
                self.login = None;
                self.status = "Logged in, predictions enabled".to_string();
                log::info!("Prediction service logged in");
            }
            state => {
                log::debug!("Waiting for login ({:?})", state);
                self.schedule_poll(PollKind::Auth);
            }
        }
    }

    fn poll_wager(&mut self) {
        let Some(pending) = self.pending.as_mut() else {
            return;
        };
        pending.polls += 1;
        let (ticket, polls) = (pending.ticket, pending.polls);
        match self.service.poll_prediction(ticket) {
            Ok(None) if polls >= self.settings.max_wager_polls => {
                log::warn!("Prediction not created after {} polls, giving up", polls);
                self.abandon_pending();
                self.status = "Prediction timed out".to_string();
            }
            Ok(None) => self.schedule_poll(PollKind::Wager),
            Ok(Some(handle)) => {
                let Some(pending) = self.pending.take() else {
                    return;
                };
                let prediction = Prediction {
                    handle,
                    outcomes: pending.outcomes,
                    status: PredictionStatus::Open,
                };
                if pending.discard_on_arrival {
                    log::info!("Prediction arrived after the race ended, cancelling");
                    self.close(prediction, None);
                    self.status = "Prediction cancelled".to_string();
                } else {
                    log::info!("Prediction {} open", prediction.handle.id);
                    self.status = "Prediction open".to_string();
                    self.open = Some(prediction);
                }
            }
            Err(e) => {
                log::warn!("Prediction creation failed: {}", e);
                self.status = format!("Prediction failed: {}", e);
                self.pending = None;
            }
        }
    }

    /// Forget a wager with no handle yet and stop polling for it
    fn abandon_pending(&mut self) {
        self.pending = None;
        self.polls.renew();
    }

    /// Resolve against `outcome`, or cancel when `None`. Terminal either way.
    fn close(&mut self, mut prediction: Prediction, outcome: Option<&str>) {
        let result = match outcome {
            Some(outcome) => {
                prediction.status = PredictionStatus::Resolved;
                self.service.resolve(&prediction.handle, outcome)
            }
            None => {
                prediction.status = PredictionStatus::Cancelled;
                self.service.cancel(&prediction.handle)
            }
        };
        if let Err(e) = result {
            log::warn!("Prediction {} not settled cleanly: {}", prediction.handle.id, e);
        }
        self.last = Some(prediction);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prediction::fake::{FakeService, ServiceCall};

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn open_bridge(service: FakeService, outcomes: &[&str]) -> PredictionBridge<FakeService> {
        let mut bridge = PredictionBridge::new(service, PredictionSettings::default());
        bridge.create_prediction(&names(outcomes)).expect("create");
        bridge.update(1.0);
        assert!(bridge.open_prediction().is_some());
        bridge
    }

    #[test]
    fn test_winner_in_outcomes_resolves() {
        let mut bridge = open_bridge(FakeService::logged_in(), &["Alpha", "Beta", "Gamma"]);
        bridge.end_prediction("Beta");

        assert_eq!(bridge.service().resolved(), vec!["Beta"]);
        assert_eq!(bridge.service().cancelled(), 0);
        assert_eq!(
            bridge.last_prediction().map(|p| p.status),
            Some(PredictionStatus::Resolved)
        );
        assert!(!bridge.is_busy());
    }

    #[test]
    fn test_unknown_winner_cancels() {
        let mut bridge = open_bridge(FakeService::logged_in(), &["Alpha", "Beta"]);
        bridge.end_prediction("Zeta");

        assert!(bridge.service().resolved().is_empty());
        assert_eq!(bridge.service().cancelled(), 1);
        assert_eq!(
            bridge.last_prediction().map(|p| p.status),
            Some(PredictionStatus::Cancelled)
        );
    }

    #[test]
    fn test_settles_exactly_once() {
        let mut bridge = open_bridge(FakeService::logged_in(), &["Alpha", "Beta"]);
        bridge.end_prediction("Alpha");
        bridge.end_prediction("Alpha");
        bridge.cancel_prediction();
        bridge.shutdown();

        assert_eq!(bridge.service().resolved().len(), 1);
        assert_eq!(bridge.service().cancelled(), 0);
    }

    #[test]
    fn test_second_create_rejected_while_active() {
        let mut bridge = open_bridge(FakeService::logged_in(), &["Alpha", "Beta"]);
        assert_eq!(
            bridge.create_prediction(&names(&["Alpha", "Beta"])),
            Err(PredictionError::AlreadyActive)
        );

        bridge.end_prediction("Beta");
        assert!(bridge.create_prediction(&names(&["Alpha", "Beta"])).is_ok());
    }

    #[test]
    fn test_loading_is_not_ready() {
        let service = FakeService::with_auth_states(vec![AuthState::Loading]);
        let mut bridge = PredictionBridge::new(service, PredictionSettings::default());
        assert_eq!(
            bridge.create_prediction(&names(&["A", "B"])),
            Err(PredictionError::NotReady)
        );
        assert!(bridge.service().submitted().is_empty());
    }

    #[test]
    fn test_logged_out_polls_until_logged_in() {
        let service = FakeService::with_auth_states(vec![
            AuthState::LoggedOut,
            AuthState::WaitingForCode,
            AuthState::LoggedIn,
        ]);
        let mut bridge = PredictionBridge::new(service, PredictionSettings::default());

        let err = bridge.create_prediction(&names(&["A", "B"]));
        assert!(matches!(err, Err(PredictionError::AuthenticationRequired { .. })));
        assert!(bridge.status().contains("example.invalid"));
        assert!(bridge.login_uri().is_some());

        bridge.update(1.0);
        assert!(bridge.login_uri().is_some());
        bridge.update(1.0);
        assert!(bridge.login_uri().is_none());

        assert!(bridge.create_prediction(&names(&["A", "B"])).is_ok());
        let scopes = bridge
            .service()
            .calls
            .iter()
            .filter(|c| matches!(c, ServiceCall::AuthenticationInfo { .. }))
            .count();
        assert_eq!(scopes, 1);
    }

    #[test]
    fn test_abandon_login_stops_polling() {
        let service = FakeService::with_auth_states(vec![AuthState::LoggedOut]);
        let mut bridge = PredictionBridge::new(service, PredictionSettings::default());
        let _ = bridge.create_prediction(&names(&["A", "B"]));
        bridge.abandon_login();
        assert!(bridge.login_uri().is_none());
        bridge.update(5.0);
        assert!(bridge.login_uri().is_none());
    }

    #[test]
    fn test_end_while_pending_cancels_on_arrival() {
        let service = FakeService::logged_in().ready_after(2);
        let mut bridge = PredictionBridge::new(service, PredictionSettings::default());
        bridge.create_prediction(&names(&["Alpha", "Beta"])).expect("create");

        bridge.update(1.0);
        assert!(bridge.open_prediction().is_none());
        bridge.end_prediction("Alpha");

        bridge.update(1.0);
        assert!(bridge.open_prediction().is_none());
        assert!(bridge.service().resolved().is_empty());
        assert_eq!(bridge.service().cancelled(), 1);
        assert!(!bridge.is_busy());
    }

    fn poll_calls(bridge: &PredictionBridge<FakeService>) -> usize {
        bridge
            .service()
            .calls
            .iter()
            .filter(|c| matches!(c, ServiceCall::Poll(_)))
            .count()
    }

    #[test]
    fn test_discarded_wager_stops_polling_on_next_race() {
        let mut bridge = PredictionBridge::new(
            FakeService::logged_in().never_ready(),
            PredictionSettings::default(),
        );
        bridge.create_prediction(&names(&["Alpha", "Beta"])).expect("create");
        bridge.update(1.0);
        bridge.cancel_prediction();

        assert!(bridge.create_prediction(&names(&["Alpha", "Beta"])).is_ok());
        assert_eq!(bridge.service().submitted().len(), 2);
        let before = poll_calls(&bridge);
        bridge.update(1.0);
        assert_eq!(poll_calls(&bridge), before + 1, "only the new wager is polled");
    }

    #[test]
    fn test_wager_polling_gives_up() {
        let settings = PredictionSettings {
            max_wager_polls: 5,
            ..Default::default()
        };
        let mut bridge = PredictionBridge::new(FakeService::logged_in().never_ready(), settings);
        bridge.create_prediction(&names(&["Alpha", "Beta"])).expect("create");
        for _ in 0..10 {
            bridge.update(1.0);
        }

        assert_eq!(poll_calls(&bridge), 5);
        assert!(!bridge.is_busy());
        assert_eq!(bridge.status(), "Prediction timed out");
        assert!(bridge.create_prediction(&names(&["Alpha", "Beta"])).is_ok());
    }

    #[test]
    fn test_shutdown_stops_pending_poll() {
        let mut bridge = PredictionBridge::new(
            FakeService::logged_in().never_ready(),
            PredictionSettings::default(),
        );
        bridge.create_prediction(&names(&["Alpha", "Beta"])).expect("create");
        bridge.update(1.0);
        bridge.shutdown();
        for _ in 0..5 {
            bridge.update(1.0);
        }
        assert_eq!(poll_calls(&bridge), 1);
        assert!(!bridge.is_busy());
    }

    #[test]
    fn test_resolve_error_is_still_terminal() {
        let service = FakeService::logged_in().failing_resolve();
        let mut bridge = open_bridge(service, &["Alpha", "Beta"]);
        bridge.end_prediction("Alpha");

        assert_eq!(
            bridge.last_prediction().map(|p| p.status),
            Some(PredictionStatus::Resolved)
        );
        assert!(!bridge.is_busy());
    }

    #[test]
    fn test_cancel_without_wager_is_noop() {
        let mut bridge = PredictionBridge::new(FakeService::logged_in(), PredictionSettings::default());
        bridge.cancel_prediction();
        bridge.end_prediction("Alpha");
        assert!(bridge.service().calls.is_empty());
    }

    #[test]
    fn test_shutdown_cancels_open_wager() {
        let mut bridge = open_bridge(FakeService::logged_in(), &["Alpha", "Beta"]);
        bridge.shutdown();
        assert_eq!(bridge.service().cancelled(), 1);
    }

    #[test]
    fn test_submit_failure_surfaces_status() {
        let mut bridge = PredictionBridge::new(FakeService::logged_in(), PredictionSettings::default());
        let err = bridge.create_prediction(&names(&["Solo"]));
        assert!(matches!(err, Err(PredictionError::Service(_))));
        assert!(bridge.status().starts_with("Prediction failed"));
        assert!(!bridge.is_busy());
    }
}
