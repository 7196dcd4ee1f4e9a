//! Timed continuations bound to a race session
//!
//! Every scheduled entry carries the session token that was active when it
//! was queued. Renewing the session drops the old entries, and `pop_due`
//! discards anything whose token no longer matches, so a stop or restart
//! can never be followed by a stale release or victory step.

/// Identifies one race session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionToken(u64);

#[derive(Debug, Clone)]
struct Scheduled<T> {
    wake_at: f32,
    seq: u64,
    token: SessionToken,
    payload: T,
}

/// Deadline queue of session-tagged continuations
#[derive(Debug, Clone)]
pub struct Scheduler<T> {
    entries: Vec<Scheduled<T>>,
    active: SessionToken,
    next_token: u64,
    next_seq: u64,
}

impl<T> Default for Scheduler<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Scheduler<T> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            active: SessionToken(0),
            next_token: 1,
            next_seq: 0,
        }
    }

    pub fn active(&self) -> SessionToken {
        self.active
    }

    /// Cancel everything pending and start a new session
    pub fn renew(&mut self) -> SessionToken {
        let dropped = self.entries.len();
        self.entries.clear();
        self.active = SessionToken(self.next_token);
        self.next_token += 1;
        if dropped > 0 {
            log::debug!("Session renewed, dropped {} pending continuation(s)", dropped);
        }
        self.active
    }

    /// Queue `payload` to fire once `now >= wake_at`
    pub fn schedule(&mut self, wake_at: f32, payload: T) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.entries.push(Scheduled {
            wake_at,
            seq,
            token: self.active,
            payload,
        });
    }

    /// Take the earliest due entry of the active session
    pub fn pop_due(&mut self, now: f32) -> Option<T> {
        let active = self.active;
        self.entries.retain(|e| e.token == active);

        let index = self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.wake_at <= now)
            .min_by(|(_, a), (_, b)| a.wake_at.total_cmp(&b.wake_at).then(a.seq.cmp(&b.seq)))
            .map(|(i, _)| i)?;
        Some(self.entries.swap_remove(index).payload)
    }

    /// Entries still waiting in the active session
    pub fn pending(&self) -> usize {
        self.entries.iter().filter(|e| e.token == self.active).count()
    }

    /// Deadline of the earliest pending entry
    pub fn next_wake(&self) -> Option<f32> {
        self.entries
            .iter()
            .filter(|e| e.token == self.active)
            .map(|e| e.wake_at)
            .min_by(f32::total_cmp)
    }
}
