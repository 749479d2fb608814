//! Local sabotage tracker for the player at this client
//!
//! While idle the tracker keeps the nearest qualifying target highlighted.
//! Once started it counts progress locally for presentation and, on reaching
//! 1, produces the completion request. The server keeps its own progress and
//! decides the outcome; the tracker only learns it from the result broadcast
//! or a rejection.

use shared::{
    select_target, Broadcast, Candidate, PlayerId, Position, Rejection, Request, TargetId, Team,
    SABOTAGE_INTERACT_DURATION, SABOTAGE_INTERACT_RADIUS,
};

/// Seconds to wait for the server's verdict after asking to complete.
pub const RESULT_WAIT: f32 = 3.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InteractionEvent {
    Candidate(Option<TargetId>),
    Progress(f32),
    Result { target_id: TargetId, success: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

type Listener<E> = Box<dyn FnMut(&E) + Send>;

/// Typed observer list with explicit unsubscribe.
pub struct Listeners<E> {
    next_id: u64,
    listeners: Vec<(ListenerId, Listener<E>)>,
}

impl<E> Listeners<E> {
    pub fn new() -> Self {
        Self {
            next_id: 1,
            listeners: Vec::new(),
        }
    }

    pub fn subscribe<F>(&mut self, listener: F) -> ListenerId
    where
        F: FnMut(&E) + Send + 'static,
    {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(listener_id, _)| *listener_id != id);
        self.listeners.len() != before
    }

    pub fn emit(&mut self, event: &E) {
        for (_, listener) in self.listeners.iter_mut() {
            listener(event);
        }
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

impl<E> Default for Listeners<E> {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum LocalState {
    Idle {
        candidate: Option<TargetId>,
    },
    Interacting {
        target_id: TargetId,
        elapsed: f32,
        progress: f32,
    },
    AwaitingResult {
        target_id: TargetId,
        waited: f32,
    },
}

pub struct LocalInteraction {
    team: Team,
    radius: f32,
    duration: f32,
    state: LocalState,
    listeners: Listeners<InteractionEvent>,
}

impl LocalInteraction {
    pub fn new(team: Team) -> Self {
        Self::with_settings(team, SABOTAGE_INTERACT_RADIUS, SABOTAGE_INTERACT_DURATION)
    }

    pub fn with_settings(team: Team, radius: f32, duration: f32) -> Self {
        Self {
            team,
            radius,
            duration,
            state: LocalState::Idle { candidate: None },
            listeners: Listeners::new(),
        }
    }

    pub fn subscribe<F>(&mut self, listener: F) -> ListenerId
    where
        F: FnMut(&InteractionEvent) + Send + 'static,
    {
        self.listeners.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        self.listeners.unsubscribe(id)
    }

    pub fn candidate(&self) -> Option<TargetId> {
        match self.state {
            LocalState::Idle { candidate } => candidate,
            _ => None,
        }
    }

    pub fn target(&self) -> Option<TargetId> {
        match self.state {
            LocalState::Idle { .. } => None,
            LocalState::Interacting { target_id, .. }
            | LocalState::AwaitingResult { target_id, .. } => Some(target_id),
        }
    }

    pub fn progress(&self) -> f32 {
        match self.state {
            LocalState::Interacting { progress, .. } => progress,
            LocalState::AwaitingResult { .. } => 1.0,
            LocalState::Idle { .. } => 0.0,
        }
    }

    pub fn is_interacting(&self) -> bool {
        !matches!(self.state, LocalState::Idle { .. })
    }

    /// Re-runs target discovery while idle. Emits a candidate event when the
    /// highlighted target changes.
    pub fn scan<I>(&mut self, position: Position, candidates: I) -> Option<TargetId>
    where
        I: IntoIterator<Item = Candidate>,
    {
        let current = match self.state {
            LocalState::Idle { candidate } => candidate,
            _ => return None,
        };

        let found = select_target(position, self.team, self.radius, candidates);
        if found != current {
            self.state = LocalState::Idle { candidate: found };
            self.listeners.emit(&InteractionEvent::Candidate(found));
        }
        found
    }

    /// Starts interacting with the highlighted target, returning the request
    /// to send. Does nothing without a candidate or when already busy.
    pub fn begin(&mut self) -> Option<Request> {
        let target_id = match self.state {
            LocalState::Idle {
                candidate: Some(target_id),
            } => target_id,
            _ => return None,
        };

        self.state = LocalState::Interacting {
            target_id,
            elapsed: 0.0,
            progress: 0.0,
        };
        self.listeners.emit(&InteractionEvent::Progress(0.0));
        Some(Request::SabotageStart)
    }

    /// Advances local progress. Returns the completion request on the step
    /// progress reaches 1.
    pub fn advance(&mut self, dt: f32) -> Option<Request> {
        match self.state {
            LocalState::Interacting {
                target_id,
                elapsed,
                ..
            } => {
                let elapsed = elapsed + dt;
                let progress = if self.duration > 0.0 {
                    (elapsed / self.duration).min(1.0)
                } else {
                    1.0
                };
                self.listeners.emit(&InteractionEvent::Progress(progress));

                if progress >= 1.0 {
                    self.state = LocalState::AwaitingResult {
                        target_id,
                        waited: 0.0,
                    };
                    return Some(Request::SabotageComplete { target_id });
                }

                self.state = LocalState::Interacting {
                    target_id,
                    elapsed,
                    progress,
                };
                None
            }
            LocalState::AwaitingResult { target_id, waited } => {
                let waited = waited + dt;
                if waited >= RESULT_WAIT {
                    self.finish(target_id, false);
                } else {
                    self.state = LocalState::AwaitingResult { target_id, waited };
                }
                None
            }
            LocalState::Idle { .. } => None,
        }
    }

    /// Abandons the current interaction, returning the cancel request.
    pub fn cancel(&mut self) -> Option<Request> {
        if !self.is_interacting() {
            return None;
        }
        self.reset();
        Some(Request::SabotageCancel)
    }

    /// Feeds a broadcast from the server. Only results for `local_player`
    /// concern the tracker.
    pub fn on_broadcast(&mut self, broadcast: &Broadcast, local_player: PlayerId) {
        if let Broadcast::SabotageResult {
            player_id,
            target_id,
            success,
        } = *broadcast
        {
            if player_id == local_player && self.target() == Some(target_id) {
                self.finish(target_id, success);
            }
        }
    }

    /// Feeds a rejection of one of our sabotage requests.
    pub fn on_rejected(&mut self, request: Request, _reason: Rejection) {
        match request {
            Request::SabotageStart => self.reset(),
            Request::SabotageComplete { target_id } => {
                if self.target() == Some(target_id) {
                    self.finish(target_id, false);
                }
            }
            Request::SabotageCancel | Request::ActivateAbility => {}
        }
    }

    fn finish(&mut self, target_id: TargetId, success: bool) {
        self.reset();
        self.listeners
            .emit(&InteractionEvent::Result { target_id, success });
    }

    fn reset(&mut self) {
        self.state = LocalState::Idle { candidate: None };
        self.listeners.emit(&InteractionEvent::Progress(0.0));
    }
}
