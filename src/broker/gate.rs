use tokio::sync::mpsc;

use crate::exchange::PendingQuestion;
use crate::ipc::UiEvent;

/// Identifies one attached UI surface for its whole lifetime.
pub type SurfaceId = u64;

struct Surface {
    id: SurfaceId,
    tx: mpsc::UnboundedSender<UiEvent>,
    ready: bool,
}

/// Holds back notifications until the UI surface says it can take them.
///
/// The surface connects before it has finished initializing, so anything sent
/// in between would be lost. Only the pending question matters across that
/// window: it is buffered and, on `ready`, replaced by whatever question is
/// actually pending at that moment. Other state notifications are dropped
/// while not ready because the ready snapshot supersedes them.
pub struct ReadinessGate {
    surface: Option<Surface>,
    next_id: SurfaceId,
    buffered: Option<PendingQuestion>,
}

impl Default for ReadinessGate {
    fn default() -> Self {
        Self::new()
    }
}

impl ReadinessGate {
    pub fn new() -> Self {
        Self {
            surface: None,
            next_id: 1,
            buffered: None,
        }
    }

    /// Attach a new surface, replacing any previous one. It starts not ready.
    pub fn attach(&mut self, tx: mpsc::UnboundedSender<UiEvent>) -> SurfaceId {
        let id = self.next_id;
        self.next_id += 1;
        if let Some(old) = self.surface.replace(Surface {
            id,
            tx,
            ready: false,
        }) {
            tracing::debug!("ui surface {} replaced by {}", old.id, id);
        } else {
            tracing::debug!("ui surface {} attached", id);
        }
        id
    }

    /// Detach `id` if it is still the current surface.
    pub fn detach(&mut self, id: SurfaceId) -> bool {
        if self.surface.as_ref().is_some_and(|s| s.id == id) {
            self.surface = None;
            tracing::debug!("ui surface {} detached", id);
            return true;
        }
        false
    }

    pub fn is_attached(&self) -> bool {
        self.surface.is_some()
    }

    pub fn is_ready(&self) -> bool {
        self.surface.as_ref().is_some_and(|s| s.ready)
    }

    pub fn current_surface(&self) -> Option<SurfaceId> {
        self.surface.as_ref().map(|s| s.id)
    }

    pub fn has_buffered(&self) -> bool {
        self.buffered.is_some()
    }

    /// Send a question now, or keep it (replacing any earlier one) until ready.
    pub fn deliver_question(&mut self, question: PendingQuestion) {
        if self.is_ready() {
            self.send(question.into());
        } else {
            tracing::debug!("buffering question {} until the ui is ready", question.id);
            self.buffered = Some(question);
        }
    }

    /// Send a state notification if the surface is ready.
    pub fn notify(&mut self, event: UiEvent) -> bool {
        if !self.is_ready() {
            tracing::trace!("ui not ready; dropping {}", event.name());
            return false;
        }
        self.send(event)
    }

    /// Handle the readiness handshake from surface `id`.
    ///
    /// Sends `snapshot`, then `current` if a question is pending. A buffered
    /// question that is no longer current is discarded. Returns false (and
    /// sends nothing) if `id` is not the attached surface or it was already
    /// ready.
    pub fn signal_ready(
        &mut self,
        id: SurfaceId,
        snapshot: Vec<UiEvent>,
        current: Option<PendingQuestion>,
    ) -> bool {
        let Some(surface) = self.surface.as_mut().filter(|s| s.id == id) else {
            tracing::debug!("ready from detached surface {} ignored", id);
            return false;
        };
        if surface.ready {
            tracing::debug!("duplicate ready from surface {} ignored", id);
            return false;
        }
        surface.ready = true;

        let buffered = self.buffered.take();
        for event in snapshot {
            self.send(event);
        }
        match (current, buffered) {
            (Some(question), _) => {
                tracing::debug!("replaying pending question {} to surface {}", question.id, id);
                self.send(question.into());
            }
            (None, Some(stale)) => {
                tracing::debug!("dropping answered question {}", stale.id);
            }
            (None, None) => {}
        }
        true
    }

    /// Forget the surface and any buffered question.
    pub fn close(&mut self) {
        self.surface = None;
        self.buffered = None;
    }

    fn send(&mut self, event: UiEvent) -> bool {
        let failed = match &self.surface {
            Some(surface) => surface.tx.send(event).is_err(),
            None => return false,
        };
        if failed {
            if let Some(gone) = self.surface.take() {
                tracing::warn!("ui surface {} went away", gone.id);
            }
            return false;
        }
        true
    }
}
