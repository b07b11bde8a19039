pub mod gate;

pub use gate::{ReadinessGate, SurfaceId};

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};

use crate::config::BrokerConfig;
use crate::error::{AsklineError, Result};
use crate::exchange::{new_id, Answer, Attachment, PendingQuestion, QueuedPrompt, ToolCallEntry};
use crate::ipc::{UiCommand, UiEvent};
use crate::queue::PromptQueue;
use crate::session::SessionHistory;
use crate::storage::{DocumentStore, HistoryDocument, PersistenceStore, QueueState};

/// The one outstanding question and the channel its asker waits on.
struct PendingSlot {
    id: String,
    responder: oneshot::Sender<Answer>,
}

struct BrokerState {
    queue: PromptQueue,
    history: SessionHistory,
    gate: ReadinessGate,
    current: Option<PendingSlot>,
    disposed: bool,
}

enum Begin {
    Answered(Answer),
    Waiting {
        id: String,
        rx: oneshot::Receiver<Answer>,
    },
}

/// Correlates agent questions with human answers.
///
/// Every mutation of the queue, the session history and the pending slot
/// happens under one lock that is never held across an await.
pub struct RequestBroker {
    state: Mutex<BrokerState>,
    persistence: Arc<PersistenceStore>,
    answer_timeout: Option<Duration>,
}

impl RequestBroker {
    /// Load both documents from `store` and build a broker over them.
    pub async fn open(store: Arc<dyn DocumentStore>, config: &BrokerConfig) -> Self {
        let persistence = Arc::new(PersistenceStore::new(store, config.debounce()));
        let queue_state = persistence.load_queue_state().await;
        let history = persistence.load_history().await;
        Self::with_documents(persistence, queue_state, history, config)
    }

    pub fn with_documents(
        persistence: Arc<PersistenceStore>,
        queue_state: QueueState,
        history: HistoryDocument,
        config: &BrokerConfig,
    ) -> Self {
        let session_id = new_id();
        tracing::info!(
            "broker session {} starting with {} queued prompt(s), {} stored exchange(s)",
            session_id,
            queue_state.queue.len(),
            history.history.len()
        );
        let queue = PromptQueue::new(queue_state, persistence.clone(), config.max_prompt_chars);
        let history = SessionHistory::new(
            session_id,
            history,
            config.max_history,
            persistence.clone(),
        );
        Self {
            state: Mutex::new(BrokerState {
                queue,
                history,
                gate: ReadinessGate::new(),
                current: None,
                disposed: false,
            }),
            persistence,
            answer_timeout: config.answer_timeout(),
        }
    }

    /// Ask the human a question and wait for the answer.
    ///
    /// Answers straight from the queue when autopilot is on and it has
    /// prompts. Otherwise the question goes to the UI surface and this
    /// resolves on the matching `submit`.
    pub async fn ask(&self, question: &str) -> Result<Answer> {
        let (id, mut rx) = match self.begin(question)? {
            Begin::Answered(answer) => return Ok(answer),
            Begin::Waiting { id, rx } => (id, rx),
        };
        // Frees the slot if this future is dropped while still waiting.
        let mut guard = ExpireOnDrop {
            broker: self,
            id: &id,
            armed: true,
        };

        let Some(limit) = self.answer_timeout else {
            let outcome = (&mut rx).await;
            guard.armed = false;
            return outcome.map_err(|_| AsklineError::Disposed);
        };

        let outcome = tokio::time::timeout(limit, &mut rx).await;
        guard.armed = false;
        match outcome {
            Ok(outcome) => outcome.map_err(|_| AsklineError::Disposed),
            Err(_) => {
                let timeout_secs = limit.as_secs();
                if self.expire(&id) {
                    tracing::warn!("question {} unanswered after {}s", id, timeout_secs);
                    return Err(AsklineError::AnswerTimeout { timeout_secs });
                }
                // Answered between the timer firing and the expiry taking the lock.
                rx.try_recv()
                    .map_err(|_| AsklineError::AnswerTimeout { timeout_secs })
            }
        }
    }

    fn begin(&self, question: &str) -> Result<Begin> {
        let mut guard = self.live_state()?;
        let st = &mut *guard;

        st.reap_abandoned();
        if let Some(slot) = &st.current {
            return Err(AsklineError::RequestInFlight {
                id: slot.id.clone(),
            });
        }

        if st.queue.can_autoresolve() {
            if let Some(prompt) = st.queue.take_next() {
                let entry = ToolCallEntry::auto_resolved(
                    new_id(),
                    question,
                    &prompt.text,
                    st.history.session_id(),
                );
                tracing::info!("question {} answered from queue", entry.id);
                st.history.record(entry.clone());
                st.publish_queue();
                st.publish_completed(entry);
                return Ok(Begin::Answered(Answer {
                    value: prompt.text,
                    attachments: Vec::new(),
                    from_queue: true,
                }));
            }
        }

        if !st.gate.is_attached() {
            return Err(AsklineError::SurfaceUnavailable);
        }

        let id = new_id();
        let entry = ToolCallEntry::pending(id.clone(), question, st.history.session_id());
        let pending = PendingQuestion::from_entry(&entry);
        st.history.record(entry);

        let (tx, rx) = oneshot::channel();
        st.current = Some(PendingSlot {
            id: id.clone(),
            responder: tx,
        });
        tracing::debug!(
            "question {} pending ({})",
            id,
            pending.classification.as_str()
        );
        st.gate.deliver_question(pending);
        st.publish_session();
        Ok(Begin::Waiting { id, rx })
    }

    /// Drop the pending request `id` after its timeout. False if it was
    /// already answered.
    fn expire(&self, id: &str) -> bool {
        let mut guard = self.lock();
        let st = &mut *guard;
        if st.current.take_if(|slot| slot.id == id).is_none() {
            return false;
        }
        st.history.discard_pending(id);
        st.publish_session();
        true
    }

    /// Answer the pending request `id`.
    pub fn submit(&self, id: &str, value: &str, attachments: Vec<Attachment>) -> Result<()> {
        let mut guard = self.live_state()?;
        let st = &mut *guard;
        let Some(slot) = st.current.take_if(|slot| slot.id == id) else {
            tracing::warn!("ignoring submit for stale request {}", id);
            return Err(AsklineError::StaleCorrelation { id: id.to_string() });
        };
        st.resolve(slot, value.to_string(), attachments, false)
    }

    /// Answer whatever request is pending.
    pub fn submit_current(&self, value: &str, attachments: Vec<Attachment>) -> Result<()> {
        let Some(id) = self.pending_id() else {
            tracing::warn!("ignoring submit with nothing pending");
            return Err(AsklineError::StaleCorrelation {
                id: "<none>".into(),
            });
        };
        self.submit(&id, value, attachments)
    }

    /// Queue a prompt. If a request is pending and autopilot is on, the head
    /// of the queue answers it right away.
    pub fn add_queue_prompt(&self, text: &str, id: Option<String>) -> Result<QueuedPrompt> {
        let mut guard = self.live_state()?;
        let st = &mut *guard;
        let prompt = st.queue.push(text, id)?;

        st.reap_abandoned();
        if st.current.is_some() && st.queue.can_autoresolve() {
            if let (Some(slot), Some(head)) = (st.current.take(), st.queue.take_next()) {
                tracing::info!("pending question {} answered from queue", slot.id);
                st.resolve(slot, head.text, Vec::new(), true)?;
            }
        }
        st.publish_queue();
        Ok(prompt)
    }

    pub fn remove_queue_prompt(&self, id: &str) -> Result<QueuedPrompt> {
        self.with_queue(|queue| queue.remove_by_id(id))
    }

    pub fn edit_queue_prompt(&self, id: &str, text: &str) -> Result<()> {
        self.with_queue(|queue| queue.edit(id, text))
    }

    pub fn reorder_queue(&self, from: usize, to: usize) -> Result<()> {
        self.with_queue(|queue| queue.reorder(from, to))
    }

    pub fn clear_queue(&self) -> Result<()> {
        self.with_queue(|queue| {
            queue.clear();
            Ok(())
        })
    }

    pub fn set_queue_enabled(&self, enabled: bool) -> Result<()> {
        self.with_queue(|queue| {
            queue.set_enabled(enabled);
            Ok(())
        })
    }

    fn with_queue<T>(&self, op: impl FnOnce(&mut PromptQueue) -> Result<T>) -> Result<T> {
        let mut guard = self.live_state()?;
        let st = &mut *guard;
        let out = op(&mut st.queue)?;
        st.publish_queue();
        Ok(out)
    }

    pub fn clear_history(&self) -> Result<()> {
        let mut guard = self.live_state()?;
        let st = &mut *guard;
        st.history.clear_persisted()?;
        st.publish_history();
        Ok(())
    }

    pub fn remove_history_entry(&self, id: &str) -> Result<()> {
        let mut guard = self.live_state()?;
        let st = &mut *guard;
        st.history.remove_persisted(id)?;
        st.publish_history();
        Ok(())
    }

    /// Attach a UI surface. It receives nothing until it sends `ready`.
    pub fn attach_surface(&self, tx: mpsc::UnboundedSender<UiEvent>) -> SurfaceId {
        self.lock().gate.attach(tx)
    }

    pub fn detach_surface(&self, surface: SurfaceId) -> bool {
        self.lock().gate.detach(surface)
    }

    /// Readiness handshake: send the snapshot, then the pending question.
    pub fn ready(&self, surface: SurfaceId) -> bool {
        let mut guard = self.lock();
        let st = &mut *guard;
        let current = st
            .current
            .as_ref()
            .and_then(|slot| st.history.get(&slot.id))
            .map(PendingQuestion::from_entry);
        let snapshot = st.snapshot();
        st.gate.signal_ready(surface, snapshot, current)
    }

    /// Apply one inbound UI command. Failures go to the log, and those the
    /// human can act on also come back as a `warning` event.
    pub fn handle_ui_command(&self, surface: SurfaceId, command: UiCommand) {
        let result = match command {
            UiCommand::Submit {
                id: Some(id),
                value,
                attachments,
            } => self.submit(&id, &value, attachments),
            UiCommand::Submit {
                id: None,
                value,
                attachments,
            } => self.submit_current(&value, attachments),
            UiCommand::AddQueuePrompt { text, id } => self.add_queue_prompt(&text, id).map(|_| ()),
            UiCommand::RemoveQueuePrompt { id } => self.remove_queue_prompt(&id).map(|_| ()),
            UiCommand::EditQueuePrompt { id, text } => self.edit_queue_prompt(&id, &text),
            UiCommand::ReorderQueue { from, to } => self.reorder_queue(from, to),
            UiCommand::ToggleQueue { enabled } => self.set_queue_enabled(enabled),
            UiCommand::ClearQueue => self.clear_queue(),
            UiCommand::Ready => {
                self.ready(surface);
                Ok(())
            }
            UiCommand::ClearHistory => self.clear_history(),
            UiCommand::RemoveHistoryEntry { id } => self.remove_history_entry(&id),
        };

        match result {
            Ok(()) => {}
            Err(AsklineError::StaleCorrelation { .. }) => {}
            Err(e) if e.is_validation() => {
                tracing::warn!("rejected ui command: {}", e);
                self.warn_ui(e.to_string());
            }
            Err(AsklineError::Disposed) => {
                tracing::debug!("ui command after dispose ignored");
            }
            Err(e) => {
                tracing::error!("ui command failed: {}", e);
                self.warn_ui(e.to_string());
            }
        }
    }

    /// Send a `warning` event to the surface, if it is ready.
    pub fn warn_ui(&self, message: String) {
        self.lock().gate.notify(UiEvent::Warning { message });
    }

    /// Flush the queue, persist the session and release the pending asker.
    /// Repeat calls do nothing.
    pub fn dispose(&self) -> Result<()> {
        let mut guard = self.lock();
        let st = &mut *guard;
        if st.disposed {
            return Ok(());
        }
        st.disposed = true;

        if let Some(slot) = st.current.take() {
            tracing::info!("abandoning pending question {}", slot.id);
        }
        st.gate.close();

        let queue_result = self.persistence.flush_queue();
        if let Err(e) = &queue_result {
            tracing::error!("failed to flush queue state: {}", e);
        }
        let history_result = st.history.persist_session().map(|_| ());
        queue_result.and(history_result)
    }

    pub fn is_disposed(&self) -> bool {
        self.lock().disposed
    }

    pub fn pending_id(&self) -> Option<String> {
        self.lock().current.as_ref().map(|slot| slot.id.clone())
    }

    pub fn queue_snapshot(&self) -> QueueState {
        self.lock().queue.snapshot()
    }

    pub fn current_session(&self) -> Vec<ToolCallEntry> {
        self.lock().history.current_session()
    }

    pub fn persisted_history(&self) -> Vec<ToolCallEntry> {
        self.lock().history.persisted().to_vec()
    }

    pub fn session_id(&self) -> String {
        self.lock().history.session_id().to_string()
    }

    pub fn persistence(&self) -> &Arc<PersistenceStore> {
        &self.persistence
    }

    fn lock(&self) -> MutexGuard<'_, BrokerState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn live_state(&self) -> Result<MutexGuard<'_, BrokerState>> {
        let guard = self.lock();
        if guard.disposed {
            return Err(AsklineError::Disposed);
        }
        Ok(guard)
    }
}

/// Expires the pending request when an `ask` future is dropped mid-wait.
struct ExpireOnDrop<'a> {
    broker: &'a RequestBroker,
    id: &'a str,
    armed: bool,
}

impl Drop for ExpireOnDrop<'_> {
    fn drop(&mut self) {
        if self.armed && self.broker.expire(self.id) {
            tracing::info!("question {} abandoned by its asker", self.id);
        }
    }
}

impl BrokerState {
    /// Free a slot whose asker is gone, so it cannot absorb a queued answer.
    fn reap_abandoned(&mut self) {
        if let Some(slot) = self.current.take_if(|slot| slot.responder.is_closed()) {
            tracing::info!("dropping question {} with no waiting asker", slot.id);
            self.history.discard_pending(&slot.id);
            self.publish_session();
        }
    }

    /// Complete the slot's entry and hand the answer to the waiting asker.
    fn resolve(
        &mut self,
        slot: PendingSlot,
        value: String,
        attachments: Vec<Attachment>,
        from_queue: bool,
    ) -> Result<()> {
        let Some(entry) = self
            .history
            .complete(&slot.id, &value, attachments.clone(), from_queue)
        else {
            tracing::warn!("pending entry {} missing from session", slot.id);
            return Err(AsklineError::StaleCorrelation { id: slot.id });
        };
        let answer = Answer {
            value,
            attachments,
            from_queue,
        };
        if slot.responder.send(answer).is_err() {
            tracing::warn!("asker for {} went away before the answer", slot.id);
        }
        self.publish_completed(entry);
        Ok(())
    }

    fn snapshot(&self) -> Vec<UiEvent> {
        vec![
            self.queue_event(),
            UiEvent::CurrentSessionUpdated {
                entries: self.history.current_session(),
            },
            UiEvent::PersistedHistoryUpdated {
                entries: self.history.persisted().to_vec(),
            },
        ]
    }

    fn queue_event(&self) -> UiEvent {
        UiEvent::QueueUpdated {
            items: self.queue.items().to_vec(),
            enabled: self.queue.is_enabled(),
        }
    }

    fn publish_queue(&mut self) {
        let event = self.queue_event();
        self.gate.notify(event);
    }

    fn publish_session(&mut self) {
        let entries = self.history.current_session();
        self.gate.notify(UiEvent::CurrentSessionUpdated { entries });
    }

    fn publish_history(&mut self) {
        let entries = self.history.persisted().to_vec();
        self.gate.notify(UiEvent::PersistedHistoryUpdated { entries });
    }

    fn publish_completed(&mut self, entry: ToolCallEntry) {
        self.gate.notify(UiEvent::ExchangeCompleted { entry });
        self.publish_session();
    }
}
