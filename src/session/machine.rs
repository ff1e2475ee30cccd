//! Per-connection conversation controller.

use std::sync::Arc;

use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::messages;
use super::phase::SessionPhase;
use super::transition::{
    adopt_subject, begin_task, fallback_content, fill_optional_slot, fill_slot,
};
use super::{RoutingMode, SessionSettings};
use crate::channels::{FrameSink, ServerFrame};
use crate::dispatch::{JobDispatcher, WorkerJob};
use crate::error::ChannelError;
use crate::extraction::{Extractor, Intent};
use crate::task::{Slot, TaskRecord};

/// Drives one session from introduction through task dispatch.
///
/// Each call to [`handle_turn`](Self::handle_turn) processes one inbound
/// utterance to completion, including any worker run, before returning. The
/// only errors are channel errors; everything else is reported to the user
/// or recovered by re-asking.
pub struct SessionMachine {
    id: Uuid,
    settings: SessionSettings,
    extractor: Arc<dyn Extractor>,
    dispatcher: Arc<dyn JobDispatcher>,
    phase: SessionPhase,
    record: TaskRecord,
}

impl SessionMachine {
    pub fn new(
        settings: SessionSettings,
        extractor: Arc<dyn Extractor>,
        dispatcher: Arc<dyn JobDispatcher>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            settings,
            extractor,
            dispatcher,
            phase: SessionPhase::default(),
            record: TaskRecord::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn record(&self) -> &TaskRecord {
        &self.record
    }

    /// Opening message, sent once when the connection is established.
    pub async fn greet(&self, sink: &mut dyn FrameSink) -> Result<(), ChannelError> {
        sink.send_frame(ServerFrame::status(messages::GREETING)).await
    }

    /// Process one inbound utterance.
    pub async fn handle_turn(
        &mut self,
        utterance: &str,
        sink: &mut dyn FrameSink,
    ) -> Result<(), ChannelError> {
        debug!(session_id = %self.id, phase = %self.phase, "Handling turn");

        if self.phase.is_transient() {
            warn!(
                session_id = %self.id,
                phase = %self.phase,
                "Turn arrived in transient phase, ignoring"
            );
            return Ok(());
        }

        match self.phase {
            SessionPhase::AwaitingName => self.accept_name(utterance, sink).await?,
            SessionPhase::Routing => self.route(utterance, sink).await?,
            SessionPhase::CollectingSlot(slot) => self.collect(slot, utterance, sink).await?,
            // Only reachable after a failed run: the user asked to try again.
            SessionPhase::Ready
            | SessionPhase::Dispatching
            | SessionPhase::Succeeded
            | SessionPhase::Failed => {}
        }

        if self.phase == SessionPhase::Ready {
            self.run_task(sink).await?;
        }
        Ok(())
    }

    fn transition(&mut self, next: SessionPhase) {
        if !self.phase.can_transition_to(next) {
            warn!(
                session_id = %self.id,
                from = %self.phase,
                to = %next,
                "Unexpected session transition"
            );
        }
        debug!(session_id = %self.id, from = %self.phase, to = %next, "Session transition");
        self.phase = next;
    }

    async fn accept_name(
        &mut self,
        utterance: &str,
        sink: &mut dyn FrameSink,
    ) -> Result<(), ChannelError> {
        if utterance.trim().is_empty() {
            return sink.send_frame(ServerFrame::status(messages::GREETING)).await;
        }
        self.record = self.record.with_participant_name(utterance);
        let name = self.record.participant_name().unwrap_or_default().to_string();
        info!(session_id = %self.id, "Participant introduced");
        self.transition(SessionPhase::Routing);
        sink.send_frame(ServerFrame::status(messages::welcome(&name)))
            .await
    }

    async fn route(&mut self, utterance: &str, sink: &mut dyn FrameSink) -> Result<(), ChannelError> {
        let intent = match self.settings.routing {
            RoutingMode::Direct => Intent::Task,
            RoutingMode::IntentGated => {
                self.extractor
                    .classify_intent(utterance)
                    .await
                    .unwrap_or_else(|| {
                        debug!(session_id = %self.id, "No intent produced, treating as chat");
                        Intent::Chat
                    })
            }
        };

        match intent {
            Intent::Chat => {
                let reply = self
                    .extractor
                    .generate_chat_reply(utterance, self.record.participant_name())
                    .await
                    .unwrap_or_else(|| messages::CHAT_FALLBACK.to_string());
                self.transition(SessionPhase::Routing);
                sink.send_frame(ServerFrame::status(reply)).await
            }
            Intent::Task => match begin_task(&self.record, utterance) {
                Ok(record) => {
                    info!(session_id = %self.id, variant = %self.settings.variant, "Task cycle started");
                    self.record = record;
                    self.advance(true, sink).await
                }
                Err(e) => {
                    warn!(session_id = %self.id, error = %e, "Could not start task");
                    sink.send_frame(ServerFrame::status(messages::CHAT_FALLBACK))
                        .await
                }
            },
        }
    }

    async fn collect(
        &mut self,
        slot: Slot,
        utterance: &str,
        sink: &mut dyn FrameSink,
    ) -> Result<(), ChannelError> {
        let extraction = self.extractor.extract_slot(utterance, slot).await;
        let filled = if self.settings.variant.requires(slot) {
            fill_slot(&self.record, slot, extraction.as_ref())
        } else {
            fill_optional_slot(&self.record, slot, extraction.as_ref(), utterance)
        };
        match filled {
            Ok(record) => {
                info!(session_id = %self.id, %slot, "Slot filled");
                self.record = record;
                self.advance(false, sink).await
            }
            Err(e) => {
                warn!(session_id = %self.id, %slot, error = %e, "Slot not filled, asking again");
                sink.send_frame(ServerFrame::status(messages::slot_prompt(slot)))
                    .await
            }
        }
    }

    /// Move to the next unset slot, or to `Ready` once the record is
    /// complete. A task acknowledgement shares a frame with the first prompt.
    async fn advance(
        &mut self,
        acknowledge: bool,
        sink: &mut dyn FrameSink,
    ) -> Result<(), ChannelError> {
        match self.record.next_unset(self.settings.variant) {
            Some(slot) => {
                self.transition(SessionPhase::CollectingSlot(slot));
                let prompt = if acknowledge {
                    messages::task_accepted(slot)
                } else {
                    messages::slot_prompt(slot).to_string()
                };
                sink.send_frame(ServerFrame::status(prompt)).await
            }
            None => {
                debug_assert!(self.record.is_complete(self.settings.variant));
                self.transition(SessionPhase::Ready);
                if acknowledge {
                    sink.send_frame(ServerFrame::status(messages::TASK_ACCEPTED))
                        .await?;
                }
                Ok(())
            }
        }
    }

    /// Generate content, run the worker, and relay its events.
    async fn run_task(&mut self, sink: &mut dyn FrameSink) -> Result<(), ChannelError> {
        sink.send_frame(ServerFrame::status(messages::READY)).await?;

        let content = match self.extractor.generate_task_content(&self.record).await {
            Some(content) => content,
            None => {
                warn!(session_id = %self.id, "Content generation produced nothing, using fallback");
                fallback_content(&self.record)
            }
        };
        self.record = adopt_subject(&self.record, &content);

        let Some(job) = WorkerJob::from_record(&self.record, self.settings.variant, &content) else {
            error!(session_id = %self.id, record = ?self.record, "Ready with an incomplete record");
            return sink
                .send_frame(ServerFrame::status(messages::automation_failed(
                    "the task is missing required details",
                )))
                .await;
        };

        self.transition(SessionPhase::Dispatching);
        info!(session_id = %self.id, job_id = %job.id, "Worker job dispatched");

        match self.dispatcher.dispatch(&job).await {
            Ok(outcome) => {
                for event in &outcome.events {
                    sink.send_frame(ServerFrame::from(event)).await?;
                }
                self.transition(SessionPhase::Succeeded);
                info!(session_id = %self.id, job_id = %job.id, "Task cycle succeeded");

                sink.send_frame(ServerFrame::status(messages::sent(&job.recipient)))
                    .await?;
                self.record = self.record.next_cycle();
                self.transition(SessionPhase::Routing);
                sink.send_frame(ServerFrame::status(messages::what_else(
                    self.record.participant_name(),
                )))
                .await
            }
            Err(e) => {
                self.transition(SessionPhase::Failed);
                error!(session_id = %self.id, job_id = %job.id, error = %e, "Task cycle failed");
                // The record is kept so the user can retry the same task.
                self.transition(SessionPhase::Ready);
                sink.send_frame(ServerFrame::status(messages::automation_failed(
                    &e.to_string(),
                )))
                .await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::dispatch::{AutomationEvent, DispatchOutcome};
    use crate::error::WorkerError;
    use crate::extraction::{SlotExtraction, TaskContent};
    use crate::task::TaskVariant;

    /// Deterministic collaborator: intents are scripted, slot answers echo
    /// the utterance under the asked slot's key unless the utterance is
    /// "???", which yields nothing.
    #[derive(Default)]
    struct StubExtractor {
        intents: Mutex<VecDeque<Intent>>,
        content_calls: Mutex<usize>,
        wrong_key: bool,
    }

    impl StubExtractor {
        fn with_intents(intents: &[Intent]) -> Self {
            Self {
                intents: Mutex::new(intents.iter().copied().collect()),
                ..Default::default()
            }
        }
    }

    #[async_trait]
    impl Extractor for StubExtractor {
        async fn classify_intent(&self, _text: &str) -> Option<Intent> {
            self.intents.lock().unwrap().pop_front()
        }

        async fn extract_slot(&self, text: &str, slot: Slot) -> Option<SlotExtraction> {
            if text == "???" {
                return None;
            }
            if self.wrong_key {
                return Some(SlotExtraction::single(Slot::ContextDetails, text));
            }
            Some(SlotExtraction::single(slot, text))
        }

        async fn generate_chat_reply(&self, text: &str, known_name: Option<&str>) -> Option<String> {
            Some(format!("chat({}): {text}", known_name.unwrap_or("-")))
        }

        async fn generate_task_content(&self, _record: &TaskRecord) -> Option<TaskContent> {
            *self.content_calls.lock().unwrap() += 1;
            Some(TaskContent {
                subject: "Generated".to_string(),
                body: "Dear Sir/Madam,".to_string(),
            })
        }
    }

    /// Returns scripted results and records every job it receives.
    struct StubDispatcher {
        results: Mutex<VecDeque<Result<Vec<AutomationEvent>, i32>>>,
        jobs: Mutex<Vec<Vec<String>>>,
    }

    impl StubDispatcher {
        fn new(results: Vec<Result<Vec<AutomationEvent>, i32>>) -> Arc<Self> {
            Arc::new(Self {
                results: Mutex::new(results.into()),
                jobs: Mutex::new(Vec::new()),
            })
        }

        fn job_count(&self) -> usize {
            self.jobs.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl JobDispatcher for StubDispatcher {
        async fn dispatch(&self, job: &WorkerJob) -> Result<DispatchOutcome, WorkerError> {
            self.jobs.lock().unwrap().push(job.args().to_vec());
            match self.results.lock().unwrap().pop_front().unwrap_or(Ok(Vec::new())) {
                Ok(events) => Ok(DispatchOutcome {
                    events,
                    exit_code: 0,
                }),
                Err(code) => Err(WorkerError::Failed {
                    code,
                    stderr: "worker blew up".to_string(),
                }),
            }
        }
    }

    fn machine(
        variant: TaskVariant,
        routing: RoutingMode,
        extractor: StubExtractor,
        dispatcher: Arc<StubDispatcher>,
    ) -> SessionMachine {
        SessionMachine::new(
            SessionSettings { variant, routing },
            Arc::new(extractor),
            dispatcher,
        )
    }

    async fn say(m: &mut SessionMachine, text: &str) -> Vec<ServerFrame> {
        let mut frames = Vec::new();
        m.handle_turn(text, &mut frames).await.unwrap();
        frames
    }

    fn status(text: &str) -> ServerFrame {
        ServerFrame::status(text)
    }

    #[tokio::test]
    async fn greeting_then_name() {
        let dispatcher = StubDispatcher::new(vec![]);
        let mut m = machine(
            TaskVariant::Guided,
            RoutingMode::IntentGated,
            StubExtractor::default(),
            dispatcher,
        );
        let mut frames = Vec::new();
        m.greet(&mut frames).await.unwrap();
        assert_eq!(frames, vec![status(messages::GREETING)]);

        let frames = say(&mut m, "Ada").await;
        assert_eq!(frames, vec![status("Nice to meet you, Ada! How can I help you today?")]);
        assert_eq!(m.phase(), SessionPhase::Routing);
        assert_eq!(m.record().participant_name(), Some("Ada"));
    }

    #[tokio::test]
    async fn chat_never_leaves_routing() {
        let dispatcher = StubDispatcher::new(vec![]);
        let mut m = machine(
            TaskVariant::Guided,
            RoutingMode::IntentGated,
            StubExtractor::with_intents(&[Intent::Chat; 5]),
            Arc::clone(&dispatcher),
        );
        say(&mut m, "Ada").await;
        for i in 0..5 {
            let frames = say(&mut m, &format!("hello {i}")).await;
            assert_eq!(frames, vec![status(&format!("chat(Ada): hello {i}"))]);
            assert_eq!(m.phase(), SessionPhase::Routing);
        }
        // Classification failure also counts as chat.
        say(&mut m, "hello again").await;
        assert_eq!(m.phase(), SessionPhase::Routing);
        assert_eq!(dispatcher.job_count(), 0);
        assert!(!m.record().has_task());
    }

    #[tokio::test]
    async fn guided_cycle_succeeds_and_resets() {
        let dispatcher = StubDispatcher::new(vec![Ok(vec![
            AutomationEvent::Status("Opening browser".to_string()),
            AutomationEvent::Image {
                bytes: b"hi".to_vec(),
                mime: "image/jpeg",
            },
        ])]);
        let mut m = machine(
            TaskVariant::Guided,
            RoutingMode::IntentGated,
            StubExtractor::with_intents(&[Intent::Task]),
            Arc::clone(&dispatcher),
        );
        say(&mut m, "Ada").await;
        let before = m.record().clone();

        let frames = say(&mut m, "email my boss about leave").await;
        assert_eq!(
            frames,
            vec![status(
                "I can help with that. What's the recipient's email address?"
            )]
        );
        assert_eq!(m.phase(), SessionPhase::CollectingSlot(Slot::RecipientAddress));

        say(&mut m, "boss@example.com").await;
        assert_eq!(m.phase(), SessionPhase::CollectingSlot(Slot::SubjectLine));

        // The record completes on the subject, so the same turn dispatches.
        let frames = say(&mut m, "Leave request").await;
        assert_eq!(
            frames,
            vec![
                status(messages::READY),
                status("Opening browser"),
                ServerFrame::Image("data:image/jpeg;base64,aGk=".to_string()),
                status("✅ Email sent successfully to boss@example.com!"),
                status("What else can I do for you, Ada?"),
            ]
        );
        assert_eq!(m.phase(), SessionPhase::Routing);
        assert_eq!(m.record(), &before);
        assert_eq!(
            dispatcher.jobs.lock().unwrap()[0],
            vec!["boss@example.com", "Leave request", "Dear Sir/Madam,"]
        );
    }

    #[tokio::test]
    async fn credentialed_cycle_uses_generated_subject() {
        let dispatcher = StubDispatcher::new(vec![Ok(vec![])]);
        let mut m = machine(
            TaskVariant::Credentialed,
            RoutingMode::IntentGated,
            StubExtractor::with_intents(&[Intent::Task]),
            Arc::clone(&dispatcher),
        );
        say(&mut m, "Ada").await;
        say(&mut m, "send a leave email").await;
        assert_eq!(m.phase(), SessionPhase::CollectingSlot(Slot::CredentialUser));
        say(&mut m, "ada@gmail.com").await;
        say(&mut m, "hunter2").await;
        say(&mut m, "3rd to 5th March").await;
        assert!(!m.record().is_complete(TaskVariant::Credentialed));
        say(&mut m, "boss@example.com").await;

        assert_eq!(dispatcher.job_count(), 1);
        assert_eq!(
            dispatcher.jobs.lock().unwrap()[0],
            vec![
                "ada@gmail.com",
                "hunter2",
                "boss@example.com",
                "Generated",
                "Dear Sir/Madam,"
            ]
        );
        assert_eq!(m.phase(), SessionPhase::Routing);
    }

    #[tokio::test]
    async fn context_reply_without_extraction_is_kept_verbatim() {
        let dispatcher = StubDispatcher::new(vec![Ok(vec![])]);
        let mut m = machine(
            TaskVariant::Credentialed,
            RoutingMode::Direct,
            StubExtractor::default(),
            Arc::clone(&dispatcher),
        );
        say(&mut m, "Ada").await;
        say(&mut m, "email my boss").await;
        say(&mut m, "ada@gmail.com").await;
        say(&mut m, "hunter2").await;
        assert_eq!(m.phase(), SessionPhase::CollectingSlot(Slot::ContextDetails));

        let frames = say(&mut m, "???").await;
        assert_eq!(frames, vec![status(messages::slot_prompt(Slot::RecipientAddress))]);
        assert_eq!(m.record().get(Slot::ContextDetails), Some("???"));

        say(&mut m, "boss@example.com").await;
        assert_eq!(dispatcher.job_count(), 1);
        assert_eq!(m.phase(), SessionPhase::Routing);
    }

    #[tokio::test]
    async fn blank_name_asks_again() {
        let dispatcher = StubDispatcher::new(vec![]);
        let mut m = machine(
            TaskVariant::Guided,
            RoutingMode::IntentGated,
            StubExtractor::default(),
            dispatcher,
        );
        let frames = say(&mut m, "   ").await;
        assert_eq!(frames, vec![status(messages::GREETING)]);
        assert_eq!(m.phase(), SessionPhase::AwaitingName);
        assert_eq!(m.record().participant_name(), None);

        say(&mut m, "Ada").await;
        assert_eq!(m.record().participant_name(), Some("Ada"));
    }

    #[tokio::test]
    async fn extraction_failure_is_idempotent() {
        let dispatcher = StubDispatcher::new(vec![]);
        let mut m = machine(
            TaskVariant::Guided,
            RoutingMode::Direct,
            StubExtractor::default(),
            dispatcher,
        );
        say(&mut m, "Ada").await;
        say(&mut m, "email my boss").await;
        let before = m.record().clone();

        let first = say(&mut m, "???").await;
        let second = say(&mut m, "???").await;
        assert_eq!(first, vec![status(messages::slot_prompt(Slot::RecipientAddress))]);
        assert_eq!(first, second);
        assert_eq!(m.record(), &before);
        assert_eq!(m.phase(), SessionPhase::CollectingSlot(Slot::RecipientAddress));
    }

    #[tokio::test]
    async fn invalid_address_reprompts_same_slot() {
        let dispatcher = StubDispatcher::new(vec![]);
        let mut m = machine(
            TaskVariant::Guided,
            RoutingMode::Direct,
            StubExtractor::default(),
            dispatcher,
        );
        say(&mut m, "Ada").await;
        say(&mut m, "email my boss").await;
        let frames = say(&mut m, "my manager").await;
        assert_eq!(frames, vec![status(messages::slot_prompt(Slot::RecipientAddress))]);
        assert!(!m.record().is_set(Slot::RecipientAddress));
    }

    #[tokio::test]
    async fn value_under_other_key_is_ignored() {
        let dispatcher = StubDispatcher::new(vec![]);
        let extractor = StubExtractor {
            wrong_key: true,
            ..Default::default()
        };
        let mut m = machine(TaskVariant::Guided, RoutingMode::Direct, extractor, dispatcher);
        say(&mut m, "Ada").await;
        say(&mut m, "email my boss").await;
        say(&mut m, "boss@example.com").await;
        assert!(!m.record().is_set(Slot::RecipientAddress));
        assert!(!m.record().is_set(Slot::ContextDetails));
        assert_eq!(m.phase(), SessionPhase::CollectingSlot(Slot::RecipientAddress));
    }

    #[tokio::test]
    async fn worker_failure_keeps_record_and_allows_retry() {
        let dispatcher = StubDispatcher::new(vec![Err(2), Ok(vec![])]);
        let mut m = machine(
            TaskVariant::Guided,
            RoutingMode::Direct,
            StubExtractor::default(),
            Arc::clone(&dispatcher),
        );
        say(&mut m, "Ada").await;
        say(&mut m, "email my boss").await;
        say(&mut m, "boss@example.com").await;
        let frames = say(&mut m, "Leave").await;

        assert_eq!(
            frames,
            vec![
                status(messages::READY),
                status("❌ An error occurred during browser automation: Worker exited with code 2: worker blew up"),
            ]
        );
        assert_eq!(m.phase(), SessionPhase::Ready);
        assert!(m.record().is_complete(TaskVariant::Guided));
        assert_eq!(m.record().get(Slot::RecipientAddress), Some("boss@example.com"));

        // The next message re-runs the same job; nothing runs on its own.
        assert_eq!(dispatcher.job_count(), 1);
        say(&mut m, "try again").await;
        assert_eq!(dispatcher.job_count(), 2);
        assert_eq!(m.phase(), SessionPhase::Routing);
        assert!(!m.record().has_task());
    }

    #[tokio::test]
    async fn content_is_generated_once_per_dispatch() {
        let dispatcher = StubDispatcher::new(vec![Ok(vec![])]);
        let extractor = Arc::new(StubExtractor::default());
        let mut m = SessionMachine::new(
            SessionSettings {
                variant: TaskVariant::Guided,
                routing: RoutingMode::Direct,
            },
            Arc::clone(&extractor) as Arc<dyn Extractor>,
            dispatcher,
        );
        for text in ["Ada", "email", "boss@example.com", "Hi"] {
            say(&mut m, text).await;
        }
        assert_eq!(*extractor.content_calls.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn closed_channel_stops_the_turn() {
        struct ClosedSink;

        #[async_trait]
        impl FrameSink for ClosedSink {
            async fn send_frame(&mut self, _frame: ServerFrame) -> Result<(), ChannelError> {
                Err(ChannelError::Disconnected {
                    name: "test".to_string(),
                    reason: "gone".to_string(),
                })
            }
        }

        let dispatcher = StubDispatcher::new(vec![]);
        let mut m = machine(
            TaskVariant::Guided,
            RoutingMode::Direct,
            StubExtractor::default(),
            dispatcher,
        );
        let result = m.handle_turn("Ada", &mut ClosedSink).await;
        assert!(matches!(result, Err(ChannelError::Disconnected { .. })));
    }
}
