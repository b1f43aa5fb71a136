//! Interaction state machine for one problem session.
//!
//! Requests are split into a dispatch half ([`Session::request_hint`],
//! [`Session::request_analysis`]) that reserves a pending tutor message and
//! hands back a [`Dispatch`], and a resolve half ([`Session::resolve`]) that
//! consumes the matching [`TutorReply`]. Entering an awaiting state is the
//! only way to obtain a `Dispatch`, so at most one request is outstanding.

use crate::gateway::TutorTask;
use crate::locale::Language;
use crate::session::image::UploadedImage;
use crate::session::{Message, MessageId, Role, Transcript};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Idle,
    AwaitingHint,
    HintGiven,
    AwaitingAnalysis,
    AnalysisGiven,
}

impl SessionState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::AwaitingHint => "awaiting_hint",
            Self::HintGiven => "hint_given",
            Self::AwaitingAnalysis => "awaiting_analysis",
            Self::AnalysisGiven => "analysis_given",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    Upload,
    RequestHint,
    RequestAnalysis,
}

impl fmt::Display for SessionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Upload => f.write_str("upload"),
            Self::RequestHint => f.write_str("request_hint"),
            Self::RequestAnalysis => f.write_str("request_analysis"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    #[error("{event} is not allowed in state {state}")]
    NotAllowed {
        event: SessionEvent,
        state: SessionState,
    },

    #[error("{task} reply for message {pending_id} does not match the outstanding request")]
    StaleReply {
        task: TutorTask,
        pending_id: MessageId,
    },
}

/// Everything a background task needs to run one tutor request.
#[derive(Debug, Clone)]
pub struct Dispatch {
    pub task: TutorTask,
    pub pending_id: MessageId,
    pub image_jpeg: Arc<[u8]>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TutorReply {
    pub task: TutorTask,
    pub pending_id: MessageId,
    pub text: String,
}

/// Which controls the presentation layer should offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Controls {
    pub upload: bool,
    pub request_hint: bool,
    pub busy: bool,
    pub request_analysis: bool,
    pub reset: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Outstanding {
    task: TutorTask,
    pending_id: MessageId,
}

#[derive(Debug)]
pub struct Session {
    state: SessionState,
    transcript: Transcript,
    image: Option<UploadedImage>,
    outstanding: Option<Outstanding>,
    language: Language,
}

impl Session {
    pub fn new(language: Language) -> Self {
        Self {
            state: SessionState::Idle,
            transcript: Transcript::default(),
            image: None,
            outstanding: None,
            language,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn image(&self) -> Option<&UploadedImage> {
        self.image.as_ref()
    }

    pub fn has_image(&self) -> bool {
        self.image.is_some()
    }

    pub fn controls(&self) -> Controls {
        match self.state {
            SessionState::Idle => Controls {
                upload: !self.has_image(),
                request_hint: self.has_image(),
                ..Controls::default()
            },
            SessionState::AwaitingHint | SessionState::AwaitingAnalysis => Controls {
                busy: true,
                ..Controls::default()
            },
            SessionState::HintGiven => Controls {
                request_analysis: true,
                reset: true,
                ..Controls::default()
            },
            SessionState::AnalysisGiven => Controls {
                reset: true,
                ..Controls::default()
            },
        }
    }

    pub fn upload(&mut self, image: UploadedImage) -> Result<(), TransitionError> {
        if self.state != SessionState::Idle || self.has_image() {
            return Err(self.not_allowed(SessionEvent::Upload));
        }

        self.transcript.append(Message::image(image.data_uri().to_string()));
        self.image = Some(image);
        debug!(state = %self.state, "photo uploaded");
        Ok(())
    }

    pub fn request_hint(&mut self) -> Result<Dispatch, TransitionError> {
        let image_jpeg = match (&self.image, self.state) {
            (Some(image), SessionState::Idle) => image.jpeg_bytes(),
            _ => return Err(self.not_allowed(SessionEvent::RequestHint)),
        };

        let pending = Message::pending_tutor();
        let pending_id = pending.id;
        self.transcript.append(pending);
        Ok(self.begin(TutorTask::Hint, pending_id, image_jpeg))
    }

    pub fn request_analysis(&mut self) -> Result<Dispatch, TransitionError> {
        let image_jpeg = match (&self.image, self.state) {
            (Some(image), SessionState::HintGiven) => image.jpeg_bytes(),
            _ => return Err(self.not_allowed(SessionEvent::RequestAnalysis)),
        };

        let pending = Message::pending_tutor();
        let pending_id = pending.id;
        self.transcript.extend([
            Message::text(Role::Student, self.language.strings().student_follow_up),
            pending,
        ]);
        Ok(self.begin(TutorTask::FullAnalysis, pending_id, image_jpeg))
    }

    /// Fills the pending tutor message and advances to the matching "given"
    /// state. The reply text may be a fallback; the transition is the same.
    pub fn resolve(&mut self, reply: TutorReply) -> Result<(), TransitionError> {
        let expected = Outstanding {
            task: reply.task,
            pending_id: reply.pending_id,
        };
        if self.outstanding != Some(expected) {
            return Err(TransitionError::StaleReply {
                task: reply.task,
                pending_id: reply.pending_id,
            });
        }

        self.transcript
            .update(reply.pending_id, reply.text, false)
            .map_err(|_| TransitionError::StaleReply {
                task: reply.task,
                pending_id: reply.pending_id,
            })?;
        self.outstanding = None;
        self.state = match reply.task {
            TutorTask::Hint => SessionState::HintGiven,
            TutorTask::FullAnalysis => SessionState::AnalysisGiven,
        };
        debug!(state = %self.state, "tutor reply resolved");
        Ok(())
    }

    /// Drops the transcript and photo and returns to IDLE. Any request still
    /// in flight is orphaned: its reply will be rejected as stale.
    pub fn reset(&mut self) {
        self.transcript.clear();
        self.image = None;
        self.outstanding = None;
        self.state = SessionState::Idle;
        debug!("session reset");
    }

    fn begin(&mut self, task: TutorTask, pending_id: MessageId, image_jpeg: Arc<[u8]>) -> Dispatch {
        self.outstanding = Some(Outstanding { task, pending_id });
        self.state = match task {
            TutorTask::Hint => SessionState::AwaitingHint,
            TutorTask::FullAnalysis => SessionState::AwaitingAnalysis,
        };
        debug!(state = %self.state, %pending_id, "tutor request dispatched");
        Dispatch {
            task,
            pending_id,
            image_jpeg,
        }
    }

    fn not_allowed(&self, event: SessionEvent) -> TransitionError {
        TransitionError::NotAllowed {
            event,
            state: self.state,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Controls, Session, SessionEvent, SessionState, TransitionError, TutorReply};
    use crate::gateway::tests::{gateway_with, Scripted, ScriptedModel};
    use crate::gateway::TutorTask;
    use crate::locale::Language;
    use crate::session::image::tests::encoded_fixture;
    use crate::session::image::UploadedImage;
    use crate::session::{MessageKind, Role};
    use image::ImageFormat;

    fn photo() -> UploadedImage {
        let bytes = encoded_fixture(4, 4, ImageFormat::Png);
        UploadedImage::decode(&bytes).expect("fixture should decode")
    }

    fn uploaded_session() -> Session {
        let mut session = Session::new(Language::English);
        session.upload(photo()).expect("upload should be accepted");
        session
    }

    fn hinted_session(text: &str) -> Session {
        let mut session = uploaded_session();
        let dispatch = session.request_hint().expect("hint should dispatch");
        session
            .resolve(TutorReply {
                task: dispatch.task,
                pending_id: dispatch.pending_id,
                text: text.to_string(),
            })
            .expect("hint reply should resolve");
        session
    }

    fn assert_invariants(session: &Session) {
        let messages = session.transcript().messages();
        assert!(session.transcript().pending_count() <= 1);
        if let Some(first) = messages.first() {
            assert_eq!(first.kind, MessageKind::Image);
            assert_eq!(first.role, Role::Student);
        }
        assert!(messages
            .iter()
            .skip(1)
            .all(|message| message.kind == MessageKind::Text));
    }

    #[test]
    fn new_session_is_idle_and_empty() {
        let session = Session::new(Language::English);
        assert_eq!(session.state(), SessionState::Idle);
        assert!(session.transcript().is_empty());
        assert!(session.image().is_none());
        assert_eq!(
            session.controls(),
            Controls {
                upload: true,
                ..Controls::default()
            }
        );
    }

    #[test]
    fn upload_appends_single_student_image() {
        let session = uploaded_session();
        let messages = session.transcript().messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].kind, MessageKind::Image);
        assert_eq!(messages[0].role, Role::Student);
        assert_eq!(
            Some(messages[0].content.as_str()),
            session.image().map(UploadedImage::data_uri)
        );
        assert_eq!(session.state(), SessionState::Idle);
        assert!(session.controls().request_hint);
        assert!(!session.controls().upload);
    }

    #[test]
    fn second_upload_without_reset_is_rejected() {
        let mut session = uploaded_session();
        let error = session.upload(photo()).expect_err("second photo should fail");
        assert_eq!(
            error,
            TransitionError::NotAllowed {
                event: SessionEvent::Upload,
                state: SessionState::Idle,
            }
        );
        assert_eq!(session.transcript().len(), 1);
    }

    #[test]
    fn hint_request_reserves_pending_tutor_message() {
        let mut session = uploaded_session();
        let dispatch = session.request_hint().expect("hint should dispatch");

        assert_eq!(dispatch.task, TutorTask::Hint);
        assert_eq!(session.state(), SessionState::AwaitingHint);
        let pending = session
            .transcript()
            .get(dispatch.pending_id)
            .expect("placeholder should exist");
        assert!(pending.is_pending);
        assert_eq!(pending.role, Role::Tutor);
        assert_eq!(
            session.controls(),
            Controls {
                busy: true,
                ..Controls::default()
            }
        );
        assert_invariants(&session);
    }

    #[test]
    fn duplicate_hint_dispatch_is_rejected_while_awaiting() {
        let mut session = uploaded_session();
        session.request_hint().expect("hint should dispatch");
        assert!(session.request_hint().is_err());
        assert!(session.request_analysis().is_err());
        assert_eq!(session.transcript().pending_count(), 1);
    }

    #[test]
    fn hint_cannot_be_requested_without_photo() {
        let mut session = Session::new(Language::English);
        assert!(matches!(
            session.request_hint(),
            Err(TransitionError::NotAllowed {
                event: SessionEvent::RequestHint,
                ..
            })
        ));
    }

    #[test]
    fn resolved_hint_fills_placeholder_and_moves_to_hint_given() {
        let session = hinted_session("Check step 3");
        let messages = session.transcript().messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].kind, MessageKind::Text);
        assert_eq!(messages[1].role, Role::Tutor);
        assert_eq!(messages[1].content, "Check step 3");
        assert!(!messages[1].is_pending);
        assert_eq!(session.state(), SessionState::HintGiven);
        assert_eq!(
            session.controls(),
            Controls {
                request_analysis: true,
                reset: true,
                ..Controls::default()
            }
        );
    }

    #[test]
    fn analysis_requires_a_resolved_hint() {
        let mut session = uploaded_session();
        assert!(session.request_analysis().is_err());
        session.request_hint().expect("hint should dispatch");
        assert!(session.request_analysis().is_err());
    }

    #[test]
    fn analysis_appends_follow_up_then_pending_reply() {
        let mut session = hinted_session("Check step 3");
        let dispatch = session.request_analysis().expect("analysis should dispatch");
        assert_eq!(dispatch.task, TutorTask::FullAnalysis);
        assert_eq!(session.state(), SessionState::AwaitingAnalysis);

        session
            .resolve(TutorReply {
                task: TutorTask::FullAnalysis,
                pending_id: dispatch.pending_id,
                text: "Error in step 3: sign flipped".to_string(),
            })
            .expect("analysis reply should resolve");

        let messages = session.transcript().messages();
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[2].role, Role::Student);
        assert_eq!(
            messages[2].content,
            Language::English.strings().student_follow_up
        );
        assert_eq!(messages[3].role, Role::Tutor);
        assert_eq!(messages[3].content, "Error in step 3: sign flipped");
        assert!(!messages[3].is_pending);
        assert_eq!(session.state(), SessionState::AnalysisGiven);
        assert_eq!(
            session.controls(),
            Controls {
                reset: true,
                ..Controls::default()
            }
        );
        assert_invariants(&session);
    }

    #[test]
    fn follow_up_message_uses_session_language() {
        let mut session = Session::new(Language::Russian);
        session.upload(photo()).expect("upload should be accepted");
        let hint = session.request_hint().expect("hint should dispatch");
        session
            .resolve(TutorReply {
                task: TutorTask::Hint,
                pending_id: hint.pending_id,
                text: "подсказка".to_string(),
            })
            .expect("hint reply should resolve");
        session.request_analysis().expect("analysis should dispatch");
        assert_eq!(
            session.transcript().messages()[2].content,
            "Подсказка не помогла. Где ошибка?"
        );
    }

    #[test]
    fn reply_for_other_request_is_rejected_as_stale() {
        let mut session = uploaded_session();
        let dispatch = session.request_hint().expect("hint should dispatch");
        let error = session
            .resolve(TutorReply {
                task: TutorTask::FullAnalysis,
                pending_id: dispatch.pending_id,
                text: "wrong task".to_string(),
            })
            .expect_err("mismatched task should fail");
        assert!(matches!(error, TransitionError::StaleReply { .. }));
        assert_eq!(session.state(), SessionState::AwaitingHint);
        assert_eq!(session.transcript().pending_count(), 1);
    }

    #[test]
    fn reset_returns_to_empty_idle_from_every_state() {
        let mut sessions = vec![Session::new(Language::English), uploaded_session()];

        let mut awaiting_hint = uploaded_session();
        awaiting_hint.request_hint().expect("hint should dispatch");
        sessions.push(awaiting_hint);

        sessions.push(hinted_session("hint"));

        let mut awaiting_analysis = hinted_session("hint");
        awaiting_analysis
            .request_analysis()
            .expect("analysis should dispatch");
        sessions.push(awaiting_analysis);

        let mut analysed = hinted_session("hint");
        let dispatch = analysed.request_analysis().expect("analysis should dispatch");
        analysed
            .resolve(TutorReply {
                task: TutorTask::FullAnalysis,
                pending_id: dispatch.pending_id,
                text: "analysis".to_string(),
            })
            .expect("analysis should resolve");
        sessions.push(analysed);

        for mut session in sessions {
            session.reset();
            assert_eq!(session.state(), SessionState::Idle);
            assert!(session.transcript().is_empty());
            assert!(session.image().is_none());
            assert!(session.controls().upload);
        }
    }

    #[test]
    fn reply_arriving_after_reset_is_discarded() {
        let mut session = uploaded_session();
        let dispatch = session.request_hint().expect("hint should dispatch");
        session.reset();

        let error = session
            .resolve(TutorReply {
                task: dispatch.task,
                pending_id: dispatch.pending_id,
                text: "late".to_string(),
            })
            .expect_err("orphaned reply should fail");
        assert!(matches!(error, TransitionError::StaleReply { .. }));
        assert!(session.transcript().is_empty());
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[test]
    fn new_photo_is_accepted_after_reset() {
        let mut session = hinted_session("hint");
        session.reset();
        session.upload(photo()).expect("upload after reset should work");
        assert_eq!(session.transcript().len(), 1);
        assert_invariants(&session);
    }

    #[tokio::test]
    async fn gateway_failure_still_reaches_analysis_given() {
        let gateway = gateway_with(ScriptedModel::new(Scripted::Fail));
        let mut session = hinted_session("Check step 3");

        let dispatch = session.request_analysis().expect("analysis should dispatch");
        let reply = gateway.answer(dispatch).await;
        session.resolve(reply).expect("fallback reply should resolve");

        assert_eq!(session.state(), SessionState::AnalysisGiven);
        let last = session
            .transcript()
            .messages()
            .last()
            .expect("transcript should not be empty");
        assert_eq!(last.content, Language::English.strings().analysis_failed);
        assert!(!last.is_pending);
    }

    #[tokio::test]
    async fn failed_hint_still_allows_analysis_and_reset() {
        let gateway = gateway_with(ScriptedModel::new(Scripted::Empty));
        let mut session = uploaded_session();

        let dispatch = session.request_hint().expect("hint should dispatch");
        let reply = tokio::spawn(async move { gateway.answer(dispatch).await })
            .await
            .expect("gateway task should join");
        session.resolve(reply).expect("fallback reply should resolve");

        assert_eq!(session.state(), SessionState::HintGiven);
        assert_eq!(
            session.transcript().messages()[1].content,
            Language::English.strings().hint_empty
        );
        assert!(session.controls().request_analysis);
        assert!(session.controls().reset);
    }
}
