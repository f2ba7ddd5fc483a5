//! Test-session state machine.
//!
//! Every transition is a plain method on [`SessionState`] that mutates the
//! aggregate and returns the side effects the runtime has to carry out. The
//! machine itself never awaits, so ordering and idempotency can be checked
//! without a runtime.

use std::sync::Arc;
use std::time::SystemTime;

use tracing::debug;

use crate::collaborators::{CollaboratorError, DialogueReply, DialogueRequest, ScoringRequest};

use super::error::SessionError;
use super::part::{PartPolicy, TestPart};
use super::types::{
    CompletionReason, Evaluation, Finalization, SessionPhase, SessionSnapshot, Speaker, Utterance,
};

pub const DEFAULT_ACKNOWLEDGEMENT: &str = "Thank you. Let's move on to the next question.";

/// Work the runtime performs on behalf of a transition.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Play an examiner utterance that was just appended.
    Speak { text: String },
    RequestDialogue {
        generation: u64,
        request: DialogueRequest,
    },
    RequestScoring {
        generation: u64,
        request: ScoringRequest,
    },
    Completed { reason: CompletionReason },
    /// Drop every in-flight collaborator call.
    CancelPending,
}

#[derive(Debug, Clone)]
pub struct SessionState {
    session_id: String,
    part: TestPart,
    policy: PartPolicy,
    phase: SessionPhase,
    started_at: Option<SystemTime>,
    time_remaining_secs: u32,
    questions_asked: u32,
    total_questions: u32,
    transcript: Vec<Utterance>,
    completion: Option<CompletionReason>,
    finalization: Finalization,
    acknowledgement: String,
    generation: u64,
    pending_dialogue: Option<u64>,
    pending_scoring: Option<u64>,
}

impl SessionState {
    pub fn new<S: Into<String>>(session_id: S, part: TestPart, policy: PartPolicy) -> Self {
        Self {
            session_id: session_id.into(),
            part,
            policy,
            phase: SessionPhase::NotStarted,
            started_at: None,
            time_remaining_secs: policy.duration_secs,
            questions_asked: 0,
            total_questions: policy.total_questions,
            transcript: Vec::new(),
            completion: None,
            finalization: Finalization::NotStarted,
            acknowledgement: DEFAULT_ACKNOWLEDGEMENT.to_string(),
            generation: 0,
            pending_dialogue: None,
            pending_scoring: None,
        }
    }

    /// Overrides the utterance used when the dialogue service fails.
    pub fn with_acknowledgement<S: Into<String>>(mut self, acknowledgement: S) -> Self {
        self.acknowledgement = acknowledgement.into();
        self
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn part(&self) -> TestPart {
        self.part
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn time_remaining_secs(&self) -> u32 {
        self.time_remaining_secs
    }

    pub fn questions_asked(&self) -> u32 {
        self.questions_asked
    }

    pub fn total_questions(&self) -> u32 {
        self.total_questions
    }

    pub fn transcript(&self) -> &[Utterance] {
        &self.transcript
    }

    pub fn completion(&self) -> Option<CompletionReason> {
        self.completion
    }

    pub fn finalization(&self) -> &Finalization {
        &self.finalization
    }

    pub fn evaluation(&self) -> Option<&Arc<Evaluation>> {
        self.finalization.evaluation()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            session_id: self.session_id.clone(),
            part: self.part,
            phase: self.phase,
            started_at: self.started_at,
            time_remaining_secs: self.time_remaining_secs,
            questions_asked: self.questions_asked,
            total_questions: self.total_questions,
            transcript: self.transcript.clone(),
            completion: self.completion,
            finalization: self.finalization.clone(),
        }
    }

    /// Opens the session with the examiner's greeting and first question.
    pub fn start<S: Into<String>>(&mut self, opening: S) -> Result<Vec<Effect>, SessionError> {
        if self.phase != SessionPhase::NotStarted {
            return Err(SessionError::invalid_state("start", self.phase.as_str()));
        }

        let opening = opening.into();
        self.started_at = Some(SystemTime::now());
        self.time_remaining_secs = self.policy.duration_secs;
        self.total_questions = self.policy.total_questions;
        self.transcript.push(Utterance::examiner(opening.clone()));
        self.phase = SessionPhase::AwaitingCandidate;

        let mut effects = vec![Effect::Speak { text: opening }];
        if self.total_questions == 0 {
            effects.extend(self.complete(CompletionReason::QuestionsExhausted));
        } else if self.time_remaining_secs == 0 {
            effects.extend(self.complete(CompletionReason::TimeExpired));
        }
        Ok(effects)
    }

    /// One second of test time. No-op unless the session is in progress.
    pub fn tick(&mut self) -> Vec<Effect> {
        if !self.phase.is_in_progress() {
            return Vec::new();
        }

        self.time_remaining_secs = self.time_remaining_secs.saturating_sub(1);
        if self.time_remaining_secs == 0 {
            return self.complete(CompletionReason::TimeExpired);
        }
        Vec::new()
    }

    pub fn record_candidate_utterance<S: Into<String>>(
        &mut self,
        text: S,
    ) -> Result<Vec<Effect>, SessionError> {
        if self.phase != SessionPhase::AwaitingCandidate {
            return Err(SessionError::invalid_state(
                "record a candidate utterance",
                self.phase.as_str(),
            ));
        }

        let text = text.into();
        self.transcript.push(Utterance::candidate(text.clone()));
        self.questions_asked = (self.questions_asked + 1).min(self.total_questions);

        if self.questions_asked >= self.total_questions {
            return Ok(self.complete(CompletionReason::QuestionsExhausted));
        }
        if self.time_remaining_secs == 0 {
            return Ok(self.complete(CompletionReason::TimeExpired));
        }

        self.phase = SessionPhase::AwaitingExaminer;
        let generation = self.next_generation();
        self.pending_dialogue = Some(generation);

        Ok(vec![Effect::RequestDialogue {
            generation,
            request: DialogueRequest {
                part: self.part,
                style: self.policy.style,
                latest_candidate_text: text,
                transcript: self.transcript.clone(),
                questions_asked: self.questions_asked,
                total_questions: self.total_questions,
                time_remaining_secs: self.time_remaining_secs,
            },
        }])
    }

    pub fn record_examiner_utterance<S: Into<String>>(
        &mut self,
        text: S,
        test_complete: bool,
    ) -> Result<Vec<Effect>, SessionError> {
        if self.phase != SessionPhase::AwaitingExaminer {
            return Err(SessionError::invalid_state(
                "record an examiner utterance",
                self.phase.as_str(),
            ));
        }

        let text = text.into();
        self.pending_dialogue = None;
        let mut effects = Vec::new();
        if !text.trim().is_empty() {
            self.transcript.push(Utterance::examiner(text.clone()));
            effects.push(Effect::Speak { text });
        }

        if test_complete {
            effects.extend(self.complete(CompletionReason::ExaminerConcluded));
        } else {
            self.phase = SessionPhase::AwaitingCandidate;
        }
        Ok(effects)
    }

    /// Applies the dialogue service's answer for the request tagged `generation`.
    ///
    /// Stale answers are dropped. A failed call is replaced by the generic
    /// acknowledgement so the candidate can keep talking.
    pub fn apply_dialogue_reply(
        &mut self,
        generation: u64,
        result: Result<DialogueReply, CollaboratorError>,
    ) -> Vec<Effect> {
        if !self.awaits_dialogue(generation) {
            debug!(
                target: "session_machine",
                session_id = %self.session_id,
                generation,
                phase = self.phase.as_str(),
                "discarding stale dialogue reply"
            );
            return Vec::new();
        }

        let (text, test_complete) = match result {
            Ok(reply) => (reply.examiner_text, reply.test_complete),
            Err(_) => (self.acknowledgement.clone(), false),
        };

        self.record_examiner_utterance(text, test_complete)
            .unwrap_or_default()
    }

    pub(crate) fn awaits_dialogue(&self, generation: u64) -> bool {
        self.phase == SessionPhase::AwaitingExaminer && self.pending_dialogue == Some(generation)
    }

    /// Requests scoring once per session. Later calls return no effects.
    pub fn finalize(&mut self) -> Result<Vec<Effect>, SessionError> {
        if self.phase != SessionPhase::Completed {
            return Err(SessionError::invalid_state("finalize", self.phase.as_str()));
        }
        if self.finalization != Finalization::NotStarted {
            return Ok(Vec::new());
        }

        let transcript = self.combined_candidate_text();
        if transcript.is_empty() {
            self.finalization = Finalization::Skipped;
            return Ok(Vec::new());
        }

        let generation = self.next_generation();
        self.pending_scoring = Some(generation);
        self.finalization = Finalization::Pending;
        Ok(vec![Effect::RequestScoring {
            generation,
            request: ScoringRequest {
                transcript,
                part: self.part,
            },
        }])
    }

    /// Stores the scoring outcome. Returns false when the result was stale.
    pub fn apply_scoring_result(
        &mut self,
        generation: u64,
        result: Result<Evaluation, CollaboratorError>,
    ) -> bool {
        if self.pending_scoring != Some(generation) || self.finalization != Finalization::Pending {
            return false;
        }

        self.pending_scoring = None;
        self.finalization = match result {
            Ok(evaluation) => Finalization::Scored(Arc::new(evaluation)),
            Err(err) => Finalization::Failed(err.into()),
        };
        true
    }

    /// Ends the session without scoring and invalidates in-flight calls.
    pub fn abort(&mut self) -> Result<Vec<Effect>, SessionError> {
        if self.phase == SessionPhase::Completed {
            return Err(SessionError::invalid_state("abort", self.phase.as_str()));
        }

        self.phase = SessionPhase::Completed;
        self.completion = Some(CompletionReason::Aborted);
        self.finalization = Finalization::Cancelled;
        self.next_generation();
        self.pending_dialogue = None;
        self.pending_scoring = None;

        Ok(vec![
            Effect::CancelPending,
            Effect::Completed {
                reason: CompletionReason::Aborted,
            },
        ])
    }

    fn complete(&mut self, reason: CompletionReason) -> Vec<Effect> {
        self.phase = SessionPhase::Completed;
        self.completion = Some(reason);
        self.pending_dialogue = None;

        let mut effects = vec![Effect::Completed { reason }];
        effects.extend(self.finalize().unwrap_or_default());
        effects
    }

    fn combined_candidate_text(&self) -> String {
        self.transcript
            .iter()
            .filter(|utterance| utterance.speaker == Speaker::Candidate)
            .map(|utterance| utterance.text.trim())
            .filter(|text| !text.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn next_generation(&mut self) -> u64 {
        self.generation = self.generation.wrapping_add(1);
        self.generation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::CollaboratorKind;
    use crate::session::types::CriterionFeedback;
    use crate::session::PromptStyle;

    fn started(part: TestPart) -> SessionState {
        let mut state = SessionState::new("session", part, part.default_policy());
        state.start("Hello. First question?").expect("start");
        state
    }

    fn with_policy(duration_secs: u32, total_questions: u32) -> SessionState {
        let policy = PartPolicy {
            duration_secs,
            total_questions,
            style: PromptStyle::Interview,
        };
        let mut state = SessionState::new("session", TestPart::Part1, policy);
        state.start("Hello.").expect("start");
        state
    }

    fn evaluation() -> Evaluation {
        let criterion = || CriterionFeedback {
            band: 6.0,
            strengths: String::new(),
            weaknesses: String::new(),
        };
        Evaluation::from_criteria(
            criterion(),
            criterion(),
            criterion(),
            criterion(),
            Vec::new(),
            "Competent user",
        )
        .expect("evaluation")
    }

    fn dialogue_generation(effects: &[Effect]) -> u64 {
        effects
            .iter()
            .find_map(|effect| match effect {
                Effect::RequestDialogue { generation, .. } => Some(*generation),
                _ => None,
            })
            .expect("dialogue request")
    }

    fn scoring_requests(effects: &[Effect]) -> Vec<(u64, ScoringRequest)> {
        effects
            .iter()
            .filter_map(|effect| match effect {
                Effect::RequestScoring {
                    generation,
                    request,
                } => Some((*generation, request.clone())),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn start_opens_with_examiner_utterance() {
        let mut state = SessionState::new("s", TestPart::Part3, TestPart::Part3.default_policy());
        let effects = state.start("Let's discuss.").expect("start");

        assert_eq!(state.phase(), SessionPhase::AwaitingCandidate);
        assert_eq!(state.total_questions(), 5);
        assert_eq!(state.time_remaining_secs(), 300);
        assert_eq!(state.transcript().len(), 1);
        assert_eq!(state.transcript()[0].speaker, Speaker::Examiner);
        assert_eq!(
            effects,
            vec![Effect::Speak {
                text: "Let's discuss.".into()
            }]
        );
        assert!(matches!(
            state.start("again"),
            Err(SessionError::InvalidState { .. })
        ));
    }

    #[test]
    fn part_two_single_answer_completes_and_scores_once() {
        let mut state = started(TestPart::Part2);
        let effects = state
            .record_candidate_utterance("I recently read a novel about a lighthouse keeper.")
            .expect("record");

        assert_eq!(state.phase(), SessionPhase::Completed);
        assert_eq!(
            state.completion(),
            Some(CompletionReason::QuestionsExhausted)
        );
        let requests = scoring_requests(&effects);
        assert_eq!(requests.len(), 1);
        assert_eq!(
            requests[0].1.transcript,
            "I recently read a novel about a lighthouse keeper."
        );
        assert_eq!(requests[0].1.part, TestPart::Part2);
        assert_eq!(state.finalization(), &Finalization::Pending);
        assert!(!effects
            .iter()
            .any(|effect| matches!(effect, Effect::RequestDialogue { .. })));
    }

    #[test]
    fn timer_expiry_without_answers_skips_scoring() {
        let mut state = with_policy(3, 3);
        let mut effects = Vec::new();
        for _ in 0..3 {
            effects.extend(state.tick());
        }

        assert_eq!(state.phase(), SessionPhase::Completed);
        assert_eq!(state.completion(), Some(CompletionReason::TimeExpired));
        assert_eq!(state.questions_asked(), 0);
        assert_eq!(state.time_remaining_secs(), 0);
        assert_eq!(state.finalization(), &Finalization::Skipped);
        assert!(scoring_requests(&effects).is_empty());

        // repeated delivery at zero stays a no-op
        assert!(state.tick().is_empty());
        assert!(state.tick().is_empty());
        assert_eq!(state.time_remaining_secs(), 0);
    }

    #[test]
    fn time_expiry_completes_regardless_of_remaining_questions() {
        let mut state = with_policy(2, 5);
        let generation = dialogue_generation(
            &state
                .record_candidate_utterance("My hometown is by the sea.")
                .expect("record"),
        );
        state.tick();
        let effects = state.tick();

        assert_eq!(state.phase(), SessionPhase::Completed);
        assert_eq!(state.questions_asked(), 1);
        assert_eq!(scoring_requests(&effects).len(), 1);

        // the outstanding dialogue answer can no longer reopen the session
        let late = state.apply_dialogue_reply(generation, Ok(DialogueReply::next("Why?")));
        assert!(late.is_empty());
        assert_eq!(state.phase(), SessionPhase::Completed);
    }

    #[test]
    fn candidate_utterance_outside_awaiting_candidate_is_rejected() {
        let mut state = SessionState::new("s", TestPart::Part1, TestPart::Part1.default_policy());
        assert!(matches!(
            state.record_candidate_utterance("too early"),
            Err(SessionError::InvalidState { .. })
        ));
        assert!(state.transcript().is_empty());

        state.start("Hello.").expect("start");
        state.record_candidate_utterance("first").expect("record");
        let before = state.transcript().to_vec();

        let err = state.record_candidate_utterance("double submit").unwrap_err();
        assert_eq!(
            err,
            SessionError::InvalidState {
                operation: "record a candidate utterance",
                phase: "awaiting_examiner",
            }
        );
        assert_eq!(state.transcript(), before.as_slice());
        assert_eq!(state.questions_asked(), 1);
    }

    #[test]
    fn dialogue_request_carries_policy_style() {
        let policy = PartPolicy {
            duration_secs: 120,
            total_questions: 4,
            style: PromptStyle::Discussion,
        };
        let mut state = SessionState::new("s", TestPart::Part1, policy);
        state.start("Hello.").expect("start");

        let effects = state.record_candidate_utterance("answer").expect("record");
        let style = effects.iter().find_map(|effect| match effect {
            Effect::RequestDialogue { request, .. } => Some(request.style),
            _ => None,
        });
        assert_eq!(style, Some(PromptStyle::Discussion));
    }

    #[test]
    fn dialogue_failure_falls_back_without_counting_a_question() {
        let mut state = started(TestPart::Part3);
        let first = dialogue_generation(&state.record_candidate_utterance("one").expect("record"));
        state.apply_dialogue_reply(first, Ok(DialogueReply::next("Second question?")));

        let second = dialogue_generation(&state.record_candidate_utterance("two").expect("record"));
        let effects = state.apply_dialogue_reply(
            second,
            Err(CollaboratorError::service(
                CollaboratorKind::Dialogue,
                "timeout",
            )),
        );

        assert_eq!(state.phase(), SessionPhase::AwaitingCandidate);
        assert_eq!(state.questions_asked(), 2);
        assert_eq!(
            effects,
            vec![Effect::Speak {
                text: DEFAULT_ACKNOWLEDGEMENT.into()
            }]
        );
        let last = state.transcript().last().expect("utterance");
        assert_eq!(last.speaker, Speaker::Examiner);
        assert_eq!(last.text, DEFAULT_ACKNOWLEDGEMENT);

        state.record_candidate_utterance("three").expect("accepted");
        assert_eq!(state.questions_asked(), 3);
    }

    #[test]
    fn custom_acknowledgement_is_used_for_fallback() {
        let mut state = SessionState::new("s", TestPart::Part1, TestPart::Part1.default_policy())
            .with_acknowledgement("Alright.");
        state.start("Hello.").expect("start");
        let generation =
            dialogue_generation(&state.record_candidate_utterance("answer").expect("record"));
        state.apply_dialogue_reply(
            generation,
            Err(CollaboratorError::service(CollaboratorKind::Dialogue, "down")),
        );
        assert_eq!(state.transcript().last().map(|u| u.text.as_str()), Some("Alright."));
    }

    #[test]
    fn examiner_conclusion_finalizes() {
        let mut state = started(TestPart::Part1);
        let generation =
            dialogue_generation(&state.record_candidate_utterance("I study law.").expect("record"));
        let effects = state.apply_dialogue_reply(
            generation,
            Ok(DialogueReply::concluding("Thank you, that's the end of part one.")),
        );

        assert_eq!(state.phase(), SessionPhase::Completed);
        assert_eq!(state.completion(), Some(CompletionReason::ExaminerConcluded));
        assert!(matches!(effects[0], Effect::Speak { .. }));
        assert_eq!(scoring_requests(&effects).len(), 1);
        assert_eq!(state.transcript().len(), 3);
    }

    #[test]
    fn finalize_is_idempotent_and_keeps_the_same_evaluation() {
        let mut state = started(TestPart::Part2);
        let effects = state.record_candidate_utterance("My answer.").expect("record");
        let (generation, _) = scoring_requests(&effects).remove(0);

        assert!(state.finalize().expect("finalize").is_empty());
        assert!(state.apply_scoring_result(generation, Ok(evaluation())));
        let first = Arc::clone(state.evaluation().expect("scored"));

        assert!(state.finalize().expect("finalize").is_empty());
        assert!(!state.apply_scoring_result(generation, Ok(evaluation())));
        let second = state.evaluation().expect("scored");
        assert!(Arc::ptr_eq(&first, second));
    }

    #[test]
    fn finalize_before_completion_is_invalid() {
        let mut state = started(TestPart::Part1);
        assert!(matches!(
            state.finalize(),
            Err(SessionError::InvalidState { .. })
        ));
        assert_eq!(state.finalization(), &Finalization::NotStarted);
    }

    #[test]
    fn scoring_failure_is_recorded_not_fatal() {
        let mut state = started(TestPart::Part2);
        let effects = state.record_candidate_utterance("Answer.").expect("record");
        let (generation, _) = scoring_requests(&effects).remove(0);

        state.apply_scoring_result(
            generation,
            Err(CollaboratorError::scoring_parse("missing pronunciation")),
        );
        assert_eq!(state.phase(), SessionPhase::Completed);
        assert_eq!(
            state.finalization(),
            &Finalization::Failed(SessionError::ScoringParse("missing pronunciation".into()))
        );
        assert!(state.evaluation().is_none());
    }

    #[test]
    fn abort_discards_late_dialogue_reply() {
        let mut state = started(TestPart::Part1);
        let generation =
            dialogue_generation(&state.record_candidate_utterance("answer").expect("record"));

        let effects = state.abort().expect("abort");
        assert!(effects.contains(&Effect::CancelPending));
        assert_eq!(state.completion(), Some(CompletionReason::Aborted));
        assert_eq!(state.finalization(), &Finalization::Cancelled);

        let late = state.apply_dialogue_reply(generation, Ok(DialogueReply::next("Next?")));
        assert!(late.is_empty());
        assert_eq!(state.phase(), SessionPhase::Completed);
        assert_eq!(state.transcript().len(), 2);
        assert!(state.finalize().expect("finalize").is_empty());
        assert!(matches!(state.abort(), Err(SessionError::InvalidState { .. })));
    }

    #[test]
    fn counters_respect_their_bounds() {
        let mut state = with_policy(4, 2);
        let generation =
            dialogue_generation(&state.record_candidate_utterance("a").expect("record"));
        state.apply_dialogue_reply(generation, Ok(DialogueReply::next("b?")));
        state.record_candidate_utterance("b").expect("record");

        assert_eq!(state.questions_asked(), state.total_questions());
        for _ in 0..10 {
            state.tick();
        }
        assert!(state.questions_asked() <= state.total_questions());
        assert_eq!(state.time_remaining_secs(), 4);
        assert!(state.record_candidate_utterance("c").is_err());
    }
}
