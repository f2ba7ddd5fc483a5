use crate::collaborators::types::{DialogueRequest, ScoringRequest};
use crate::session::{PromptStyle, Speaker, TestPart};

use super::client::ChatMessage;

pub(crate) fn dialogue_messages(request: &DialogueRequest) -> Vec<ChatMessage> {
    let mut messages = vec![ChatMessage::system(dialogue_instructions(request))];
    for utterance in &request.transcript {
        match utterance.speaker {
            Speaker::Examiner => messages.push(ChatMessage::assistant(&utterance.text)),
            Speaker::Candidate => messages.push(ChatMessage::user(&utterance.text)),
        }
    }
    messages
}

fn dialogue_instructions(request: &DialogueRequest) -> String {
    let style = match request.style {
        PromptStyle::Interview => {
            "Ask short, personal questions about familiar topics, one at a time."
        }
        PromptStyle::MonologueFollowUp => {
            "The candidate has given a long turn on a cue card. Ask at most one brief rounding-off question."
        }
        PromptStyle::Discussion => {
            "Ask abstract, opinion-based questions that extend the topic and probe reasoning."
        }
    };

    format!(
        "You are an IELTS speaking examiner conducting {part}. {style} \
         The candidate has answered {asked} of {total} questions and {remaining} seconds remain. \
         Briefly acknowledge the last answer, then ask the next question. \
         Never give feedback or scores. \
         Reply with a JSON object: {{\"examiner_text\": string, \"test_complete\": boolean}}. \
         Set test_complete to true only when you are closing this part.",
        part = request.part,
        asked = request.questions_asked,
        total = request.total_questions,
        remaining = request.time_remaining_secs,
    )
}

pub(crate) fn scoring_messages(request: &ScoringRequest) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(scoring_instructions(request.part)),
        ChatMessage::user(request.transcript.clone()),
    ]
}

fn scoring_instructions(part: TestPart) -> String {
    format!(
        "You are a certified IELTS speaking examiner. Assess the candidate's {part} answers \
         using the public band descriptors. Score each criterion from 0 to 9 in steps of 0.5. \
         Reply with a JSON object with keys fluency_coherence, lexical_resource, \
         grammatical_range, pronunciation (each {{\"score\": number, \"strengths\": string, \
         \"weaknesses\": string}}), recommendations (array of strings) and band_descriptor (string)."
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Utterance;

    #[test]
    fn dialogue_history_maps_speakers_to_roles() {
        let request = DialogueRequest {
            part: TestPart::Part1,
            style: PromptStyle::Interview,
            latest_candidate_text: "I'm a student.".into(),
            transcript: vec![
                Utterance::examiner("Do you work or study?"),
                Utterance::candidate("I'm a student."),
            ],
            questions_asked: 1,
            total_questions: 3,
            time_remaining_secs: 240,
        };

        let messages = dialogue_messages(&request);
        let roles: Vec<_> = messages.iter().map(|m| m.role).collect();
        assert_eq!(roles, vec!["system", "assistant", "user"]);
        assert!(messages[0].content.contains("1 of 3"));
        assert!(messages[0].content.contains("240 seconds"));
    }

    #[test]
    fn instructions_follow_the_session_style() {
        let request = DialogueRequest {
            part: TestPart::Part1,
            style: PromptStyle::Discussion,
            latest_candidate_text: "Cities are crowded.".into(),
            transcript: Vec::new(),
            questions_asked: 1,
            total_questions: 4,
            time_remaining_secs: 120,
        };

        let instructions = &dialogue_messages(&request)[0].content;
        assert!(instructions.contains("abstract, opinion-based"));
        assert!(!instructions.contains("short, personal"));
    }
}
