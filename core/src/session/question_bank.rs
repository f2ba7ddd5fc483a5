//! Question catalogue used for opening prompts and offline follow-ups.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use rand::seq::SliceRandom;

use super::part::TestPart;

const FALLBACK_QUESTION: &str = "Could you tell me a little more about yourself?";

/// Source of examiner prompts, selectable per test part.
pub trait QuestionBank: Send + Sync {
    /// Returns one question for `part`.
    fn pick(&self, part: TestPart) -> String;

    fn greeting(&self, part: TestPart) -> String {
        match part {
            TestPart::Part1 => {
                "Good morning. My name is Sarah and I will be your examiner today. In this first part I'd like to ask you some questions about yourself.".into()
            }
            TestPart::Part2 => {
                "Now I'm going to give you a topic and I'd like you to talk about it for one to two minutes. You have one minute to think about what you are going to say.".into()
            }
            TestPart::Part3 => {
                "We've been talking about a particular topic, and now I'd like to discuss with you some more general questions related to it.".into()
            }
        }
    }

    /// Greeting followed by the first question.
    fn opening(&self, part: TestPart) -> String {
        format!("{} {}", self.greeting(part), self.pick(part))
    }
}

/// Static prompt lists with uniformly random selection.
#[derive(Debug, Clone)]
pub struct StaticQuestionBank {
    questions: HashMap<TestPart, Vec<String>>,
}

impl StaticQuestionBank {
    pub fn new(questions: HashMap<TestPart, Vec<String>>) -> Self {
        Self { questions }
    }

    pub fn questions(&self, part: TestPart) -> &[String] {
        self.questions
            .get(&part)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

impl Default for StaticQuestionBank {
    fn default() -> Self {
        let mut questions = HashMap::new();
        questions.insert(
            TestPart::Part1,
            to_owned(&[
                "Do you work or are you a student?",
                "Let's talk about your hometown. What do you like most about it?",
                "How do you usually spend your weekends?",
                "Do you enjoy cooking? Why or why not?",
                "What kind of music do you like to listen to?",
                "Do you prefer reading books or watching films?",
            ]),
        );
        questions.insert(
            TestPart::Part2,
            to_owned(&[
                "Describe a book you have recently read. You should say what the book was, why you chose it, what it was about, and explain whether you would recommend it.",
                "Describe a place you visited that left a strong impression on you. You should say where it was, when you went there, what you did there, and explain why it was memorable.",
                "Describe a person who has influenced you. You should say who this person is, how you know them, what they have done, and explain why they influenced you.",
                "Describe a skill you would like to learn. You should say what it is, why you want to learn it, how you would learn it, and explain how it would help you.",
            ]),
        );
        questions.insert(
            TestPart::Part3,
            to_owned(&[
                "Why do you think some people read less than they used to?",
                "How has technology changed the way people communicate?",
                "Should governments invest more in public transport than in roads?",
                "What are the advantages of learning skills from older generations?",
                "Do you think tourism does more good than harm to local communities?",
            ]),
        );
        Self::new(questions)
    }
}

impl QuestionBank for StaticQuestionBank {
    fn pick(&self, part: TestPart) -> String {
        let mut rng = rand::thread_rng();
        self.questions(part)
            .choose(&mut rng)
            .cloned()
            .unwrap_or_else(|| FALLBACK_QUESTION.to_string())
    }
}

/// Deterministic bank that walks its list in order and wraps around.
#[derive(Debug, Default)]
pub struct SequentialQuestionBank {
    questions: Vec<String>,
    cursor: AtomicUsize,
}

impl SequentialQuestionBank {
    pub fn new<I, S>(questions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            questions: questions.into_iter().map(Into::into).collect(),
            cursor: AtomicUsize::new(0),
        }
    }
}

impl QuestionBank for SequentialQuestionBank {
    fn pick(&self, _part: TestPart) -> String {
        if self.questions.is_empty() {
            return FALLBACK_QUESTION.to_string();
        }
        let index = self.cursor.fetch_add(1, Ordering::SeqCst) % self.questions.len();
        self.questions[index].clone()
    }
}

fn to_owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|item| item.to_string()).collect()
}
