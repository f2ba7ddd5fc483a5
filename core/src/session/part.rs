//! Test part catalogue and the timing/question policy attached to each part.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::SessionError;

/// One of the three structured segments of the speaking test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestPart {
    Part1,
    Part2,
    Part3,
}

/// How the examiner is expected to drive the conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptStyle {
    /// Short questions about familiar topics.
    Interview,
    /// A cue-card monologue, optionally rounded off by a follow-up.
    MonologueFollowUp,
    /// Abstract discussion building on the part 2 topic.
    Discussion,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartPolicy {
    pub duration_secs: u32,
    pub total_questions: u32,
    pub style: PromptStyle,
}

impl TestPart {
    pub const ALL: [TestPart; 3] = [TestPart::Part1, TestPart::Part2, TestPart::Part3];

    pub fn number(&self) -> u8 {
        match self {
            TestPart::Part1 => 1,
            TestPart::Part2 => 2,
            TestPart::Part3 => 3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TestPart::Part1 => "part1",
            TestPart::Part2 => "part2",
            TestPart::Part3 => "part3",
        }
    }

    pub fn default_policy(&self) -> PartPolicy {
        match self {
            TestPart::Part1 => PartPolicy {
                duration_secs: 300,
                total_questions: 3,
                style: PromptStyle::Interview,
            },
            TestPart::Part2 => PartPolicy {
                duration_secs: 180,
                total_questions: 1,
                style: PromptStyle::MonologueFollowUp,
            },
            TestPart::Part3 => PartPolicy {
                duration_secs: 300,
                total_questions: 5,
                style: PromptStyle::Discussion,
            },
        }
    }
}

impl fmt::Display for TestPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Part {}", self.number())
    }
}

impl TryFrom<u8> for TestPart {
    type Error = SessionError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(TestPart::Part1),
            2 => Ok(TestPart::Part2),
            3 => Ok(TestPart::Part3),
            other => Err(SessionError::InvalidPart(other.to_string())),
        }
    }
}

impl FromStr for TestPart {
    type Err = SessionError;

    /// Accepts `2`, `part2`, `part_2` and `Part 2` style labels.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized: String = value
            .trim()
            .to_ascii_lowercase()
            .chars()
            .filter(|c| !matches!(c, ' ' | '_' | '-'))
            .collect();
        let digits = normalized.strip_prefix("part").unwrap_or(&normalized);

        match digits.parse::<u8>() {
            Ok(number) => {
                TestPart::try_from(number).map_err(|_| SessionError::InvalidPart(value.to_string()))
            }
            Err(_) => Err(SessionError::InvalidPart(value.to_string())),
        }
    }
}

/// Per-part policies used when sessions start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartPolicyTable {
    pub part1: PartPolicy,
    pub part2: PartPolicy,
    pub part3: PartPolicy,
}

impl Default for PartPolicyTable {
    fn default() -> Self {
        Self {
            part1: TestPart::Part1.default_policy(),
            part2: TestPart::Part2.default_policy(),
            part3: TestPart::Part3.default_policy(),
        }
    }
}

impl PartPolicyTable {
    pub fn get(&self, part: TestPart) -> PartPolicy {
        match part {
            TestPart::Part1 => self.part1,
            TestPart::Part2 => self.part2,
            TestPart::Part3 => self.part3,
        }
    }

    pub fn with_policy(mut self, part: TestPart, policy: PartPolicy) -> Self {
        match part {
            TestPart::Part1 => self.part1 = policy,
            TestPart::Part2 => self.part2 = policy,
            TestPart::Part3 => self.part3 = policy,
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_common_labels() {
        assert_eq!("1".parse::<TestPart>().unwrap(), TestPart::Part1);
        assert_eq!("part2".parse::<TestPart>().unwrap(), TestPart::Part2);
        assert_eq!("Part 3".parse::<TestPart>().unwrap(), TestPart::Part3);
        assert_eq!("part_2".parse::<TestPart>().unwrap(), TestPart::Part2);
    }

    #[test]
    fn rejects_unknown_parts() {
        assert_eq!(
            "part4".parse::<TestPart>(),
            Err(SessionError::InvalidPart("part4".into()))
        );
        assert!(matches!(
            "speaking".parse::<TestPart>(),
            Err(SessionError::InvalidPart(_))
        ));
        assert_eq!(
            TestPart::try_from(0),
            Err(SessionError::InvalidPart("0".into()))
        );
    }

    #[test]
    fn part_two_is_a_single_question() {
        let policy = TestPart::Part2.default_policy();
        assert_eq!(policy.total_questions, 1);
        assert_eq!(policy.style, PromptStyle::MonologueFollowUp);
        assert!(TestPart::Part1.default_policy().total_questions > 1);
        assert!(TestPart::Part3.default_policy().total_questions > 1);
    }

    #[test]
    fn policy_table_overrides_single_part() {
        let short = PartPolicy {
            duration_secs: 3,
            total_questions: 2,
            style: PromptStyle::Interview,
        };
        let table = PartPolicyTable::default().with_policy(TestPart::Part1, short);
        assert_eq!(table.get(TestPart::Part1), short);
        assert_eq!(table.get(TestPart::Part3), TestPart::Part3.default_policy());
    }
}
