use serde::{Deserialize, Serialize};

pub const MIN_DIFFICULTY: u8 = 1;
pub const MAX_DIFFICULTY: u8 = 5;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    MultipleChoice,
    CodeTrace,
    CodeCompletion,
    Matching,
    TrueFalse,
}

/// One selectable answer of a question, including grading metadata that is
/// never sent to the client before submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerOption {
    pub text: String,
    #[serde(default)]
    pub correct: bool,
    #[serde(default)]
    pub explanation: Option<String>,
    #[serde(default)]
    pub common_mistake: Option<String>,
    #[serde(default)]
    pub teaching_point: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    #[serde(rename = "_id")]
    pub id: String,
    pub question_text: String,
    pub question_type: QuestionType,
    pub topic_id: String,
    /// Ordinal 1 (easiest) to 5 (hardest)
    pub difficulty: u8,
    pub answers: Vec<AnswerOption>,
    #[serde(default)]
    pub solution_steps: Vec<String>,
    #[serde(default)]
    pub code_snippet: Option<String>,
    #[serde(default)]
    pub lesson_reference: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
}

impl Question {
    /// Index of the first answer flagged correct
    pub fn correct_answer_index(&self) -> Option<usize> {
        self.answers.iter().position(|answer| answer.correct)
    }
}

/// Coarse difficulty grouping used when matching questions to mastery.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DifficultyBand {
    Easy,
    Medium,
    Hard,
}

impl DifficultyBand {
    pub fn for_difficulty(difficulty: u8) -> Self {
        match difficulty {
            0..=2 => DifficultyBand::Easy,
            3 => DifficultyBand::Medium,
            _ => DifficultyBand::Hard,
        }
    }

    pub fn contains(&self, difficulty: u8) -> bool {
        Self::for_difficulty(difficulty) == *self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerChoiceView {
    pub text: String,
}

/// Question as shown to a student: correctness and explanations stripped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionView {
    pub id: String,
    pub question_text: String,
    pub question_type: QuestionType,
    pub topic_id: String,
    pub difficulty: u8,
    pub answers: Vec<AnswerChoiceView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code_snippet: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl From<&Question> for QuestionView {
    fn from(question: &Question) -> Self {
        Self {
            id: question.id.clone(),
            question_text: question.question_text.clone(),
            question_type: question.question_type,
            topic_id: question.topic_id.clone(),
            difficulty: question.difficulty,
            answers: question
                .answers
                .iter()
                .map(|answer| AnswerChoiceView {
                    text: answer.text.clone(),
                })
                .collect(),
            code_snippet: question.code_snippet.clone(),
            image_url: question.image_url.clone(),
        }
    }
}
