// chapter, section and user records
// inputs (New*/…Update) are validated here before they reach the store

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::Error;

pub const DEFAULT_TIME_LIMIT: u32 = 30;
pub const DEFAULT_PASSING_SCORE: u8 = 70;

/// Author hint for how a practice answer should be shown. A hint, not a rule:
/// the classifier still decides prose vs code.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnswerKind {
    #[default]
    Text,
    Code,
    Image,
    Mixed,
}

impl FromStr for AnswerKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(AnswerKind::Text),
            "code" => Ok(AnswerKind::Code),
            "image" => Ok(AnswerKind::Image),
            "mixed" => Ok(AnswerKind::Mixed),
            other => Err(format!("unknown answer kind: {other} (text, code, image, mixed)")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    User,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::User => "user",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "user" => Ok(Role::User),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chapter {
    pub id: String,
    pub title: String,
    pub description: String,
    pub order: i64,
    pub tutorials: Vec<Tutorial>,
    pub practice_sections: Vec<PracticeSection>,
    pub exam_sections: Vec<ExamSection>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Chapter {
    pub fn content_count(&self) -> usize {
        self.tutorials.len() + self.practice_sections.len() + self.exam_sections.len()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewChapter {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub order: i64,
}

impl NewChapter {
    pub fn validate(self) -> Result<Self, Error> {
        let title = required(self.title, "chapter title")?;
        Ok(Self {
            title,
            description: self.description.trim().to_string(),
            order: self.order,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChapterUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub order: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tutorial {
    pub id: String,
    pub title: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
    #[serde(default)]
    pub links: Vec<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTutorial {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub video_url: Option<String>,
    #[serde(default)]
    pub links: Vec<String>,
}

impl NewTutorial {
    pub fn validate(self) -> Result<Self, Error> {
        Ok(Self {
            title: required(self.title, "tutorial title")?,
            description: self.description.trim().to_string(),
            video_url: optional(self.video_url),
            // blank link rows are left over from the editor
            links: self
                .links
                .into_iter()
                .map(|l| l.trim().to_string())
                .filter(|l| !l.is_empty())
                .collect(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PracticeSection {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default)]
    pub questions: Vec<String>,
    #[serde(default)]
    pub answers: Vec<String>,
    #[serde(default)]
    pub answer_type: AnswerKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer_image_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl PracticeSection {
    /// The answer that gets rendered; later entries are kept but never shown.
    pub fn primary_answer(&self) -> Option<&str> {
        self.answers
            .first()
            .map(String::as_str)
            .filter(|a| !a.is_empty())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPractice {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub questions: Vec<String>,
    #[serde(default)]
    pub answers: Vec<String>,
    #[serde(default)]
    pub answer_type: AnswerKind,
    #[serde(default)]
    pub answer_image_url: Option<String>,
}

impl NewPractice {
    pub fn validate(self) -> Result<Self, Error> {
        let title = optional(self.title);
        let description = optional(self.description);
        let image_url = optional(self.image_url);
        let answer_image_url = optional(self.answer_image_url);

        if title.is_none() && description.is_none() && image_url.is_none() {
            return Err(Error::Validation(
                "provide at least one of: title, description, or image".into(),
            ));
        }

        let has_answer = self.answers.first().is_some_and(|a| !a.trim().is_empty());
        match self.answer_type {
            AnswerKind::Text | AnswerKind::Code if !has_answer => {
                return Err(Error::Validation("an answer is required".into()));
            }
            AnswerKind::Image if answer_image_url.is_none() => {
                return Err(Error::Validation("an answer image is required".into()));
            }
            AnswerKind::Mixed if !has_answer && answer_image_url.is_none() => {
                return Err(Error::Validation(
                    "provide either a text/code answer or an answer image".into(),
                ));
            }
            _ => {}
        }

        Ok(Self {
            title,
            description,
            image_url,
            questions: self.questions,
            // answers are stored verbatim, indentation matters for code
            answers: self.answers,
            answer_type: self.answer_type,
            answer_image_url,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamSection {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub questions: Vec<String>,
    pub options: Vec<Vec<String>>,
    pub correct_answers: Vec<usize>,
    /// Minutes.
    pub time_limit: u32,
    /// Percent needed to pass.
    pub passing_score: u8,
    pub created_at: DateTime<Utc>,
}

impl ExamSection {
    fn check(&self) -> Result<(), Error> {
        check_exam(
            &self.questions,
            &self.options,
            &self.correct_answers,
            self.passing_score,
        )
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewExam {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub questions: Vec<String>,
    pub options: Vec<Vec<String>>,
    pub correct_answers: Vec<usize>,
    #[serde(default = "default_time_limit")]
    pub time_limit: u32,
    #[serde(default = "default_passing_score")]
    pub passing_score: u8,
}

fn default_time_limit() -> u32 {
    DEFAULT_TIME_LIMIT
}

fn default_passing_score() -> u8 {
    DEFAULT_PASSING_SCORE
}

impl NewExam {
    pub fn validate(self) -> Result<Self, Error> {
        let mut questions = self.questions;
        let mut options = self.options;
        let mut correct_answers = self.correct_answers;
        drop_blank_questions(&mut questions, &mut options, &mut correct_answers)?;

        check_exam(&questions, &options, &correct_answers, self.passing_score)?;

        Ok(Self {
            title: required(self.title, "exam title")?,
            description: self.description.trim().to_string(),
            questions,
            options,
            correct_answers,
            time_limit: self.time_limit,
            passing_score: self.passing_score,
        })
    }
}

/// Partial exam edit; unset fields keep their stored value.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub questions: Option<Vec<String>>,
    pub options: Option<Vec<Vec<String>>>,
    pub correct_answers: Option<Vec<usize>>,
    pub time_limit: Option<u32>,
    pub passing_score: Option<u8>,
}

impl ExamUpdate {
    pub fn apply(self, exam: &mut ExamSection) -> Result<(), Error> {
        let mut merged = exam.clone();
        if let Some(title) = self.title {
            merged.title = required(title, "exam title")?;
        }
        if let Some(description) = self.description {
            merged.description = description.trim().to_string();
        }
        if let Some(questions) = self.questions {
            merged.questions = questions;
        }
        if let Some(options) = self.options {
            merged.options = options;
        }
        if let Some(correct) = self.correct_answers {
            merged.correct_answers = correct;
        }
        if let Some(limit) = self.time_limit {
            merged.time_limit = limit;
        }
        if let Some(score) = self.passing_score {
            merged.passing_score = score;
        }

        drop_blank_questions(
            &mut merged.questions,
            &mut merged.options,
            &mut merged.correct_answers,
        )?;
        merged.check()?;
        *exam = merged;
        Ok(())
    }
}

// blank questions go together with their options and correct answer
fn drop_blank_questions(
    questions: &mut Vec<String>,
    options: &mut Vec<Vec<String>>,
    correct: &mut Vec<usize>,
) -> Result<(), Error> {
    if options.len() != questions.len() || correct.len() != questions.len() {
        return Err(Error::Validation(
            "questions, options and correct answers must line up".into(),
        ));
    }

    let keep: Vec<bool> = questions.iter().map(|q| !q.trim().is_empty()).collect();
    let mut flags = keep.iter().copied();
    questions.retain(|_| flags.next().unwrap_or(false));
    let mut flags = keep.iter().copied();
    options.retain(|_| flags.next().unwrap_or(false));
    let mut flags = keep.iter().copied();
    correct.retain(|_| flags.next().unwrap_or(false));
    Ok(())
}

fn check_exam(
    questions: &[String],
    options: &[Vec<String>],
    correct: &[usize],
    passing_score: u8,
) -> Result<(), Error> {
    if questions.is_empty() {
        return Err(Error::Validation("an exam needs at least one question".into()));
    }
    if options.len() != questions.len() || correct.len() != questions.len() {
        return Err(Error::Validation(
            "questions, options and correct answers must line up".into(),
        ));
    }
    for (i, (opts, answer)) in options.iter().zip(correct).enumerate() {
        if *answer >= opts.len() {
            return Err(Error::Validation(format!(
                "question {} has no option {answer}",
                i + 1
            )));
        }
    }
    if passing_score > 100 {
        return Err(Error::Validation("passing score is a percentage".into()));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub uid: String,
    pub email: String,
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_image: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_login: Option<DateTime<Utc>>,
}

impl UserRecord {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// What the auth provider hands us at sign-in.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub uid: String,
    pub email: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

impl Identity {
    pub fn new(uid: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            email: email.into(),
            display_name: None,
        }
    }
}

/// Profile edit. An absent image leaves it as is, an explicit `null` clears it.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default, deserialize_with = "present")]
    pub profile_image: Option<Option<String>>,
}

// a field that is present deserializes to Some, even when it is null
fn present<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.display_name.is_none() && self.profile_image.is_none()
    }
}

fn required(value: String, what: &str) -> Result<String, Error> {
    let value = value.trim();
    if value.is_empty() {
        return Err(Error::Validation(format!("{what} is required")));
    }
    Ok(value.to_string())
}

fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn practice(kind: AnswerKind) -> NewPractice {
        NewPractice {
            title: Some("Loops".into()),
            description: None,
            image_url: None,
            questions: vec![],
            answers: vec![],
            answer_type: kind,
            answer_image_url: None,
        }
    }

    #[test]
    fn practice_needs_a_prompt() {
        let mut p = practice(AnswerKind::Text);
        p.title = Some("   ".into());
        p.answers = vec!["42".into()];
        assert!(matches!(p.validate(), Err(Error::Validation(_))));
    }

    #[test]
    fn answer_requirements_follow_kind() {
        assert!(practice(AnswerKind::Code).validate().is_err());
        assert!(practice(AnswerKind::Image).validate().is_err());
        assert!(practice(AnswerKind::Mixed).validate().is_err());

        let mut image = practice(AnswerKind::Image);
        image.answer_image_url = Some("https://cdn.example.com/a.png".into());
        assert!(image.validate().is_ok());

        let mut mixed = practice(AnswerKind::Mixed);
        mixed.answers = vec!["print(1)".into()];
        assert!(mixed.validate().is_ok());
    }

    #[test]
    fn blank_exam_questions_are_dropped() {
        let exam = NewExam {
            title: "Quiz".into(),
            description: String::new(),
            questions: vec!["2 + 2?".into(), "  ".into()],
            options: vec![vec!["3".into(), "4".into()], vec![]],
            correct_answers: vec![1, 0],
            time_limit: DEFAULT_TIME_LIMIT,
            passing_score: DEFAULT_PASSING_SCORE,
        }
        .validate()
        .unwrap();

        assert_eq!(exam.questions.len(), 1);
        assert_eq!(exam.options.len(), 1);
        assert_eq!(exam.correct_answers, vec![1]);
    }

    #[test]
    fn exam_update_drops_blank_questions() {
        let mut exam = ExamSection {
            id: "e1".into(),
            title: "Quiz".into(),
            description: String::new(),
            questions: vec!["2 + 2?".into()],
            options: vec![vec!["3".into(), "4".into()]],
            correct_answers: vec![1],
            time_limit: DEFAULT_TIME_LIMIT,
            passing_score: DEFAULT_PASSING_SCORE,
            created_at: Utc::now(),
        };

        ExamUpdate {
            questions: Some(vec!["3 + 3?".into(), "".into(), "1 + 1?".into()]),
            options: Some(vec![
                vec!["6".into(), "7".into()],
                vec!["x".into()],
                vec!["2".into()],
            ]),
            correct_answers: Some(vec![0, 0, 0]),
            ..Default::default()
        }
        .apply(&mut exam)
        .unwrap();

        assert_eq!(exam.questions, vec!["3 + 3?", "1 + 1?"]);
        assert_eq!(exam.options, vec![vec!["6", "7"], vec!["2"]]);
        assert_eq!(exam.correct_answers, vec![0, 0]);
    }

    #[test]
    fn profile_image_null_means_clear() {
        let clear: ProfileUpdate = serde_json::from_str(r#"{"profileImage":null}"#).unwrap();
        assert_eq!(clear.profile_image, Some(None));
        assert!(!clear.is_empty());

        let keep: ProfileUpdate = serde_json::from_str(r#"{"displayName":"Ada"}"#).unwrap();
        assert_eq!(keep.profile_image, None);
    }

    #[test]
    fn correct_answer_must_index_an_option() {
        let err = check_exam(&["q".into()], &[vec!["a".into()]], &[1], 70).unwrap_err();
        assert!(err.to_string().contains("no option 1"));
    }

    #[test]
    fn exam_defaults_from_json() {
        let exam: NewExam = serde_json::from_str(
            r#"{"title":"Quiz","questions":["q"],"options":[["a","b"]],"correctAnswers":[0]}"#,
        )
        .unwrap();
        assert_eq!(exam.time_limit, 30);
        assert_eq!(exam.passing_score, 70);
    }
}
