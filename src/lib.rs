// learnhub library - chapters, practice answers and exams

pub mod cli;
mod core;
mod error;
mod output;
mod server;

pub use core::{
    AnswerBlock, AnswerKind, AnswerView, Chapter, ChapterUpdate, Classification,
    ClassifierWeights, ContentClassifier, ExamScore, ExamSection, ExamUpdate, Explanation,
    Identity, Language, NewChapter, NewExam, NewPractice, NewTutorial, PracticeSection,
    ProfileUpdate, Role, Session, Signals, Store, Tutorial, UserDirectory, UserRecord, classify,
    detect_language, embed_url, grade, render_answer, youtube_id,
};
pub use error::Error;
pub(crate) use output::Output;
pub use server::{Server, USER_HEADER};
