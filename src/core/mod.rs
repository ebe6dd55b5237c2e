// core logic - answer classification, content storage, users and grading

mod classify;
mod exam;
mod model;
mod patterns;
mod render;
mod session;
mod store;
mod users;
mod video;

pub use classify::{
    Classification, ClassifierWeights, ContentClassifier, Explanation, Language, Signals, classify,
    detect_language,
};
pub use exam::{ExamScore, grade};
pub use model::{
    AnswerKind, Chapter, ChapterUpdate, ExamSection, ExamUpdate, Identity, NewChapter, NewExam,
    NewPractice, NewTutorial, PracticeSection, ProfileUpdate, Role, Tutorial, UserRecord,
};
pub use render::{AnswerBlock, AnswerView, render_answer};
pub use session::Session;
pub use store::Store;
pub use users::UserDirectory;
pub use video::{embed_url, youtube_id};
