// chapter storage on sqlite
// a chapter row carries its tutorials, practice and exam sections as json
// columns, so every nested edit is a read-modify-write of one row

use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::collections::HashSet;
use std::str::FromStr;
use tracing::{debug, info};
use uuid::Uuid;

use super::model::{
    Chapter, ChapterUpdate, ExamSection, ExamUpdate, NewChapter, NewExam, NewPractice,
    NewTutorial, PracticeSection, Tutorial,
};
use super::users::UserDirectory;
use crate::Error;

const SELECT_CHAPTER: &str = "SELECT id, title, description, sort_order, tutorials, \
     practice_sections, exam_sections, created_at, updated_at FROM chapters";

const DEFAULT_CHAPTERS: &[(&str, &str)] = &[
    ("Chapter 1", "Introduction to ICT fundamentals and basic concepts"),
    ("Chapter 2", "Computer hardware and system components"),
    ("Chapter 3", "Software applications and operating systems"),
    ("Chapter 4", "Networking and internet technologies"),
    ("Chapter 5", "Database management and data handling"),
    ("Chapter 6", "Cybersecurity and digital safety practices"),
];

#[derive(Clone)]
pub struct Store {
    pool: SqlitePool,
}

#[derive(sqlx::FromRow)]
struct ChapterRow {
    id: String,
    title: String,
    description: String,
    sort_order: i64,
    tutorials: String,
    practice_sections: String,
    exam_sections: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ChapterRow {
    fn into_chapter(self) -> Result<Chapter, Error> {
        Ok(Chapter {
            id: self.id,
            title: self.title,
            description: self.description,
            order: self.sort_order,
            tutorials: serde_json::from_str(&self.tutorials)?,
            practice_sections: serde_json::from_str(&self.practice_sections)?,
            exam_sections: serde_json::from_str(&self.exam_sections)?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl Store {
    pub async fn connect(url: &str) -> Result<Self, Error> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);

        // every in-memory connection is its own database, so keep exactly one alive
        let pool = if url.contains(":memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_with(options)
                .await?
        } else {
            SqlitePoolOptions::new()
                .max_connections(5)
                .connect_with(options)
                .await?
        };

        let store = Self { pool };
        store.migrate().await?;
        debug!(url, "store ready");
        Ok(store)
    }

    async fn migrate(&self) -> Result<(), Error> {
        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS chapters (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                description TEXT NOT NULL,
                sort_order INTEGER NOT NULL,
                tutorials TEXT NOT NULL DEFAULT '[]',
                practice_sections TEXT NOT NULL DEFAULT '[]',
                exam_sections TEXT NOT NULL DEFAULT '[]',
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )"#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS users (
                uid TEXT PRIMARY KEY,
                email TEXT NOT NULL,
                role TEXT NOT NULL,
                display_name TEXT,
                profile_image TEXT,
                created_at TEXT NOT NULL,
                last_login TEXT
            )"#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub fn users(&self) -> UserDirectory {
        UserDirectory::new(self.pool.clone())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    // chapters

    pub async fn create_chapter(&self, chapter: NewChapter) -> Result<Chapter, Error> {
        let chapter = chapter.validate()?;
        let mut tx = self.pool.begin().await?;

        let existing: Option<(String,)> =
            sqlx::query_as("SELECT id FROM chapters WHERE title = ? LIMIT 1")
                .bind(&chapter.title)
                .fetch_optional(&mut *tx)
                .await?;
        if existing.is_some() {
            return Err(Error::DuplicateChapter(chapter.title));
        }

        let now = Utc::now();
        let created = Chapter {
            id: new_id(),
            title: chapter.title,
            description: chapter.description,
            order: chapter.order,
            tutorials: vec![],
            practice_sections: vec![],
            exam_sections: vec![],
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            "INSERT INTO chapters (id, title, description, sort_order, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&created.id)
        .bind(&created.title)
        .bind(&created.description)
        .bind(created.order)
        .bind(created.created_at)
        .bind(created.updated_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        info!(id = %created.id, title = %created.title, "chapter created");
        Ok(created)
    }

    /// All chapters in display order.
    pub async fn chapters(&self) -> Result<Vec<Chapter>, Error> {
        let rows: Vec<ChapterRow> =
            sqlx::query_as(&format!("{SELECT_CHAPTER} ORDER BY sort_order, created_at, rowid"))
                .fetch_all(&self.pool)
                .await?;

        rows.into_iter().map(ChapterRow::into_chapter).collect()
    }

    pub async fn chapter(&self, id: &str) -> Result<Chapter, Error> {
        let row: Option<ChapterRow> = sqlx::query_as(&format!("{SELECT_CHAPTER} WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.ok_or_else(|| chapter_not_found(id))?.into_chapter()
    }

    pub async fn update_chapter(&self, id: &str, update: ChapterUpdate) -> Result<Chapter, Error> {
        self.modify(id, |chapter| {
            if let Some(title) = update.title {
                let title = title.trim();
                if title.is_empty() {
                    return Err(Error::Validation("chapter title is required".into()));
                }
                chapter.title = title.to_string();
            }
            if let Some(description) = update.description {
                chapter.description = description.trim().to_string();
            }
            if let Some(order) = update.order {
                chapter.order = order;
            }
            Ok(chapter.clone())
        })
        .await
    }

    pub async fn delete_chapter(&self, id: &str) -> Result<(), Error> {
        let done = sqlx::query("DELETE FROM chapters WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if done.rows_affected() == 0 {
            return Err(chapter_not_found(id));
        }
        info!(id, "chapter deleted");
        Ok(())
    }

    pub async fn delete_all_chapters(&self) -> Result<u64, Error> {
        let done = sqlx::query("DELETE FROM chapters")
            .execute(&self.pool)
            .await?;
        info!(count = done.rows_affected(), "all chapters deleted");
        Ok(done.rows_affected())
    }

    /// Create the six starter chapters, skipping titles that already exist.
    pub async fn seed_default_chapters(&self) -> Result<Vec<Chapter>, Error> {
        let mut created = Vec::new();
        for (i, (title, description)) in DEFAULT_CHAPTERS.iter().enumerate() {
            let chapter = NewChapter {
                title: title.to_string(),
                description: description.to_string(),
                order: i as i64 + 1,
            };
            match self.create_chapter(chapter).await {
                Ok(c) => created.push(c),
                Err(Error::DuplicateChapter(title)) => debug!(%title, "seed skipped"),
                Err(e) => return Err(e),
            }
        }
        Ok(created)
    }

    /// Keep the oldest chapter for each title and delete the rest.
    /// Returns how many were deleted.
    pub async fn cleanup_duplicate_chapters(&self) -> Result<u64, Error> {
        let rows: Vec<(String, String)> =
            sqlx::query_as("SELECT id, title FROM chapters ORDER BY created_at, rowid")
                .fetch_all(&self.pool)
                .await?;

        let mut seen = HashSet::new();
        let mut deleted = 0;
        for (id, title) in rows {
            if seen.insert(title.clone()) {
                continue;
            }
            sqlx::query("DELETE FROM chapters WHERE id = ?")
                .bind(&id)
                .execute(&self.pool)
                .await?;
            info!(%id, %title, "deleted duplicate chapter");
            deleted += 1;
        }
        Ok(deleted)
    }

    // tutorials

    pub async fn add_tutorial(&self, chapter_id: &str, tutorial: NewTutorial) -> Result<Tutorial, Error> {
        let tutorial = tutorial.validate()?;
        self.modify(chapter_id, |chapter| {
            let created = Tutorial {
                id: new_id(),
                title: tutorial.title,
                description: tutorial.description,
                video_url: tutorial.video_url,
                links: tutorial.links,
                created_at: Utc::now(),
            };
            chapter.tutorials.push(created.clone());
            Ok(created)
        })
        .await
    }

    pub async fn update_tutorial(
        &self,
        chapter_id: &str,
        tutorial_id: &str,
        tutorial: NewTutorial,
    ) -> Result<Tutorial, Error> {
        let tutorial = tutorial.validate()?;
        self.modify(chapter_id, |chapter| {
            let slot = chapter
                .tutorials
                .iter_mut()
                .find(|t| t.id == tutorial_id)
                .ok_or_else(|| Error::NotFound(format!("tutorial {tutorial_id}")))?;
            slot.title = tutorial.title;
            slot.description = tutorial.description;
            slot.video_url = tutorial.video_url;
            slot.links = tutorial.links;
            Ok(slot.clone())
        })
        .await
    }

    pub async fn delete_tutorial(&self, chapter_id: &str, tutorial_id: &str) -> Result<(), Error> {
        self.modify(chapter_id, |chapter| {
            remove_by_id(&mut chapter.tutorials, |t| &t.id, tutorial_id, "tutorial")
        })
        .await
    }

    // practice sections

    pub async fn add_practice(
        &self,
        chapter_id: &str,
        practice: NewPractice,
    ) -> Result<PracticeSection, Error> {
        let practice = practice.validate()?;
        self.modify(chapter_id, |chapter| {
            let created = practice_from(new_id(), Utc::now(), practice);
            chapter.practice_sections.push(created.clone());
            Ok(created)
        })
        .await
    }

    /// Replace a practice section's content; id and creation time stay.
    pub async fn update_practice(
        &self,
        chapter_id: &str,
        practice_id: &str,
        practice: NewPractice,
    ) -> Result<PracticeSection, Error> {
        let practice = practice.validate()?;
        self.modify(chapter_id, |chapter| {
            let slot = chapter
                .practice_sections
                .iter_mut()
                .find(|p| p.id == practice_id)
                .ok_or_else(|| Error::NotFound(format!("practice section {practice_id}")))?;
            *slot = practice_from(slot.id.clone(), slot.created_at, practice);
            Ok(slot.clone())
        })
        .await
    }

    pub async fn delete_practice(&self, chapter_id: &str, practice_id: &str) -> Result<(), Error> {
        self.modify(chapter_id, |chapter| {
            remove_by_id(
                &mut chapter.practice_sections,
                |p| &p.id,
                practice_id,
                "practice section",
            )
        })
        .await
    }

    // exam sections

    pub async fn add_exam(&self, chapter_id: &str, exam: NewExam) -> Result<ExamSection, Error> {
        let exam = exam.validate()?;
        self.modify(chapter_id, |chapter| {
            let created = ExamSection {
                id: new_id(),
                title: exam.title,
                description: exam.description,
                questions: exam.questions,
                options: exam.options,
                correct_answers: exam.correct_answers,
                time_limit: exam.time_limit,
                passing_score: exam.passing_score,
                created_at: Utc::now(),
            };
            chapter.exam_sections.push(created.clone());
            Ok(created)
        })
        .await
    }

    pub async fn update_exam(
        &self,
        chapter_id: &str,
        exam_id: &str,
        update: ExamUpdate,
    ) -> Result<ExamSection, Error> {
        self.modify(chapter_id, |chapter| {
            let slot = chapter
                .exam_sections
                .iter_mut()
                .find(|e| e.id == exam_id)
                .ok_or_else(|| Error::NotFound(format!("exam section {exam_id}")))?;
            update.apply(slot)?;
            Ok(slot.clone())
        })
        .await
    }

    pub async fn delete_exam(&self, chapter_id: &str, exam_id: &str) -> Result<(), Error> {
        self.modify(chapter_id, |chapter| {
            remove_by_id(&mut chapter.exam_sections, |e| &e.id, exam_id, "exam section")
        })
        .await
    }

    // load a chapter, let `edit` change it, write it back in the same transaction.
    // a new title must not belong to another chapter
    async fn modify<T, F>(&self, id: &str, edit: F) -> Result<T, Error>
    where
        F: FnOnce(&mut Chapter) -> Result<T, Error>,
    {
        let mut tx = self.pool.begin().await?;

        let row: Option<ChapterRow> = sqlx::query_as(&format!("{SELECT_CHAPTER} WHERE id = ?"))
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        let mut chapter = row.ok_or_else(|| chapter_not_found(id))?.into_chapter()?;
        let title = chapter.title.clone();

        let out = edit(&mut chapter)?;
        chapter.updated_at = Utc::now();

        if chapter.title != title {
            let taken: Option<(String,)> =
                sqlx::query_as("SELECT id FROM chapters WHERE title = ? AND id != ? LIMIT 1")
                    .bind(&chapter.title)
                    .bind(id)
                    .fetch_optional(&mut *tx)
                    .await?;
            if taken.is_some() {
                return Err(Error::DuplicateChapter(chapter.title));
            }
        }

        sqlx::query(
            "UPDATE chapters SET title = ?, description = ?, sort_order = ?, tutorials = ?, \
             practice_sections = ?, exam_sections = ?, updated_at = ? WHERE id = ?",
        )
        .bind(&chapter.title)
        .bind(&chapter.description)
        .bind(chapter.order)
        .bind(serde_json::to_string(&chapter.tutorials)?)
        .bind(serde_json::to_string(&chapter.practice_sections)?)
        .bind(serde_json::to_string(&chapter.exam_sections)?)
        .bind(chapter.updated_at)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        debug!(id, "chapter updated");
        Ok(out)
    }
}

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

fn chapter_not_found(id: &str) -> Error {
    Error::NotFound(format!("chapter {id}"))
}

fn practice_from(id: String, created_at: DateTime<Utc>, p: NewPractice) -> PracticeSection {
    PracticeSection {
        id,
        title: p.title,
        description: p.description,
        image_url: p.image_url,
        questions: p.questions,
        answers: p.answers,
        answer_type: p.answer_type,
        answer_image_url: p.answer_image_url,
        created_at,
    }
}

fn remove_by_id<T>(
    items: &mut Vec<T>,
    id_of: impl Fn(&T) -> &String,
    id: &str,
    what: &str,
) -> Result<(), Error> {
    let before = items.len();
    items.retain(|item| id_of(item) != id);
    if items.len() == before {
        return Err(Error::NotFound(format!("{what} {id}")));
    }
    Ok(())
}
