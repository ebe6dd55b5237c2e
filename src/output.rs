// output formatting - readable text for humans or raw json for scripts

use serde::Serialize;

use crate::core::{Chapter, Explanation, UserRecord};

pub struct Output;

impl Output {
    pub fn explanation(text: &str, explanation: &Explanation) {
        let result = explanation.result;
        if result.is_code {
            println!("code ({})", result.language);
        } else {
            println!("text");
        }

        println!(
            "score: {:.2} (threshold {:.2})",
            explanation.score, explanation.threshold
        );

        let s = &explanation.signals;
        if !s.categories.is_empty() {
            println!("patterns: {}", s.categories.join(", "));
        }

        let structural: Vec<&str> = [
            (s.multiline, "multiline"),
            (s.indentation, "indentation"),
            (s.braces, "braces"),
            (s.parentheses, "parentheses"),
            (s.semicolons, "semicolons"),
            (s.quotes, "quotes"),
            (s.declared_code, "declared code"),
        ]
        .into_iter()
        .filter_map(|(fired, name)| fired.then_some(name))
        .collect();
        if !structural.is_empty() {
            println!("signals: {}", structural.join(", "));
        }

        println!("chars: {}", text.chars().count());
    }

    pub fn chapters(chapters: &[Chapter]) {
        if chapters.is_empty() {
            println!("no chapters");
            return;
        }

        let width = chapters
            .iter()
            .map(|c| c.title.len())
            .max()
            .unwrap_or(0)
            .min(40);

        for c in chapters {
            println!(
                "{:>3}  {:width$}  {} tutorials, {} practice, {} exams  {}",
                c.order,
                truncate(&c.title, 40),
                c.tutorials.len(),
                c.practice_sections.len(),
                c.exam_sections.len(),
                c.id,
                width = width
            );
        }
    }

    pub fn users(users: &[UserRecord]) {
        if users.is_empty() {
            println!("no users");
            return;
        }

        for u in users {
            println!(
                "{:5}  {:30}  {}  joined {}",
                u.role.as_str(),
                truncate(&u.email, 30),
                u.uid,
                u.created_at.format("%Y-%m-%d")
            );
        }
    }

    // raw json for scripts
    pub fn raw<T: Serialize>(value: &T) {
        println!("{}", serde_json::to_string(value).unwrap_or_default());
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() > max {
        let cut: String = s.chars().take(max - 3).collect();
        format!("{cut}...")
    } else {
        s.to_string()
    }
}
