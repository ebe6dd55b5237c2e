// pattern tables for answer classification
// compiled once, shared read-only by every classify call
//
// the tables are matched as bytes with unicode classes off: \w and \s are
// ascii only and `.` stops at \r as well as \n

use regex::bytes::{RegexSet, RegexSetBuilder};
use std::sync::LazyLock;

use super::classify::Language;

// idioms that suggest "this is code", grouped so explain() can say what fired
const CODE_CATEGORIES: &[(&str, &[&str])] = &[
    (
        "declaration",
        &[
            r"function\s+\w+\s*\(",
            r"const\s+\w+\s*=",
            r"let\s+\w+\s*=",
            r"var\s+\w+\s*=",
            r"=>\s*\{",
            r"async\s+function",
        ],
    ),
    ("module", &[r"import\s+", r"export\s+"]),
    (
        "control-flow",
        &[
            r"if\s*\(",
            r"for\s*\(",
            r"while\s*\(",
            r"return\s+",
            r"try\s*\{",
            r"catch\s*\(",
        ],
    ),
    (
        "object",
        &[r"class\s+\w+", r"new\s+\w+", r"\.\w+\(", r"console\.log"],
    ),
    (
        "async",
        &[r"await\s+", r"Promise\.", r"\.then\(", r"\.catch\("],
    ),
    ("markup", &[r"<[^>]*>"]),
    ("stylesheet", &[r"css\s*\{", r"@media", r"\.\w+\s*\{"]),
    (
        "sql",
        &[
            r"(?i)sql",
            r"(?i)select\s+.+from",
            r"(?i)insert\s+into",
            r"(?i)update\s+.+set",
            r"(?i)delete\s+from",
            r"(?i)create\s+table",
        ],
    ),
    (
        "scripting",
        &[
            r"(?i)python",
            r"def\s+\w+",
            r"import\s+\w+",
            r"print\s*\(",
            r"if\s+\w+:",
            r"for\s+\w+\s+in",
        ],
    ),
];

// checked in this order, first hit wins
const LANGUAGES: &[(Language, &[&str])] = &[
    (
        Language::Javascript,
        &[
            r"function\s+\w+\s*\(",
            r"const\s+\w+\s*=",
            r"let\s+\w+\s*=",
            r"var\s+\w+\s*=",
            r"import\s+",
            r"export\s+",
            r"console\.log",
            r"=>\s*\{",
            r"Promise\.",
            r"async\s+function",
            // js classes open a brace or stand alone, python ones end in a colon
            r"(?m)class\s+\w+(\s+extends\s+[\w.]+)?\s*(\{|$)",
        ],
    ),
    (
        Language::Python,
        &[
            r"def\s+\w+",
            r"import\s+\w+",
            r"print\s*\(",
            r"if\s+\w+:",
            r"for\s+\w+\s+in",
            r"class\s+\w+",
            r"__init__",
            r"self\.",
        ],
    ),
    (
        Language::Html,
        &[
            r"<html", r"<head", r"<body", r"<div", r"<span", r"<p", r"<h[1-6]", r"<!DOCTYPE",
            r"<script", r"<style", r"<link", r"<meta",
        ],
    ),
    (
        Language::Css,
        &[
            r"css\s*\{",
            r"@media",
            r"\.\w+\s*\{",
            r"#\w+\s*\{",
            r"margin:",
            r"padding:",
            r"color:",
            r"background:",
            r"font-size:",
            r"display:",
        ],
    ),
    (
        Language::Sql,
        &[
            r"(?i)select\s+.+from",
            r"(?i)insert\s+into",
            r"(?i)update\s+.+set",
            r"(?i)delete\s+from",
            r"(?i)create\s+table",
            r"(?i)alter\s+table",
            r"(?i)drop\s+table",
            r"(?i)where\s+",
        ],
    ),
];

pub(crate) struct Category {
    pub name: &'static str,
    pub set: RegexSet,
}

// SAFETY: the tables above are static literals; compilation cannot fail.
#[allow(clippy::expect_used)]
fn compile(patterns: &[&str]) -> RegexSet {
    RegexSetBuilder::new(patterns)
        .unicode(false)
        .crlf(true)
        .build()
        .expect("valid pattern table")
}

pub(crate) static CODE_PATTERNS: LazyLock<Vec<Category>> = LazyLock::new(|| {
    CODE_CATEGORIES
        .iter()
        .map(|&(name, patterns)| Category {
            name,
            set: compile(patterns),
        })
        .collect()
});

pub(crate) static LANGUAGE_PATTERNS: LazyLock<Vec<(Language, RegexSet)>> = LazyLock::new(|| {
    LANGUAGES
        .iter()
        .map(|&(language, patterns)| (language, compile(patterns)))
        .collect()
});
