// answer classification - should a stored answer render as prose or as code,
// and if code, which highlighter to use. heuristic on purpose: it is allowed
// to be wrong but never to fail

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

use super::model::AnswerKind;
use super::patterns::{CODE_PATTERNS, LANGUAGE_PATTERNS};
use crate::Error;

// float sums like 0.2 + 0.1 must still land on the inclusive threshold
const SCORE_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Javascript,
    Python,
    Html,
    Css,
    Sql,
}

impl Language {
    pub fn as_str(self) -> &'static str {
        match self {
            Language::Javascript => "javascript",
            Language::Python => "python",
            Language::Html => "html",
            Language::Css => "css",
            Language::Sql => "sql",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Classification {
    pub is_code: bool,
    /// Only meaningful when `is_code` is set.
    pub language: Language,
}

/// Evidence weights and the code threshold.
///
/// These were tuned by hand, not derived, so they load from TOML and any
/// missing key keeps its default.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierWeights {
    pub patterns: f64,
    pub multiline: f64,
    pub indentation: f64,
    pub braces: f64,
    pub parentheses: f64,
    pub semicolons: f64,
    pub quotes: f64,
    pub declared_code: f64,
    pub threshold: f64,
}

impl Default for ClassifierWeights {
    fn default() -> Self {
        Self {
            patterns: 0.6,
            multiline: 0.2,
            indentation: 0.1,
            braces: 0.1,
            parentheses: 0.1,
            semicolons: 0.1,
            quotes: 0.1,
            declared_code: 0.3,
            threshold: 0.3,
        }
    }
}

impl ClassifierWeights {
    pub fn from_toml(source: &str) -> Result<Self, Error> {
        Ok(toml::from_str(source)?)
    }

    pub fn load(path: &Path) -> Result<Self, Error> {
        let source = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml(&source)
    }

    pub fn score(&self, signals: &Signals) -> f64 {
        let weighted = [
            (!signals.categories.is_empty(), self.patterns),
            (signals.multiline, self.multiline),
            (signals.indentation, self.indentation),
            (signals.braces, self.braces),
            (signals.parentheses, self.parentheses),
            (signals.semicolons, self.semicolons),
            (signals.quotes, self.quotes),
            (signals.declared_code, self.declared_code),
        ];

        weighted
            .iter()
            .filter(|(fired, _)| *fired)
            .map(|(_, weight)| weight)
            .sum()
    }
}

/// What the classifier saw in a piece of text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Signals {
    /// Names of the pattern categories with at least one hit.
    pub categories: Vec<&'static str>,
    pub multiline: bool,
    pub indentation: bool,
    pub braces: bool,
    pub parentheses: bool,
    pub semicolons: bool,
    pub quotes: bool,
    pub declared_code: bool,
}

impl Signals {
    pub fn collect(text: &str, kind: Option<AnswerKind>) -> Self {
        let categories = CODE_PATTERNS
            .iter()
            .filter(|c| c.set.is_match(text.as_bytes()))
            .map(|c| c.name)
            .collect();

        Self {
            categories,
            multiline: text.split('\n').count() > 1,
            indentation: text
                .split('\n')
                .any(|line| line.starts_with("  ") || line.starts_with('\t')),
            braces: text.contains('{') && text.contains('}'),
            parentheses: text.contains('(') && text.contains(')'),
            semicolons: text.contains(';'),
            quotes: text.contains(['"', '\'', '`']),
            declared_code: kind == Some(AnswerKind::Code),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Explanation {
    pub signals: Signals,
    pub score: f64,
    pub threshold: f64,
    pub result: Classification,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ContentClassifier {
    weights: ClassifierWeights,
}

impl ContentClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_weights(weights: ClassifierWeights) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> &ClassifierWeights {
        &self.weights
    }

    pub fn classify(&self, text: &str, kind: Option<AnswerKind>) -> Classification {
        self.explain(text, kind).result
    }

    /// Same decision as [`classify`](Self::classify), with the evidence behind it.
    pub fn explain(&self, text: &str, kind: Option<AnswerKind>) -> Explanation {
        if text.is_empty() {
            return Explanation {
                signals: Signals::default(),
                score: 0.0,
                threshold: self.weights.threshold,
                result: Classification::default(),
            };
        }

        let signals = Signals::collect(text, kind);
        let score = self.weights.score(&signals);
        let is_code = score + SCORE_EPSILON >= self.weights.threshold;

        // language only matters for code, prose keeps the default
        let language = if is_code {
            detect_language(text)
        } else {
            Language::default()
        };

        Explanation {
            signals,
            score,
            threshold: self.weights.threshold,
            result: Classification { is_code, language },
        }
    }
}

/// Classify with the default weights.
pub fn classify(text: &str, kind: Option<AnswerKind>) -> Classification {
    ContentClassifier::new().classify(text, kind)
}

/// First language in priority order with any matching pattern, javascript otherwise.
pub fn detect_language(text: &str) -> Language {
    LANGUAGE_PATTERNS
        .iter()
        .find(|(_, set)| set.is_match(text.as_bytes()))
        .map(|(language, _)| *language)
        .unwrap_or_default()
}
