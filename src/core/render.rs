// how a practice solution is shown: a prose or code block, an image, or both

use serde::Serialize;

use super::classify::{ContentClassifier, Language};
use super::model::{AnswerKind, PracticeSection};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum AnswerBlock {
    Code { language: Language, body: String },
    Prose { body: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerView {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block: Option<AnswerBlock>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

pub fn render_answer(classifier: &ContentClassifier, practice: &PracticeSection) -> AnswerView {
    // an image answer has no text worth showing even if some was stored
    let block = match practice.answer_type {
        AnswerKind::Image => None,
        _ => practice.primary_answer().map(|body| {
            let result = classifier.classify(body, Some(practice.answer_type));
            if result.is_code {
                AnswerBlock::Code {
                    language: result.language,
                    body: body.to_string(),
                }
            } else {
                AnswerBlock::Prose {
                    body: body.to_string(),
                }
            }
        }),
    };

    AnswerView {
        block,
        image_url: practice
            .answer_image_url
            .as_deref()
            .and_then(usable_image_url)
            .map(str::to_string),
    }
}

// blob: urls only ever lived in the uploading browser tab
fn usable_image_url(url: &str) -> Option<&str> {
    let url = url.trim();
    (!url.is_empty() && !url.starts_with("blob:")).then_some(url)
}
