// tutorial video links

use regex::Regex;
use std::sync::LazyLock;

// SAFETY: static literal pattern; compilation cannot fail.
#[allow(clippy::expect_used)]
static YOUTUBE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^.*(youtu\.be/|v/|u/\w/|embed/|watch\?v=|&v=)([^#&?]*).*").expect("youtube regex")
});

/// Video id from the usual YouTube url shapes. Ids are always 11 characters,
/// anything else is treated as not a YouTube link.
pub fn youtube_id(url: &str) -> Option<String> {
    let caps = YOUTUBE_RE.captures(url)?;
    let id = caps.get(2)?.as_str();
    (id.chars().count() == 11).then(|| id.to_string())
}

pub fn embed_url(url: &str) -> Option<String> {
    youtube_id(url).map(|id| format!("https://www.youtube.com/embed/{id}"))
}
