use url::Url;

use crate::{JobPhase, Role, TopicId};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppViewModel {
    pub topics: Vec<TopicRowView>,
    pub selected_topic_id: Option<TopicId>,
    pub messages: Vec<MessageView>,
    pub loading: bool,
    pub processing: Option<ProcessingView>,
    pub error: Option<String>,
    pub dirty: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicRowView {
    pub id: TopicId,
    pub title: String,
    pub selected: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageView {
    pub id: String,
    pub role: Role,
    pub content: String,
    pub sources: Vec<SourceLink>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessingView {
    pub topic_id: TopicId,
    pub job_id: String,
    pub phase: JobPhase,
    pub progress: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLink {
    pub label: String,
    pub url: String,
}

impl SourceLink {
    pub fn new(url: &str) -> Self {
        Self {
            label: source_label(url),
            url: url.to_string(),
        }
    }
}

pub const FALLBACK_SOURCE_LABEL: &str = "Document";

/// Short label for a source link: the last path segment of the URL.
pub fn source_label(url: &str) -> String {
    let from_url = Url::parse(url).ok().and_then(|parsed| {
        parsed
            .path_segments()
            .and_then(|mut segments| segments.next_back().map(str::to_string))
    });
    let label = match from_url {
        Some(segment) => segment,
        None => url.rsplit('/').next().unwrap_or_default().to_string(),
    };
    if label.trim().is_empty() {
        FALLBACK_SOURCE_LABEL.to_string()
    } else {
        label
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_is_last_path_segment() {
        assert_eq!(
            source_label("https://bucket.example.com/circulars/cssf22_806eng.pdf?sig=1"),
            "cssf22_806eng.pdf"
        );
        assert_eq!(source_label("docs/local/file.pdf"), "file.pdf");
    }

    #[test]
    fn label_falls_back_when_path_is_empty() {
        assert_eq!(source_label("https://example.com/"), FALLBACK_SOURCE_LABEL);
        assert_eq!(source_label(""), FALLBACK_SOURCE_LABEL);
    }
}
