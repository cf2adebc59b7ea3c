use circular_core::{AppViewModel, JobPhase, MessageView, Role};

/// Turns successive view models into terminal lines, printing only what
/// changed since the previous frame.
#[derive(Debug, Default)]
pub struct Renderer {
    topic_id: Option<String>,
    rendered_messages: usize,
    loading: bool,
    status: Option<(JobPhase, Option<String>)>,
    error: Option<String>,
}

impl Renderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn render(&mut self, view: &AppViewModel) -> Vec<String> {
        let mut lines = Vec::new();

        if view.selected_topic_id != self.topic_id {
            self.topic_id = view.selected_topic_id.clone();
            self.rendered_messages = 0;
            if let Some(row) = view.topics.iter().find(|row| row.selected) {
                lines.push(format!("== {} ==", row.title));
            }
        }
        if view.messages.len() < self.rendered_messages {
            self.rendered_messages = 0;
        }
        for message in &view.messages[self.rendered_messages..] {
            lines.extend(message_lines(message));
        }
        self.rendered_messages = view.messages.len();

        let status = view
            .processing
            .as_ref()
            .map(|processing| (processing.phase, processing.progress.clone()));
        if view.loading && !self.loading {
            lines.push("... waiting for an answer (/cancel to stop)".to_string());
        }
        if view.loading && status.is_some() && status != self.status {
            if let Some((phase, progress)) = &status {
                lines.push(status_line(*phase, progress.as_deref()));
            }
        }
        self.loading = view.loading;
        self.status = status;

        if view.error != self.error {
            if let Some(error) = &view.error {
                lines.push(format!("! {error} (/dismiss to clear)"));
            }
            self.error = view.error.clone();
        }

        lines
    }
}

pub fn topic_list(view: &AppViewModel) -> Vec<String> {
    if view.topics.is_empty() {
        return vec!["No chats yet. Type /new to start one.".to_string()];
    }
    view.topics
        .iter()
        .enumerate()
        .map(|(index, row)| {
            let marker = if row.selected { '*' } else { ' ' };
            format!("{marker} {:>2}. {}", index + 1, row.title)
        })
        .collect()
}

fn message_lines(message: &MessageView) -> Vec<String> {
    let speaker = match message.role {
        Role::User => "you",
        Role::Assistant => "assistant",
    };
    let mut lines = vec![format!("{speaker}> {}", message.content)];
    for source in &message.sources {
        lines.push(format!("    [{}] {}", source.label, source.url));
    }
    lines
}

fn status_line(phase: JobPhase, progress: Option<&str>) -> String {
    let phase = match phase {
        JobPhase::Pending => "pending",
        JobPhase::Processing => "processing",
        JobPhase::Completed => "completed",
        JobPhase::Failed => "failed",
    };
    match progress {
        Some(progress) => format!("... {phase}: {progress}"),
        None => format!("... {phase}"),
    }
}
