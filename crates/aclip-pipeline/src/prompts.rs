//! Category-tagged prompt templates.
//!
//! Templates are plain text with `{{name}}` placeholders, keyed by
//! `(stage, category)`. Built-in defaults cover the `default` category for
//! every LLM stage; a prompt directory may overlay per-category variants as
//! `<dir>/<stage>/<category>.txt`. A missing category falls back to
//! `default`.

use std::collections::HashMap;
use std::path::Path;

use aclip_models::{StageId, VideoCategory};
use tracing::{debug, warn};

use crate::error::StageError;

const DEFAULT_OUTLINE: &str = include_str!("../prompts/outline.txt");
const DEFAULT_TIMELINE: &str = include_str!("../prompts/timeline.txt");
const DEFAULT_SCORING: &str = include_str!("../prompts/scoring.txt");
const DEFAULT_TITLE: &str = include_str!("../prompts/title.txt");
const DEFAULT_CLUSTERING: &str = include_str!("../prompts/clustering.txt");

/// Static mapping `(stage, category) -> template`.
pub struct PromptLibrary {
    templates: HashMap<(StageId, VideoCategory), String>,
}

impl PromptLibrary {
    /// A library holding only the built-in default-category templates.
    pub fn with_defaults() -> Self {
        let mut templates = HashMap::new();
        for (stage, text) in [
            (StageId::Outline, DEFAULT_OUTLINE),
            (StageId::Timeline, DEFAULT_TIMELINE),
            (StageId::Scoring, DEFAULT_SCORING),
            (StageId::Title, DEFAULT_TITLE),
            (StageId::Clustering, DEFAULT_CLUSTERING),
        ] {
            templates.insert((stage, VideoCategory::Default), text.to_string());
        }
        Self { templates }
    }

    /// Load the library, overlaying `<dir>/<stage>/<category>.txt` files on
    /// top of the built-in defaults. An absent directory leaves just the
    /// defaults; unreadable files are skipped with a warning.
    pub async fn load(dir: impl AsRef<Path>) -> Self {
        let mut library = Self::with_defaults();
        let dir = dir.as_ref();

        for stage in StageId::ALL.iter().filter(|s| s.uses_llm()) {
            for category in VideoCategory::ALL {
                let path = dir
                    .join(stage.name())
                    .join(format!("{}.txt", category.as_str()));
                match tokio::fs::read_to_string(&path).await {
                    Ok(text) => {
                        debug!(path = %path.display(), "loaded prompt template");
                        library.templates.insert((*stage, category), text);
                    }
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                    Err(e) => {
                        warn!(path = %path.display(), "skipping unreadable prompt template: {}", e);
                    }
                }
            }
        }

        library
    }

    /// The template for a stage/category pair, falling back to `default`.
    pub fn template(&self, stage: StageId, category: VideoCategory) -> Option<&str> {
        self.templates
            .get(&(stage, category))
            .or_else(|| self.templates.get(&(stage, VideoCategory::Default)))
            .map(String::as_str)
    }

    /// Render a stage prompt, substituting `{{name}}` placeholders. The
    /// `{{category}}` binding is always available; any placeholder left
    /// unresolved is an error.
    pub fn render(
        &self,
        stage: StageId,
        category: VideoCategory,
        bindings: &[(&str, &str)],
    ) -> Result<String, StageError> {
        let template = self.template(stage, category).ok_or_else(|| {
            StageError::invalid(format!("no prompt template for {}", stage))
        })?;

        let mut rendered = template.replace("{{category}}", category.label());
        for (name, value) in bindings {
            rendered = rendered.replace(&format!("{{{{{}}}}}", name), value);
        }

        if let Some(pos) = rendered.find("{{") {
            let tail: String = rendered[pos..].chars().take(40).collect();
            return Err(StageError::invalid(format!(
                "unresolved placeholder in {} prompt: {}",
                stage, tail
            )));
        }

        Ok(rendered)
    }
}
