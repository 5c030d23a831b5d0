//! Evaluation prompt rendering

use handlebars::Handlebars;
use serde::Serialize;

use crate::error::Result;
use crate::models::{Episode, Novel};
use crate::utils::truncate_text;

/// System role sent with every evaluation request
pub const SYSTEM_PROMPT: &str = "You are a professional literary critic who evaluates novels.";

/// Text placed in an episode slot the work cannot fill
pub const UNAVAILABLE_EPISODE: &str = "(このエピソードは利用できません)";

const TEMPLATE_NAME: &str = "evaluation";
const TEMPLATE_SOURCE: &str = include_str!("../../templates/evaluation_prompt.hbs");

#[derive(Serialize)]
struct PromptContext<'a> {
    title: &'a str,
    author: &'a str,
    episode_count: usize,
    episodes: Vec<String>,
}

/// Renders the evaluation prompt for a work and its leading episodes
pub struct PromptBuilder {
    registry: Handlebars<'static>,
    slots: usize,
    max_episode_chars: Option<usize>,
}

impl PromptBuilder {
    /// Create a builder with `slots` episode sections, each cut to `max_episode_chars`
    pub fn new(slots: usize, max_episode_chars: Option<usize>) -> Result<Self> {
        let mut registry = Handlebars::new();
        registry.set_strict_mode(true);
        registry.register_escape_fn(handlebars::no_escape);
        registry
            .register_template_string(TEMPLATE_NAME, TEMPLATE_SOURCE)
            .map_err(|e| crate::error::Error::with_source("invalid prompt template", e))?;

        Ok(Self {
            registry,
            slots: slots.max(1),
            max_episode_chars,
        })
    }

    /// Number of episode sections in a rendered prompt
    pub fn slots(&self) -> usize {
        self.slots
    }

    /// Render the prompt; missing episodes are padded, extra ones ignored
    pub fn render(&self, novel: &Novel, episodes: &[Episode]) -> Result<String> {
        let mut sections: Vec<String> = episodes
            .iter()
            .take(self.slots)
            .map(|episode| self.episode_section(episode))
            .collect();
        sections.resize(self.slots, UNAVAILABLE_EPISODE.to_string());

        let context = PromptContext {
            title: &novel.title,
            author: &novel.author,
            episode_count: self.slots,
            episodes: sections,
        };

        Ok(self.registry.render(TEMPLATE_NAME, &context)?)
    }

    fn episode_section(&self, episode: &Episode) -> String {
        let content = match self.max_episode_chars {
            Some(limit) => truncate_text(&episode.content, limit),
            None => episode.content.clone(),
        };
        format!("## エピソード: {}\n\n{}", episode.title, content)
    }
}
