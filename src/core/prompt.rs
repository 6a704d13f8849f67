use super::vocabulary::{Vocabulary, WordList};
use crate::constants::DEFAULT_PROMPT_TEMPLATE;
use crate::errors::Error;
use std::path::Path;
use tracing::info;

/// Builds generation prompts from a template and the theme vocabulary
#[derive(Debug)]
pub struct PromptBuilder {
    template: String,
    vocabulary: Vocabulary,
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_PROMPT_TEMPLATE.to_string())
    }
}

impl PromptBuilder {
    pub fn new(template: String) -> Self {
        Self {
            template,
            vocabulary: Vocabulary::new(),
        }
    }

    /// Loads the template from the first ```` ```markdown ```` fenced block of a file
    pub fn from_template_file(path: &Path) -> Result<Self, Error> {
        let content = std::fs::read_to_string(path)?;
        let template = extract_markdown_block(&content).ok_or_else(|| {
            Error::Config(format!(
                "no ```markdown block found in prompt template {}",
                path.display()
            ))
        })?;
        info!("Loaded prompt template from {}", path.display());
        Ok(Self::new(template.to_string()))
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    /// Fills the template for a theme and title.
    ///
    /// # Errors
    ///
    /// Returns `Error::Validation` if the theme has no vocabulary.
    pub fn build(&self, theme: &str, title: &str) -> Result<String, Error> {
        let words = self.vocabulary.words(theme).ok_or_else(|| {
            Error::Validation(format!(
                "unsupported theme: {}. Supported themes: {}",
                theme,
                self.vocabulary.themes().join(", ")
            ))
        })?;
        Ok(render(&self.template, theme, title, &words))
    }
}

fn render(template: &str, theme: &str, title: &str, words: &WordList) -> String {
    template
        .replace("{{theme}}", theme)
        .replace("{{title}}", title)
        .replace("{{core_words}}", &words.core.join(", "))
        .replace("{{item_words}}", &words.items.join(", "))
        .replace("{{environment_words}}", &words.environment.join(", "))
}

fn extract_markdown_block(content: &str) -> Option<&str> {
    let start = content.find("```markdown")?;
    let after_fence = &content[start..];
    let body_start = start + after_fence.find('\n')? + 1;
    let body = &content[body_start..];
    let end = body.find("\n```")?;
    Some(body[..end].trim_end_matches('\r'))
}

/// Rough generation time in seconds, growing with the prompt length
pub fn estimate_processing_time(prompt: &str) -> u64 {
    let chars = prompt.chars().count() as u64;
    10 + (chars / 100) * 5
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn fills_every_placeholder() {
        let builder = PromptBuilder::default();
        let prompt = builder.build("超市", "快乐购物").unwrap();
        assert!(prompt.contains("快乐购物"));
        assert!(prompt.contains("shōu yín yuán 收银员, huò jià 货架"));
        assert!(prompt.contains("gòu wù dài 购物袋"));
        assert!(!prompt.contains("{{"));
    }

    #[test]
    fn unknown_theme_is_a_validation_error() {
        let builder = PromptBuilder::default();
        match builder.build("火星", "x") {
            Err(Error::Validation(message)) => assert!(message.contains("超市")),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn reads_fenced_template_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            "# Poster\n\nintro text\n\n```markdown\nTitle: {{{{title}}}} / {{{{core_words}}}}\r\n```\ntrailing"
        )
        .unwrap();

        let builder = PromptBuilder::from_template_file(file.path()).unwrap();
        let prompt = builder.build("公园", "周末").unwrap();
        assert!(prompt.starts_with("Title: 周末 / huá huá tī 滑滑梯"));
        assert!(!prompt.contains("trailing"));
    }

    #[test]
    fn template_without_block_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "no fenced block here").unwrap();
        assert!(matches!(
            PromptBuilder::from_template_file(file.path()),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn estimate_grows_every_hundred_chars() {
        assert_eq!(estimate_processing_time("short"), 10);
        assert_eq!(estimate_processing_time(&"字".repeat(250)), 20);
    }
}
