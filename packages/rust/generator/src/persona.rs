//! Persona instructions and prompt construction.

use pbnforge_shared::AuthorStyle;

/// Tone instruction for a persona.
pub fn persona_instruction(style: AuthorStyle) -> &'static str {
    match style {
        AuthorStyle::Expert => {
            "Write in a dry, analytical, technical voice. Use terminology, figures and \
             in-depth analysis. Minimal emotion, maximum facts."
        }
        AuthorStyle::Lifestyle => {
            "Write emotionally, lightly and accessibly. Use personal examples and \
             storytelling, and address the reader directly as \"you\". The article should \
             read like a post on a personal blog."
        }
        AuthorStyle::Neutral => {
            "Write in the standard informational style of a news portal. Objective and balanced."
        }
    }
}

/// Parameters for a single article prompt.
#[derive(Debug, Clone, Copy)]
pub struct PromptInput<'a> {
    pub topic: &'a str,
    pub target_url: &'a str,
    pub anchor: &'a str,
    pub style: AuthorStyle,
    pub target_words: u32,
}

/// Build the full prompt sent to the text-generation capability.
pub fn build_prompt(input: &PromptInput<'_>) -> String {
    let persona = persona_instruction(input.style);
    format!(
        "You are a professional blog writer. {persona}\n\
         \n\
         Task: Write an SEO-optimized article in HTML format (use <h1>, <h2>, <p> tags only).\n\
         Topic: {topic}\n\
         Requirement 1: Include a natural link to \"{target_url}\" with anchor text \"{anchor}\".\n\
         Requirement 2: Make the article engaging and around {words} words.\n\
         Requirement 3: Return ONLY HTML code, no markdown symbols like ```html.\n",
        topic = input.topic,
        target_url = input.target_url,
        anchor = input.anchor,
        words = input.target_words,
    )
}
