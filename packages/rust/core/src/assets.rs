//! Image keyword and tag generation.

use tracing::{debug, instrument};

use postcraft_markdown::clean_tag_output;
use postcraft_providers::TextGenerator;
use postcraft_shared::{PostcraftError, Result};

const KEYWORD_INSTRUCTIONS: &[&str] = &[
    "Only output one clear and descriptive keyword or phrase for image search.",
    "Keep it relevant to the topic. The image is retrieved from a stock photo search, so do not be creative.",
];

const TAG_INSTRUCTIONS: &[&str] = &[
    "Only output a comma-separated list of clear, SEO-friendly tags relevant to the topic.",
    "Each tag must be a single lowercase word or a hyphenated phrase (e.g., 'machine-learning').",
    "No special characters except hyphens. No spaces.",
    "Output only the list, no extra explanation or markdown.",
];

/// Ask for a single image-search keyword for `topic`.
#[instrument(skip_all, fields(topic = %topic))]
pub async fn generate_image_keyword(generator: &dyn TextGenerator, topic: &str) -> Result<String> {
    let prompt = format!("Suggest an image search keyword for a blog post about: {topic}");
    let reply = generator.generate(&prompt, KEYWORD_INSTRUCTIONS).await?;

    let keyword = clean_keyword(&reply)
        .ok_or_else(|| PostcraftError::validation("image keyword reply was empty"))?;
    debug!(%keyword, "image keyword chosen");
    Ok(keyword)
}

/// Ask for tags for `topic`, returned as a cleaned comma-joined string.
#[instrument(skip_all, fields(topic = %topic))]
pub async fn generate_tags(generator: &dyn TextGenerator, topic: &str) -> Result<String> {
    let prompt = format!("Generate tags for a technical blog post about: {topic}");
    let reply = generator.generate(&prompt, TAG_INSTRUCTIONS).await?;

    let tags = clean_tag_output(&reply);
    if tags.is_empty() {
        return Err(PostcraftError::validation("tag reply contained no usable tags"));
    }
    debug!(%tags, "tags generated");
    Ok(tags)
}

/// First non-empty line with quotes and emphasis markers removed.
fn clean_keyword(reply: &str) -> Option<String> {
    reply
        .lines()
        .map(|line| {
            line.trim()
                .trim_matches(|c: char| matches!(c, '"' | '\'' | '`' | '*' | '_' | '#' | '-'))
                .trim()
                .to_string()
        })
        .find(|line| !line.is_empty())
}
