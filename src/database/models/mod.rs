pub mod category;
pub mod post;
pub mod user;

pub use category::{Category, CategoryResponse};
pub use post::{AuthorRef, CategoryRef, Comment, CommentResponse, Post, PostResponse};
pub use user::User;

/// Derive a URL-safe slug from a title or name: lowercase ASCII letters,
/// digits, and single hyphens, with no leading or trailing hyphen.
pub fn slugify(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    let mut last_was_hyphen = true; // suppress a leading hyphen
    for ch in input.chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch.to_ascii_lowercase());
            last_was_hyphen = false;
        } else if !last_was_hyphen {
            slug.push('-');
            last_was_hyphen = true;
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

const EXCERPT_LENGTH: usize = 150;

/// First 150 characters of the content, used when no excerpt is supplied.
pub fn derive_excerpt(content: &str) -> String {
    if content.chars().count() <= EXCERPT_LENGTH {
        return content.to_string();
    }
    let truncated: String = content.chars().take(EXCERPT_LENGTH).collect();
    format!("{}...", truncated.trim_end())
}
