use serde_json::{json, Value};
use uuid::Uuid;

/// A path segment that may be either a store id or a human-readable slug.
/// Parsed once at the HTTP boundary; lookups dispatch on the variant.
#[derive(Debug, Clone, PartialEq)]
pub enum Identifier {
    Id(Uuid),
    Slug(String),
}

impl Identifier {
    pub fn parse(raw: &str) -> Self {
        match Uuid::parse_str(raw) {
            Ok(id) => Identifier::Id(id),
            Err(_) => Identifier::Slug(raw.to_string()),
        }
    }

    /// Filter document for the dual lookup: a well-formed id is matched
    /// against id OR slug in one query; anything else can only be a slug.
    pub fn where_clause(&self) -> Value {
        match self {
            Identifier::Id(id) => json!({
                "$or": [
                    { "id": id.to_string() },
                    { "slug": id.to_string() },
                ]
            }),
            Identifier::Slug(slug) => json!({ "slug": slug }),
        }
    }
}

impl std::fmt::Display for Identifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Identifier::Id(id) => write!(f, "{}", id),
            Identifier::Slug(slug) => write!(f, "{}", slug),
        }
    }
}
