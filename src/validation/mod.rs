//! Declarative request validation. Each endpoint owns a rule set that is
//! evaluated against the parsed body before any handler logic runs; any
//! violation short-circuits with a 400 and a field-level error list.

use serde_json::Value;
use uuid::Uuid;

use crate::error::{ApiError, FieldError};

#[derive(Debug, Clone, Copy)]
pub enum Format {
    Email,
    StoreId,
}

#[derive(Debug, Clone)]
pub struct Rule {
    field: &'static str,
    required: bool,
    min: Option<usize>,
    max: Option<usize>,
    format: Option<Format>,
    message: &'static str,
}

impl Rule {
    pub fn new(field: &'static str) -> Self {
        Self {
            field,
            required: false,
            min: None,
            max: None,
            format: None,
            message: "Invalid value",
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Inclusive bounds on the trimmed character count.
    pub fn length(mut self, min: usize, max: usize) -> Self {
        self.min = Some(min);
        self.max = Some(max);
        self
    }

    pub fn min_length(mut self, min: usize) -> Self {
        self.min = Some(min);
        self
    }

    pub fn max_length(mut self, max: usize) -> Self {
        self.max = Some(max);
        self
    }

    pub fn format(mut self, format: Format) -> Self {
        self.format = Some(format);
        self
    }

    pub fn message(mut self, message: &'static str) -> Self {
        self.message = message;
        self
    }

    fn violation(&self) -> FieldError {
        FieldError::new(self.field, self.message)
    }

    fn check(&self, body: &Value) -> Option<FieldError> {
        let value = body.get(self.field);
        let value = match value {
            None | Some(Value::Null) => {
                return self.required.then(|| self.violation());
            }
            Some(v) => v,
        };

        let text = match value.as_str() {
            Some(s) => s.trim(),
            None => return Some(self.violation()),
        };

        if let Some(min) = self.min {
            if text.chars().count() < min {
                return Some(self.violation());
            }
        }
        if let Some(max) = self.max {
            if text.chars().count() > max {
                return Some(self.violation());
            }
        }

        match self.format {
            Some(Format::Email) if !looks_like_email(text) => Some(self.violation()),
            Some(Format::StoreId) if Uuid::parse_str(text).is_err() => Some(self.violation()),
            _ => None,
        }
    }
}

fn looks_like_email(text: &str) -> bool {
    if text.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = text.split_once('@') else {
        return false;
    };
    !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
}

#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Evaluate every rule, collecting all violations (not just the first).
    pub fn check(&self, body: &Value) -> Result<(), ApiError> {
        let errors: Vec<FieldError> =
            self.rules.iter().filter_map(|rule| rule.check(body)).collect();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ApiError::validation_error(errors))
        }
    }
}

// Rule sets per endpoint

pub fn post_create_rules() -> RuleSet {
    RuleSet::new()
        .rule(
            Rule::new("title")
                .required()
                .length(1, 100)
                .message("Title must be between 1 and 100 characters"),
        )
        .rule(Rule::new("content").required().min_length(1).message("Content is required"))
        .rule(
            Rule::new("category")
                .required()
                .format(Format::StoreId)
                .message("Valid category ID is required"),
        )
}

/// Update accepts partial bodies: fields keep their create-time constraints
/// but are only validated when present.
pub fn post_update_rules() -> RuleSet {
    RuleSet::new()
        .rule(Rule::new("title").length(1, 100).message("Title must be between 1 and 100 characters"))
        .rule(Rule::new("content").min_length(1).message("Content is required"))
        .rule(Rule::new("category").format(Format::StoreId).message("Valid category ID is required"))
}

pub fn category_rules() -> RuleSet {
    RuleSet::new()
        .rule(
            Rule::new("name")
                .required()
                .length(1, 50)
                .message("Category name must be between 1 and 50 characters"),
        )
        .rule(Rule::new("description").max_length(200).message("Description cannot exceed 200 characters"))
}

pub fn register_rules() -> RuleSet {
    RuleSet::new()
        .rule(Rule::new("name").required().length(1, 50).message("Name must be between 1 and 50 characters"))
        .rule(Rule::new("email").required().format(Format::Email).message("Please provide a valid email"))
        .rule(Rule::new("password").required().min_length(6).message("Password must be at least 6 characters"))
}

pub fn login_rules() -> RuleSet {
    RuleSet::new()
        .rule(Rule::new("email").required().format(Format::Email).message("Please provide a valid email"))
        .rule(Rule::new("password").required().min_length(1).message("Password is required"))
}

pub fn comment_rules() -> RuleSet {
    RuleSet::new()
        .rule(Rule::new("content").required().min_length(1).message("Comment content is required"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn field_errors(err: ApiError) -> Vec<String> {
        match err {
            ApiError::ValidationError(errors) => errors.into_iter().map(|e| e.field).collect(),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn valid_post_body_passes() {
        let body = json!({
            "title": "Hello",
            "content": "World",
            "category": "0a0b0c0d-0000-4000-8000-000000000001"
        });
        assert!(post_create_rules().check(&body).is_ok());
    }

    #[test]
    fn missing_fields_are_all_reported() {
        let err = post_create_rules().check(&json!({})).unwrap_err();
        let fields = field_errors(err);
        assert_eq!(fields, vec!["title", "content", "category"]);
    }

    #[test]
    fn whitespace_only_title_fails() {
        let body = json!({
            "title": "   ",
            "content": "World",
            "category": "0a0b0c0d-0000-4000-8000-000000000001"
        });
        let err = post_create_rules().check(&body).unwrap_err();
        assert_eq!(field_errors(err), vec!["title"]);
    }

    #[test]
    fn category_must_be_a_store_id() {
        let body = json!({ "title": "Hello", "content": "World", "category": "technology" });
        let err = post_create_rules().check(&body).unwrap_err();
        assert_eq!(field_errors(err), vec!["category"]);
    }

    #[test]
    fn update_rules_skip_absent_fields() {
        assert!(post_update_rules().check(&json!({})).is_ok());
        let err = post_update_rules().check(&json!({ "title": "" })).unwrap_err();
        assert_eq!(field_errors(err), vec!["title"]);
    }

    #[test]
    fn category_description_is_optional_but_bounded() {
        assert!(category_rules().check(&json!({ "name": "Tech" })).is_ok());
        let long = "x".repeat(201);
        let err = category_rules()
            .check(&json!({ "name": "Tech", "description": long }))
            .unwrap_err();
        assert_eq!(field_errors(err), vec!["description"]);
    }

    #[test]
    fn register_rejects_bad_email_and_short_password() {
        let err = register_rules()
            .check(&json!({ "name": "Jane", "email": "not-an-email", "password": "abc" }))
            .unwrap_err();
        assert_eq!(field_errors(err), vec!["email", "password"]);
    }

    #[test]
    fn email_heuristics() {
        assert!(looks_like_email("jane@example.com"));
        assert!(!looks_like_email("jane@com"));
        assert!(!looks_like_email("@example.com"));
        assert!(!looks_like_email("jane doe@example.com"));
    }

    #[test]
    fn comment_content_must_not_be_whitespace() {
        let err = comment_rules().check(&json!({ "content": "  " })).unwrap_err();
        assert_eq!(field_errors(err), vec!["content"]);
    }
}
