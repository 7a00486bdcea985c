// src/bookmarks/validators.rs

use std::collections::HashSet;

use super::models::{CreateBookmarkRequest, UpdateBookmarkRequest};
use crate::common::{ValidationResult, Validator};

pub const MAX_TITLE_LEN: usize = 255;
pub const MAX_URL_LEN: usize = 2048;
pub const MAX_DESCRIPTION_LEN: usize = 10_000;
pub const MAX_TAG_LEN: usize = 40;

pub struct BookmarkValidator;

impl Validator<CreateBookmarkRequest> for BookmarkValidator {
    fn validate(&self, data: &CreateBookmarkRequest) -> ValidationResult {
        let mut result = ValidationResult::new();

        validate_title(&mut result, &data.title);
        validate_url_field(&mut result, &data.url);

        if let Some(description) = &data.description {
            validate_description(&mut result, description);
        }

        if let Some(tags) = &data.tags {
            validate_tags(&mut result, tags);
        }

        result
    }
}

// Updates validate only the fields that are present
impl Validator<UpdateBookmarkRequest> for BookmarkValidator {
    fn validate(&self, data: &UpdateBookmarkRequest) -> ValidationResult {
        let mut result = ValidationResult::new();

        if let Some(title) = &data.title {
            validate_title(&mut result, title);
        }

        if let Some(url) = &data.url {
            validate_url_field(&mut result, url);
        }

        if let Some(description) = &data.description {
            validate_description(&mut result, description);
        }

        if let Some(tags) = &data.tags {
            validate_tags(&mut result, tags);
        }

        result
    }
}

fn validate_title(result: &mut ValidationResult, title: &str) {
    if title.trim().is_empty() {
        result.add_error("title", "Title is required");
    } else if title.len() > MAX_TITLE_LEN {
        result.add_error("title", "Title must not exceed 255 characters");
    }
}

fn validate_url_field(result: &mut ValidationResult, url: &str) {
    if url.trim().is_empty() {
        result.add_error("url", "URL is required");
    } else if url.len() > MAX_URL_LEN {
        result.add_error("url", "URL must not exceed 2048 characters");
    } else if parse_url(url).is_none() {
        result.add_error("url", "URL must include a scheme and host");
    }
}

fn validate_description(result: &mut ValidationResult, description: &str) {
    if description.len() > MAX_DESCRIPTION_LEN {
        result.add_error(
            "description",
            "Description must not exceed 10000 characters",
        );
    }
}

fn validate_tags(result: &mut ValidationResult, tags: &[String]) {
    for tag in tags {
        if tag.trim().len() > MAX_TAG_LEN {
            result.add_error("tags", "Tags must not exceed 40 characters");
            break;
        }
    }
}

/// Parse and require a scheme plus host
pub fn parse_url(value: &str) -> Option<reqwest::Url> {
    let url = reqwest::Url::parse(value.trim()).ok()?;
    if url.has_host() {
        Some(url)
    } else {
        None
    }
}

/// Trim, lowercase, drop blanks, dedupe preserving first-seen order
pub fn normalize_tags(tags: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut normalized = Vec::new();
    for tag in tags {
        let cleaned = tag.trim().to_lowercase();
        if cleaned.is_empty() {
            continue;
        }
        if seen.insert(cleaned.clone()) {
            normalized.push(cleaned);
        }
    }
    normalized
}
