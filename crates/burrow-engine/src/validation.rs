use crate::error::{EngineError, FieldErrors, Result};
use burrow_core::RecordId;
use regex::Regex;
use std::sync::LazyLock;

pub const MAX_URL_LENGTH: usize = 2000;
pub const MAX_DESCRIPTION_LENGTH: usize = 100;
pub const MAX_PAGE_PARAMETER: i64 = 10_000;

/// OWASP URL pattern: web, ftp, gopher, telnet and nntp schemes plus
/// `mailto:` and `news:`. The optional tail is a punctuation mark followed by
/// one of the literal characters `:abkln`; whitespace is never accepted.
static URL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^((((https?|ftps?|gopher|telnet|nntp)://)|(mailto:|news:))(%[0-9A-Fa-f]{2}|[-()_.!~*';/?:@&=+$,A-Za-z0-9])+)([).!';/?:,][:abkln])?$",
    )
    .expect("URL pattern is a valid regex")
});

/// Caller-supplied fields of a new short URL.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShortUrlInput {
    pub url: Option<String>,
    pub description: Option<String>,
}

impl ShortUrlInput {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// A [`ShortUrlInput`] that passed validation.
#[derive(Debug, Clone)]
pub(crate) struct ValidatedInput {
    pub url: String,
    pub description: Option<String>,
}

/// Checks every field and reports all violations at once.
pub(crate) fn validate_input(input: ShortUrlInput) -> std::result::Result<ValidatedInput, FieldErrors> {
    let mut errors = FieldErrors::new();

    match input.url.as_deref() {
        None => errors.push("url", None, "url is required"),
        Some(url) if url.trim().is_empty() => errors.push("url", Some(url), "url is required"),
        Some(url) => {
            if !URL_PATTERN.is_match(url) {
                errors.push("url", Some(url), "url is invalid");
            }
            if url.chars().count() > MAX_URL_LENGTH {
                errors.push("url", Some(url), "url is too long, 2000 max");
            }
        }
    }

    if let Some(description) = input.description.as_deref() {
        if description.chars().count() > MAX_DESCRIPTION_LENGTH {
            errors.push("description", Some(description), "description is too long");
        }
    }

    match input.url {
        Some(url) if errors.is_empty() => Ok(ValidatedInput {
            url,
            description: input.description,
        }),
        _ => Err(errors),
    }
}

pub(crate) fn parse_record_id(id: &str) -> Result<RecordId> {
    Ok(RecordId::parse(id)?)
}

/// Validates listing parameters and narrows them to the store's types.
pub(crate) fn page_request(page: i64, size: i64) -> Result<(u32, u32)> {
    let page = bounded("page", page, 0)?;
    let size = bounded("size", size, 1)?;
    Ok((page, size))
}

fn bounded(name: &str, value: i64, min: i64) -> Result<u32> {
    if !(min..=MAX_PAGE_PARAMETER).contains(&value) {
        return Err(EngineError::InvalidParameter(format!(
            "{name} must be between {min} and {MAX_PAGE_PARAMETER}, got {value}"
        )));
    }
    u32::try_from(value).map_err(|e| EngineError::InvalidParameter(format!("{name}: {e}")))
}
