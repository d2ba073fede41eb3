//! Filename template validation and formatting
//!
//! A template is a string carrying the five tokens `DD`, `MM`, `YYYY`, `ART`
//! and `BETREFF` interleaved with literal separator text. Formatting is a
//! pure, total function over a validated template: tokens are substituted
//! with the item's display fields and the result always ends in `.pdf`.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::app::source::DocumentFields;
use crate::constants::templates;
use crate::errors::TemplateError;

/// A validated filename template
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FilenameTemplate(String);

impl FilenameTemplate {
    /// Validate a raw template string
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError::MissingToken`] naming the first required
    /// token absent from the input.
    pub fn parse(raw: impl Into<String>) -> Result<Self, TemplateError> {
        let raw = raw.into();
        for token in templates::REQUIRED_TOKENS {
            if !raw.contains(token) {
                return Err(TemplateError::MissingToken { token });
            }
        }
        Ok(Self(raw))
    }

    /// The template every installation starts out with
    pub fn default_template() -> Self {
        Self(templates::DEFAULT_TEMPLATE.to_string())
    }

    /// Raw template string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Produce the destination filename for one item's display fields
    ///
    /// Each token is replaced exactly once, scanning in the fixed order DD,
    /// MM, YYYY, ART, BETREFF. Category and subject are sanitized for
    /// filesystem safety; the date fields are inserted verbatim (they are
    /// assumed numeric already).
    pub fn format(&self, fields: &DocumentFields) -> String {
        let mut name = self.0.clone();
        name = replace_once(&name, templates::TOKEN_DAY, &fields.day);
        name = replace_once(&name, templates::TOKEN_MONTH, &fields.month);
        name = replace_once(&name, templates::TOKEN_YEAR, &fields.year);
        name = replace_once(&name, templates::TOKEN_CATEGORY, &sanitize(&fields.category));
        name = replace_once(&name, templates::TOKEN_SUBJECT, &sanitize(&fields.subject));
        name.push_str(templates::FILE_EXTENSION);
        name
    }
}

impl Default for FilenameTemplate {
    fn default() -> Self {
        Self::default_template()
    }
}

impl fmt::Display for FilenameTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for FilenameTemplate {
    type Error = TemplateError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<FilenameTemplate> for String {
    fn from(template: FilenameTemplate) -> Self {
        template.0
    }
}

fn replace_once(input: &str, token: &str, value: &str) -> String {
    input.replacen(token, value, 1)
}

/// Replace every character outside `[A-Za-z0-9ÄÖÜäöüß]` with `_`
fn sanitize(value: &str) -> String {
    value
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, 'Ä' | 'Ö' | 'Ü' | 'ä' | 'ö' | 'ü' | 'ß') {
                c
            } else {
                '_'
            }
        })
        .collect()
}
