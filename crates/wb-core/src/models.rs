//! # Domain Models
//!
//! These structs represent the core entities of Wordbook.
//! Identifiers are opaque strings: new lists and words get UUID v7 ids,
//! legacy words keep the word text they were keyed by.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::document::Document;
use crate::error::{AppError, Result};

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_owned())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }
    };
}

string_id!(
    /// Opaque identity supplied by the external auth collaborator.
    UserId
);
string_id!(ListId);
string_id!(WordId);

/// Language tag of a list (and of a legacy word).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Japanese,
    English,
}

impl Language {
    /// Migration order of the legacy language tags.
    pub const ALL: [Language; 2] = [Language::Japanese, Language::English];

    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Japanese => "japanese",
            Language::English => "english",
        }
    }

    /// Name of the list synthesized when legacy words of this language are migrated.
    pub fn default_list_name(&self) -> &'static str {
        match self {
            Language::Japanese => "기본 일본어 단어장",
            Language::English => "기본 영어 단어장",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Language {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "japanese" => Ok(Language::Japanese),
            "english" => Ok(Language::English),
            other => Err(AppError::ValidationError(format!(
                "unsupported language '{other}'"
            ))),
        }
    }
}

/// A named, language-tagged grouping of words owned by one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VocabularyList {
    pub id: ListId,
    pub name: String,
    pub language: Language,
    pub created_at: DateTime<Utc>,
}

/// A vocabulary entry nested under a list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Word {
    pub id: WordId,
    pub word: String,
    pub meaning: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub part_of_speech: Option<String>,
    /// Empty when no image is attached; otherwise the live blob's download URL.
    #[serde(default)]
    pub image_url: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Word {
    pub fn has_image(&self) -> bool {
        !self.image_url.is_empty()
    }
}

/// Pre-migration word shape: stored flat under the user, keyed by its own
/// text and tagged with a language. Readable and convertible, never written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyWord {
    pub id: String,
    #[serde(default)]
    pub word: String,
    #[serde(default)]
    pub meaning: String,
    #[serde(default)]
    pub language: Option<Language>,
    /// Every other stored field (createdAt, partOfSpeech, imageUrl, ...).
    #[serde(flatten)]
    pub extra: Document,
}

impl LegacyWord {
    /// Converts into the list-nested shape, preserving all stored fields.
    ///
    /// The document id is kept; `createdAt` is filled in with `migrated_at`
    /// for records written before that field existed.
    pub fn into_list_word(self, migrated_at: DateTime<Utc>) -> Result<(WordId, Document)> {
        let id = WordId::new(self.id.clone());
        let mut fields = crate::document::to_document(&self)?;
        if !fields.contains_key("createdAt") {
            fields.insert("createdAt".into(), serde_json::to_value(migrated_at)?);
        }
        Ok((id, fields))
    }
}

/// User-supplied image input, tagged at the point of entry.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "camelCase")]
pub enum ImageSource {
    /// No image (or the image was cleared).
    #[default]
    None,
    /// A final `data:image/...;base64,` URL produced by the client.
    FileBytes(String),
    /// A remote http(s) URL, or an already-attached download URL.
    RemoteUrl(String),
}

impl ImageSource {
    /// Raw value compared against a word's current `imageUrl`.
    pub fn as_str(&self) -> &str {
        match self {
            ImageSource::None => "",
            ImageSource::FileBytes(data_url) => data_url,
            ImageSource::RemoteUrl(url) => url,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.as_str().trim().is_empty()
    }

    /// Checks the input shape without touching any backend: file bytes must
    /// decode as an image data URL, remote URLs must be http(s).
    pub fn validate(&self) -> Result<()> {
        if self.is_empty() {
            return Ok(());
        }
        match self {
            ImageSource::None => Ok(()),
            ImageSource::FileBytes(data_url) => crate::data_url::DataUrl::parse(data_url).map(|_| ()),
            ImageSource::RemoteUrl(url) => {
                let url = url.trim().to_ascii_lowercase();
                if url.starts_with("http://") || url.starts_with("https://") {
                    Ok(())
                } else {
                    Err(AppError::ValidationError(
                        "image URL must use http or https".into(),
                    ))
                }
            }
        }
    }
}

/// Request-scoped caller identity, passed explicitly into every operation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    user: Option<UserId>,
}

impl RequestContext {
    pub fn authenticated(user: UserId) -> Self {
        Self { user: Some(user) }
    }

    pub fn anonymous() -> Self {
        Self { user: None }
    }

    pub fn user(&self) -> Option<&UserId> {
        self.user.as_ref()
    }

    /// The current user, or `AuthRequired` when there is no session.
    pub fn user_id(&self) -> Result<&UserId> {
        self.user.as_ref().ok_or(AppError::AuthRequired)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_sources_are_checked_before_use() {
        assert!(ImageSource::None.validate().is_ok());
        assert!(ImageSource::RemoteUrl("  ".into()).validate().is_ok());
        assert!(ImageSource::FileBytes("data:image/png;base64,iVBORw0KGgo=".into())
            .validate()
            .is_ok());
        assert!(ImageSource::RemoteUrl("HTTPS://images.example/cat.jpg".into())
            .validate()
            .is_ok());

        for bad in [
            ImageSource::FileBytes("data:text/plain;base64,aGk=".into()),
            ImageSource::RemoteUrl("ftp://images.example/cat.jpg".into()),
        ] {
            assert!(matches!(bad.validate(), Err(AppError::ValidationError(_))));
        }
    }
}
