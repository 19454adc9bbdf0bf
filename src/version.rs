//! Entity tag (ETag) types for optimistic concurrency control.
//!
//! An entity tag is an opaque string identifying a specific version of an
//! entity's content. Tags are either supplied externally (a database row
//! version, a timestamp) or derived deterministically from content using
//! SHA-256 hashing, so two snapshots with equal content always produce equal
//! tags.
//!
//! # Type-Safe Format Management
//!
//! Phantom types distinguish the HTTP ETag wire format from the raw internal
//! format at compile time, preventing format confusion:
//!
//! * [`HttpTag`] - HTTP ETag format (`W/"abc123"`)
//! * [`RawTag`] - Internal raw format (`abc123`)
//!
//! # Basic Usage
//!
//! ```rust
//! use coreex::version::{RawTag, HttpTag};
//!
//! // Derive a tag from content (deterministic)
//! let snapshot = br#"{"id":1,"name":"X"}"#;
//! let tag = RawTag::from_content(snapshot);
//! assert_eq!(tag, RawTag::from_content(snapshot));
//!
//! // Parse a client-supplied If-Match header
//! let supplied: HttpTag = "W/\"abc123\"".parse().unwrap();
//!
//! // Render an ETag response header
//! let header = HttpTag::from(tag.clone()).to_string();
//!
//! // Equality works across formats
//! let matches = supplied == RawTag::from_opaque("abc123");
//! assert!(matches);
//! ```

use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::{fmt, marker::PhantomData, str::FromStr};
use thiserror::Error;

// Phantom type markers for format distinction
#[derive(Debug, Clone, Copy)]
pub struct Http;

#[derive(Debug, Clone, Copy)]
pub struct Raw;

/// Opaque entity tag with compile-time format safety.
///
/// The internal representation stays opaque; the only supported business
/// operation is equality comparison. Tags can be created from:
/// - content bytes (deterministic hash-based generation),
/// - a JSON value (canonical serialization, then hashed),
/// - an externally supplied opaque string.
#[derive(Debug, Clone, Eq, Hash)]
pub struct EntityTag<Format> {
    /// Opaque tag value
    opaque: String,
    /// Phantom marker for compile-time format distinction
    _format: PhantomData<Format>,
}

/// Type alias for HTTP ETag format tags (`W/"abc123"`)
pub type HttpTag = EntityTag<Http>;

/// Type alias for raw internal format tags (`abc123`)
pub type RawTag = EntityTag<Raw>;

// Core constructors (always produce Raw format as the canonical form)
impl<Format> EntityTag<Format> {
    /// Derive a tag from entity content.
    ///
    /// Generates a deterministic hash-based tag: identical content always
    /// yields an identical tag, regardless of where or when it is computed.
    pub fn from_content(content: &[u8]) -> RawTag {
        let mut hasher = Sha256::new();
        hasher.update(content);
        let hash = hasher.finalize();
        // First 8 hash bytes keep the ETag short while staying collision-safe
        // for version-comparison purposes.
        let encoded = BASE64.encode(&hash[..8]);

        EntityTag {
            opaque: encoded,
            _format: PhantomData,
        }
    }

    /// Derive a tag from a JSON value via its canonical serialization.
    pub fn from_json(value: &Value) -> RawTag {
        Self::from_content(value.to_string().as_bytes())
    }

    /// Create a tag from an externally supplied opaque string.
    ///
    /// Used when the storage layer has its own versioning scheme (row
    /// versions, sequence numbers, timestamps).
    pub fn from_opaque(opaque: impl AsRef<str>) -> RawTag {
        EntityTag {
            opaque: opaque.as_ref().to_string(),
            _format: PhantomData,
        }
    }

    /// Get the opaque tag string.
    ///
    /// For diagnostics only; business logic should rely solely on equality.
    pub fn as_str(&self) -> &str {
        &self.opaque
    }
}

impl fmt::Display for EntityTag<Raw> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.opaque)
    }
}

// HTTP format renders as a weak ETag header value
impl fmt::Display for EntityTag<Http> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "W/\"{}\"", self.opaque)
    }
}

impl FromStr for EntityTag<Raw> {
    type Err = TagError;

    fn from_str(tag_str: &str) -> Result<Self, Self::Err> {
        let trimmed = tag_str.trim();

        if trimmed.is_empty() {
            return Err(TagError::Parse("tag string cannot be empty".to_string()));
        }

        Ok(EntityTag {
            opaque: trimmed.to_string(),
            _format: PhantomData,
        })
    }
}

// HTTP format parses both weak (W/"...") and strong ("...") ETags
impl FromStr for EntityTag<Http> {
    type Err = TagError;

    fn from_str(header: &str) -> Result<Self, Self::Err> {
        let trimmed = header.trim();

        let value = trimmed.strip_prefix("W/").unwrap_or(trimmed);

        if value.len() < 2 || !value.starts_with('"') || !value.ends_with('"') {
            return Err(TagError::InvalidEtagFormat(header.to_string()));
        }

        let opaque = value[1..value.len() - 1].to_string();

        if opaque.is_empty() {
            return Err(TagError::InvalidEtagFormat(header.to_string()));
        }

        Ok(EntityTag {
            opaque,
            _format: PhantomData,
        })
    }
}

impl From<EntityTag<Raw>> for EntityTag<Http> {
    fn from(raw: EntityTag<Raw>) -> Self {
        EntityTag {
            opaque: raw.opaque,
            _format: PhantomData,
        }
    }
}

impl From<EntityTag<Http>> for EntityTag<Raw> {
    fn from(http: EntityTag<Http>) -> Self {
        EntityTag {
            opaque: http.opaque,
            _format: PhantomData,
        }
    }
}

// Cross-format comparison (tags are equal if opaque strings match)
impl<F1, F2> PartialEq<EntityTag<F2>> for EntityTag<F1> {
    fn eq(&self, other: &EntityTag<F2>) -> bool {
        self.opaque == other.opaque
    }
}

// Serde implementations preserve the opaque string regardless of format
impl<Format> Serialize for EntityTag<Format> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.opaque.serialize(serializer)
    }
}

impl<'de, Format> Deserialize<'de> for EntityTag<Format> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let opaque = String::deserialize(deserializer)?;
        Ok(EntityTag {
            opaque,
            _format: PhantomData,
        })
    }
}

/// Capability for entities that carry their own concurrency tag.
///
/// An entity exposing `Some(tag)` opts into concurrency checking on writes
/// even when the caller has not requested automatic concurrency. Entities
/// without an explicit tag fall back to content-derived generation via
/// [`resolve_tag`].
pub trait Versioned {
    /// The entity's own concurrency tag, if it carries one.
    fn entity_tag(&self) -> Option<RawTag>;
}

/// JSON values expose a tag through their conventional `etag` field.
///
/// This is how a raw JSON merge-patch document carries a concurrency token
/// in its body, alongside an `If-Match`-style request header.
impl Versioned for Value {
    fn entity_tag(&self) -> Option<RawTag> {
        self.get("etag")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(EntityTag::<Raw>::from_opaque)
    }
}

/// Resolve the authoritative tag for a stored value.
///
/// Prefers the value's own tag; otherwise derives one deterministically from
/// the value's serialized content, so identical content always yields an
/// identical tag.
pub fn resolve_tag<T>(value: &T) -> Result<RawTag, serde_json::Error>
where
    T: Versioned + Serialize,
{
    match value.entity_tag() {
        Some(tag) => Ok(tag),
        None => Ok(EntityTag::<Raw>::from_json(&serde_json::to_value(value)?)),
    }
}

/// Errors that can occur parsing entity tags.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TagError {
    /// Invalid ETag header format provided
    #[error("Invalid ETag format: {0}")]
    InvalidEtagFormat(String),

    /// Tag parsing failed
    #[error("Failed to parse tag: {0}")]
    Parse(String),
}
