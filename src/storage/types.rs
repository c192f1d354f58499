//! core type-safe wrappers for the storage layer.

use std::fmt;
use std::fmt::Formatter;
use std::str::FromStr;

use git2::Oid;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha1::{Digest, Sha1};

/// Content digest of a stored object (blob or commit record).
///
/// The digest is the SHA-1 of the raw object bytes, so two objects share an id
/// exactly when their content is byte-identical. The inner Oid is only
/// accessible within the crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(pub(crate) Oid);

impl ObjectId {
    /// number of hex characters in a full digest
    pub const HEX_LEN: usize = 40;

    /// number of hex characters used for the shard directory
    pub const SHARD_LEN: usize = 2;

    /// hash raw content into its digest
    pub fn for_content(content: &[u8]) -> Result<Self, git2::Error> {
        let digest = Sha1::digest(content);
        Oid::from_bytes(digest.as_slice()).map(ObjectId)
    }

    /// parse an ObjectId from a full 40-character hex string
    pub fn from_hex(hex: &str) -> Result<Self, InvalidObjectId> {
        let hex = hex.trim();
        if hex.len() != Self::HEX_LEN {
            return Err(InvalidObjectId::WrongLength(hex.len()));
        }
        validate_hex(hex)?;

        Oid::from_str(hex)
            .map(ObjectId)
            .map_err(|_| InvalidObjectId::NotHex(hex.to_string()))
    }

    /// full lowercase hex form
    pub fn to_hex(&self) -> String {
        self.0.to_string()
    }

    /// short form of the digest
    pub fn short(&self) -> String {
        self.to_hex()[..7].to_string()
    }

    /// split the hex form into (shard directory, file name)
    pub fn shard(&self) -> (String, String) {
        let hex = self.to_hex();
        let (dir, file) = hex.split_at(Self::SHARD_LEN);
        (dir.to_string(), file.to_string())
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ObjectId {
    type Err = InvalidObjectId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl Serialize for ObjectId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ObjectId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let hex = String::deserialize(deserializer)?;
        ObjectId::from_hex(&hex).map_err(serde::de::Error::custom)
    }
}

/// check that every character is a hex digit
pub(crate) fn validate_hex(hex: &str) -> Result<(), InvalidObjectId> {
    if hex.is_empty() {
        return Err(InvalidObjectId::Empty);
    }

    match hex.char_indices().find(|(_, c)| !c.is_ascii_hexdigit()) {
        Some((position, char)) => Err(InvalidObjectId::InvalidCharacter { char, position }),
        None => Ok(()),
    }
}

/// A path-to-digest mapping recorded before it is bundled into a commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StagedFile {
    /// path relative to the working directory, `/`-separated
    pub path: String,
    /// digest of the file content at the time it was staged
    #[serde(rename = "digest")]
    pub id: ObjectId,
}

impl StagedFile {
    pub fn new(path: impl Into<String>, id: ObjectId) -> Self {
        Self {
            path: path.into(),
            id,
        }
    }
}

/// Error returned when a digest string is malformed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvalidObjectId {
    Empty,
    WrongLength(usize),
    TooShort(usize),
    InvalidCharacter { char: char, position: usize },
    NotHex(String),
}

impl fmt::Display for InvalidObjectId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            InvalidObjectId::Empty => write!(f, "digest cannot be empty"),
            InvalidObjectId::WrongLength(len) => write!(
                f,
                "digest must be {} hex characters, got {}",
                ObjectId::HEX_LEN,
                len
            ),
            InvalidObjectId::TooShort(len) => write!(
                f,
                "abbreviated digest needs at least {} characters, got {}",
                crate::storage::blob::MIN_PREFIX_LEN,
                len
            ),
            InvalidObjectId::InvalidCharacter { char, position } => {
                write!(f, "invalid character '{}' at position {}", char, position)
            }
            InvalidObjectId::NotHex(s) => write!(f, "not a hex digest: {}", s),
        }
    }
}

impl std::error::Error for InvalidObjectId {}
