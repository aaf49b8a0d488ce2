use crate::codec;
use crate::error::{CoreError, Result};
use crate::key::CompositeKey;
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// A validated, externally visible short code.
///
/// Short codes are 3-32 characters long and contain only characters of the
/// base62 alphabet.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ShortCode(String);

const MIN_LENGTH: usize = 3;
const MAX_LENGTH: usize = 32;

impl ShortCode {
    /// Creates a new `ShortCode` after validating the input.
    pub fn new(code: impl Into<String>) -> Result<Self> {
        let code = code.into();
        Self::validate(&code)?;
        Ok(Self(code))
    }

    /// Encodes a composite key into its short code.
    pub fn from_key(key: &CompositeKey) -> Self {
        Self(codec::encode(&key.to_string()))
    }

    /// Decodes the short code back into the composite key it was minted from.
    ///
    /// A well-formed code can still decode to text that is not a canonical
    /// key (it was never issued); that is reported as
    /// [`CoreError::InvalidKey`]. Leading `'0'` digits decode to the same
    /// key as the code without them, so only the exact encoding of the key
    /// is accepted.
    pub fn to_key(&self) -> Result<CompositeKey> {
        let text = codec::decode(&self.0)?;
        let key = CompositeKey::parse(&text)?;
        if codec::encode(&text) != self.0 {
            return Err(CoreError::InvalidShortCode(format!(
                "'{}' is not the canonical code of key {}",
                self.0, key
            )));
        }
        Ok(key)
    }

    /// Creates a `ShortCode` without validation.
    ///
    /// Use this only for codes produced by trusted internal sources.
    pub fn new_unchecked(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    /// Generates the full shortened URL based on the provided domain prefix.
    pub fn to_url(&self, domain: &str) -> String {
        format!("{}/{}", domain.trim_end_matches('/'), self.0)
    }

    /// Returns the short code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn validate(code: &str) -> Result<()> {
        if code.len() < MIN_LENGTH || code.len() > MAX_LENGTH {
            return Err(CoreError::InvalidShortCode(format!(
                "length must be between {} and {}, got {}",
                MIN_LENGTH,
                MAX_LENGTH,
                code.len()
            )));
        }

        if !code.chars().all(codec::is_alphabet_char) {
            return Err(CoreError::InvalidShortCode(format!(
                "must contain only alphanumeric characters: '{}'",
                code
            )));
        }

        Ok(())
    }
}

impl TryFrom<String> for ShortCode {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<ShortCode> for String {
    fn from(code: ShortCode) -> Self {
        code.0
    }
}

impl Display for ShortCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
