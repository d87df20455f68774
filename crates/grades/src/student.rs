use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Result, SchemaError};

/// Student number, normalized to a leading capital: `b10401006 -> B10401006`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StudentId(String);

impl StudentId {
    pub const LEN: usize = 9;

    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.len() != Self::LEN || !s.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(SchemaError::StudentId(s.to_string()));
        }
        let lower = s.to_ascii_lowercase();
        let mut out = String::with_capacity(Self::LEN);
        let mut chars = lower.chars();
        if let Some(first) = chars.next() {
            out.push(first.to_ascii_uppercase());
        }
        out.extend(chars);
        Ok(Self(out))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for StudentId {
    type Error = SchemaError;
    fn try_from(s: String) -> Result<Self> {
        Self::parse(&s)
    }
}

impl From<StudentId> for String {
    fn from(v: StudentId) -> String {
        v.0
    }
}

impl fmt::Display for StudentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_case() {
        assert_eq!(StudentId::parse("b10401006").unwrap().as_str(), "B10401006");
        assert_eq!(StudentId::parse("R11922ABC").unwrap().as_str(), "R11922abc");
    }

    #[test]
    fn rejects_wrong_length_or_symbols() {
        assert!(StudentId::parse("b1040100").is_err());
        assert!(StudentId::parse("b104010066").is_err());
        assert!(StudentId::parse("b1040-006").is_err());
    }
}
