use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{Result, SchemaError};

fn id1_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\S+?\d+\S*$").expect("static regex"))
}

fn id2_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^.{3}\s.{5}$").expect("static regex"))
}

/// Course number, e.g. `CSIE1212`: a prefix, digits, an optional suffix,
/// no whitespace.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Id1(String);

impl Id1 {
    pub fn parse(s: impl Into<String>) -> Result<Self> {
        let s = s.into();
        if id1_re().is_match(&s) {
            Ok(Self(s))
        } else {
            Err(SchemaError::Id1(s))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Course identifier code, e.g. `902 10750` (note the space).
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Id2(String);

impl Id2 {
    pub fn parse(s: impl Into<String>) -> Result<Self> {
        let s = s.into();
        if id2_re().is_match(&s) {
            Ok(Self(s))
        } else {
            Err(SchemaError::Id2(s))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

macro_rules! string_newtype_impls {
    ($t:ty) => {
        impl TryFrom<String> for $t {
            type Error = SchemaError;
            fn try_from(s: String) -> Result<Self> {
                Self::parse(s)
            }
        }

        impl From<$t> for String {
            fn from(v: $t) -> String {
                v.0
            }
        }

        impl fmt::Display for $t {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

string_newtype_impls!(Id1);
string_newtype_impls!(Id2);

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    pub id1: Id1,
    pub id2: Id2,
    pub title: String,
}

impl Course {
    pub fn new(id1: Id1, id2: Id2, title: impl Into<String>) -> Self {
        Self { id1, id2, title: title.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id1_accepts_department_prefix_and_digits() {
        assert!(Id1::parse("CSIE1212").is_ok());
        assert!(Id1::parse("MATH4006").is_ok());
        assert_eq!(Id1::parse("CSIE"), Err(SchemaError::Id1("CSIE".into())));
        assert!(Id1::parse("").is_err());
    }

    #[test]
    fn ids_match_whole_string() {
        assert!(Id1::parse("EE5184A").is_ok());
        assert!(Id1::parse("CSIE1212 extra").is_err());
        assert!(Id1::parse(" CSIE1212").is_err());
        assert!(Id2::parse("902 10750 ").is_err());
        assert!(Id2::parse("x902 10750").is_err());
    }

    #[test]
    fn id2_requires_space_in_fourth_position() {
        assert!(Id2::parse("902 10750").is_ok());
        assert!(Id2::parse("90210750").is_err());
        assert!(Id2::parse("902 1075").is_err());
    }

    #[test]
    fn course_rejects_bad_ids_on_decode() {
        let bad = r#"{"id1":"CSIE","id2":"902 10750","title":"Data Structures"}"#;
        assert!(serde_json::from_str::<Course>(bad).is_err());
    }
}
