use std::fmt;
use std::str::FromStr;

use serde::de::{self, IgnoredAny, SeqAccess, Visitor};
use serde::ser::SerializeTuple;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{Result, SchemaError};

pub const MIN_YEAR: u16 = 90;
pub const MAX_YEAR: u16 = 130;

/// Academic term marker: (year, term), e.g. `111-2`.
///
/// Serialized as a two-element array `[111, 2]`. Decoding also accepts the
/// `"111-2"` string form used in URLs and config.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Semester {
    year: u16,
    term: u8,
}

impl Semester {
    pub fn new(year: u16, term: u8) -> Result<Self> {
        if !(MIN_YEAR..=MAX_YEAR).contains(&year) {
            return Err(SchemaError::Semester(format!(
                "year {year} outside {MIN_YEAR}..={MAX_YEAR}"
            )));
        }
        if !(1..=2).contains(&term) {
            return Err(SchemaError::Semester(format!("term {term} outside 1..=2")));
        }
        Ok(Self { year, term })
    }

    pub fn year(&self) -> u16 {
        self.year
    }

    pub fn term(&self) -> u8 {
        self.term
    }
}

impl fmt::Display for Semester {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.year, self.term)
    }
}

impl FromStr for Semester {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self> {
        let bad = || SchemaError::Semester(format!("expected \"<year>-<term>\", got {s:?}"));
        let (a, b) = s.trim().split_once('-').ok_or_else(bad)?;
        let year = a.parse::<u16>().map_err(|_| bad())?;
        let term = b.parse::<u8>().map_err(|_| bad())?;
        Self::new(year, term)
    }
}

impl Serialize for Semester {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut t = serializer.serialize_tuple(2)?;
        t.serialize_element(&self.year)?;
        t.serialize_element(&self.term)?;
        t.end()
    }
}

struct SemesterVisitor;

impl<'de> Visitor<'de> for SemesterVisitor {
    type Value = Semester;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a [year, term] pair or a \"year-term\" string")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<Semester, E> {
        v.parse().map_err(E::custom)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> std::result::Result<Semester, A::Error> {
        let year: u16 = seq
            .next_element()?
            .ok_or_else(|| de::Error::invalid_length(0, &self))?;
        let term: u8 = seq
            .next_element()?
            .ok_or_else(|| de::Error::invalid_length(1, &self))?;
        if seq.next_element::<IgnoredAny>()?.is_some() {
            return Err(de::Error::invalid_length(3, &self));
        }
        Semester::new(year, term).map_err(de::Error::custom)
    }
}

impl<'de> Deserialize<'de> for Semester {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserializer.deserialize_any(SemesterVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_displays_dash_form() {
        let s: Semester = "111-2".parse().unwrap();
        assert_eq!((s.year(), s.term()), (111, 2));
        assert_eq!(s.to_string(), "111-2");
    }

    #[test]
    fn rejects_out_of_range() {
        assert!(Semester::new(89, 1).is_err());
        assert!(Semester::new(131, 1).is_err());
        assert!(Semester::new(111, 3).is_err());
        assert!("111".parse::<Semester>().is_err());
        assert!("abc-1".parse::<Semester>().is_err());
    }

    #[test]
    fn decodes_pair_and_string() {
        let a: Semester = serde_json::from_str("[110, 1]").unwrap();
        let b: Semester = serde_json::from_str("\"110-1\"").unwrap();
        assert_eq!(a, b);
        assert_eq!(serde_json::to_string(&a).unwrap(), "[110,1]");
    }

    #[test]
    fn rejects_wrong_arity() {
        assert!(serde_json::from_str::<Semester>("[110]").is_err());
        assert!(serde_json::from_str::<Semester>("[110, 1, 2]").is_err());
        assert!(serde_json::from_str::<Semester>("[]").is_err());
    }

    #[test]
    fn orders_by_year_then_term() {
        let a = Semester::new(110, 2).unwrap();
        let b = Semester::new(111, 1).unwrap();
        assert!(a < b);
    }
}
