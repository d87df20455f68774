use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{is_percentage, sums_to_hundred, Result, SchemaError};

/// Letter grade. The index runs from `F = 0` up to `A+ = 9` so that segment
/// lists read low to high.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Grade {
    F,
    CMinus,
    C,
    CPlus,
    BMinus,
    B,
    BPlus,
    AMinus,
    A,
    APlus,
}

impl Grade {
    /// Lowest to highest.
    pub const ALL: [Grade; 10] = [
        Grade::F,
        Grade::CMinus,
        Grade::C,
        Grade::CPlus,
        Grade::BMinus,
        Grade::B,
        Grade::BPlus,
        Grade::AMinus,
        Grade::A,
        Grade::APlus,
    ];

    pub const MAX_INDEX: u8 = 9;

    pub fn as_str(&self) -> &'static str {
        match self {
            Grade::F => "F",
            Grade::CMinus => "C-",
            Grade::C => "C",
            Grade::CPlus => "C+",
            Grade::BMinus => "B-",
            Grade::B => "B",
            Grade::BPlus => "B+",
            Grade::AMinus => "A-",
            Grade::A => "A",
            Grade::APlus => "A+",
        }
    }

    pub fn index(&self) -> u8 {
        *self as u8
    }

    pub fn from_index(i: u8) -> Option<Self> {
        Self::ALL.get(i as usize).copied()
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Grade {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        Self::ALL
            .iter()
            .find(|g| g.as_str() == s)
            .copied()
            .ok_or_else(|| SchemaError::Grade(s.to_string()))
    }
}

impl TryFrom<String> for Grade {
    type Error = SchemaError;
    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<Grade> for String {
    fn from(g: Grade) -> String {
        g.as_str().to_string()
    }
}

/// Share of students (percent) below, at, and above a given grade.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "[f64; 3]", into = "[f64; 3]")]
pub struct Dist([f64; 3]);

impl Dist {
    pub fn new(values: [f64; 3]) -> Result<Self> {
        if let Some(v) = values.iter().find(|v| !is_percentage(**v)) {
            return Err(SchemaError::Dist(format!("{v} is not a percentage")));
        }
        if !sums_to_hundred(values) {
            return Err(SchemaError::Dist(format!("{values:?} does not sum to 100")));
        }
        Ok(Self(values))
    }

    pub fn lower(&self) -> f64 {
        self.0[0]
    }

    pub fn same(&self) -> f64 {
        self.0[1]
    }

    pub fn higher(&self) -> f64 {
        self.0[2]
    }

    pub fn values(&self) -> [f64; 3] {
        self.0
    }
}

impl TryFrom<[f64; 3]> for Dist {
    type Error = SchemaError;
    fn try_from(v: [f64; 3]) -> Result<Self> {
        Self::new(v)
    }
}

impl From<Dist> for [f64; 3] {
    fn from(d: Dist) -> Self {
        d.0
    }
}
