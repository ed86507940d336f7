use std::error::Error;
use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};

/// Horizontal storage lane. The numbering is for display only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Bay {
    B01,
    B02,
    B03,
    B04,
    B05,
    B06,
    B07,
    B08,
    B09,
    B10,
    B11,
    B12,
    B13,
}

impl Bay {
    pub const COUNT: usize = 13;

    pub const ALL: [Bay; Bay::COUNT] = [
        Bay::B01,
        Bay::B02,
        Bay::B03,
        Bay::B04,
        Bay::B05,
        Bay::B06,
        Bay::B07,
        Bay::B08,
        Bay::B09,
        Bay::B10,
        Bay::B11,
        Bay::B12,
        Bay::B13,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Bay::B01 => "B01",
            Bay::B02 => "B02",
            Bay::B03 => "B03",
            Bay::B04 => "B04",
            Bay::B05 => "B05",
            Bay::B06 => "B06",
            Bay::B07 => "B07",
            Bay::B08 => "B08",
            Bay::B09 => "B09",
            Bay::B10 => "B10",
            Bay::B11 => "B11",
            Bay::B12 => "B12",
            Bay::B13 => "B13",
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }

    /// Exact match against the canonical code, as the wire contract requires.
    pub fn from_code(code: &str) -> Option<Bay> {
        Bay::ALL.into_iter().find(|bay| bay.as_str() == code)
    }
}

/// Vertical stacking position within a bay. `L01` is the bottom.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Level {
    L01,
    L02,
    L03,
    L04,
    L05,
    L06,
    L07,
    L08,
    L09,
    L10,
}

impl Level {
    pub const COUNT: usize = 10;

    pub const ALL: [Level; Level::COUNT] = [
        Level::L01,
        Level::L02,
        Level::L03,
        Level::L04,
        Level::L05,
        Level::L06,
        Level::L07,
        Level::L08,
        Level::L09,
        Level::L10,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Level::L01 => "L01",
            Level::L02 => "L02",
            Level::L03 => "L03",
            Level::L04 => "L04",
            Level::L05 => "L05",
            Level::L06 => "L06",
            Level::L07 => "L07",
            Level::L08 => "L08",
            Level::L09 => "L09",
            Level::L10 => "L10",
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_code(code: &str) -> Option<Level> {
        Level::ALL.into_iter().find(|level| level.as_str() == code)
    }
}

impl fmt::Display for Bay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Bay {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl Serialize for Level {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl FromStr for Bay {
    type Err = GridParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Bay::from_code(&value.trim().to_ascii_uppercase()).ok_or_else(|| GridParseError::Bay {
            value: value.to_string(),
        })
    }
}

impl FromStr for Level {
    type Err = GridParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Level::from_code(&value.trim().to_ascii_uppercase()).ok_or_else(|| GridParseError::Level {
            value: value.to_string(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GridParseError {
    Bay { value: String },
    Level { value: String },
}

impl fmt::Display for GridParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GridParseError::Bay { value } => write!(
                f,
                "Bay is out of range: '{}' (expected {}..{})",
                value,
                Bay::B01,
                Bay::B13
            ),
            GridParseError::Level { value } => write!(
                f,
                "Level is out of range: '{}' (expected {}..{})",
                value,
                Level::L01,
                Level::L10
            ),
        }
    }
}

impl Error for GridParseError {}

#[cfg(test)]
mod tests {
    use super::{Bay, GridParseError, Level};
    use std::str::FromStr;

    #[test]
    fn codes_are_zero_padded_and_ordered() {
        let bays = Bay::ALL.iter().map(|bay| bay.as_str()).collect::<Vec<_>>();
        assert_eq!(bays.first(), Some(&"B01"));
        assert_eq!(bays.last(), Some(&"B13"));
        assert_eq!(bays.len(), 13);

        for (index, level) in Level::ALL.iter().enumerate() {
            assert_eq!(level.index(), index);
            assert_eq!(level.as_str(), format!("L{:02}", index + 1));
        }
    }

    #[test]
    fn parses_trimmed_and_lowercase_input() {
        assert_eq!(Bay::from_str(" b07 ").expect("bay should parse"), Bay::B07);
        assert_eq!(Level::from_str("l10").expect("level should parse"), Level::L10);
    }

    #[test]
    fn from_code_is_exact() {
        assert_eq!(Bay::from_code("B13"), Some(Bay::B13));
        assert_eq!(Bay::from_code("b13"), None);
        assert_eq!(Level::from_code("L1"), None);
        assert_eq!(Level::from_code("L10"), Some(Level::L10));
    }

    #[test]
    fn rejects_out_of_range_identifiers() {
        let err = Bay::from_str("B99").expect_err("B99 is not a bay");
        assert!(matches!(err, GridParseError::Bay { .. }));
        assert!(err.to_string().contains("Bay is out of range"));

        let err = Level::from_str("L11").expect_err("L11 is not a level");
        assert!(err.to_string().contains("'L11'"));
    }
}
