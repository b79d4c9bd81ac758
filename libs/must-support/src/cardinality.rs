//! Element cardinality (`min..max`)

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CardinalityError {
    #[error("max cardinality '{0}' is neither a number nor '*'")]
    InvalidMax(String),

    #[error("min cardinality {min} exceeds max cardinality {max}")]
    Inverted { min: u32, max: u32 },
}

/// Upper bound of a cardinality
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Max {
    Bounded(u32),
    Unbounded,
}

impl FromStr for Max {
    type Err = CardinalityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "*" => Ok(Max::Unbounded),
            other => other
                .parse::<u32>()
                .map(Max::Bounded)
                .map_err(|_| CardinalityError::InvalidMax(s.to_string())),
        }
    }
}

impl fmt::Display for Max {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Max::Bounded(n) => write!(f, "{}", n),
            Max::Unbounded => f.write_str("*"),
        }
    }
}

/// `min..max` with `min <= max` (unbounded counts as infinity)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Cardinality {
    min: u32,
    max: Max,
}

impl Cardinality {
    /// Used when neither the profile nor its base declares a cardinality
    pub const DEFAULT: Cardinality = Cardinality {
        min: 0,
        max: Max::Bounded(1),
    };

    pub fn new(min: u32, max: Max) -> Result<Self, CardinalityError> {
        if let Max::Bounded(max) = max {
            if min > max {
                return Err(CardinalityError::Inverted { min, max });
            }
        }
        Ok(Self { min, max })
    }

    /// Build from ElementDefinition `min` and `max` (`"*"` or a number)
    pub fn parse(min: u32, max: &str) -> Result<Self, CardinalityError> {
        Self::new(min, max.parse()?)
    }

    pub fn min(&self) -> u32 {
        self.min
    }

    pub fn max(&self) -> Max {
        self.max
    }

    pub fn is_unbounded(&self) -> bool {
        self.max == Max::Unbounded
    }
}

impl fmt::Display for Cardinality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.min, self.max)
    }
}
