use thiserror::Error;

/// Validation failures raised while decoding or constructing a rule.
///
/// Construction is the only fallible stage: once a rule has validated,
/// deadline evaluation is total and never reports an error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuleError {
    /// The text does not start with a recognized rule prefix.
    #[error("Unrecognized rule format")]
    UnknownFormat,

    /// The text length does not match the recognized prefix's fixed width.
    #[error("Wrong rule length: expected {expected}, got {got}")]
    Length { expected: usize, got: usize },

    /// A fixed delimiter slot holds the wrong character.
    #[error("Bad delimiter at position {pos}")]
    Delimiter { pos: usize },

    /// A numeric slot holds a non-digit character.
    #[error("Expected a digit at position {pos}")]
    Digit { pos: usize },

    /// A field value is outside its permitted range.
    #[error("Field {field} out of range: {value}")]
    OutOfRange { field: &'static str, value: u32 },

    /// The (day, month) pair can never form a calendar date.
    #[error("No calendar date for day {day} in month {month}")]
    InvalidDate { day: u8, month: u8 },

    /// Every field is zero and no wildcard is set, so the rule can never fire.
    #[error("Rule never fires (all fields zero)")]
    NonWorking,
}

pub type Result<T> = std::result::Result<T, RuleError>;
