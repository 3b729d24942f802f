use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum LessonKeyError {
    #[error("lesson key must look like `<module>-<order>`, got `{0}`")]
    Malformed(String),

    #[error("lesson order must be >= 1")]
    ZeroOrder,
}

/// Progress identity of a lesson: `(module index, authored lesson order)`.
///
/// Completions are recorded under this key rather than the lesson's own id,
/// so a key is only meaningful against the course tree it was computed from.
/// The textual form is `"{module_index}-{order}"` and is what travels over
/// the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LessonKey {
    module_index: usize,
    order: u32,
}

impl LessonKey {
    /// Builds a key from a 0-based module index and a 1-based lesson order.
    ///
    /// # Errors
    ///
    /// Returns `LessonKeyError::ZeroOrder` if `order` is 0.
    pub fn new(module_index: usize, order: u32) -> Result<Self, LessonKeyError> {
        if order == 0 {
            return Err(LessonKeyError::ZeroOrder);
        }
        Ok(Self {
            module_index,
            order,
        })
    }

    #[must_use]
    pub fn module_index(&self) -> usize {
        self.module_index
    }

    #[must_use]
    pub fn order(&self) -> u32 {
        self.order
    }
}

impl fmt::Display for LessonKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.module_index, self.order)
    }
}

impl FromStr for LessonKey {
    type Err = LessonKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || LessonKeyError::Malformed(s.to_owned());
        let (module, order) = s.trim().split_once('-').ok_or_else(malformed)?;
        let module_index = module.parse::<usize>().map_err(|_| malformed())?;
        let order = order.parse::<u32>().map_err(|_| malformed())?;
        Self::new(module_index, order)
    }
}

impl TryFrom<String> for LessonKey {
    type Error = LessonKeyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<LessonKey> for String {
    fn from(key: LessonKey) -> Self {
        key.to_string()
    }
}
