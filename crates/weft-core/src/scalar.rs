#![forbid(unsafe_code)]

//! Plain values written to the render surface.

use std::fmt;
use std::rc::Rc;

/// A plain (non-directive) value.
///
/// Equality follows `Object.is` semantics: floats compare by bit pattern, so
/// `NaN == NaN` and `0.0 != -0.0`.
#[derive(Debug, Clone, Default)]
pub enum Scalar {
    #[default]
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Rc<str>),
}

impl Scalar {
    /// Whether this value means "absent" for attribute writes.
    #[must_use]
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::None | Self::Bool(false))
    }

    /// String form used for attribute and text writes.
    ///
    /// `None` renders as the empty string.
    #[must_use]
    pub fn to_text(&self) -> String {
        match self {
            Self::None => String::new(),
            Self::Bool(b) => b.to_string(),
            Self::Int(i) => i.to_string(),
            Self::Float(f) => f.to_string(),
            Self::Str(s) => s.to_string(),
        }
    }
}

impl PartialEq for Scalar {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::None, Self::None) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a.to_bits() == b.to_bits(),
            (Self::Str(a), Self::Str(b)) => Rc::ptr_eq(a, b) || a == b,
            _ => false,
        }
    }
}

impl Eq for Scalar {}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}

impl From<()> for Scalar {
    fn from((): ()) -> Self {
        Self::None
    }
}

impl From<bool> for Scalar {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for Scalar {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for Scalar {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<u32> for Scalar {
    fn from(v: u32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<usize> for Scalar {
    fn from(v: usize) -> Self {
        Self::Int(i64::try_from(v).unwrap_or(i64::MAX))
    }
}

impl From<f64> for Scalar {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for Scalar {
    fn from(v: &str) -> Self {
        Self::Str(Rc::from(v))
    }
}

impl From<String> for Scalar {
    fn from(v: String) -> Self {
        Self::Str(Rc::from(v))
    }
}

impl From<Rc<str>> for Scalar {
    fn from(v: Rc<str>) -> Self {
        Self::Str(v)
    }
}

impl<T: Into<Scalar>> From<Option<T>> for Scalar {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::None, Into::into)
    }
}
