//! Enum types for the cortex data model.
//!
//! Each enum is a closed set of variants with:
//! - Custom Serialize (as snake_case string)
//! - Custom Deserialize (known variants + synonym normalization; unknown
//!   strings are an error, not a catch-all)
//! - `as_str()`, `parse()`, `Display` and `FromStr` impls
//!
//! Parsers emit kind strings in whatever vocabulary their language uses
//! (`func`, `class`, `struct`, ...). Normalization happens here, at ingress,
//! so the rest of the system only ever sees canonical variants.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Error returned when a string does not name a known enum variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} {value:?} (expected one of: {expected})")]
pub struct ParseEnumError {
    /// Which enum was being parsed (e.g., "entity type").
    pub kind: &'static str,
    /// The rejected input.
    pub value: String,
    /// Comma-separated canonical spellings.
    pub expected: &'static str,
}

// ---------------------------------------------------------------------------
// Macro: defines a closed enum with canonical strings and accepted synonyms.
// ---------------------------------------------------------------------------
macro_rules! define_enum {
    (
        $(#[$meta:meta])*
        $name:ident, kind = $kind:expr, default = $default:ident,
        expected = $expected:expr,
        variants: [
            $( ($variant:ident, $str:expr, [ $( $alias:expr ),* ]) ),+ $(,)?
        ]
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $( $variant, )+
        }

        impl $name {
            /// All variants in declaration order.
            pub const ALL: &'static [$name] = &[ $( Self::$variant, )+ ];

            /// Returns the canonical string representation.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $( Self::$variant => $str, )+
                }
            }

            /// Parses a canonical spelling or any accepted synonym.
            ///
            /// Matching is case-insensitive. Returns `None` for unknown
            /// strings; callers decide whether that is an error.
            pub fn parse(s: &str) -> Option<Self> {
                let lower = s.to_ascii_lowercase();
                match lower.as_str() {
                    $(
                        $str $( | $alias )* => Some(Self::$variant),
                    )+
                    _ => None,
                }
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::$default
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = ParseEnumError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s).ok_or_else(|| ParseEnumError {
                    kind: $kind,
                    value: s.to_owned(),
                    expected: $expected,
                })
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                s.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

define_enum! {
    /// The kind of a code entity.
    ///
    /// Language-specific vocabularies are normalized here: `func`/`fn` map
    /// to [`EntityKind::Function`], `class`/`struct`/`interface`/`enum`/
    /// `trait` to [`EntityKind::Type`], and so on.
    EntityKind, kind = "entity type", default = Function,
    expected = "function, method, type, constant, variable, import",
    variants: [
        (Function, "function", ["func", "fn"]),
        (Method, "method", []),
        (Type, "type", ["class", "struct", "interface", "enum", "trait"]),
        (Constant, "constant", ["const"]),
        (Variable, "variable", ["var"]),
        (Import, "import", []),
    ]
}

impl EntityKind {
    /// Two-letter kind code used in entity ids (`sa-<kind2>-...`).
    pub fn short_code(&self) -> &'static str {
        match self {
            Self::Function => "fn",
            Self::Method => "mt",
            Self::Type => "ty",
            Self::Constant => "ct",
            Self::Variable => "va",
            Self::Import => "im",
        }
    }

    /// Reverse of [`EntityKind::short_code`].
    pub fn from_short_code(code: &str) -> Option<Self> {
        match code {
            "fn" => Some(Self::Function),
            "mt" => Some(Self::Method),
            "ty" => Some(Self::Type),
            "ct" => Some(Self::Constant),
            "va" => Some(Self::Variable),
            "im" => Some(Self::Import),
            _ => None,
        }
    }
}

define_enum! {
    /// Source-level visibility, derived by parsers from language conventions.
    Visibility, kind = "visibility", default = Private,
    expected = "public, private",
    variants: [
        (Public, "public", ["pub", "exported"]),
        (Private, "private", ["unexported"]),
    ]
}

define_enum! {
    /// Lifecycle status of an entity.
    ///
    /// Archived entities survive for history but are excluded from default
    /// queries. Hard deletion only happens through an explicit reset.
    EntityStatus, kind = "status", default = Active,
    expected = "active, archived",
    variants: [
        (Active, "active", []),
        (Archived, "archived", []),
    ]
}

define_enum! {
    /// The type of a dependency edge.
    DepType, kind = "dependency type", default = Calls,
    expected = "calls, uses_type, imports, references, extends, implements",
    variants: [
        (Calls, "calls", ["call"]),
        (UsesType, "uses_type", ["uses-type", "usestype"]),
        (Imports, "imports", ["import"]),
        (References, "references", ["reference", "refs"]),
        (Extends, "extends", []),
        (Implements, "implements", []),
    ]
}
