//! Typed numeric keys for type-safe row references.
//!
//! Ledger numbers and sequences are all `i32` in storage. Wrapping them
//! prevents passing a `BudgetSequence` where a `GlmSequence` is expected.

use serde::{Deserialize, Serialize};

/// Macro to generate typed key wrappers.
macro_rules! typed_key {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub i32);

        impl $name {
            /// Returns the inner value.
            #[must_use]
            pub const fn get(self) -> i32 {
                self.0
            }
        }

        impl From<i32> for $name {
            fn from(value: i32) -> Self {
                Self(value)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = std::num::ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(s.parse()?))
            }
        }
    };
}

typed_key!(LedgerNumber, "Number identifying a ledger.");
typed_key!(BudgetSequence, "Unique sequence of a budget row.");
typed_key!(
    GlmSequence,
    "Unique sequence of a general ledger master row."
);
