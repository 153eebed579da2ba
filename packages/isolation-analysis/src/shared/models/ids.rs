//! Typed identifiers for program entities

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub u32);

        impl $name {
            #[inline]
            pub const fn new(raw: u32) -> Self {
                Self(raw)
            }

            #[inline]
            pub const fn raw(self) -> u32 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "{}"), self.0)
            }
        }

        impl From<u32> for $name {
            fn from(raw: u32) -> Self {
                Self(raw)
            }
        }
    };
}

define_id!(
    /// Function identifier
    FunctionId,
    "fn"
);
define_id!(
    /// Basic block identifier
    BlockId,
    "bb"
);
define_id!(
    /// Instruction identifier; a call site's identity
    InstId,
    "i"
);
define_id!(
    /// Pointer-valued program value
    ValueId,
    "v"
);
define_id!(
    /// Abstract memory object in a points-to set
    ObjectId,
    "obj"
);
