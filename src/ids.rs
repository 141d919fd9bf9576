//! Index newtypes shared by the model, the call graph and the detector.
//!
//! All entities live in arenas owned by the [`ProgramModel`](crate::model::ProgramModel);
//! these ids are positions in those arenas and are handed out once, in
//! declaration order, so two runs over the same sources agree on them.

use serde::Serialize;
use std::fmt;

/// Position of a class in the program model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ClassId(pub u32);

/// Unique function id, also the index of its call graph node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct FunctionId(pub u32);

/// Lock id. Ids start at 1; 0 is never handed out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct LockId(pub u32);

macro_rules! arena_index {
    ($ty:ident, $prefix:literal) => {
        impl $ty {
            #[inline]
            pub fn index(self) -> usize {
                self.0 as usize
            }

            #[inline]
            pub fn from_index(index: usize) -> Self {
                Self(index as u32)
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "{}"), self.0)
            }
        }
    };
}

arena_index!(ClassId, "class#");
arena_index!(FunctionId, "fn#");
arena_index!(LockId, "lock#");
