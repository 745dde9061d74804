//! Memory layout policy
//!
//! The checker never decides how large a type is; the target's layout policy
//! is injected and consulted by `sizeof` and when laying out struct members.

use crate::types::Type;

/// Answers "how many bytes does this type occupy" for the target machine
pub trait MemoryLayout {
    fn size_of(&self, ty: &Type) -> usize;
}
