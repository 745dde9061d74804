//! Type lattice, promotion and conversion rules

mod conversion;
mod layout;
mod promotion;
mod type_system;

pub use conversion::{convert, storage_type, ConversionMode};
pub use layout::MemoryLayout;
pub use promotion::{promote_binary, promote_unary, OperatorClass};
pub use type_system::*;
