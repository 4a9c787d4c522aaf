//! # Common Types and Traits

use core::fmt::{Debug, Display};
use core::hash::Hash;

use num_traits::{FromPrimitive, PrimInt, ToPrimitive, Unsigned};

/// A type that can be used as a token identifier.
///
/// Constrained to unsigned primitive integers; the max learnable token in a
/// vocabulary must be less than `T::max_value()`, which is reserved as the
/// chunk-boundary sentinel during training.
pub trait TokenType:
    'static
    + PrimInt
    + FromPrimitive
    + ToPrimitive
    + Unsigned
    + Hash
    + Default
    + Debug
    + Display
    + Send
    + Sync
{
}

impl<T> TokenType for T where
    T: 'static
        + PrimInt
        + FromPrimitive
        + ToPrimitive
        + Unsigned
        + Hash
        + Default
        + Debug
        + Display
        + Send
        + Sync
{
}

/// A pair of adjacent tokens.
pub type Pair<T> = (T, T);

/// The boundary sentinel for `T`.
///
/// Inserted between chunks of the token stream during training; no merge may
/// cross it. Distinct from every byte token and every learnable identifier.
pub fn boundary<T: TokenType>() -> T {
    T::max_value()
}

/// Type alias for hash maps in this crate.
pub type CommonHashMap<K, V> = ahash::AHashMap<K, V>;

/// Type alias for hash sets in this crate.
pub type CommonHashSet<V> = ahash::AHashSet<V>;

/// The number of single-byte tokens (identifiers `0..=255`).
pub const BYTE_TOKENS: usize = 256;
