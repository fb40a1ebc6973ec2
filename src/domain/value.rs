//! Value-object conventions.
//!
//! A value object is immutable, has no identifier, and compares by full
//! attribute equality. In Rust that is a plain data struct with
//! `#[derive(Clone, PartialEq)]` and no `&mut` surface; the marker trait
//! below documents the intent at type level.

/// Marker for attribute-equality-only domain records.
///
/// Implementors must derive (or hand-write) `PartialEq` over *all* fields
/// and expose no mutation after construction.
pub trait ValueObject: Clone + PartialEq + Send + Sync {}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Money {
        currency: String,
        minor_units: i64,
    }

    impl ValueObject for Money {}

    #[test]
    fn test_value_equality_is_structural() {
        let a = Money {
            currency: "IDR".into(),
            minor_units: 1500,
        };
        let b = a.clone();
        let c = Money {
            currency: "IDR".into(),
            minor_units: 2500,
        };

        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
