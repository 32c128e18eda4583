//! Shared helpers for the challenger crates.

#![doc = include_str!("../README.md")]
#![deny(
    clippy::nursery,
    clippy::pedantic,
    warnings,
    missing_docs,
    unused_crate_dependencies
)]

pub mod serde;

/// Ensure that a condition is true, otherwise return an error.
#[macro_export]
macro_rules! ensure {
    ($cond:expr, $err:expr) => {
        if !$cond {
            return Err($err);
        }
    };
}

#[cfg(test)]
mod tests {
    fn half(n: u32) -> Result<u32, String> {
        ensure!(n % 2 == 0, format!("{n} is odd"));
        Ok(n / 2)
    }

    #[test]
    fn ensure_returns_the_error_when_the_condition_fails() {
        assert_eq!(half(4), Ok(2));
        assert_eq!(half(3), Err("3 is odd".to_string()));
    }
}
