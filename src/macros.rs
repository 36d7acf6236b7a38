/// Include the enclosed items only when the `alloc` feature is enabled.
macro_rules! if_alloc {
    ($($tt:tt)*) => {
        cfg_if::cfg_if! {
            if #[cfg(feature = "alloc")] {
                $($tt)*
            }
        }
    };
}

/// Report a corrupted tree or a violated structural precondition.
///
/// There is no way to continue from this, so it's a panic rather than an
/// [`Error`](crate::Error) variant.
macro_rules! invalid_structure {
    ($($arg:tt)*) => {
        panic!("invalid tree structure: {}", format_args!($($arg)*))
    };
}

/// Like `debug_assert!`, but also enabled by the `hardened` feature and
/// reported through [`invalid_structure!`].
macro_rules! check_structure {
    ($cond:expr, $($arg:tt)*) => {
        if cfg!(any(debug_assertions, feature = "hardened")) && !$cond {
            invalid_structure!($($arg)*);
        }
    };
}
