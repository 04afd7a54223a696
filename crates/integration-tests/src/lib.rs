//! Cross-crate behavioural tests live in `tests/`.
