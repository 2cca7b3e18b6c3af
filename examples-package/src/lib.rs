//! Runnable demos for the qfetch crates. See `examples/`.
