#[cfg(feature = "logger")]
/// This module provides a session decorator that logs every call it forwards.
pub mod logger;
