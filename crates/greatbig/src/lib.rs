pub mod db;
pub mod model;
pub mod search;
pub mod services;

/// Test utilities for unit and integration testing.
/// Only available with cfg(test) or feature "testing".
#[cfg(any(test, feature = "testing"))]
pub mod testing;
