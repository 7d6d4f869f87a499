/// HTTP middleware utilities for drinks-service
///
/// Authorization is an extractor rather than a `Transform`: each protected
/// handler names its required permission in its signature, and the check runs
/// before any other handler argument is used.
pub mod permissions;

pub use permissions::*;
