//! Test suites for the depot service.

pub(crate) mod support;
