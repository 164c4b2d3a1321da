//! Integration test host for the VesperOS workspace.
//!
//! The crate body is empty; everything lives in `tests/`, exercising the
//! full kernel context against the recording port fake.
