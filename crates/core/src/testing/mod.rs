//! Test doubles for the engine's collaborator seams
//!
//! These mocks let the protocol layer be exercised without a network or a
//! browser: [`MockTransport`] plays back scripted responses and records
//! every request it sees, and [`RedirectPresenter`] stands in for the
//! browser round trip by computing a redirect from the authorize URL.
//!
//! They back the crate's own unit and integration tests and are exported
//! for applications that want to test against the engine.

mod mocks;

pub use mocks::{query_param, MockTransport, RedirectPresenter};
