//! Observer trait for generate events.
//!
//! Pass a [`GenerationObserver`] to
//! [`crate::ServiceClient::generate_with_observer`] to see fragments
//! the moment they are applied, e.g. to echo the answer to a terminal while it
//! is still being produced. The assembled text is returned regardless; the
//! observer is a side channel and cannot change the outcome.
//!
//! # Example
//!
//! ```rust
//! use doc_analyzer::GenerationObserver;
//! use std::sync::Mutex;
//!
//! struct Echo {
//!     seen: Mutex<String>,
//! }
//!
//! impl GenerationObserver for Echo {
//!     fn on_fragment(&self, fragment: &str) {
//!         print!("{fragment}");
//!         if let Ok(mut seen) = self.seen.lock() {
//!             seen.push_str(fragment);
//!         }
//!     }
//! }
//! ```

use crate::error::InferenceError;
use crate::stream::AssembledResponse;

/// Called by the streaming client over the life of one request.
///
/// All methods default to no-ops. Exactly one of `on_generation_complete` or
/// `on_generation_error` follows each `on_generation_start`. Fragments that
/// were observed before an error are not retracted; the error means they do
/// not form an answer.
pub trait GenerationObserver: Send + Sync {
    /// Before the request is sent.
    fn on_generation_start(&self, model: &str) {
        let _ = model;
    }

    /// One non-empty fragment, in arrival order.
    fn on_fragment(&self, fragment: &str) {
        let _ = fragment;
    }

    fn on_generation_complete(&self, response: &AssembledResponse) {
        let _ = response;
    }

    fn on_generation_error(&self, error: &InferenceError) {
        let _ = error;
    }
}

/// Observer that ignores every event.
pub struct NoopObserver;

impl GenerationObserver for NoopObserver {}
