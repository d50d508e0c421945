//! Errors raised at the JavaScript boundary.
//!
//! The layout core never fails: bad sizes, dangling edges and odd option
//! values all degrade to something drawable. Only converting values to and
//! from JS can go wrong.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LayoutError {
    /// A JS argument did not match the expected shape.
    #[error("invalid {what}: {source}")]
    InvalidInput {
        what: &'static str,
        #[source]
        source: serde_wasm_bindgen::Error,
    },

    /// A result could not be converted back to a JS value.
    #[error("failed to serialize layout result: {0}")]
    Output(#[source] serde_wasm_bindgen::Error),
}

impl LayoutError {
    pub(crate) fn input(what: &'static str) -> impl FnOnce(serde_wasm_bindgen::Error) -> Self {
        move |source| Self::InvalidInput { what, source }
    }
}

pub type Result<T, E = LayoutError> = std::result::Result<T, E>;
