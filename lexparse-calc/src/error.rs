//! The calculator's unified error surface.
//!
//! Every stage of the pipeline (table construction, grammar analysis,
//! either driver) has its own error enum in `lexparse`; this type folds
//! them into one, so callers can write `?` without mapping.

use lexparse::ll::LlError;
use lexparse::lr::LrError;
use lexparse::table::TableError;
use lexparse::tablegen::BuildError;
use lexparse::GrammarError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CalcError {
    /// The parsing tables could not be constructed.
    #[error("table construction failed: {0}")]
    Build(#[from] BuildError),

    /// A table entry was written or read out of range.
    #[error("table access failed: {0}")]
    Table(#[from] TableError),

    /// Grammar analysis failed.
    #[error("grammar analysis failed: {0}")]
    Grammar(#[from] GrammarError),

    /// The shift/reduce parse failed.
    #[error("parse failed: {0}")]
    Lr(#[from] LrError),

    /// The predictive parse failed.
    #[error("parse failed: {0}")]
    Ll(#[from] LlError),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn _assert_error_trait_obj(e: &dyn std::error::Error) -> &dyn std::error::Error {
        e
    }

    fn _assert_send_sync_static<T: Send + Sync + 'static>() {}

    #[test]
    fn calc_error_is_a_std_error_and_send_sync() {
        _assert_send_sync_static::<CalcError>();
        let err: CalcError = GrammarError::EmptyProductionBody.into();
        let _ = _assert_error_trait_obj(&err);
        assert!(err.to_string().contains("grammar analysis failed"));
    }
}
