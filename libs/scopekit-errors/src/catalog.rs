//! The problems the scoping layer can emit.

use http::StatusCode;

use crate::problem::Problem;

/// Fixed error shape. The detail text belongs to the definition, so nothing
/// request-specific can end up in it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrDef {
    pub status: StatusCode,
    pub code: &'static str,
    pub title: &'static str,
    pub detail: &'static str,
}

impl ErrDef {
    pub fn to_problem(&self) -> Problem {
        Problem {
            type_url: "about:blank".to_owned(),
            title: self.title.to_owned(),
            status: self.status.as_u16(),
            detail: self.detail.to_owned(),
            code: self.code.to_owned(),
        }
    }
}

/// Every capability or scope denial. A caller cannot tell a missing
/// capability from an out-of-scope record.
pub const FORBIDDEN: ErrDef = ErrDef {
    status: StatusCode::FORBIDDEN,
    code: "FORBIDDEN",
    title: "Forbidden",
    detail: "You do not have access to this resource.",
};

/// The caller's filter uses syntax the rewriter does not accept.
pub const INVALID_FILTER: ErrDef = ErrDef {
    status: StatusCode::BAD_REQUEST,
    code: "INVALID_FILTER",
    title: "Bad Request",
    detail: "The query filter is not supported.",
};
