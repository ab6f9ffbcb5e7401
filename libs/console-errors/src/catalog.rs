//! Static error catalog entries.

use crate::problem::Problem;
use http::StatusCode;

/// One catalog entry: status, title and stable machine code.
#[derive(Debug, Clone, Copy)]
pub struct ErrDef {
    pub status: u16,
    pub title: &'static str,
    pub code: &'static str,
}

impl ErrDef {
    #[must_use]
    pub const fn new(status: u16, title: &'static str, code: &'static str) -> Self {
        Self {
            status,
            title,
            code,
        }
    }

    /// Stable documentation URI for this code.
    #[must_use]
    pub fn type_url(&self) -> String {
        format!("https://errors.marketplace-console.dev/{}", self.code)
    }

    #[inline]
    pub fn as_problem(&self, detail: impl Into<String>) -> Problem {
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        Problem::new(status, self.title, detail.into())
            .with_code(self.code)
            .with_type(self.type_url())
    }

    /// Problem carrying request context.
    pub fn with_context(
        &self,
        detail: impl Into<String>,
        instance: &str,
        trace_id: Option<String>,
    ) -> Problem {
        let mut p = self.as_problem(detail).with_instance(instance);
        if let Some(tid) = trace_id {
            p = p.with_trace_id(tid);
        }
        p
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn err_def_to_problem_works() {
        const NOT_FOUND: ErrDef = ErrDef::new(404, "Not Found", "CONSOLE_NOT_FOUND");

        let problem = NOT_FOUND.with_context("Partner 7 not found", "/console/v1/partners/7", None);
        assert_eq!(problem.status, StatusCode::NOT_FOUND);
        assert_eq!(problem.title, "Not Found");
        assert_eq!(problem.code, "CONSOLE_NOT_FOUND");
        assert_eq!(problem.instance, "/console/v1/partners/7");
        assert!(problem.type_url.ends_with("/CONSOLE_NOT_FOUND"));
    }
}
