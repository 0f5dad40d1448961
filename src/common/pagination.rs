// src/common/pagination.rs

use serde::Deserialize;
use utoipa::IntoParams;

pub const DEFAULT_LIMIT: i64 = 100;
pub const MAX_LIMIT: i64 = 500;

/// `?skip=&limit=` accepted by every list endpoint.
#[derive(Debug, Clone, Copy, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct Pagination {
    /// Rows to skip (default 0).
    pub skip: Option<i64>,
    /// Page size (default 100, capped at 500).
    pub limit: Option<i64>,
}

impl Pagination {
    pub fn offset(&self) -> i64 {
        self.skip.unwrap_or(0).max(0)
    }

    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_and_caps() {
        let p = Pagination::default();
        assert_eq!((p.offset(), p.limit()), (0, 100));

        let p = Pagination { skip: Some(-5), limit: Some(10_000) };
        assert_eq!((p.offset(), p.limit()), (0, 500));

        let p = Pagination { skip: Some(20), limit: Some(0) };
        assert_eq!((p.offset(), p.limit()), (20, 1));
    }
}
