//! Query-string parameter types shared by listing endpoints.

use serde::Deserialize;
use tasklane_core::error::CoreResult;
use tasklane_core::item::ListFilter;

/// `?status=&keyword=&page=&page_size=` for `GET /items`.
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub status: Option<String>,
    pub keyword: Option<String>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

impl ListParams {
    /// Validate the status and build a store filter. An empty `status` is
    /// treated as absent.
    pub fn into_filter(self) -> CoreResult<ListFilter> {
        let status = match self.status.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(raw.parse()?),
        };
        Ok(ListFilter {
            status,
            keyword: self.keyword,
            page: self.page,
            page_size: self.page_size,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tasklane_core::item::Status;

    #[test]
    fn empty_status_means_unfiltered() {
        let params = ListParams {
            status: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(params.into_filter().unwrap().status, None);
    }

    #[test]
    fn unknown_status_is_rejected() {
        let params = ListParams {
            status: Some("done".to_string()),
            ..Default::default()
        };
        assert!(params.into_filter().is_err());
    }

    #[test]
    fn known_status_is_parsed() {
        let params = ListParams {
            status: Some("history".to_string()),
            ..Default::default()
        };
        assert_eq!(params.into_filter().unwrap().status, Some(Status::History));
    }
}
