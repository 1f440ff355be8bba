pub mod communities;
pub mod events;
pub mod threads;
pub mod users;

use threads_shared::api::{SearchParams, SortDirection};

const DEFAULT_PAGE_SIZE: u32 = 20;
const MAX_PAGE_SIZE: u32 = 100;

/// Page number, page size and sort order with defaults applied.
fn paging(params: &SearchParams) -> (u32, u32, SortDirection) {
    let page = params.page.unwrap_or(1).max(1);
    let limit = params
        .limit
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .clamp(1, MAX_PAGE_SIZE);
    (page, limit, params.sort.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paging_applies_defaults_and_bounds() {
        assert_eq!(
            paging(&SearchParams::default()),
            (1, 20, SortDirection::Desc)
        );

        let params = SearchParams {
            q: String::new(),
            page: Some(0),
            limit: Some(500),
            sort: Some(SortDirection::Asc),
        };
        assert_eq!(paging(&params), (1, 100, SortDirection::Asc));
    }
}
