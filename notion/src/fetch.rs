use crate::client::NotionApi;
use crate::error::NotionError;
use crate::metrics_defs::NOTION_PAGES_FETCHED;
use crate::types::Record;
use crate::validate::QueryParams;
use shared::counter;

/// Largest page size the API accepts.
pub const PAGE_SIZE: u64 = 100;

/// Upper bound on pages per fetch. Reaching it means the API kept reporting
/// `has_more` far beyond any realistic database size.
pub const MAX_PAGES: usize = 10_000;

/// Fetch every record of a database, following cursors one page at a time.
/// Records are returned in API order. Any failure aborts the whole fetch.
pub async fn fetch_all<A>(api: &A, database_id: &str) -> Result<Vec<Record>, NotionError>
where
    A: NotionApi + ?Sized,
{
    fetch_all_bounded(api, database_id, MAX_PAGES).await
}

pub async fn fetch_all_bounded<A>(
    api: &A,
    database_id: &str,
    max_pages: usize,
) -> Result<Vec<Record>, NotionError>
where
    A: NotionApi + ?Sized,
{
    let mut params = QueryParams {
        page_size: Some(PAGE_SIZE),
        ..Default::default()
    };
    let mut records = Vec::new();
    let mut page_fetches = 0;

    loop {
        if page_fetches == max_pages {
            tracing::error!(database_id, page_fetches, "Pagination limit reached");
            return Err(NotionError::PaginationLimit(max_pages));
        }

        let page = api.query_database(database_id, &params).await?;
        page_fetches += 1;
        counter!(NOTION_PAGES_FETCHED).increment(1);

        records.extend(page.results.into_iter().map(Record::from));

        if !page.has_more {
            break;
        }

        match page.next_cursor {
            Some(cursor) => params.start_cursor = Some(cursor),
            None => return Err(NotionError::MissingCursor),
        }
    }

    tracing::info!(
        database_id,
        page_fetches,
        records = records.len(),
        "Fetched all pages from Notion"
    );

    Ok(records)
}
