//! Helpers adapters share for paged APIs

use url::Url;

use super::error::{CollectError, CollectResult};
use super::request::{FetchedResponse, HttpResponse};
use crate::model::{format_number, parse_number};

/// The `rel="next"` target of an RFC 8288 `Link` header, if any
pub fn next_link(response: &HttpResponse) -> Option<Url> {
    let header = response.header("link")?;
    header.split(',').find_map(|link| {
        let mut parts = link.split(';');
        let target = parts.next()?.trim();
        let is_next = parts.any(|param| {
            let param = param.trim();
            param
                .strip_prefix("rel=")
                .map(|rel| rel.trim_matches('"'))
                .is_some_and(|rel| rel.split_whitespace().any(|r| r == "next"))
        });
        if !is_next {
            return None;
        }
        let target = target.strip_prefix('<')?.strip_suffix('>')?;
        Url::parse(target).ok()
    })
}

/// The most recent successful data response, i.e. the last page fetched
pub fn last_page(responses: &[FetchedResponse]) -> Option<&HttpResponse> {
    responses
        .iter()
        .rev()
        .filter(|r| !r.is_lookup())
        .find_map(FetchedResponse::response)
}

/// Number of data pages fetched so far
pub fn pages_fetched(responses: &[FetchedResponse]) -> usize {
    responses.iter().filter(|r| !r.is_lookup()).count()
}

/// Collect the items of every page, in page order
pub fn merge_pages<T, F>(pages: &[HttpResponse], mut extract: F) -> CollectResult<Vec<T>>
where
    F: FnMut(&HttpResponse) -> CollectResult<Vec<T>>,
{
    let mut items = Vec::new();
    for page in pages {
        items.extend(extract(page)?);
    }
    Ok(items)
}

/// Add up per-page partial counts
pub fn sum_partials<'a>(partials: impl IntoIterator<Item = &'a str>) -> CollectResult<String> {
    let mut total = 0.0;
    for partial in partials {
        total += parse_number(partial)
            .ok_or_else(|| CollectError::parse(format!("'{partial}' is not a number")))?;
    }
    Ok(format_number(total))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_link_picks_rel_next() {
        let response = HttpResponse::new(200, "[]").with_header(
            "Link",
            r#"<https://gitlab.example.org/api/v4/projects/1/jobs?page=1>; rel="prev", <https://gitlab.example.org/api/v4/projects/1/jobs?page=3>; rel="next", <https://gitlab.example.org/api/v4/projects/1/jobs?page=9>; rel="last""#,
        );
        assert_eq!(
            next_link(&response).map(|u| u.to_string()),
            Some("https://gitlab.example.org/api/v4/projects/1/jobs?page=3".to_string())
        );
    }

    #[test]
    fn test_no_next_link_on_last_page() {
        let response = HttpResponse::new(200, "[]").with_header(
            "link",
            r#"<https://gitlab.example.org/jobs?page=1>; rel="first""#,
        );
        assert_eq!(next_link(&response), None);
        assert_eq!(next_link(&HttpResponse::new(200, "[]")), None);
    }

    #[test]
    fn test_merge_pages_and_partials() {
        let pages = vec![HttpResponse::new(200, "[1,2]"), HttpResponse::new(200, "[3]")];
        let items: Vec<u32> = merge_pages(&pages, |page| page.json()).unwrap();
        assert_eq!(items, vec![1, 2, 3]);

        assert_eq!(sum_partials(["3", "4.5"]).unwrap(), "7.5");
        assert!(sum_partials(["x"]).is_err());
    }
}
