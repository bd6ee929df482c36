//! `Link` header pagination

use reqwest::Url;

/// Page number of the `rel="next"` link, if any
///
/// `<https://api.github.com/orgs/acme/repos?page=2>; rel="next", <...>; rel="last"`
pub fn next_page(header: &str) -> Option<u32> {
    header.split(',').find_map(|entry| {
        let mut parts = entry.split(';');
        let target = parts.next()?.trim();

        let is_next = parts.any(|param| {
            let param = param.trim();
            param
                .strip_prefix("rel=")
                .map(|rel| rel.trim_matches('"').split_whitespace().any(|r| r == "next"))
                .unwrap_or(false)
        });
        if !is_next {
            return None;
        }

        let url = Url::parse(target.strip_prefix('<')?.strip_suffix('>')?).ok()?;
        url.query_pairs()
            .find(|(key, _)| key == "page")
            .and_then(|(_, value)| value.parse().ok())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_page_present() {
        let header = r#"<https://api.github.com/orgs/acme/repos?per_page=100&page=2>; rel="next", <https://api.github.com/orgs/acme/repos?per_page=100&page=5>; rel="last""#;
        assert_eq!(next_page(header), Some(2));
    }

    #[test]
    fn test_next_page_not_first_entry() {
        let header = r#"<https://api.github.com/orgs/acme/repos?page=1>; rel="prev", <https://api.github.com/orgs/acme/repos?page=3>; rel="next""#;
        assert_eq!(next_page(header), Some(3));
    }

    #[test]
    fn test_last_page_has_no_next() {
        let header = r#"<https://api.github.com/orgs/acme/repos?page=1>; rel="first", <https://api.github.com/orgs/acme/repos?page=4>; rel="prev""#;
        assert_eq!(next_page(header), None);
        assert_eq!(next_page(""), None);
    }

    #[test]
    fn test_malformed_link() {
        assert_eq!(next_page(r#"https://example.com?page=2; rel="next""#), None);
        assert_eq!(next_page(r#"<https://example.com/?page=two>; rel="next""#), None);
    }
}
