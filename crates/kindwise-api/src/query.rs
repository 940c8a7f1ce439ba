//! Query-string assembly.
//!
//! Segments always render in the same order: `q`, `limit`, `details`,
//! `language`, `async`, then caller extras. Each known segment appends a
//! trailing `&`, one trailing `&` is trimmed at the end, and a query with
//! no segments renders as an empty string rather than a bare `?`. Only the
//! search term is percent-encoded; extras are the caller's to escape.

use crate::options::{ExtraGetParams, IdentifyOptions, RetrieveOptions};

#[derive(Debug, Default)]
pub(crate) struct QueryParams<'a> {
    pub q: Option<&'a str>,
    pub limit: Option<u32>,
    pub details: Option<&'a [String]>,
    pub language: Option<&'a [String]>,
    pub asynchronous: bool,
    pub extra: Option<&'a ExtraGetParams>,
}

pub(crate) fn build_query(params: &QueryParams<'_>) -> String {
    let mut query = String::from("?");
    if let Some(q) = params.q {
        query.push_str(&format!("q={}&", urlencoding::encode(q)));
    }
    if let Some(limit) = params.limit {
        query.push_str(&format!("limit={limit}&"));
    }
    if let Some(details) = params.details {
        query.push_str(&format!("details={}&", details.join(",")));
    }
    if let Some(language) = params.language {
        query.push_str(&format!("language={}&", language.join(",")));
    }
    if params.asynchronous {
        query.push_str("async=true&");
    }
    if let Some(extra) = params.extra {
        query.push_str(&render_extra(extra));
    }
    let trimmed = query.strip_suffix('&').unwrap_or(&query);
    if trimmed == "?" {
        String::new()
    } else {
        trimmed.to_string()
    }
}

fn render_extra(extra: &ExtraGetParams) -> String {
    match extra {
        ExtraGetParams::Raw(text) => text.strip_prefix('?').unwrap_or(text).to_string(),
        ExtraGetParams::Pairs(pairs) => pairs
            .iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect::<Vec<_>>()
            .join("&"),
    }
}

/// Append one more `key=value` segment to an already-built query.
pub(crate) fn append_param(query: &str, param: &str) -> String {
    if query.is_empty() {
        format!("?{param}")
    } else {
        format!("{query}&{param}")
    }
}

pub(crate) fn identify_query(opts: &IdentifyOptions) -> String {
    build_query(&QueryParams {
        details: opts.details.as_deref(),
        language: opts.language.as_deref(),
        asynchronous: opts.asynchronous,
        extra: opts.extra_get_params.as_ref(),
        ..QueryParams::default()
    })
}

pub(crate) fn retrieve_query(opts: &RetrieveOptions) -> String {
    build_query(&QueryParams {
        details: opts.details.as_deref(),
        language: opts.language.as_deref(),
        extra: opts.extra_get_params.as_ref(),
        ..QueryParams::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owned(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_empty_query_renders_as_nothing() {
        assert_eq!(build_query(&QueryParams::default()), "");
    }

    #[test]
    fn test_details_language_and_async_order() {
        let details = owned(&["a", "b"]);
        let language = owned(&["cz"]);
        let query = build_query(&QueryParams {
            details: Some(&details),
            language: Some(&language),
            asynchronous: true,
            ..QueryParams::default()
        });
        assert_eq!(query, "?details=a,b&language=cz&async=true");
    }

    #[test]
    fn test_search_query_order() {
        let language = owned(&["cz"]);
        let query = build_query(&QueryParams {
            q: Some("vcela"),
            limit: Some(1),
            language: Some(&language),
            ..QueryParams::default()
        });
        assert_eq!(query, "?q=vcela&limit=1&language=cz");
    }

    #[test]
    fn test_search_term_is_percent_encoded() {
        let query = build_query(&QueryParams {
            q: Some("bee orchid"),
            ..QueryParams::default()
        });
        assert_eq!(query, "?q=bee%20orchid");
    }

    #[test]
    fn test_raw_extras_with_leading_question_mark() {
        let extra = ExtraGetParams::from("?test=test");
        let query = build_query(&QueryParams {
            extra: Some(&extra),
            ..QueryParams::default()
        });
        assert_eq!(query, "?test=test");
    }

    #[test]
    fn test_raw_extras_without_leading_question_mark() {
        let extra = ExtraGetParams::from("test=test");
        let query = build_query(&QueryParams {
            extra: Some(&extra),
            ..QueryParams::default()
        });
        assert_eq!(query, "?test=test");
    }

    #[test]
    fn test_raw_extras_trailing_ampersand_is_trimmed() {
        let extra = ExtraGetParams::from("test=test&");
        let query = build_query(&QueryParams {
            extra: Some(&extra),
            ..QueryParams::default()
        });
        assert_eq!(query, "?test=test");
    }

    #[test]
    fn test_pair_extras_render_in_order() {
        let extra = ExtraGetParams::from(vec![("test".to_string(), "test".to_string())]);
        let query = build_query(&QueryParams {
            extra: Some(&extra),
            ..QueryParams::default()
        });
        assert_eq!(query, "?test=test");
    }

    #[test]
    fn test_extras_follow_known_segments() {
        let details = owned(&["image"]);
        let extra = ExtraGetParams::from("test=test");
        let query = build_query(&QueryParams {
            details: Some(&details),
            extra: Some(&extra),
            ..QueryParams::default()
        });
        assert_eq!(query, "?details=image&test=test");
    }

    #[test]
    fn test_append_param_to_empty_query() {
        assert_eq!(append_param("", "full_disease_list=true"), "?full_disease_list=true");
    }

    #[test]
    fn test_append_param_to_existing_query() {
        assert_eq!(
            append_param("?language=cz", "full_disease_list=true"),
            "?language=cz&full_disease_list=true"
        );
    }

    #[test]
    fn test_detail_lookup_query_order() {
        let details = owned(&["rank", "gbif_id"]);
        let language = owned(&["cs"]);
        let query = build_query(&QueryParams {
            details: Some(&details),
            language: Some(&language),
            ..QueryParams::default()
        });
        assert_eq!(query, "?details=rank,gbif_id&language=cs");
    }

    #[test]
    fn test_identify_query_from_options() {
        let opts = IdentifyOptions {
            details: Some(owned(&["image"])),
            language: Some(owned(&["cz", "de"])),
            asynchronous: true,
            ..IdentifyOptions::default()
        };
        assert_eq!(identify_query(&opts), "?details=image&language=cz,de&async=true");
    }
}
