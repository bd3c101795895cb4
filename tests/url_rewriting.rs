use proptest::prelude::*;
use url::Url;
use warc2offline::url_rewriting::normalize_opt;
use warc2offline::{ArticleUrlRewriter, FuzzyRules, ScopeFilter, item_path, normalize};

const ARTICLE_PATHS: [&str; 4] = [
    "kiwix.org/a/article/path",
    "kiwix.org/a/article/path/",
    "kiwix.org/a/path",
    "kiwix.org/a/path/",
];

/// Where `reference` lands when the package is served from `https://serving.com/`.
fn served(item: &str, reference: &str) -> String {
    let base = Url::parse(&format!("https://serving.com/{item}")).unwrap();
    base.join(reference).unwrap().to_string()
}

#[test]
fn test_normalize_examples() {
    assert_eq!(normalize_opt(None), None);
    assert_eq!(normalize("").as_str(), "");
    assert_eq!(normalize("https://example.com").as_str(), "example.com");
    assert_eq!(normalize("http://test@example.com/").as_str(), "test@example.com/");
    assert_eq!(normalize("http://example.com/a?b=c&d").as_str(), "example.com/a?b=c&d");
    assert_eq!(normalize("HTTPS://example.com/x/").as_str(), "example.com/x/");
}

#[test]
fn test_relative_references_stay_relative() {
    for article in ARTICLE_PATHS {
        let rw = ArticleUrlRewriter::new(article);
        for url in ["foo", "bar/foo", "foo/", "bar/foo/", "../baz"] {
            assert_eq!(rw.rewrite(url).as_deref(), Some(url), "{article} {url}");
            assert_eq!(rw.rewrite(&format!("./{url}")).as_deref(), Some(url));
        }
        let expected = if article == "kiwix.org/a/path" { "../biz" } else { "../../biz" };
        assert_eq!(rw.rewrite("../../biz").as_deref(), Some(expected), "{article}");
    }
}

#[test]
fn test_absolute_path_references() {
    for article in ARTICLE_PATHS {
        let rw = ArticleUrlRewriter::new(article);
        for url in ["/foo", "/foo/bar"] {
            for input in [url.to_string(), format!(" {url}"), format!("{url} "), format!(" {url} ")] {
                let rewritten = rw.rewrite(&input).unwrap();
                assert!(!rewritten.starts_with('/'), "{rewritten}");
                assert_eq!(served(article, &rewritten), format!("https://serving.com/kiwix.org{url}"));
            }
        }
    }
}

#[test]
fn test_absolute_references_move_under_host_directory() {
    for article in ARTICLE_PATHS {
        let rw = ArticleUrlRewriter::new(article);
        for url in [
            "//exemple.com/foo",
            "//exemple.com/foo/bar",
            "//kiwix.org/baz",
            "https://exemple.com/foo",
            "http://exemple.com/foo/bar",
            "http://kiwix.org/baz",
        ] {
            let rewritten = rw.rewrite(url).unwrap();
            assert!(!rewritten.starts_with('/'), "{rewritten}");
            assert_eq!(
                served(article, &rewritten),
                format!("https://serving.com/{}", normalize(url))
            );
        }
    }
}

#[test]
fn test_blob_and_data_untouched() {
    let rw = ArticleUrlRewriter::new("kiwix.org/a/path");
    for url in ["data:0548datacontent", "blob:exemple.com/url"] {
        assert_eq!(rw.rewrite_or_keep(url), url);
    }
}

#[test]
fn test_out_of_scope_references_kept() {
    let scope = ScopeFilter::new(["kiwix.org/bar/foo"]);
    for article in ARTICLE_PATHS {
        let rw = ArticleUrlRewriter::with_scope(article, &scope);
        assert!(!rw.rewrite_or_keep("https://kiwix.org/bar/foo").contains("kiwix.org"));
        assert_eq!(
            rw.rewrite_or_keep("https://kiwix.org/external/link"),
            "https://kiwix.org/external/link"
        );
    }
}

#[test]
fn test_item_path_uses_fuzzy_rules() {
    let rules = FuzzyRules::builtin();
    assert_eq!(item_path("https://example.com/a/b.js", rules), "example.com/a/b.js");
    assert_eq!(
        item_path("https://player.vimeo.com/video/1234?autoplay=1", rules),
        "vimeo.fuzzy.replayweb.page/video/1234"
    );
    assert_eq!(item_path("https://example.com/style.css?1699999999", rules), "example.com/style.css?");
}

proptest! {
    #[test]
    fn normalize_is_idempotent(url in "(https?://|//|HTTP://)?[a-zA-Z0-9@:./?&=#%_-]{0,40}") {
        let once = normalize(&url);
        prop_assert_eq!(normalize(&once), once.clone());
    }

    #[test]
    fn normalize_ignores_http_scheme(rest in "[a-z0-9][a-z0-9./?=&]{0,30}") {
        prop_assert_eq!(normalize(&format!("http://{rest}")), normalize(&format!("https://{rest}")));
    }

    #[test]
    fn rewritten_paths_resolve_to_target(
        item in "[a-z]{1,5}\\.org(/[a-z]{1,5}){0,3}/?",
        target in "[a-z]{1,5}\\.com(/[a-z]{1,5}){0,3}/?",
    ) {
        let rw = ArticleUrlRewriter::new(&item);
        let rewritten = rw.rewrite(&format!("https://{target}")).unwrap();
        prop_assert!(!rewritten.starts_with('/'));
        prop_assert_eq!(served(&item, &rewritten), format!("https://serving.com/{target}"));
    }
}
