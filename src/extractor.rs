//! Article extraction from listing-page HTML.
//!
//! A listing page is a grid of tiles. Each tile has a title element carrying
//! the `tn-title` class and an anchor pointing at `/news/<slug>,<id>`. The
//! anchor may wrap the title, sit inside it, or be a sibling somewhere in the
//! same tile, so the link lookup tries those three places in turn.
//!
//! Everything site-specific lives in [`ExtractRules`] and is built from
//! [`FeedConfig`]; adapting to markup changes means editing selectors or the
//! link pattern, not this module.

use crate::config::FeedConfig;
use crate::error::{ConfigError, ParseError};
use crate::models::Article;
use crate::utils::normalize_whitespace;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info, instrument, warn};
use url::Url;

/// How far above a title element the tile lookup climbs.
const MAX_CARD_DEPTH: usize = 4;

/// Compiled selectors and link pattern for one site.
#[derive(Debug)]
pub struct ExtractRules {
    site: Url,
    title_selectors: Vec<(String, Selector)>,
    anchor: Selector,
    image: Selector,
    id_link: Regex,
    fallback_title: String,
}

/// A link that passed the article pattern.
#[derive(Debug, PartialEq, Eq)]
struct ArticleLink {
    link: String,
    id: u64,
    slug: String,
}

impl ExtractRules {
    pub fn from_config(config: &FeedConfig) -> Result<Self, ConfigError> {
        if config.article_link_selectors.is_empty() {
            return Err(ConfigError::NoSelectors);
        }
        let title_selectors = config
            .article_link_selectors
            .iter()
            .map(|raw| Ok((raw.clone(), parse_selector(raw)?)))
            .collect::<Result<Vec<_>, ConfigError>>()?;

        let id_link = Regex::new(&config.id_link)?;
        if !id_link.capture_names().flatten().any(|name| name == "id") {
            return Err(ConfigError::MissingIdGroup(config.id_link.clone()));
        }

        Ok(Self {
            site: config.site()?,
            title_selectors,
            anchor: parse_selector("a[href]")?,
            image: parse_selector("img[alt]")?,
            id_link,
            fallback_title: config.fallback_title.clone(),
        })
    }

    /// Extract every article listed on one page, in document order.
    ///
    /// A page where no title selector matches yields an empty list and a
    /// warning rather than an error: it usually means the site changed its
    /// markup, which is for the operator to look at.
    #[instrument(level = "info", skip_all, fields(%page_url))]
    pub fn extract(&self, page_url: &str, html: &str) -> Result<Vec<Article>, ParseError> {
        if html.trim().is_empty() {
            return Err(ParseError::EmptyDocument {
                url: page_url.to_string(),
            });
        }

        let document = Html::parse_document(html);
        if !document.errors.is_empty() {
            debug!(count = document.errors.len(), "HTML parser recovered from errors");
        }

        let Some((selector_src, markers)) = self.select_markers(&document) else {
            warn!(
                selectors = ?self.title_selectors.iter().map(|(s, _)| s).collect::<Vec<_>>(),
                "No title markers matched; the page layout may have changed"
            );
            return Ok(Vec::new());
        };
        debug!(selector = %selector_src, markers = markers.len(), "Title markers selected");

        let mut articles = Vec::new();

        for marker in &markers {
            let raw_title = normalize_whitespace(&marker.text().collect::<Vec<_>>().join(" "));

            let Some(anchor) = self.link_for(*marker) else {
                warn!(title = %raw_title, "Title marker has no link; dropping");
                continue;
            };
            let href = anchor.value().attr("href").unwrap_or_default();

            let Some(found) = self.match_link(href) else {
                if self.is_foreign_article_link(href) {
                    warn!(%href, title = %raw_title, "Article link points at another host; skipping");
                } else {
                    debug!(%href, title = %raw_title, "Link is not an article link; skipping");
                }
                continue;
            };

            if found.slug.is_empty() {
                warn!(link = %found.link, id = found.id, "Article link has an empty slug");
            } else if !is_plain_slug(&found.slug) {
                warn!(link = %found.link, slug = %found.slug, "Article slug has unexpected characters");
            }

            let title = if raw_title.is_empty() {
                self.title_fallback(*marker, anchor)
            } else {
                raw_title
            };

            articles.push(Article {
                id: found.id,
                title,
                link: found.link,
                slug: found.slug,
            });
        }

        if articles.is_empty() {
            warn!(markers = markers.len(), "Title markers found but no article links matched");
        } else {
            info!(count = articles.len(), "Extracted articles");
        }
        Ok(articles)
    }

    /// First selector, in configured order, that matches anything.
    fn select_markers<'a, 'd>(
        &'a self,
        document: &'d Html,
    ) -> Option<(&'a str, Vec<ElementRef<'d>>)> {
        self.title_selectors.iter().find_map(|(src, selector)| {
            let found: Vec<_> = document.select(selector).collect();
            (!found.is_empty()).then_some((src.as_str(), found))
        })
    }

    /// Whether `el` holds a title element other than `marker`, under any of
    /// the configured title selectors.
    fn holds_other_title<'d>(&self, el: ElementRef<'d>, marker: ElementRef<'d>) -> bool {
        self.title_selectors
            .iter()
            .any(|(_, selector)| el.select(selector).any(|other| other != marker))
    }

    /// Anchor belonging to a title element: an enclosing `<a>`, an `<a>`
    /// inside it, or an article link elsewhere in the same tile.
    fn link_for<'d>(&self, marker: ElementRef<'d>) -> Option<ElementRef<'d>> {
        let enclosing = marker
            .ancestors()
            .filter_map(ElementRef::wrap)
            .find(|el| el.value().name() == "a" && el.value().attr("href").is_some());
        if enclosing.is_some() {
            return enclosing;
        }

        if let Some(inner) = marker.select(&self.anchor).next() {
            return Some(inner);
        }

        for ancestor in marker
            .ancestors()
            .filter_map(ElementRef::wrap)
            .take(MAX_CARD_DEPTH)
        {
            if matches!(ancestor.value().name(), "body" | "html") {
                break;
            }
            if self.holds_other_title(ancestor, marker) {
                break;
            }
            let candidate = ancestor.select(&self.anchor).find(|a| {
                a.value()
                    .attr("href")
                    .is_some_and(|href| self.match_link(href).is_some())
            });
            if candidate.is_some() {
                return candidate;
            }
        }
        None
    }

    /// Resolve `href` against the site and check it against the article pattern.
    /// The site host matches with or without a leading `www.`.
    fn match_link(&self, href: &str) -> Option<ArticleLink> {
        let mut url = self.site.join(href.trim()).ok()?;
        if !matches!(url.scheme(), "http" | "https") || !same_site(&url, &self.site) {
            return None;
        }
        url.set_fragment(None);

        let caps = self.id_link.captures(url.path())?;
        let id = caps.name("id")?.as_str().parse::<u64>().ok()?;
        let slug = caps
            .name("slug")
            .map(|m| m.as_str().to_string())
            .unwrap_or_default();

        Some(ArticleLink {
            link: url.to_string(),
            id,
            slug,
        })
    }

    /// Off-site link whose path would otherwise pass as an article.
    fn is_foreign_article_link(&self, href: &str) -> bool {
        self.site.join(href.trim()).is_ok_and(|url| {
            !same_site(&url, &self.site) && self.id_link.is_match(url.path())
        })
    }

    /// Title for a marker with no text: the link's own text, then an image
    /// `alt`, then the configured placeholder.
    fn title_fallback(&self, marker: ElementRef<'_>, anchor: ElementRef<'_>) -> String {
        let anchor_text = normalize_whitespace(&anchor.text().collect::<Vec<_>>().join(" "));
        if !anchor_text.is_empty() {
            return anchor_text;
        }
        marker
            .select(&self.image)
            .chain(anchor.select(&self.image))
            .filter_map(|img| img.value().attr("alt"))
            .map(normalize_whitespace)
            .find(|alt| !alt.is_empty())
            .unwrap_or_else(|| self.fallback_title.clone())
    }
}

fn parse_selector(raw: &str) -> Result<Selector, ConfigError> {
    Selector::parse(raw).map_err(|e| ConfigError::Selector {
        selector: raw.to_string(),
        reason: e.to_string(),
    })
}

fn same_site(url: &Url, site: &Url) -> bool {
    let bare = |u: &Url| {
        u.host_str()
            .map(|h| h.strip_prefix("www.").unwrap_or(h).to_ascii_lowercase())
    };
    bare(url).is_some() && bare(url) == bare(site)
}

fn is_plain_slug(slug: &str) -> bool {
    slug.chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules() -> ExtractRules {
        ExtractRules::from_config(&FeedConfig::default()).unwrap()
    }

    fn extract(html: &str) -> Vec<Article> {
        rules().extract("https://epiotrkow.pl/news/", html).unwrap()
    }

    #[test]
    fn test_title_wrapped_in_anchor() {
        let html = r#"<html><body>
            <a href="/news/example-title,12345"><span class="tn-title">Example Title</span></a>
        </body></html>"#;
        let articles = extract(html);
        assert_eq!(articles.len(), 1);
        assert_eq!(articles[0].title, "Example Title");
        assert_eq!(articles[0].link, "https://epiotrkow.pl/news/example-title,12345");
        assert_eq!(articles[0].id, 12345);
        assert_eq!(articles[0].slug, "example-title");
    }

    #[test]
    fn test_every_title_layout_on_one_page_is_extracted() {
        let html = r#"<html><body>
            <a href="/news/a,1"><span class="tn-title">A</span></a>
            <div><h5 class="tn-title"><a href="/news/b,2">B</a></h5></div>
            <div><a href="/news/c,3"><img alt="c"></a><h5 class="tn-title">C</h5></div>
        </body></html>"#;
        let articles = extract(html);
        let ids: Vec<u64> = articles.iter().map(|a| a.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        let titles: Vec<&str> = articles.iter().map(|a| a.title.as_str()).collect();
        assert_eq!(titles, vec!["A", "B", "C"]);
    }

    #[test]
    fn test_tile_lookup_stops_at_titles_outside_the_winning_selector() {
        let config = FeedConfig {
            article_link_selectors: vec![".tn-img h5.tn-title".into(), ".tn-title".into()],
            ..FeedConfig::default()
        };
        let rules = ExtractRules::from_config(&config).unwrap();
        let html = r#"<section>
            <div class="tn-img">
              <div><h5 class="tn-title">Top</h5></div>
              <a href="/news/other,9"><span class="tn-title">Other</span></a>
            </div>
        </section>"#;
        let articles = rules.extract("https://epiotrkow.pl/news/", html).unwrap();
        assert!(articles.is_empty());
    }

    #[test]
    fn test_www_host_counts_as_same_site() {
        let html = r#"<a href="https://www.epiotrkow.pl/news/www-link,31"><span class="tn-title">W</span></a>"#;
        let articles = extract(html);
        assert_eq!(articles.len(), 1);
        assert_eq!(articles[0].id, 31);
        assert_eq!(articles[0].link, "https://www.epiotrkow.pl/news/www-link,31");
    }

    #[test]
    fn test_empty_title_falls_back_to_anchor_text() {
        let html = r#"<a href="/news/words,6"><img alt="Alt text"> Anchor
            words <span class="tn-title"></span></a>"#;
        assert_eq!(extract(html)[0].title, "Anchor words");
    }

    #[test]
    fn test_anchor_without_title_marker_is_ignored() {
        let html = r#"<html><body><a href="/news/other,999">Other</a></body></html>"#;
        assert!(extract(html).is_empty());
    }

    #[test]
    fn test_anchor_inside_title_element() {
        let html = r#"<div><h5 class="tn-title"><a href="/news/inside,7">Inside</a></h5></div>"#;
        let articles = extract(html);
        assert_eq!(articles.len(), 1);
        assert_eq!(articles[0].id, 7);
        assert_eq!(articles[0].title, "Inside");
    }

    #[test]
    fn test_sibling_anchor_in_same_tile() {
        let html = r#"
            <div class="bg-white">
              <a href="/news/first,1"><img src="a.jpg" alt="First"></a>
              <h5 class="tn-title">First  headline</h5>
            </div>
            <div class="bg-white">
              <a href="/news/second,2"><img src="b.jpg" alt="Second"></a>
              <h5 class="tn-title">Second
                 headline</h5>
            </div>"#;
        let articles = extract(html);
        let ids: Vec<u64> = articles.iter().map(|a| a.id).collect();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(articles[0].title, "First headline");
        assert_eq!(articles[1].title, "Second headline");
    }

    #[test]
    fn test_tile_lookup_does_not_borrow_neighbouring_links() {
        let config = FeedConfig {
            article_link_selectors: vec![".tn-title".into()],
            ..FeedConfig::default()
        };
        let rules = ExtractRules::from_config(&config).unwrap();
        let html = r#"
            <section>
              <div><h5 class="tn-title">Orphan</h5></div>
              <div><a href="/news/neighbour,5"><span class="tn-title">Neighbour</span></a></div>
            </section>"#;
        let articles = rules.extract("https://epiotrkow.pl/news/", html).unwrap();
        assert_eq!(articles.len(), 1);
        assert_eq!(articles[0].id, 5);
    }

    #[test]
    fn test_one_article_per_title_in_document_order() {
        let html = r#"
            <a href="/news/a,3"><span class="tn-title">A</span></a>
            <a href="/news/b,1"><span class="tn-title">B</span></a>
            <a href="/news/c,2"><span class="tn-title">C</span></a>"#;
        let ids: Vec<u64> = extract(html).iter().map(|a| a.id).collect();
        assert_eq!(ids, vec![3, 1, 2]);
    }

    #[test]
    fn test_non_article_links_are_rejected() {
        let rejected = [
            "/news/",
            "/news/wydarzenia-p2",
            "/news/no-id,",
            "/news/not-numeric,12a",
            "/news/extra/segment,12",
            "/news/trailing,12/comments",
            "/sport/wrong-prefix,12",
            "https://other.example/news/foreign,12",
            "mailto:news@epiotrkow.pl",
        ];
        for href in rejected {
            let html = format!(r#"<a href="{href}"><span class="tn-title">X</span></a>"#);
            assert!(extract(&html).is_empty(), "{href} should be rejected");
        }
    }

    #[test]
    fn test_absolute_link_on_site_is_accepted() {
        let html = r#"<a href="https://epiotrkow.pl/news/abs,42#comments"><span class="tn-title">Abs</span></a>"#;
        let articles = extract(html);
        assert_eq!(articles.len(), 1);
        assert_eq!(articles[0].link, "https://epiotrkow.pl/news/abs,42");
    }

    #[test]
    fn test_empty_slug_is_kept() {
        let html = r#"<a href="/news/,77"><span class="tn-title">No slug</span></a>"#;
        let articles = extract(html);
        assert_eq!(articles.len(), 1);
        assert_eq!(articles[0].id, 77);
        assert_eq!(articles[0].slug, "");
    }

    #[test]
    fn test_empty_title_falls_back_to_image_alt() {
        let html = r#"<a href="/news/pic,8"><img alt=" Photo title "><span class="tn-title"> </span></a>"#;
        assert_eq!(extract(html)[0].title, "Photo title");
    }

    #[test]
    fn test_empty_title_without_image_uses_placeholder() {
        let html = r#"<a href="/news/blank,9"><span class="tn-title"></span></a>"#;
        assert_eq!(extract(html)[0].title, "Bez tytułu");
    }

    #[test]
    fn test_title_marker_without_link_is_dropped() {
        let html = r#"<body><h5 class="tn-title">Lonely</h5></body>"#;
        assert!(extract(html).is_empty());
    }

    #[test]
    fn test_no_markers_is_not_an_error() {
        let html = r#"<html><body><p>Maintenance</p></body></html>"#;
        assert!(extract(html).is_empty());
    }

    #[test]
    fn test_empty_body_is_parse_error() {
        let err = rules().extract("https://epiotrkow.pl/news/", "   ").unwrap_err();
        assert!(matches!(err, ParseError::EmptyDocument { .. }));
    }

    #[test]
    fn test_selector_preference_order() {
        let config = FeedConfig {
            article_link_selectors: vec![".tn-img .tn-title".into(), ".tn-title".into()],
            ..FeedConfig::default()
        };
        let rules = ExtractRules::from_config(&config).unwrap();
        let html = r#"
            <div class="tn-img"><a href="/news/top,1"><span class="tn-title">Top</span></a></div>
            <a href="/news/rest,2"><span class="tn-title">Rest</span></a>"#;
        let articles = rules.extract("https://epiotrkow.pl/news/", html).unwrap();
        assert_eq!(articles.len(), 1);
        assert_eq!(articles[0].id, 1);
    }

    #[test]
    fn test_invalid_selector_is_config_error() {
        let config = FeedConfig {
            article_link_selectors: vec!["<<<".into()],
            ..FeedConfig::default()
        };
        assert!(matches!(
            ExtractRules::from_config(&config),
            Err(ConfigError::Selector { .. })
        ));
    }

    #[test]
    fn test_pattern_without_id_group_is_config_error() {
        let config = FeedConfig {
            id_link: r"^/news/.+,\d+$".into(),
            ..FeedConfig::default()
        };
        assert!(matches!(
            ExtractRules::from_config(&config),
            Err(ConfigError::MissingIdGroup(_))
        ));
    }

    #[test]
    fn test_is_plain_slug() {
        assert!(is_plain_slug("zderzenie-na-al-3-maja-2024"));
        assert!(!is_plain_slug("Wielkie_Litery"));
        assert!(!is_plain_slug("%C5%82ad"));
    }
}
