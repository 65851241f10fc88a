//! HTML parser for chapter pages
//!
//! This module handles parsing a fetched page to extract:
//! - The link to the next chapter, through an ordered list of matchers
//! - The page title, used to name the saved file

use crate::config::{LinksConfig, DEFAULT_NEXT_SELECTORS};
use crate::url::resolve_link;
use crate::ConfigError;
use scraper::{Html, Selector};
use std::fmt;
use url::Url;

/// One strategy for locating the "next" link on a page
///
/// Implement this to support a site whose next link cannot be described by
/// a CSS selector, then add it with [`LinkExtractor::with_matcher`].
pub trait LinkMatcher: fmt::Debug + Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &str;

    /// Returns the absolute next URL if this strategy finds one
    fn find(&self, document: &Html, base_url: &Url) -> Option<Url>;
}

/// Matches the first element selected by a CSS selector that has a
/// followable `href`
#[derive(Debug, Clone)]
pub struct SelectorMatcher {
    source: String,
    selector: Selector,
}

impl SelectorMatcher {
    /// Parses a CSS selector into a matcher
    pub fn parse(selector: &str) -> Result<Self, ConfigError> {
        let parsed = Selector::parse(selector).map_err(|e| ConfigError::InvalidSelector {
            selector: selector.to_string(),
            message: format!("{:?}", e),
        })?;

        Ok(Self {
            source: selector.to_string(),
            selector: parsed,
        })
    }
}

impl LinkMatcher for SelectorMatcher {
    fn name(&self) -> &str {
        &self.source
    }

    fn find(&self, document: &Html, base_url: &Url) -> Option<Url> {
        document
            .select(&self.selector)
            .filter_map(|element| element.value().attr("href"))
            .find_map(|href| resolve_link(href, base_url))
    }
}

/// Finds the next link on a page by trying matchers in priority order
///
/// The first matcher that yields a URL wins; later matchers are not run.
///
/// # Example
///
/// ```
/// use chapter_chain::LinkExtractor;
/// use url::Url;
///
/// let html = r#"<a class="next" href="/c3">Next</a><a rel="next" href="/c2">Next</a>"#;
/// let base = Url::parse("https://example.com/c1").unwrap();
/// let next = LinkExtractor::default().find_next(html, &base);
/// assert_eq!(next.unwrap().as_str(), "https://example.com/c2");
/// ```
#[derive(Debug)]
pub struct LinkExtractor {
    matchers: Vec<Box<dyn LinkMatcher>>,
}

impl LinkExtractor {
    /// Creates an extractor with no matchers; it never finds a link
    pub fn empty() -> Self {
        Self {
            matchers: Vec::new(),
        }
    }

    /// Creates an extractor from CSS selectors in priority order
    pub fn from_selectors<I>(selectors: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let matchers = selectors
            .into_iter()
            .map(|s| {
                SelectorMatcher::parse(s.as_ref()).map(|m| Box::new(m) as Box<dyn LinkMatcher>)
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { matchers })
    }

    /// Creates an extractor from the `[links]` configuration section
    pub fn from_config(config: &LinksConfig) -> Result<Self, ConfigError> {
        Self::from_selectors(&config.next_selectors)
    }

    /// Appends a matcher with the lowest priority
    pub fn with_matcher(mut self, matcher: impl LinkMatcher + 'static) -> Self {
        self.matchers.push(Box::new(matcher));
        self
    }

    /// Names of the matchers, in priority order
    pub fn matcher_names(&self) -> Vec<&str> {
        self.matchers.iter().map(|m| m.name()).collect()
    }

    /// Parses `content` and looks for the next link
    pub fn find_next(&self, content: &str, base_url: &Url) -> Option<Url> {
        let document = Html::parse_document(content);
        self.find_next_in(&document, base_url)
    }

    /// Looks for the next link in an already parsed document
    pub fn find_next_in(&self, document: &Html, base_url: &Url) -> Option<Url> {
        self.matchers.iter().find_map(|matcher| {
            let found = matcher.find(document, base_url);
            if let Some(url) = &found {
                tracing::debug!("next link {} matched by '{}'", url, matcher.name());
            }
            found
        })
    }
}

impl Default for LinkExtractor {
    fn default() -> Self {
        let matchers = DEFAULT_NEXT_SELECTORS
            .iter()
            .filter_map(|s| SelectorMatcher::parse(s).ok())
            .map(|m| Box::new(m) as Box<dyn LinkMatcher>)
            .collect();

        Self { matchers }
    }
}

/// Extracted information from a chapter page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedPage {
    /// The page title (from the first <title> tag)
    pub title: Option<String>,

    /// The absolute URL of the next chapter, if any
    pub next: Option<Url>,
}

/// Parses a chapter page once and extracts its title and next link
///
/// # Arguments
///
/// * `html` - The page content
/// * `base_url` - The URL the page was fetched from
/// * `extractor` - The next-link strategies to apply
pub fn parse_page(html: &str, base_url: &Url, extractor: &LinkExtractor) -> ParsedPage {
    let document = Html::parse_document(html);

    ParsedPage {
        title: extract_title(&document),
        next: extractor.find_next_in(&document, base_url),
    }
}

/// Extracts the page title from the HTML document
fn extract_title(document: &Html) -> Option<String> {
    let title_selector = Selector::parse("title").ok()?;

    document
        .select(&title_selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
}
