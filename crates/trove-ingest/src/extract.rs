//! Product data extraction: HTML first, message text second, URL-derived
//! fallbacks last.
//!
//! Selector lists are ordered per field. A host-specific table (the big
//! Indian storefronts have stable, well-known markup) is consulted before a
//! generic table of OpenGraph metas and common markup. The first match that
//! yields a non-empty, non-placeholder value wins.
//!
//! Like resolution, extraction is best-effort: it degrades field by field
//! and never aborts the pipeline.

use std::{future::Future, time::Duration};

use scraper::{ElementRef, Html, Selector};
use trove_core::pipeline::ProductSnapshot;
use url::Url;

use crate::Result;

pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; \
   x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 \
   Safari/537.36";

const FETCH_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_TITLE_CHARS: usize = 120;

// ─── PageFetcher ─────────────────────────────────────────────────────────────

/// Fetch the HTML body of a product page.
pub trait PageFetcher: Send + Sync {
  fn fetch_page<'a>(
    &'a self,
    url: &'a Url,
  ) -> impl Future<Output = Result<String>> + Send + 'a;
}

/// Production fetcher with browser-like headers; some storefronts serve
/// skeleton pages to unknown user agents.
pub struct HttpFetcher {
  client: reqwest::Client,
}

impl HttpFetcher {
  pub fn new() -> Result<Self> {
    use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, HeaderMap, HeaderValue};

    let mut headers = HeaderMap::new();
    headers.insert(
      ACCEPT,
      HeaderValue::from_static(
        "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
      ),
    );
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));

    let client = reqwest::Client::builder()
      .user_agent(BROWSER_USER_AGENT)
      .default_headers(headers)
      .timeout(FETCH_TIMEOUT)
      .redirect(reqwest::redirect::Policy::limited(5))
      .build()?;
    Ok(Self { client })
  }
}

impl PageFetcher for HttpFetcher {
  fn fetch_page<'a>(
    &'a self,
    url: &'a Url,
  ) -> impl Future<Output = Result<String>> + Send + 'a {
    async move {
      let resp = self.client.get(url.clone()).send().await?;
      Ok(resp.error_for_status()?.text().await?)
    }
  }
}

// ─── Selector tables ─────────────────────────────────────────────────────────

struct SelectorSet {
  title:          &'static [&'static str],
  description:    &'static [&'static str],
  image:          &'static [&'static str],
  price:          &'static [&'static str],
  original_price: &'static [&'static str],
  rating:         &'static [&'static str],
  review_count:   &'static [&'static str],
}

static AMAZON: SelectorSet = SelectorSet {
  title:          &["#productTitle"],
  description:    &["#feature-bullets", "meta[name=\"description\"]"],
  image:          &["#landingImage", "#imgBlkFront"],
  price:          &[
    ".a-price .a-offscreen",
    "#priceblock_dealprice",
    "#priceblock_ourprice",
  ],
  original_price: &[
    ".a-price.a-text-price .a-offscreen",
    ".basisPrice .a-offscreen",
  ],
  rating:         &["span.a-icon-alt"],
  review_count:   &["#acrCustomerReviewText"],
};

static FLIPKART: SelectorSet = SelectorSet {
  title:          &["span.B_NuCI", "span.VU-ZEz"],
  description:    &["meta[name=\"description\"]"],
  image:          &["img._396cs4", "img.DByuf4"],
  price:          &["div._30jeq3", "div.Nx9bqj"],
  original_price: &["div._3I9_wc", "div.yRaY8j"],
  rating:         &["div._3LWZlK", "div.XQDdHH"],
  review_count:   &["span._2_R_DZ", "span.Wphh3N"],
};

static MYNTRA: SelectorSet = SelectorSet {
  title:          &["h1.pdp-title", "h1.pdp-name"],
  description:    &["p.pdp-product-description-content"],
  image:          &[],
  price:          &["span.pdp-price strong", "span.pdp-price"],
  original_price: &["span.pdp-mrp s"],
  rating:         &["div.index-overallRating"],
  review_count:   &[],
};

static GENERIC: SelectorSet = SelectorSet {
  title:          &["meta[property=\"og:title\"]", "h1", "title"],
  description:    &[
    "meta[property=\"og:description\"]",
    "meta[name=\"description\"]",
  ],
  image:          &["meta[property=\"og:image\"]", "img.product-image", "img"],
  price:          &[
    "meta[property=\"product:price:amount\"]",
    "[itemprop=\"price\"]",
    ".price",
    ".product-price",
    ".offer-price",
  ],
  original_price: &[".mrp", ".strike-price", "del", "s"],
  rating:         &["[itemprop=\"ratingValue\"]"],
  review_count:   &["[itemprop=\"reviewCount\"]"],
};

fn selector_sets(host: &str) -> Vec<&'static SelectorSet> {
  let specific = if host.contains("amazon.") {
    Some(&AMAZON)
  } else if host.contains("flipkart.") {
    Some(&FLIPKART)
  } else if host.contains("myntra.") {
    Some(&MYNTRA)
  } else {
    None
  };
  specific.into_iter().chain([&GENERIC]).collect()
}

// ─── HTML extraction ─────────────────────────────────────────────────────────

/// Parse a product page into a snapshot. Pure; the fetch happens elsewhere.
pub fn extract_from_html(html: &str, base: &Url) -> ProductSnapshot {
  let doc = Html::parse_document(html);
  let sets = selector_sets(base.host_str().unwrap_or(""));

  let text_field = |pick: fn(&SelectorSet) -> &'static [&'static str]| {
    sets
      .iter()
      .flat_map(|s| pick(s).iter())
      .find_map(|css| first_text(&doc, css))
  };

  let price_raw = text_field(|s| s.price);
  let original_raw = text_field(|s| s.original_price);

  ProductSnapshot {
    title:          text_field(|s| s.title).map(|t| clip(&t, MAX_TITLE_CHARS)),
    description:    text_field(|s| s.description),
    image_url:      sets
      .iter()
      .flat_map(|s| s.image.iter())
      .find_map(|css| first_image(&doc, css, base)),
    price:          price_raw.as_deref().and_then(parse_price),
    original_price: original_raw.as_deref().and_then(parse_price),
    currency:       price_raw
      .as_deref()
      .and_then(detect_currency)
      .map(str::to_owned),
    rating:         text_field(|s| s.rating).as_deref().and_then(parse_rating),
    review_count:   text_field(|s| s.review_count)
      .as_deref()
      .and_then(parse_count),
    category_hint:  category_hint(base),
  }
}

/// First non-empty textual value for a selector. `<meta>` elements yield
/// their `content` attribute, everything else its text content.
fn first_text(doc: &Html, css: &str) -> Option<String> {
  let selector = Selector::parse(css).ok()?;
  doc.select(&selector).find_map(|el| {
    let value = if el.value().name() == "meta" {
      el.value().attr("content").unwrap_or("").to_owned()
    } else {
      collapse_whitespace(&el.text().collect::<String>())
    };
    let value = value.trim().to_owned();
    (!value.is_empty()).then_some(value)
  })
}

/// First usable image URL for a selector: lazy-load attributes win over
/// `src`, relative URLs resolve against the page, placeholder assets are
/// rejected.
fn first_image(doc: &Html, css: &str, base: &Url) -> Option<String> {
  let selector = Selector::parse(css).ok()?;
  doc.select(&selector).find_map(|el| image_candidate(el, base))
}

fn image_candidate(el: ElementRef<'_>, base: &Url) -> Option<String> {
  let raw = ["data-src", "data-lazy-src", "src", "content"]
    .iter()
    .find_map(|attr| el.value().attr(attr))?;
  let resolved = base.join(raw.trim()).ok()?;
  if !matches!(resolved.scheme(), "http" | "https") {
    return None;
  }
  let url = resolved.to_string();
  (!is_placeholder_image(&url)).then_some(url)
}

const PLACEHOLDER_MARKERS: &[&str] = &[
  "logo",
  "icon",
  "sprite",
  "placeholder",
  "1x1",
  "pixel",
  "spacer",
  "blank",
];

fn is_placeholder_image(url: &str) -> bool {
  let lower = url.to_ascii_lowercase();
  PLACEHOLDER_MARKERS.iter().any(|m| lower.contains(m))
}

// ─── Text heuristics ─────────────────────────────────────────────────────────

/// Recover what we can from the message text itself. Used when the page
/// could not be fetched or said less than the message did.
pub fn extract_from_text(text: &str) -> ProductSnapshot {
  // Deal messages list old and new prices in either order; the smaller
  // marked amount is the selling price.
  let amounts = currency_amounts(text);
  let price = amounts.iter().copied().reduce(f64::min);
  let original_price = amounts
    .iter()
    .copied()
    .reduce(f64::max)
    .filter(|&a| price.is_some_and(|p| a > p));

  ProductSnapshot {
    title: text
      .lines()
      .map(str::trim)
      .find(|l| l.chars().count() >= 5 && !l.contains("http"))
      .map(|l| clip(l, MAX_TITLE_CHARS)),
    description: None,
    image_url: None,
    price,
    original_price,
    currency: if price.is_some() {
      detect_currency(text).map(str::to_owned)
    } else {
      None
    },
    rating: rating_from_text(text),
    review_count: count_from_text(text),
    category_hint: None,
  }
}

/// Amounts with a currency marker, in order of appearance. Handles both
/// `₹1,999` and `Rs. 1999` spellings.
fn currency_amounts(text: &str) -> Vec<f64> {
  let tokens: Vec<&str> = text.split_whitespace().collect();
  let mut out = Vec::new();
  let mut i = 0;
  while i < tokens.len() {
    let t = tokens[i];
    let marked = t.contains('₹')
      || t.contains('$')
      || t.starts_with("Rs")
      || t.starts_with("INR");
    if marked {
      if let Some(v) = parse_price(t) {
        out.push(v);
      } else if let Some(v) = tokens.get(i + 1).and_then(|n| parse_price(n)) {
        out.push(v);
        i += 1;
      }
    }
    i += 1;
  }
  out
}

fn rating_from_text(text: &str) -> Option<f64> {
  let idx = text.find("/5")?;
  let prefix: String = text[..idx]
    .chars()
    .rev()
    .take_while(|c| c.is_ascii_digit() || *c == '.')
    .collect();
  let token: String = prefix.chars().rev().collect();
  token.parse().ok().filter(|r| (0.0..=5.0).contains(r))
}

fn count_from_text(text: &str) -> Option<u32> {
  let lower = text.to_ascii_lowercase();
  let idx = lower.find("review").or_else(|| lower.find("rating"))?;
  let prefix: String = lower[..idx]
    .chars()
    .rev()
    .skip_while(|c| c.is_whitespace())
    .take_while(|c| c.is_ascii_digit() || *c == ',')
    .collect();
  let token: String = prefix.chars().rev().filter(|c| *c != ',').collect();
  token.parse().ok()
}

// ─── Value parsing ───────────────────────────────────────────────────────────

/// `"₹1,999.00"` → `1999.0`. Strips everything but digits and the decimal
/// point; rejects non-positive results.
pub fn parse_price(raw: &str) -> Option<f64> {
  let cleaned: String = raw
    .chars()
    .filter(|c| c.is_ascii_digit() || *c == '.')
    .collect();
  let cleaned = cleaned.trim_matches('.');
  cleaned.parse::<f64>().ok().filter(|p| *p > 0.0)
}

pub fn detect_currency(raw: &str) -> Option<&'static str> {
  if raw.contains('₹') || raw.contains("Rs") || raw.contains("INR") {
    Some("INR")
  } else if raw.contains('$') || raw.contains("USD") {
    Some("USD")
  } else if raw.contains('€') {
    Some("EUR")
  } else if raw.contains('£') {
    Some("GBP")
  } else {
    None
  }
}

/// `"4.3 out of 5 stars"` → `4.3`.
fn parse_rating(raw: &str) -> Option<f64> {
  raw
    .split(|c: char| !(c.is_ascii_digit() || c == '.'))
    .find_map(|t| t.parse::<f64>().ok())
    .filter(|r| (0.0..=5.0).contains(r))
}

/// `"12,456 ratings"` → `12456`.
fn parse_count(raw: &str) -> Option<u32> {
  raw
    .split(|c: char| !(c.is_ascii_digit() || c == ','))
    .filter(|t| t.chars().any(|c| c.is_ascii_digit()))
    .find_map(|t| t.replace(',', "").parse::<u32>().ok())
}

// ─── Fallbacks ───────────────────────────────────────────────────────────────

/// Last-resort title from the URL: longest path segment, de-slugged.
pub fn title_from_url(url: &Url) -> String {
  let host = url.host_str().unwrap_or("store");
  let slug = url
    .path_segments()
    .into_iter()
    .flatten()
    .filter(|s| s.len() >= 3)
    .max_by_key(|s| s.len());

  if let Some(slug) = slug {
    let decoded = urlencoding::decode(slug).map(|c| c.into_owned());
    let cleaned = decoded
      .unwrap_or_else(|_| slug.to_owned())
      .trim_end_matches(".html")
      .replace(['-', '_', '+'], " ")
      .trim()
      .to_owned();
    if cleaned.chars().any(|c| c.is_ascii_alphabetic()) {
      return clip(&capitalize(&cleaned), MAX_TITLE_CHARS);
    }
  }
  format!("Product from {host}")
}

/// Stand-in image naming the source site; entries must always render with
/// something.
pub fn placeholder_image(url: &Url) -> String {
  let host = url.host_str().unwrap_or("product");
  format!(
    "https://via.placeholder.com/400x400?text={}",
    urlencoding::encode(host)
  )
}

/// Coarse category from the storefront domain, when the domain implies one.
pub fn category_hint(url: &Url) -> Option<String> {
  let host = url.host_str()?.to_ascii_lowercase();
  let hit = |needles: &[&str]| needles.iter().any(|n| host.contains(n));

  let category = if hit(&["amazon.", "flipkart.", "croma.", "reliancedigital."])
  {
    "Electronics & Gadgets"
  } else if hit(&["myntra.", "ajio.", "westside.", "nykaa fashion"]) {
    "Fashion & Lifestyle"
  } else if hit(&["nykaa.", "purplle."]) {
    "Beauty & Personal Care"
  } else if hit(&["bigbasket.", "blinkit.", "zepto."]) {
    "Grocery & Food"
  } else if hit(&["pepperfry.", "urbanladder."]) {
    "Home & Furniture"
  } else if hit(&["firstcry.", "hopscotch."]) {
    "Kids & Baby"
  } else {
    return None;
  };
  Some(category.to_owned())
}

/// Merge page data, text heuristics and URL fallbacks into a snapshot that
/// is guaranteed to carry a title and an image.
pub fn complete(
  page: ProductSnapshot,
  text: &str,
  url: &Url,
) -> ProductSnapshot {
  let from_text = extract_from_text(text);

  let price = page.price.or(from_text.price);
  let original_price = match (price, page.original_price.or(from_text.original_price)) {
    // An "original" price at or below the selling price is noise.
    (Some(p), Some(o)) if o > p => Some(o),
    (None, o) => o,
    _ => None,
  };

  ProductSnapshot {
    title: page
      .title
      .or(from_text.title)
      .or_else(|| Some(title_from_url(url))),
    description: page.description.or(from_text.description),
    image_url: page.image_url.or_else(|| Some(placeholder_image(url))),
    price,
    original_price,
    currency: page.currency.or(from_text.currency),
    rating: page.rating.or(from_text.rating),
    review_count: page.review_count.or(from_text.review_count),
    category_hint: page.category_hint.or_else(|| category_hint(url)),
  }
}

// ─── Small string helpers ────────────────────────────────────────────────────

fn collapse_whitespace(s: &str) -> String {
  s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn clip(s: &str, max_chars: usize) -> String {
  match s.char_indices().nth(max_chars) {
    Some((i, _)) => s[..i].trim_end().to_owned(),
    None => s.to_owned(),
  }
}

fn capitalize(s: &str) -> String {
  let mut chars = s.chars();
  match chars.next() {
    Some(c) => c.to_uppercase().chain(chars).collect(),
    None => String::new(),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn url(s: &str) -> Url { Url::parse(s).unwrap() }

  const AMAZON_PAGE: &str = r#"
    <html><body>
      <span id="productTitle">  Noise Smart Watch
        (Black)  </span>
      <div class="a-price"><span class="a-offscreen">₹1,999.00</span></div>
      <div class="a-price a-text-price"><span class="a-offscreen">₹4,999</span></div>
      <img id="landingImage" data-src="https://m.media.example/images/I/71x.jpg" src="https://m.media.example/images/sprite.png"/>
      <span class="a-icon-alt">4.1 out of 5 stars</span>
      <span id="acrCustomerReviewText">12,456 ratings</span>
    </body></html>"#;

  #[test]
  fn amazon_selectors_win_over_generic() {
    let snap =
      extract_from_html(AMAZON_PAGE, &url("https://www.amazon.in/dp/B0X"));
    assert_eq!(snap.title.as_deref(), Some("Noise Smart Watch (Black)"));
    assert_eq!(snap.price, Some(1999.0));
    assert_eq!(snap.original_price, Some(4999.0));
    assert_eq!(snap.currency.as_deref(), Some("INR"));
    assert_eq!(snap.rating, Some(4.1));
    assert_eq!(snap.review_count, Some(12456));
    // data-src preferred over the sprite in src.
    assert_eq!(
      snap.image_url.as_deref(),
      Some("https://m.media.example/images/I/71x.jpg")
    );
    assert_eq!(snap.category_hint.as_deref(), Some("Electronics & Gadgets"));
    assert_eq!(snap.discount_percent(), Some(60));
  }

  #[test]
  fn generic_page_uses_opengraph() {
    let html = r#"
      <html><head>
        <meta property="og:title" content="Cotton Kurta Set"/>
        <meta property="og:image" content="/media/kurta.jpg"/>
        <meta property="og:description" content="Handwoven cotton kurta."/>
      </head><body><h1>ignored</h1></body></html>"#;
    let snap = extract_from_html(html, &url("https://boutique.example/p/kurta"));
    assert_eq!(snap.title.as_deref(), Some("Cotton Kurta Set"));
    assert_eq!(
      snap.image_url.as_deref(),
      Some("https://boutique.example/media/kurta.jpg")
    );
    assert_eq!(snap.description.as_deref(), Some("Handwoven cotton kurta."));
    assert!(snap.category_hint.is_none());
  }

  #[test]
  fn placeholder_images_are_rejected() {
    let html = r#"
      <html><body>
        <img src="https://cdn.example/logo.png"/>
        <img src="https://cdn.example/assets/icon-cart.svg"/>
        <img src="https://cdn.example/products/watch-photo.jpg"/>
      </body></html>"#;
    let snap = extract_from_html(html, &url("https://cdn.example/p/1"));
    assert_eq!(
      snap.image_url.as_deref(),
      Some("https://cdn.example/products/watch-photo.jpg")
    );
  }

  #[test]
  fn price_parsing_handles_symbols_and_separators() {
    assert_eq!(parse_price("₹1,999.00"), Some(1999.0));
    assert_eq!(parse_price("Rs. 12,499"), Some(12499.0));
    assert_eq!(parse_price("$49.99"), Some(49.99));
    assert_eq!(parse_price("Free"), None);
    assert_eq!(parse_price("₹0"), None);
  }

  #[test]
  fn currency_detection() {
    assert_eq!(detect_currency("₹999"), Some("INR"));
    assert_eq!(detect_currency("Rs. 999"), Some("INR"));
    assert_eq!(detect_currency("$12"), Some("USD"));
    assert_eq!(detect_currency("€12"), Some("EUR"));
    assert_eq!(detect_currency("£12"), Some("GBP"));
    assert_eq!(detect_currency("999"), None);
  }

  #[test]
  fn text_heuristics_find_title_and_prices() {
    let text = "🔥 Deal alert!\nboAt Airdopes 141 TWS Earbuds\n\
                Now ₹1,099 (MRP ₹4,490) — 4.2/5 from 2,341 reviews\n\
                https://sho.rt/x";
    let snap = extract_from_text(text);
    assert_eq!(snap.title.as_deref(), Some("🔥 Deal alert!"));
    assert_eq!(snap.price, Some(1099.0));
    assert_eq!(snap.original_price, Some(4490.0));
    assert_eq!(snap.currency.as_deref(), Some("INR"));
    assert_eq!(snap.rating, Some(4.2));
    assert_eq!(snap.review_count, Some(2341));
  }

  #[test]
  fn text_prices_ignore_listing_order() {
    // Old price quoted first must not become the selling price.
    let snap = extract_from_text("Was ₹1,999 now just ₹999!\nGrab it fast");
    assert_eq!(snap.price, Some(999.0));
    assert_eq!(snap.original_price, Some(1999.0));

    let snap = extract_from_text("Only ₹999 today");
    assert_eq!(snap.price, Some(999.0));
    assert_eq!(snap.original_price, None);
  }

  #[test]
  fn url_title_fallback_deslugs() {
    assert_eq!(
      title_from_url(&url(
        "https://www.flipkart.com/noise-colorfit-pro-4-smartwatch/p/itm123"
      )),
      "Noise colorfit pro 4 smartwatch"
    );
    assert_eq!(
      title_from_url(&url("https://shop.example/")),
      "Product from shop.example"
    );
  }

  #[test]
  fn complete_always_has_title_and_image() {
    let base = url("https://www.meesho.com/p/steel-water-bottle-1l/987");
    let snap = complete(ProductSnapshot::default(), "", &base);
    assert_eq!(snap.title.as_deref(), Some("Steel water bottle 1l"));
    assert_eq!(
      snap.image_url.as_deref(),
      Some("https://via.placeholder.com/400x400?text=www.meesho.com")
    );
  }

  #[test]
  fn complete_drops_bogus_original_price() {
    let page = ProductSnapshot {
      price: Some(999.0),
      original_price: Some(999.0),
      ..Default::default()
    };
    let snap = complete(page, "", &url("https://shop.example/p/1"));
    assert_eq!(snap.original_price, None);
  }
}
