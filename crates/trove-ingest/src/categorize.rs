//! Keyword categorization.
//!
//! Weighted keyword tables assign a category; separate flag keyword sets
//! drive the featured / service / app decisions, which in turn pick the
//! display pages. A channel hint seeds flags and a confidence baseline, and
//! keyword evidence can override it.
//!
//! Matching is word-boundary aware. Plain substring checks turn "chair"
//! into an AI product.

use trove_core::{
  classify::Classifier,
  entry::ContentType,
  pipeline::CategoryAssignment,
};

// ─── Keyword tables ──────────────────────────────────────────────────────────

struct CategoryRule {
  category: &'static str,
  priority: u32,
  keywords: &'static [&'static str],
}

/// Checked first; the highest-priority table.
const AI_APP_CATEGORIES: &[CategoryRule] = &[
  CategoryRule {
    category: "AI Apps",
    priority: 10,
    keywords: &[
      "ai",
      "chatgpt",
      "copilot",
      "midjourney",
      "artificial intelligence",
      "ai tool",
      "ai assistant",
    ],
  },
  CategoryRule {
    category: "Apps & Software",
    priority: 10,
    keywords: &["app", "software", "apk", "android", "ios", "saas"],
  },
];

const SERVICE_CATEGORIES: &[CategoryRule] = &[
  CategoryRule {
    category: "Financial Services",
    priority: 8,
    keywords: &[
      "credit card",
      "loan",
      "insurance",
      "demat",
      "mutual fund",
      "emi",
    ],
  },
  CategoryRule {
    category: "Streaming Services",
    priority: 8,
    keywords: &["netflix", "prime video", "hotstar", "spotify", "ott"],
  },
  CategoryRule {
    category: "Telecom Services",
    priority: 8,
    keywords: &["recharge", "broadband", "postpaid", "prepaid", "sim"],
  },
  CategoryRule {
    category: "Hosting & Domains",
    priority: 8,
    keywords: &["hosting", "domain", "vpn", "cloud storage"],
  },
];

const PRODUCT_CATEGORIES: &[CategoryRule] = &[
  CategoryRule {
    category: "Electronics & Gadgets",
    priority: 5,
    keywords: &[
      "phone",
      "laptop",
      "tablet",
      "headphone",
      "earbuds",
      "speaker",
      "camera",
      "tv",
      "mobile",
      "smartwatch",
    ],
  },
  CategoryRule {
    category: "Fashion & Lifestyle",
    priority: 5,
    keywords: &[
      "shirt", "dress", "shoes", "bag", "watch", "clothing", "fashion",
      "kurta", "jeans", "saree",
    ],
  },
  CategoryRule {
    category: "Home & Kitchen",
    priority: 5,
    keywords: &[
      "home", "kitchen", "furniture", "decor", "appliance", "cookware",
      "bottle",
    ],
  },
  CategoryRule {
    category: "Health & Beauty",
    priority: 5,
    keywords: &[
      "beauty", "skincare", "makeup", "health", "fitness", "wellness",
    ],
  },
  CategoryRule {
    category: "Sports & Fitness",
    priority: 5,
    keywords: &["sports", "gym", "exercise", "running", "cricket", "yoga"],
  },
  CategoryRule {
    category: "Books & Media",
    priority: 5,
    keywords: &["book", "ebook", "magazine", "education", "learning"],
  },
];

const FEATURED_KEYWORDS: &[&str] = &[
  "deal",
  "offer",
  "discount",
  "sale",
  "hot",
  "trending",
  "bestseller",
  "best seller",
  "exclusive",
  "limited",
  "steal",
];

const SERVICE_KEYWORDS: &[&str] = &[
  "service",
  "subscription",
  "plan",
  "membership",
  "insurance",
  "loan",
  "credit card",
  "recharge",
  "booking",
  "hosting",
  "vpn",
  "streaming",
];

const APP_KEYWORDS: &[&str] = &[
  "app",
  "ai",
  "chatgpt",
  "software",
  "apk",
  "play store",
  "app store",
];

// ─── Channel hints ───────────────────────────────────────────────────────────

struct ChannelHint {
  channel:  &'static str,
  category: Option<&'static str>,
  featured: bool,
  service:  bool,
  app:      bool,
}

const CHANNEL_HINTS: &[ChannelHint] = &[
  ChannelHint {
    channel:  "prime-picks",
    category: None,
    featured: true,
    service:  false,
    app:      false,
  },
  ChannelHint {
    channel:  "cue-picks",
    category: None,
    featured: false,
    service:  false,
    app:      false,
  },
  ChannelHint {
    channel:  "value-picks",
    category: None,
    featured: false,
    service:  false,
    app:      false,
  },
  ChannelHint {
    channel:  "click-picks",
    category: None,
    featured: false,
    service:  false,
    app:      true,
  },
  ChannelHint {
    channel:  "deals-hub",
    category: None,
    featured: true,
    service:  false,
    app:      false,
  },
  ChannelHint {
    channel:  "loot-box",
    category: None,
    featured: true,
    service:  false,
    app:      false,
  },
  ChannelHint {
    channel:  "travel-picks",
    category: Some("Travel & Booking"),
    featured: false,
    service:  true,
    app:      false,
  },
];

// ─── Confidence weights ──────────────────────────────────────────────────────

const CHANNEL_BASELINE: u32 = 30;
const FEATURED_WEIGHT: u32 = 5;
const SERVICE_WEIGHT: u32 = 8;
const APP_WEIGHT: u32 = 10;
const SERVICE_THRESHOLD: u32 = 2;

// ─── Classifier ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordClassifier;

impl KeywordClassifier {
  pub fn new() -> Self { Self }
}

impl Classifier for KeywordClassifier {
  fn classify(
    &self,
    title: &str,
    description: &str,
    channel: Option<&str>,
  ) -> CategoryAssignment {
    let text = format!("{title} {description}").to_lowercase();
    let hint =
      channel.and_then(|c| CHANNEL_HINTS.iter().find(|h| h.channel == c));

    let featured_hits = count_hits(&text, FEATURED_KEYWORDS);
    let service_hits = count_hits(&text, SERVICE_KEYWORDS);
    let app_hits = count_hits(&text, APP_KEYWORDS);

    let is_app = app_hits >= 1 || hint.is_some_and(|h| h.app);
    let is_service = !is_app
      && (service_hits >= SERVICE_THRESHOLD || hint.is_some_and(|h| h.service));
    let is_featured = featured_hits >= 1 || hint.is_some_and(|h| h.featured);

    let content_type = if is_app {
      ContentType::App
    } else if is_service {
      ContentType::Service
    } else {
      ContentType::Product
    };

    let category = best_category(&text)
      .or_else(|| hint.and_then(|h| h.category))
      .unwrap_or("General")
      .to_owned();

    let confidence = (u32::from(hint.is_some()) * CHANNEL_BASELINE
      + featured_hits * FEATURED_WEIGHT
      + service_hits * SERVICE_WEIGHT
      + app_hits * APP_WEIGHT)
      .min(100) as u8;

    let mut display_pages = vec!["home".to_owned()];
    if is_featured {
      display_pages.push("top-picks".to_owned());
    }
    if is_service {
      display_pages.push("services".to_owned());
    }
    if is_app {
      display_pages.push("apps".to_owned());
    }

    CategoryAssignment {
      category,
      content_type,
      is_featured,
      confidence,
      display_pages,
    }
  }
}

/// Highest score wins; score is matched keywords times table priority.
/// Ties keep the earlier (higher-priority-table) rule.
fn best_category(text: &str) -> Option<&'static str> {
  let mut best: Option<(&'static str, u32)> = None;
  let rules = AI_APP_CATEGORIES
    .iter()
    .chain(SERVICE_CATEGORIES)
    .chain(PRODUCT_CATEGORIES);

  for rule in rules {
    let score = count_hits(text, rule.keywords) * rule.priority;
    if score > 0 && best.is_none_or(|(_, b)| score > b) {
      best = Some((rule.category, score));
    }
  }
  best.map(|(category, _)| category)
}

fn count_hits(text: &str, keywords: &[&str]) -> u32 {
  keywords.iter().filter(|kw| has_keyword(text, kw)).count() as u32
}

/// Substring match with word boundaries on both ends.
fn has_keyword(text: &str, keyword: &str) -> bool {
  let mut from = 0;
  while let Some(pos) = text[from..].find(keyword) {
    let at = from + pos;
    let end = at + keyword.len();
    let before_ok =
      text[..at].chars().next_back().is_none_or(|c| !c.is_alphanumeric());
    let after_ok =
      text[end..].chars().next().is_none_or(|c| !c.is_alphanumeric());
    if before_ok && after_ok {
      return true;
    }
    from = end;
  }
  false
}
