//! Merge per-page signals into one domain-level record.

use std::collections::HashSet;

use sitescout_shared::{AggregatedSignals, PageSignals};

use crate::extract::{MAX_HEADINGS, MAX_TEXT_CHARS};
use crate::text::truncate_chars;

/// Merge `pages` in list order. An empty slice yields an all-empty record.
///
/// - title / description: longest non-empty value, first one wins ties
/// - headings: union, exact dedup, at most [`MAX_HEADINGS`]
/// - text: page texts joined by spaces, bounded to [`MAX_TEXT_CHARS`]
/// - emails / phones: exact-dedup union, uncapped
/// - social links: first page to mention a platform wins
pub fn aggregate(pages: &[PageSignals]) -> AggregatedSignals {
    let mut merged = AggregatedSignals::default();
    let mut title_len = 0;
    let mut description_len = 0;
    let mut text_len = 0;

    let mut seen_headings = HashSet::new();
    let mut seen_emails = HashSet::new();
    let mut seen_phones = HashSet::new();

    for page in pages {
        let len = page.title.chars().count();
        if len > title_len {
            merged.title = page.title.clone();
            title_len = len;
        }

        let len = page.meta_description.chars().count();
        if len > description_len {
            merged.meta_description = page.meta_description.clone();
            description_len = len;
        }

        for heading in &page.headings {
            if merged.headings.len() >= MAX_HEADINGS {
                break;
            }
            if seen_headings.insert(heading.as_str()) {
                merged.headings.push(heading.clone());
            }
        }

        for email in &page.emails {
            if seen_emails.insert(email.as_str()) {
                merged.emails.push(email.clone());
            }
        }

        for phone in &page.phones {
            if seen_phones.insert(phone.as_str()) {
                merged.phones.push(phone.clone());
            }
        }

        for (platform, link) in &page.social_links {
            merged
                .social_links
                .entry(*platform)
                .or_insert_with(|| link.clone());
        }

        if text_len < MAX_TEXT_CHARS && !page.cleaned_text.is_empty() {
            if !merged.cleaned_text.is_empty() {
                merged.cleaned_text.push(' ');
                text_len += 1;
            }
            merged.cleaned_text.push_str(&page.cleaned_text);
            text_len += page.cleaned_text.chars().count();
        }
    }

    if text_len > MAX_TEXT_CHARS {
        merged.cleaned_text = truncate_chars(&merged.cleaned_text, MAX_TEXT_CHARS)
            .trim_end()
            .to_string();
    }

    merged
}
