//! GitHub-flavored markdown anchors and index links for section headings.

use std::collections::HashMap;

/// GitHub heading anchor slug.
///
/// Lowercase; keep alphanumerics, `-` and `_`; spaces become hyphens;
/// everything else is dropped.
pub fn github_slug(text: &str) -> String {
    text.trim()
        .to_lowercase()
        .chars()
        .filter_map(|c| match c {
            ' ' => Some('-'),
            c if c.is_alphanumeric() || c == '-' || c == '_' => Some(c),
            _ => None,
        })
        .collect()
}

/// Hands out unique anchors the way GitHub numbers repeated headings:
/// `values`, `values-1`, `values-2`, ...
#[derive(Debug, Default)]
pub struct Slugger {
    seen: HashMap<String, usize>,
}

impl Slugger {
    pub fn slug(&mut self, heading: &str) -> String {
        let base = github_slug(heading);
        let count = self.seen.entry(base.clone()).or_insert(0);
        let slug = if *count == 0 {
            base
        } else {
            format!("{}-{}", base, count)
        };
        *count += 1;
        slug
    }
}

/// `[heading](#anchor)`
pub fn render_toc_link(heading: &str, anchor: &str) -> String {
    format!("[{}](#{})", heading, anchor)
}

/// Index list item linking to a heading.
pub fn render_toc_item(heading: &str, anchor: &str) -> String {
    format!("* {}", render_toc_link(heading, anchor))
}
