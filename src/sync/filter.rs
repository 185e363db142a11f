use std::collections::HashSet;

use crate::remote::IllustSummary;

/// Declarative accept/reject rules applied to listing metadata. Evaluation is
/// pure and never does I/O; it only inspects fields already fetched.
#[derive(Debug, Clone, Default)]
pub struct FilterConfig {
    pub allow_r18: bool,
    pub min_lewd_level: Option<i64>,
    pub max_lewd_level: Option<i64>,
    /// An item carrying any of these tags is rejected.
    pub filter_tags: HashSet<String>,
    /// AND semantics: every one of these tags must be present.
    pub require_tags: HashSet<String>,
    pub min_bookmarks: Option<i64>,
    pub max_bookmarks: Option<i64>,
    pub max_pages: Option<i64>,
}

impl FilterConfig {
    pub fn new() -> Self {
        Self {
            allow_r18: false,
            ..Default::default()
        }
    }

    /// Returns the reject reason, or None if the item passes every rule.
    /// Rules short-circuit in a fixed order so log output is predictable.
    pub fn evaluate(&self, item: &IllustSummary) -> Option<String> {
        // tag names and translations, case-normalized
        let tags: HashSet<String> = item
            .tags
            .iter()
            .flat_map(|t| {
                std::iter::once(t.name.to_lowercase())
                    .chain(t.translated_name.iter().map(|n| n.to_lowercase()))
            })
            .collect();

        if !item.visible {
            return Some("not visible".to_string());
        }

        if item.r18 && !self.allow_r18 {
            return Some("R-18".to_string());
        }

        if let Some(min) = self.min_lewd_level {
            if item.lewd_level < min {
                return Some(format!("lewd level {} below minimum {}", item.lewd_level, min));
            }
        }

        if let Some(max) = self.max_lewd_level {
            if item.lewd_level > max {
                return Some(format!("lewd level {} above maximum {}", item.lewd_level, max));
            }
        }

        let mut unwanted: Vec<&String> = self.filter_tags.intersection(&tags).collect();
        if !unwanted.is_empty() {
            unwanted.sort();
            return Some(format!(
                "contains filtered tag(s): {}",
                unwanted
                    .iter()
                    .map(|s| s.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            ));
        }

        if !self.require_tags.is_empty() {
            let mut missing: Vec<&String> = self.require_tags.difference(&tags).collect();
            if !missing.is_empty() {
                missing.sort();
                return Some(format!(
                    "missing required tag(s): {}",
                    missing
                        .iter()
                        .map(|s| s.as_str())
                        .collect::<Vec<_>>()
                        .join(", ")
                ));
            }
        }

        if let Some(min) = self.min_bookmarks {
            if item.bookmarks < min {
                return Some(format!("bookmarks {} below minimum {}", item.bookmarks, min));
            }
        }

        if let Some(max) = self.max_bookmarks {
            if item.bookmarks > max {
                return Some(format!("bookmarks {} above maximum {}", item.bookmarks, max));
            }
        }

        if let Some(max) = self.max_pages {
            if item.page_count > max {
                return Some(format!("page count {} above maximum {}", item.page_count, max));
            }
        }

        None
    }

    pub fn accepts(&self, item: &IllustSummary) -> bool {
        self.evaluate(item).is_none()
    }
}
