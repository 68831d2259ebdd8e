//! Heuristic discovery of event-card containers in a parsed document.

use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use tracing::{debug, warn};

use crate::constants::{
    DEFAULT_ASCENT_DEPTH, DEFAULT_CONTAINER_SELECTORS, DEFAULT_DATE_ANCHOR_SELECTORS,
    DEFAULT_MAX_DATE_ANCHORS, DEFAULT_MAX_PER_SELECTOR,
};
use crate::error::{ExtractError, Result};

const STRUCTURAL_TAGS: &[&str] = &["html", "head", "body"];

fn compile_all(selectors: &[&str]) -> Vec<Selector> {
    selectors
        .iter()
        .filter_map(|css| match Selector::parse(css) {
            Ok(selector) => Some(selector),
            Err(e) => {
                warn!("Ignoring built-in selector '{}': {:?}", css, e);
                None
            }
        })
        .collect()
}

fn is_structural(el: ElementRef<'_>) -> bool {
    STRUCTURAL_TAGS.contains(&el.value().name())
}

/// Short `tag.class1.class2` label for logs and rejection records.
pub fn describe(el: ElementRef<'_>) -> String {
    let mut label = el.value().name().to_string();
    for class in el.value().classes().take(2) {
        label.push('.');
        label.push_str(class);
    }
    label
}

/// Unique containers of one document, in document order.
#[derive(Debug, Clone)]
pub struct ContainerSet<'a> {
    containers: Vec<ElementRef<'a>>,
}

impl<'a> ContainerSet<'a> {
    pub fn len(&self) -> usize {
        self.containers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.containers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = ElementRef<'a>> + '_ {
        self.containers.iter().copied()
    }
}

impl<'a> IntoIterator for ContainerSet<'a> {
    type Item = ElementRef<'a>;
    type IntoIter = std::vec::IntoIter<ElementRef<'a>>;

    fn into_iter(self) -> Self::IntoIter {
        self.containers.into_iter()
    }
}

/// Layered container discovery: direct selectors, date-anchored ascent and
/// venue-supplied selectors, unioned by node identity.
#[derive(Debug, Clone)]
pub struct ContainerDiscoverer {
    container_selectors: Vec<Selector>,
    date_anchor_selectors: Vec<Selector>,
    supplemental_selectors: Vec<Selector>,
    ascent_depth: usize,
    max_per_selector: usize,
    max_date_anchors: usize,
}

impl Default for ContainerDiscoverer {
    fn default() -> Self {
        Self {
            container_selectors: compile_all(DEFAULT_CONTAINER_SELECTORS),
            date_anchor_selectors: compile_all(DEFAULT_DATE_ANCHOR_SELECTORS),
            supplemental_selectors: Vec::new(),
            ascent_depth: DEFAULT_ASCENT_DEPTH,
            max_per_selector: DEFAULT_MAX_PER_SELECTOR,
            max_date_anchors: DEFAULT_MAX_DATE_ANCHORS,
        }
    }
}

impl ContainerDiscoverer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds venue-specific container selectors; a bad selector is a config error.
    pub fn with_supplemental<S: AsRef<str>>(mut self, selectors: &[S]) -> Result<Self> {
        for css in selectors {
            let css = css.as_ref();
            let selector = Selector::parse(css).map_err(|e| ExtractError::InvalidSelector {
                selector: css.to_string(),
                reason: format!("{:?}", e),
            })?;
            self.supplemental_selectors.push(selector);
        }
        Ok(self)
    }

    pub fn with_ascent_depth(mut self, depth: usize) -> Self {
        self.ascent_depth = depth;
        self
    }

    pub fn discover<'a>(&self, document: &'a Html) -> ContainerSet<'a> {
        let mut seen = HashSet::new();

        let mut direct = 0;
        for selector in &self.container_selectors {
            for el in document.select(selector).take(self.max_per_selector) {
                if !is_structural(el) && seen.insert(el.id()) {
                    direct += 1;
                }
            }
        }

        let mut ascended = 0;
        let anchors = self
            .date_anchor_selectors
            .iter()
            .flat_map(|selector| document.select(selector))
            .take(self.max_date_anchors);
        for anchor in anchors {
            let mut current = anchor.parent().and_then(ElementRef::wrap);
            for _ in 0..self.ascent_depth {
                let Some(el) = current else { break };
                if is_structural(el) {
                    break;
                }
                if seen.insert(el.id()) {
                    ascended += 1;
                }
                current = el.parent().and_then(ElementRef::wrap);
            }
        }

        let mut supplemental = 0;
        for selector in &self.supplemental_selectors {
            for el in document.select(selector).take(self.max_per_selector) {
                if !is_structural(el) && seen.insert(el.id()) {
                    supplemental += 1;
                }
            }
        }

        debug!(
            direct,
            ascended, supplemental, "Discovered {} containers", seen.len()
        );

        let containers = document
            .root_element()
            .descendants()
            .filter_map(ElementRef::wrap)
            .filter(|el| seen.contains(&el.id()))
            .collect();
        ContainerSet { containers }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_reachable_twice_is_returned_once() {
        let html = r#"<html><body><main>
            <div class="event"><h3>Jazz Night</h3><time datetime="2026-03-01">March 1</time></div>
        </main></body></html>"#;
        let doc = Html::parse_document(html);
        let set = ContainerDiscoverer::new().discover(&doc);

        let events: Vec<_> = set
            .iter()
            .filter(|el| el.value().classes().any(|c| c == "event"))
            .collect();
        assert_eq!(events.len(), 1);
        // main is reached by ascent from the time element
        assert!(set.iter().any(|el| el.value().name() == "main"));
        assert!(!set.iter().any(|el| el.value().name() == "body"));
    }

    #[test]
    fn test_date_anchor_ascent_is_bounded() {
        let html = r#"<html><body><section id="l5"><div id="l4"><div id="l3"><div id="l2"><div id="l1">
            <span class="when">x</span><time>March 1</time>
        </div></div></div></div></section></body></html>"#;
        let doc = Html::parse_document(html);

        let ids: Vec<_> = ContainerDiscoverer::new()
            .discover(&doc)
            .iter()
            .filter_map(|el| el.value().id())
            .map(str::to_string)
            .collect();
        assert_eq!(ids, vec!["l4", "l3", "l2", "l1"]);

        let shallow = ContainerDiscoverer::new().with_ascent_depth(1).discover(&doc);
        assert_eq!(shallow.len(), 1);
    }

    #[test]
    fn test_supplemental_selectors_extend_the_set() {
        let html = r#"<html><body><ul><li class="row"><b>Gala</b></li></ul></body></html>"#;
        let doc = Html::parse_document(html);
        assert!(ContainerDiscoverer::new().discover(&doc).is_empty());

        let discoverer = ContainerDiscoverer::new()
            .with_supplemental(&["li.row"])
            .unwrap();
        let set = discoverer.discover(&doc);
        assert_eq!(set.len(), 1);
        assert_eq!(describe(set.iter().next().unwrap()), "li.row");

        assert!(ContainerDiscoverer::new().with_supplemental(&["li["]).is_err());
    }
}
