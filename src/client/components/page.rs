//! Document model the page runtime works against.
//!
//! A `Page` is the subset of a rendered document the runtime touches:
//! placeholder elements, the stylesheet and script lists, and the failure
//! banner.

use serde::{Deserialize, Serialize};

/// An element that is, or was, a component placeholder
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Element {
    pub id: Option<String>,
    /// `data-component` attribute; cleared once the fragment is injected
    pub component: Option<String>,
    /// `data-with-assets`: also load the component's CSS and JS
    pub with_assets: bool,
    pub inner_html: String,
}

impl Element {
    pub fn placeholder(component: impl Into<String>) -> Self {
        Self {
            component: Some(component.into()),
            ..Default::default()
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_assets(mut self) -> Self {
        self.with_assets = true;
        self
    }

    pub fn is_placeholder(&self) -> bool {
        self.component.is_some()
    }
}

/// A rendered page
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub path: String,
    pub elements: Vec<Element>,
    pub stylesheets: Vec<String>,
    pub scripts: Vec<String>,
    /// Full-page error banner, set only when bootstrap fails
    pub banner: Option<String>,
}

impl Page {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    pub fn with_element(mut self, element: Element) -> Self {
        self.elements.push(element);
        self
    }

    /// Indices of elements still waiting for a fragment
    pub fn placeholders(&self) -> Vec<usize> {
        self.elements
            .iter()
            .enumerate()
            .filter(|(_, e)| e.is_placeholder())
            .map(|(i, _)| i)
            .collect()
    }

    pub fn element_by_id(&self, id: &str) -> Option<&Element> {
        self.elements.iter().find(|e| e.id.as_deref() == Some(id))
    }

    /// Add a stylesheet link once
    pub fn add_stylesheet(&mut self, href: &str) -> bool {
        push_unique(&mut self.stylesheets, href)
    }

    /// Add a script once
    pub fn add_script(&mut self, src: &str) -> bool {
        push_unique(&mut self.scripts, src)
    }
}

fn push_unique(list: &mut Vec<String>, value: &str) -> bool {
    if list.iter().any(|v| v == value) {
        return false;
    }
    list.push(value.to_string());
    true
}
