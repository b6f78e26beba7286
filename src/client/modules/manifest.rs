//! # Page Manifest
//!
//! Static route → module table. Extending the site means editing
//! `PageManifest::site()`.

use std::collections::HashMap;

/// One module to load for a route
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleDescriptor {
    pub path: &'static str,
    pub name: &'static str,
    /// A required module that fails to load or initialize aborts bootstrap
    pub required: bool,
}

impl ModuleDescriptor {
    pub const fn new(path: &'static str, name: &'static str) -> Self {
        Self {
            path,
            name,
            required: false,
        }
    }

    pub const fn required(path: &'static str, name: &'static str) -> Self {
        Self {
            path,
            name,
            required: true,
        }
    }
}

const NAVIGATION: ModuleDescriptor = ModuleDescriptor::required("/src/js/modules/navigation.js", "navigation");
const THEME: ModuleDescriptor = ModuleDescriptor::new("/src/js/modules/theme.js", "theme");
const ANALYTICS: ModuleDescriptor = ModuleDescriptor::new("/src/js/modules/analytics.js", "analytics");
const COMPONENTS: ModuleDescriptor = ModuleDescriptor::required("/src/js/components/component-loader.js", "components");

const ANIMATION: ModuleDescriptor = ModuleDescriptor::new("/src/js/modules/animation.js", "animation");
const HOME_PAGE: ModuleDescriptor = ModuleDescriptor::new("/src/js/pages/home.js", "homePage");
const FORUM: ModuleDescriptor = ModuleDescriptor::new("/src/js/pages/forum.js", "forum");
const THREAD: ModuleDescriptor = ModuleDescriptor::new("/src/js/pages/thread.js", "thread");
const CONTACT: ModuleDescriptor = ModuleDescriptor::new("/src/js/pages/contact.js", "contact");
const CHAT: ModuleDescriptor = ModuleDescriptor::new("/src/js/pages/chat.js", "chat");
const ABOUT: ModuleDescriptor = ModuleDescriptor::new("/src/js/pages/about.js", "about");
const SERVICES: ModuleDescriptor = ModuleDescriptor::new("/src/js/pages/services.js", "services");

/// Modules loaded on every page, before any page module
pub fn core_modules() -> &'static [ModuleDescriptor] {
    const CORE: &[ModuleDescriptor] = &[NAVIGATION, THEME, ANALYTICS, COMPONENTS];
    CORE
}

/// Every page module the site knows about
pub fn page_modules() -> &'static [ModuleDescriptor] {
    const PAGES: &[ModuleDescriptor] = &[ANIMATION, HOME_PAGE, FORUM, THREAD, CONTACT, CHAT, ABOUT, SERVICES];
    PAGES
}

/// Route → ordered module list
#[derive(Debug, Clone, Default)]
pub struct PageManifest {
    routes: HashMap<String, Vec<ModuleDescriptor>>,
}

impl PageManifest {
    pub fn new() -> Self {
        Self::default()
    }

    /// The site's manifest
    pub fn site() -> Self {
        Self::new()
            .route("/index.html", &[ANIMATION, HOME_PAGE])
            .route("/pages/forum.html", &[FORUM])
            .route("/pages/thread.html", &[THREAD])
            .route("/pages/contact.html", &[CONTACT])
            .route("/pages/chat.html", &[CHAT])
            .route("/pages/about.html", &[ANIMATION, ABOUT])
            .route("/pages/services.html", &[ANIMATION, SERVICES])
    }

    pub fn route(mut self, path: &str, modules: &[ModuleDescriptor]) -> Self {
        self.routes.insert(normalize_route(path), modules.to_vec());
        self
    }

    /// Modules for a page path; empty for unknown routes
    pub fn lookup(&self, path: &str) -> &[ModuleDescriptor] {
        self.routes
            .get(&normalize_route(path))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn routes(&self) -> impl Iterator<Item = &str> {
        self.routes.keys().map(String::as_str)
    }
}

/// Strip query and fragment, map directory paths to their index page
pub fn normalize_route(path: &str) -> String {
    let end = path.find(|c: char| c == '?' || c == '#').unwrap_or(path.len());
    let path = &path[..end];

    let mut route = if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{}", path)
    };
    if route.ends_with('/') {
        route.push_str("index.html");
    }
    route
}
