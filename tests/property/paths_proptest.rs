//! Property-based tests for component and route paths

use fuelq::client::components::paths::{absolutize, page_depth, resolve_component_url, rewrite_href};
use fuelq::client::modules::manifest::normalize_route;
use proptest::prelude::*;

fn component_prefix() -> impl Strategy<Value = &'static str> {
    prop::sample::select(vec![
        "",
        "components/",
        "./components/",
        "../components/",
        "../../components/",
        "/components/",
        "src/components/",
        "/src/components/",
    ])
}

proptest! {
    #[test]
    fn test_every_placeholder_style_resolves_to_one_url(
        prefix in component_prefix(),
        name in "[a-z][a-z0-9-]{0,12}",
        with_extension in any::<bool>(),
    ) {
        let attribute = if with_extension {
            format!("{}{}.html", prefix, name)
        } else {
            format!("{}{}", prefix, name)
        };
        prop_assert_eq!(resolve_component_url(&attribute), format!("/src/components/{}.html", name));
    }

    #[test]
    fn test_resolved_url_stays_under_component_root(attribute in "[a-z./-]{0,24}") {
        let url = resolve_component_url(&attribute);
        prop_assert!(url.starts_with("/src/components/"));
    }

    #[test]
    fn test_normalize_route_is_idempotent(path in "[a-z/]{0,16}(\\?[a-z=]{0,6})?(#[a-z]{0,4})?") {
        let route = normalize_route(&path);
        prop_assert!(route.starts_with('/'));
        prop_assert!(!route.ends_with('/'));
        prop_assert!(!route.contains('?') && !route.contains('#'));
        prop_assert_eq!(normalize_route(&route), route);
    }

    #[test]
    fn test_rewritten_link_points_back_at_root_target(
        dirs in prop::collection::vec("[a-z]{1,6}", 0..4),
        target in "[a-z]{1,8}(/[a-z]{1,8}){0,2}\\.html",
    ) {
        let mut page = String::from("/");
        for dir in &dirs {
            page.push_str(dir);
            page.push('/');
        }
        page.push_str("page.html");

        let depth = page_depth(&page);
        prop_assert_eq!(depth, dirs.len());

        let rewritten = rewrite_href(&target, depth, "");
        prop_assert_eq!(&rewritten, &format!("{}{}", "../".repeat(depth), target));
        prop_assert_eq!(absolutize(&page, &rewritten), Some(format!("/{}", target)));
    }
}
