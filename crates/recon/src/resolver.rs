//! Cross-route ownership and stale bookkeeping cleanup.
//!
//! An operator working through several routes will scan packages in the
//! wrong route now and then. When the package later shows up in the route
//! that owns it, the off-route and duplicate entries it left behind in other
//! routes are removed.

use crate::registry::Registry;

/// Route that owns `id`: first route still expecting it, else first route
/// that already verified it. Routes are searched in route-id order.
pub fn find_owning_route(registry: &Registry, id: &str) -> Option<String> {
    registry
        .routes()
        .find(|r| r.expected.contains(id))
        .or_else(|| registry.routes().find(|r| r.verified.contains(id)))
        .map(|r| r.route_id.clone())
}

/// Remove `id` from the off-route set and duplicate counts of every route
/// except `keep_route_id`. The timestamp goes too unless the route still
/// holds `id` as verified. Returns how many routes changed.
pub fn migrate_stale_references(registry: &mut Registry, id: &str, keep_route_id: &str) -> usize {
    purge_except(registry, id, &[keep_route_id])
}

pub(crate) fn purge_except(registry: &mut Registry, id: &str, keep: &[&str]) -> usize {
    let mut touched = 0;

    for route in registry.routes_mut() {
        if keep.contains(&route.route_id.as_str()) {
            continue;
        }

        let removed_off = route.off_route.remove(id);
        let removed_dup = route.duplicate_counts.remove(id).is_some();
        if !(removed_off || removed_dup) {
            continue;
        }

        if !route.verified.contains(id) {
            route.last_seen_at.remove(id);
        }
        log::debug!("route {}: dropped stale reference to {id}", route.route_id);
        touched += 1;
    }

    touched
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Route;

    const X: &str = "40000000007";

    fn route(id: &str) -> Route {
        Route::new(id)
    }

    #[test]
    fn expected_beats_verified() {
        let mut a = route("a");
        a.verified.insert(X.into());
        let mut b = route("b");
        b.expected.insert(X.into());
        let reg = Registry::from_routes([a, b]);
        assert_eq!(find_owning_route(&reg, X).as_deref(), Some("b"));
    }

    #[test]
    fn verified_used_when_nobody_expects() {
        let mut a = route("a");
        a.off_route.insert(X.into());
        let mut b = route("b");
        b.verified.insert(X.into());
        let reg = Registry::from_routes([a, b]);
        assert_eq!(find_owning_route(&reg, X).as_deref(), Some("b"));
    }

    #[test]
    fn unknown_id_has_no_owner() {
        let mut a = route("a");
        a.off_route.insert(X.into());
        let reg = Registry::from_routes([a]);
        assert_eq!(find_owning_route(&reg, X), None);
    }

    #[test]
    fn migration_cleans_other_routes() {
        let mut a = route("a");
        a.off_route.insert(X.into());
        a.duplicate_counts.insert(X.into(), 3);
        a.last_seen_at.insert(X.into(), 10);
        let mut b = route("b");
        b.expected.insert(X.into());
        let mut reg = Registry::from_routes([a, b]);

        let owner = find_owning_route(&reg, X).unwrap();
        assert_eq!(owner, "b");
        assert_eq!(migrate_stale_references(&mut reg, X, &owner), 1);

        let a = reg.get("a").unwrap();
        assert!(!a.off_route.contains(X));
        assert!(!a.duplicate_counts.contains_key(X));
        assert!(!a.last_seen_at.contains_key(X));
        assert!(reg.get("b").unwrap().expected.contains(X));
    }

    #[test]
    fn timestamp_dropped_even_when_manifest_lists_id() {
        let mut a = route("a");
        a.ids.insert(X.into());
        a.off_route.insert(X.into());
        a.last_seen_at.insert(X.into(), 10);
        let mut reg = Registry::from_routes([a, route("b")]);

        migrate_stale_references(&mut reg, X, "b");
        let a = reg.get("a").unwrap();
        assert!(!a.off_route.contains(X));
        assert!(!a.last_seen_at.contains_key(X));
    }

    #[test]
    fn timestamp_kept_while_verified() {
        let mut a = route("a");
        a.verified.insert(X.into());
        a.duplicate_counts.insert(X.into(), 2);
        a.last_seen_at.insert(X.into(), 10);
        let mut reg = Registry::from_routes([a, route("b")]);

        assert_eq!(migrate_stale_references(&mut reg, X, "b"), 1);
        let a = reg.get("a").unwrap();
        assert!(!a.duplicate_counts.contains_key(X));
        assert_eq!(a.last_seen_at.get(X), Some(&10));
    }

    #[test]
    fn keep_route_untouched() {
        let mut a = route("a");
        a.off_route.insert(X.into());
        let mut reg = Registry::from_routes([a]);
        assert_eq!(migrate_stale_references(&mut reg, X, "a"), 0);
        assert!(reg.get("a").unwrap().off_route.contains(X));
    }
}
