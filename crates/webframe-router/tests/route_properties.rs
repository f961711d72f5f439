//! Property tests for route registration and matching.

use std::collections::BTreeSet;

use http::Method;
use proptest::prelude::*;
use webframe_router::{RouteError, Router};

// Strategy: a static path of one to four lowercase segments
fn arb_static_path() -> impl Strategy<Value = String> {
    prop::collection::vec(prop::string::string_regex("[a-z]{1,6}").unwrap(), 1..=4)
        .prop_map(|segments| format!("/{}", segments.join("/")))
}

fn arb_method() -> impl Strategy<Value = Method> {
    prop_oneof![
        Just(Method::GET),
        Just(Method::POST),
        Just(Method::PUT),
        Just(Method::DELETE),
    ]
}

proptest! {
    /// Property: every registered static route resolves to its own handler
    #[test]
    fn proptest_registered_routes_resolve(
        routes in prop::collection::btree_set((arb_method().prop_map(|m| m.to_string()), arb_static_path()), 1..20)
    ) {
        let routes: BTreeSet<(String, String)> = routes;
        let mut router: Router<String, ()> = Router::new();
        for (method, path) in &routes {
            let method = Method::from_bytes(method.as_bytes()).unwrap();
            router.add_route(method, path, Some(path.clone()), vec![]).unwrap();
        }

        for (method, path) in &routes {
            let method = Method::from_bytes(method.as_bytes()).unwrap();
            let found = router.find_route(&method, path);
            prop_assert!(found.is_some());
            prop_assert_eq!(found.unwrap().handler(), Some(path));
        }
        prop_assert_eq!(router.len(), routes.len());
    }

    /// Property: registering the same handler path twice is always a duplicate
    #[test]
    fn proptest_second_registration_is_duplicate(path in arb_static_path(), method in arb_method()) {
        let mut router: Router<u8, ()> = Router::new();
        router.add_route(method.clone(), &path, Some(1), vec![]).unwrap();

        let err = router.add_route(method, &path, Some(2), vec![]).unwrap_err();
        prop_assert!(matches!(err, RouteError::DuplicateRoute(ref p) if *p == path));
    }

    /// Property: a parameter route binds whatever single segment it sees
    #[test]
    fn proptest_param_binds_segment(value in "[A-Za-z0-9_.-]{1,12}") {
        let mut router: Router<u8, ()> = Router::new();
        router.add_route(Method::GET, "/items/:id", Some(1), vec![]).unwrap();

        let path = format!("/items/{value}");
        let found = router.find_route(&Method::GET, &path).unwrap();
        prop_assert_eq!(found.params.get("id"), Some(value.as_str()));
    }

    /// Property: a digit-only regex segment never binds a value with a letter in it
    #[test]
    fn proptest_regex_rejects_non_matching(value in "[0-9]{0,4}[a-z][0-9a-z]{0,4}") {
        let mut router: Router<u8, ()> = Router::new();
        router.add_route(Method::GET, "/:id([0-9]+)/home", Some(1), vec![]).unwrap();

        let path = format!("/{value}/home");
        prop_assert!(router.find_route(&Method::GET, &path).is_none());
    }
}
