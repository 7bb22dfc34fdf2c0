use futures::executor::block_on;
use serde_json::json;

use super::*;
use crate::chain::{error_handler, handler, Handler, MethodTag, Next, Outcome, RouteChain};
use crate::error::{HandlerError, RegistrationError};
use crate::server::mock::{MockRequest, MockResponse};
use crate::server::{Request, Response};

type Req = MockRequest;
type Res = MockResponse;

fn mark(name: &'static str) -> Handler<Req, Res> {
    handler(move |req: &mut Req, _res: &mut Res, next: Next| {
        req.hit(name);
        Ok(next.proceed())
    })
}

fn reply(name: &'static str) -> Handler<Req, Res> {
    handler(move |req: &mut Req, res: &mut Res, _next: Next| {
        req.hit(name);
        res.status(200).send(json!({ "handler": name }))?;
        Ok(Outcome::halt())
    })
}

fn fail(status: u16, message: &'static str) -> Handler<Req, Res> {
    handler(move |_req: &mut Req, _res: &mut Res, _next: Next| {
        Err(HandlerError::with_status(status, message))
    })
}

fn dispatch(router: &Router<Req, Res>, method: &str, url: &str) -> (Req, Res) {
    let mut req = MockRequest::new(method, url);
    let mut res = MockResponse::default();
    block_on(router.handle(&mut req, &mut res));
    (req, res)
}

fn first_tag(chain: &RouteChain<Req, Res>) -> MethodTag {
    chain.iter().next().map(|e| e.method()).unwrap()
}

#[test]
fn test_add_error_handlers() {
    let mut router = Router::new();
    router.error(vec![mark("a"), mark("b")]).unwrap();
    router.error(mark("c")).unwrap();
    assert_eq!(router.error_handlers().len(), 3);
}

#[test]
fn test_method_sugar_tags_chain() {
    let mut router = Router::new();
    router.all("all", mark("x")).unwrap();
    router.get("get", mark("x")).unwrap();
    router.put("put", mark("x")).unwrap();
    router.post("post", mark("x")).unwrap();
    router.patch("patch", mark("x")).unwrap();
    router.delete("delete", mark("x")).unwrap();

    for tag in MethodTag::TAGS {
        let entry = router.route(tag.as_str()).unwrap();
        assert_eq!(entry.chain().len(), 1);
        assert_eq!(first_tag(entry.chain()), tag);
        assert!(entry.handled_methods().contains(tag));
    }
}

#[test]
fn test_multiple_and_nested_handlers() {
    let mut router = Router::new();
    router.get("a", vec![mark("1"), mark("2")]).unwrap();
    router
        .get(
            "b",
            vec![
                crate::chain::Handlers::from(mark("1")),
                vec![mark("2"), mark("3")].into(),
            ],
        )
        .unwrap();
    assert_eq!(router.route("a").unwrap().chain().len(), 2);
    assert_eq!(router.route("b").unwrap().chain().len(), 3);
}

#[test]
fn test_handler_on_multiple_paths() {
    let mut router = Router::new();
    router.get(["a", "/b/"], mark("x")).unwrap();
    assert!(router.route("a").is_some());
    assert!(router.route("b").is_some());
}

#[test]
fn test_add_to_existing_route() {
    let mut router = Router::new();
    router.get("a", mark("x")).unwrap().post("/a", mark("y")).unwrap();

    let entry = router.route("a").unwrap();
    assert_eq!(entry.chain().len(), 2);
    assert!(entry.handled_methods().supports("get"));
    assert!(entry.handled_methods().supports("post"));
    assert!(!entry.handled_methods().supports("put"));
}

#[test]
fn test_pattern_route_registration() {
    let mut router = Router::new();
    router.get("users/:id", mark("x")).unwrap();
    router.put("/users/:id/", mark("y")).unwrap();
    router.get("orders/:id", mark("z")).unwrap();

    assert!(router.route("users/:id").is_none());
    let patterns: Vec<_> = router.pattern_entries().map(|e| e.pattern()).collect();
    assert_eq!(patterns, vec!["users/:id", "orders/:id"]);

    let users = router.pattern_route("users/:id").unwrap();
    assert_eq!(users.chain().len(), 2);
    assert!(users.handled_methods().supports("PUT"));
}

#[test]
fn test_invalid_pattern_leaves_router_untouched() {
    let mut router = Router::new();
    let err = router.get(["ok", "bad/:id("], mark("x")).unwrap_err();
    assert!(matches!(err, RegistrationError::InvalidPattern { .. }));
    assert!(router.route("ok").is_none());
}

#[test]
fn test_empty_handler_list_rejected() {
    let mut router: Router<Req, Res> = Router::new();
    let err = router.get("a", Vec::<Handler<Req, Res>>::new()).unwrap_err();
    assert_eq!(
        err,
        RegistrationError::EmptyHandlers {
            method: "get".into()
        }
    );
}

#[test]
fn test_mount_with_base_path() {
    let mut sub = Router::new();
    sub.get("items", mark("x")).unwrap();
    sub.get("items/:id", mark("y")).unwrap();
    sub.error(mark("err")).unwrap();

    let mut router: Router<Req, Res> = Router::new();
    router.mount("/api/", &sub).unwrap();

    assert!(router.route("api/items").is_some());
    assert!(router.pattern_route("api/items/:id").is_some());
    assert_eq!(router.error_handlers().len(), 1);
}

#[test]
fn test_mount_with_empty_base_path() {
    let mut sub = Router::new();
    sub.get("items", mark("x")).unwrap();

    let mut router: Router<Req, Res> = Router::new();
    router.mount("", &sub).unwrap();
    assert!(router.route("items").is_some());

    let mut other: Router<Req, Res> = Router::new();
    other.use_(Use::Routers(vec![&sub as &dyn RouteSource<Req, Res>])).unwrap();
    assert!(other.route("items").is_some());
}

#[test]
fn test_routes_listed_in_registration_order() {
    let names = ["A", "a", "B", "b", "C", "c", "D", "d"];
    let mut sub: Router<Req, Res> = Router::new();
    for (i, name) in names.iter().enumerate() {
        let label: &'static str = Box::leak(format!("h{i}-{name}").into_boxed_str());
        sub.get(*name, reply(label)).unwrap();
    }
    let listed: Vec<&str> = sub.routes().map(|(path, _)| path).collect();
    assert_eq!(listed, names);

    // Under a parameterized base the literal routes become patterns, so
    // their order decides which one wins a case-insensitive match.
    let mut router: Router<Req, Res> = Router::new();
    router.mount(":org", &sub).unwrap();
    let patterns: Vec<&str> = router.pattern_entries().map(|e| e.pattern()).collect();
    let expected: Vec<String> = names.iter().map(|n| format!(":org/{n}")).collect();
    assert_eq!(patterns, expected);

    for _ in 0..5 {
        let (req, _) = dispatch(&router, "get", "x/a");
        assert_eq!(req.log, vec!["h0-A"]);
        assert_eq!(req.params().get("org"), Some("x"));
    }
}

#[test]
fn test_route_source_handle_dispatches() {
    let mut router: Router<Req, Res> = Router::new();
    router.get("pets/:id", reply("pet")).unwrap();
    let source: &dyn RouteSource<Req, Res> = &router;

    let mut req = MockRequest::new("get", "pets/7");
    let mut res = MockResponse::default();
    block_on(source.handle(&mut req, &mut res));
    assert_eq!(req.log, vec!["pet"]);
    assert_eq!(req.params().get("id"), Some("7"));
    assert_eq!(res.sent, vec![(200, json!({ "handler": "pet" }))]);
}

#[test]
fn test_mount_nested_router_paths() {
    let mut inner = Router::new();
    inner.get("c", mark("x")).unwrap();
    let mut middle: Router<Req, Res> = Router::new();
    middle.mount("b", &inner).unwrap();

    let mut router: Router<Req, Res> = Router::new();
    router.mount("a", &middle).unwrap();
    assert!(router.route("a/b/c").is_some());
}

#[test]
fn test_mount_many_routers_under_many_bases() {
    let mut one = Router::new();
    one.get("one", mark("1")).unwrap();
    let mut two = Router::new();
    two.get("two", mark("2")).unwrap();
    two.error(mark("e")).unwrap();

    let mut router: Router<Req, Res> = Router::new();
    router
        .use_(Use::Mount(Paths::from(["x", "y"]), vec![&one as &dyn RouteSource<Req, Res>, &two]))
        .unwrap();

    for path in ["x/one", "x/two", "y/one", "y/two"] {
        assert!(router.route(path).is_some(), "{path} should be mounted");
    }
    // The sub error chain is appended once per base path
    assert_eq!(router.error_handlers().len(), 2);
}

#[test]
fn test_mount_requires_router() {
    let mut router: Router<Req, Res> = Router::new();
    let err = router.use_(Use::Mount(Paths::from("api"), Vec::new())).unwrap_err();
    assert_eq!(
        err,
        RegistrationError::MissingRouters {
            base_paths: vec!["api".into()]
        }
    );
    assert!(matches!(
        router.use_(Use::Routers(Vec::new())),
        Err(RegistrationError::MissingRouters { .. })
    ));
}

#[test]
fn test_middleware_seeds_new_routes() {
    let mut router = Router::new();
    router.use_(Use::Middleware(mark("mw").into())).unwrap();
    router.get("a", mark("a")).unwrap();
    router.get("p/:id", mark("p")).unwrap();

    let chain = router.route("a").unwrap().chain();
    assert_eq!(chain.len(), 2);
    assert_eq!(first_tag(chain), MethodTag::All);
    assert_eq!(router.pattern_route("p/:id").unwrap().chain().len(), 2);
}

#[test]
fn test_middleware_appends_to_existing_routes() {
    let mut router = Router::new();
    router.get("a", mark("a")).unwrap();
    router.get("p/:id", mark("p")).unwrap();
    router.use_(Use::Middleware(mark("mw").into())).unwrap();

    let chain = router.route("a").unwrap().chain();
    assert_eq!(chain.len(), 2);
    assert_eq!(first_tag(chain), MethodTag::Get);
    assert!(router.route("a").unwrap().handled_methods().supports("delete"));
    assert_eq!(router.pattern_route("p/:id").unwrap().chain().len(), 2);
    assert_eq!(router.middleware().len(), 1);
}

#[test]
fn test_handle_literal_route() {
    let mut router = Router::new();
    router.get("a", reply("a")).unwrap();

    let (req, res) = dispatch(&router, "GET", "/a?x=1");
    assert_eq!(req.log, vec!["a"]);
    assert_eq!(res.sent, vec![(200, json!({ "handler": "a" }))]);
}

#[test]
fn test_handle_pattern_route_sets_params() {
    let mut router = Router::new();
    router.get("users/:id", reply("user")).unwrap();

    let (req, res) = dispatch(&router, "get", "users/42");
    assert_eq!(req.log, vec!["user"]);
    assert_eq!(req.params().get("id"), Some("42"));
    assert_eq!(res.sent.len(), 1);
}

#[test]
fn test_literal_route_has_priority() {
    let mut router = Router::new();
    router.get("users/:id", reply("pattern")).unwrap();
    router.get("users/me", reply("literal")).unwrap();

    let (req, _) = dispatch(&router, "get", "users/me");
    assert_eq!(req.log, vec!["literal"]);
    assert!(req.params.is_empty());
}

#[test]
fn test_pattern_fallback_on_method_mismatch() {
    let mut router = Router::new();
    router.get("users/me", reply("literal")).unwrap();
    router.post("users/:id", reply("pattern")).unwrap();

    let (req, _) = dispatch(&router, "post", "users/me");
    assert_eq!(req.log, vec!["pattern"]);
    assert_eq!(req.params().get("id"), Some("me"));
}

#[test]
fn test_pattern_scan_skips_unsupported_method() {
    let mut router = Router::new();
    router.get("items/:id", reply("get")).unwrap();
    router.post("items/:name", reply("post")).unwrap();

    let (req, _) = dispatch(&router, "post", "items/1");
    assert_eq!(req.log, vec!["post"]);
    assert_eq!(req.params().get("name"), Some("1"));
}

#[test]
fn test_sub_router_middleware_order() {
    let mut sub = Router::new();
    sub.use_(Use::Middleware(mark("sub-mw").into())).unwrap();
    sub.get("b", mark("handler")).unwrap();

    let mut router: Router<Req, Res> = Router::new();
    router.use_(Use::Middleware(mark("parent-mw").into())).unwrap();
    router.mount("a", &sub).unwrap();

    let (req, _) = dispatch(&router, "get", "a/b");
    assert_eq!(req.log, vec!["parent-mw", "sub-mw", "handler"]);
}

#[test]
fn test_not_found_sent_once() {
    let router: Router<Req, Res> = Router::new();
    let (_, res) = dispatch(&router, "get", "missing");
    assert_eq!(res.sent, vec![(404, json!({ "message": "Not Found" }))]);
}

#[test]
fn test_unsupported_method_is_not_found() {
    let mut router = Router::new();
    router.get("a", reply("a")).unwrap();
    let (req, res) = dispatch(&router, "delete", "a");
    assert!(req.log.is_empty());
    assert_eq!(res.sent[0].0, 404);
}

#[test]
fn test_error_handlers_see_not_found() {
    let mut router = Router::new();
    router
        .error(error_handler(
            |err: &HandlerError, req: &mut Req, res: &mut Res, _next: Next| {
                req.hit(&err.message);
                res.status(err.status.unwrap_or(500))
                    .send(json!({ "custom": true }))?;
                Ok(Outcome::halt())
            },
        ))
        .unwrap();

    let (req, res) = dispatch(&router, "get", "nowhere");
    assert_eq!(req.log, vec!["Not Found"]);
    assert_eq!(res.sent, vec![(404, json!({ "custom": true }))]);
}

#[test]
fn test_error_handlers_see_handler_failure() {
    let mut router = Router::new();
    router.get("a", fail(403, "Forbidden")).unwrap();
    router
        .error(error_handler(
            |err: &HandlerError, req: &mut Req, _res: &mut Res, next: Next| {
                req.hit(&err.to_string());
                Ok(next.proceed())
            },
        ))
        .unwrap();

    let (req, res) = dispatch(&router, "get", "a");
    assert_eq!(req.log, vec!["Forbidden (403)"]);
    assert!(res.sent.is_empty());
}

#[test]
fn test_failing_error_handler_is_sent() {
    let mut router = Router::new();
    router.get("a", fail(403, "Forbidden")).unwrap();
    router
        .error(error_handler(
            |_err: &HandlerError, _req: &mut Req, _res: &mut Res, _next: Next| {
                Err(HandlerError::new("error handler broke"))
            },
        ))
        .unwrap();
    router.error(mark("never")).unwrap();

    let (req, res) = dispatch(&router, "get", "a");
    assert!(req.log.is_empty());
    assert_eq!(
        res.sent,
        vec![(500, json!({ "message": "error handler broke" }))]
    );
}

#[test]
fn test_failure_without_error_handlers_is_sent() {
    let mut router = Router::new();
    router.get("a", fail(409, "Conflict")).unwrap();

    let (_, res) = dispatch(&router, "get", "a");
    assert_eq!(res.sent, vec![(409, json!({ "message": "Conflict" }))]);
}

#[test]
fn test_send_failure_is_swallowed() {
    let router: Router<Req, Res> = Router::new();
    let mut req = MockRequest::new("get", "missing");
    let mut res = MockResponse::failing();
    block_on(router.handle(&mut req, &mut res));
    assert!(res.sent.is_empty());
    assert_eq!(res.status, 404);
}

#[test]
fn test_send_error_defaults_to_500() {
    let mut res = MockResponse::default();
    send_error(
        &mut res,
        HandlerError::new("oops").details(json!({ "field": "name" })),
    );
    assert_eq!(
        res.sent,
        vec![(500, json!({ "message": "oops", "details": { "field": "name" } }))]
    );
}
