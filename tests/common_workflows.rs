//! Integration tests for common Armature REST workflows.
//!
//! A small in-test dispatcher matches requests against compiled routes and
//! calls handlers with the bound arguments, the way a server would.

use armature_rest::prelude::*;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;

// =============================================================================
// Resources
// =============================================================================

#[derive(Debug, Clone, Deserialize, PartialEq)]
struct CreateTodo {
    title: String,
    done: bool,
}

#[derive(Debug, Clone, PartialEq)]
struct CurrentUser(String);

struct TodoResource;

impl Resource for TodoResource {
    fn handler_type() -> HandlerType {
        HandlerType::class("TodoResource")
            .path("/todos")
            .produces(["application/json"])
            .method(
                HandlerMethod::new("list")
                    .get()
                    .param(FormalParam::new("limit", ValueType::U32).query("limit").default_value("20"))
                    .param(FormalParam::new("user", ValueType::custom::<CurrentUser>()).context()),
            )
            .method(
                HandlerMethod::new("find")
                    .get()
                    .path("/{id: [0-9]+}")
                    .param(FormalParam::new("id", ValueType::U64).path("id")),
            )
            .method(
                HandlerMethod::new("create")
                    .post()
                    .consumes(["application/json"])
                    .param(FormalParam::new("todo", ValueType::custom::<CreateTodo>()))
                    .param(FormalParam::new("user", ValueType::custom::<CurrentUser>()).context()),
            )
            .method(HandlerMethod::new("helper"))
    }
}

// =============================================================================
// Dispatch helpers
// =============================================================================

fn binder() -> ArgumentBinder {
    let mut readers = ReaderRegistry::new();
    readers.register_type::<CreateTodo>();

    let mut providers = ContextProviderRegistry::new();
    providers.register_fn::<CurrentUser, _>(|request: &dyn RequestContext| {
        request.header("authorization").map(|token| CurrentUser(token.to_string()))
    });

    ArgumentBinder::new(readers, providers, Container::new())
}

/// Find the route for `method` and `path`, filling regex captures
fn dispatch<'a>(table: &'a RouteTable, mut request: HttpRequest) -> Option<(&'a CompiledRoute, HttpRequest)> {
    for route in table {
        let definition = route.definition();
        if definition.method().map(|m| m.as_str()) != Some(request.method.as_str()) {
            continue;
        }

        match definition.route_regex() {
            Some(regex) => {
                let Some(captures) = regex.captures(&request.path) else {
                    continue;
                };
                for name in regex.capture_names().flatten() {
                    if let Some(value) = captures.name(name) {
                        request.path_params.insert(name.to_string(), value.as_str().to_string());
                    }
                }
                return Some((route, request));
            }
            None if definition.path() == Some(request.path.as_str()) => return Some((route, request)),
            None => continue,
        }
    }
    None
}

// =============================================================================
// Workflows
// =============================================================================

#[test]
fn test_compile_resource_routes() {
    let table = compile_resource::<TodoResource>().unwrap();
    assert_eq!(table.len(), 3);
    assert!(table.find("helper").is_none());

    let rendered: Vec<String> = table.definitions().map(|d| d.to_string()).collect();
    assert_eq!(
        rendered,
        vec!["GET /todos", "GET /todos/{id: [0-9]+}", "POST /todos"]
    );

    for definition in table.definitions() {
        assert_eq!(definition.produces(), Some(&["application/json".to_string()][..]));
    }
}

#[test]
fn test_dispatch_and_bind_query_with_context() {
    let table = compile_resource::<TodoResource>().unwrap();
    let request = HttpRequest::get("/todos?limit=5").with_header("Authorization", "ann");

    let (route, request) = dispatch(&table, request).unwrap();
    assert_eq!(route.method().name(), "list");

    let arguments = binder()
        .bind(route.method(), route.definition(), &request)
        .unwrap()
        .unwrap();
    assert_eq!(arguments.get::<u32>(0), Some(&5));
    assert_eq!(arguments.get::<CurrentUser>(1), Some(&CurrentUser("ann".into())));
}

#[test]
fn test_dispatch_regex_route() {
    let table = compile_resource::<TodoResource>().unwrap();

    let (route, request) = dispatch(&table, HttpRequest::get("/todos/17")).unwrap();
    assert_eq!(route.method().name(), "find");
    assert_eq!(request.path_params.get("param1").map(String::as_str), Some("17"));

    let arguments = binder()
        .bind(route.method(), route.definition(), &request)
        .unwrap()
        .unwrap();
    assert_eq!(arguments.get::<u64>(0), Some(&17));

    assert!(dispatch(&table, HttpRequest::get("/todos/abc")).is_none());
}

#[test]
fn test_json_body_binding() {
    let table = compile_resource::<TodoResource>().unwrap();
    let request = HttpRequest::post("/todos")
        .with_header("Content-Type", "application/json; charset=utf-8")
        .with_header("Authorization", "bob")
        .with_body(serde_json::json!({"title": "write tests", "done": false}).to_string());

    let (route, request) = dispatch(&table, request).unwrap();
    let arguments = binder()
        .bind(route.method(), route.definition(), &request)
        .unwrap()
        .unwrap();

    let todo = arguments.get_arc::<CreateTodo>(0).unwrap();
    assert_eq!(todo.title, "write tests");
    assert!(!todo.done);
}

#[test]
fn test_binding_errors_map_to_bad_request() {
    let table = compile_resource::<TodoResource>().unwrap();
    let binder = binder();

    let (route, request) = dispatch(&table, HttpRequest::get("/todos?limit=many")).unwrap();
    let error = binder
        .bind(route.method(), route.definition(), &request)
        .unwrap_err();
    assert_eq!(error.status_code(), 400);

    // anonymous request: no user context
    let (route, request) = dispatch(&table, HttpRequest::get("/todos")).unwrap();
    let error = binder
        .bind(route.method(), route.definition(), &request)
        .unwrap_err();
    assert!(error.is_client_error());
    assert!(error.to_string().starts_with("TodoResource.list() - Can't provide context of type: CurrentUser"));
}

#[test]
fn test_config_driven_compilation() {
    let config = RestConfig::from_toml_str(
        r#"
        default_consumes = ["application/json"]
        strict_body_arguments = false

        [log]
        level = "debug"
        "#,
    )
    .unwrap();

    let ty = HandlerType::class("Lookup").path("/lookup").method(
        HandlerMethod::new("lookup")
            .get()
            .param(FormalParam::new("key", ValueType::String).query("key"))
            .param(FormalParam::new("extra", ValueType::optional(ValueType::String))),
    );
    let table = RouteCompiler::new(config).compile(&ty).unwrap();
    let definition = table.find("lookup").unwrap().definition();

    assert_eq!(definition.consumes(), Some(&["application/json".to_string()][..]));
    assert_eq!(definition.parameters()[1].source(), ParameterSource::Unknown);
}

#[tokio::test]
async fn test_handlers_invoked_from_tasks() {
    let table = Arc::new(compile_resource::<TodoResource>().unwrap());
    let binder = binder();

    let mut handles = Vec::new();
    for user in ["ann", "bob", "cid"] {
        let table = table.clone();
        let binder = binder.clone();
        handles.push(tokio::spawn(async move {
            let request = HttpRequest::get("/todos").with_header("Authorization", user);
            let (route, request) = dispatch(&table, request).unwrap();
            let arguments = binder
                .bind(route.method(), route.definition(), &request)
                .unwrap()
                .unwrap();
            let user = arguments.get::<CurrentUser>(1).unwrap().0.clone();
            (user, *arguments.get::<u32>(0).unwrap())
        }));
    }

    let mut seen = HashMap::new();
    for handle in handles {
        let (user, limit) = handle.await.unwrap();
        seen.insert(user, limit);
    }
    assert_eq!(seen.len(), 3);
    assert!(seen.values().all(|limit| *limit == 20));
}
