use armature_rest_core::*;

struct JsonErrorHandler;
struct TextWriter;

/// `/abstract` resource declared on an abstract base and implemented by a
/// subclass that redeclares the methods without metadata.
struct ImplementationRest;

impl Resource for ImplementationRest {
    fn handler_type() -> HandlerType {
        let base = HandlerType::class("AbstractRest")
            .path("/abstract")
            .method(
                HandlerMethod::new("echo")
                    .get()
                    .path("/echo")
                    .produces(["text/plain"])
                    .param(FormalParam::new("name", ValueType::String).query("name")),
            )
            .method(
                HandlerMethod::new("get")
                    .get()
                    .path("/get/{param: [a-z]+}")
                    .param(FormalParam::new("param", ValueType::String).path("param")),
            );

        HandlerType::class("ImplementationRest")
            .extends(base)
            .method(
                HandlerMethod::new("echo").param(FormalParam::new("name", ValueType::String)),
            )
            .method(HandlerMethod::new("get").param(FormalParam::new("param", ValueType::String)))
    }
}

#[test]
fn test_no_metadata_compiles_to_empty_table() {
    let ty = HandlerType::class("Service")
        .method(HandlerMethod::new("run"))
        .implements(HandlerType::interface("Runnable").method(HandlerMethod::new("run")))
        .extends(HandlerType::class("Base").method(HandlerMethod::new("close")));

    let table = compile(&ty).unwrap();
    assert!(table.is_empty());
    assert_eq!(table.owner(), "Service");
}

#[test]
fn test_one_definition_per_routable_method() {
    let ty = HandlerType::class("UserResource")
        .path("/users")
        .method(HandlerMethod::new("list").get())
        .method(
            HandlerMethod::new("find")
                .get()
                .path("/{id}")
                .param(FormalParam::new("id", ValueType::U64).path("id")),
        )
        .method(
            HandlerMethod::new("create")
                .post()
                .consumes(["application/json"])
                .param(FormalParam::new("user", ValueType::Json)),
        )
        .method(HandlerMethod::new("internal").path("/internal"));

    let table = compile(&ty).unwrap();
    let names: Vec<_> = table.iter().map(|r| r.method().name().to_string()).collect();
    assert_eq!(names, vec!["list", "find", "create"]);

    let find = table.find("find").unwrap().definition();
    assert_eq!(find.method(), Some(HttpMethod::GET));
    assert_eq!(find.route_path().as_deref(), Some("/users/:id"));
    assert!(!find.path_is_regex());
}

#[test]
fn test_missing_path_fails_whole_type() {
    let ty = HandlerType::class("UserResource")
        .method(HandlerMethod::new("list").get().path("/users"))
        .method(HandlerMethod::new("count").get());

    let error = compile(&ty).unwrap_err();
    assert!(error.is_server_error());
    match error {
        Error::Compilation {
            owner,
            method,
            message,
        } => {
            assert_eq!(owner, "UserResource");
            assert_eq!(method, "count");
            assert_eq!(message, "Missing route path!");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_blank_path_is_rejected() {
    let ty = HandlerType::class("UserResource").method(HandlerMethod::new("list").get().path("  "));

    let error = compile(&ty).unwrap_err();
    assert_eq!(
        error.to_string(),
        "UserResource.list() - Missing or empty route path!"
    );
}

#[test]
fn test_most_derived_path_wins() {
    let api = HandlerType::interface("EchoApi").method(
        HandlerMethod::new("echo")
            .get()
            .path("/interface/echo")
            .consumes(["text/plain"]),
    );
    let ty = HandlerType::class("EchoResource")
        .implements(api)
        .method(HandlerMethod::new("echo").path("/class/echo"));

    let collected = collect(&ty);
    assert_eq!(collected.len(), 1);
    let paths: Vec<_> = collected[0]
        .metadata
        .iter()
        .filter(|m| m.kind() == MetadataKind::Path)
        .collect();
    assert_eq!(paths, vec![&Metadata::Path("/class/echo".into())]);

    let table = compile(&ty).unwrap();
    let echo = table.find("echo").unwrap().definition();
    assert_eq!(echo.path(), Some("/class/echo"));
    assert_eq!(echo.consumes(), Some(&["text/plain".to_string()][..]));
}

#[test]
fn test_inherited_routes() {
    let table = compile_resource::<ImplementationRest>().unwrap();
    assert_eq!(table.len(), 2);

    let echo = table.find("echo").unwrap();
    assert_eq!(echo.definition().path(), Some("/abstract/echo"));
    assert_eq!(echo.definition().produces(), Some(&["text/plain".to_string()][..]));
    assert_eq!(
        echo.definition().parameters()[0].to_string(),
        "query parameter \"name\""
    );

    let get = table.find("get").unwrap().definition();
    assert!(get.path_is_regex());
    assert_eq!(
        get.route_path().as_deref(),
        Some("^/abstract/get/(?P<param2>[a-z]+)$")
    );
    assert_eq!(get.parameters()[0].path_index(), Some(2));
    assert!(get.route_regex().unwrap().is_match("/abstract/get/test"));
}

#[test]
fn test_type_level_items_are_inherited_by_routes() {
    let ty = HandlerType::class("Reports")
        .path("/reports")
        .produces(["application/json"])
        .catch_with(vec![StrategyRef::of::<JsonErrorHandler>()])
        .writer::<TextWriter>()
        .method(HandlerMethod::new("daily").get().path("daily").order(1).suppress_check())
        .method(
            HandlerMethod::new("export")
                .get()
                .path("/export")
                .produces(["text/csv"])
                .catch_with(vec![]),
        );

    let table = compile(&ty).unwrap();

    let daily = table.find("daily").unwrap().definition();
    assert_eq!(daily.path(), Some("/reports/daily"));
    assert_eq!(daily.order(), 1);
    assert!(daily.suppress_check());
    assert_eq!(daily.error_handlers(), &[StrategyRef::of::<JsonErrorHandler>()]);
    assert_eq!(daily.writer(), Some(&StrategyRef::of::<TextWriter>()));

    let export = table.find("export").unwrap().definition();
    assert_eq!(export.produces(), Some(&["text/csv".to_string()][..]));
    assert!(export.error_handlers().is_empty());
    assert!(!export.suppress_check());
}

#[test]
fn test_interface_path_used_as_base() {
    let api = HandlerType::interface("OrdersApi").path("/orders");
    let ty = HandlerType::class("Orders")
        .implements(api)
        .method(HandlerMethod::new("all").get());

    let table = compile(&ty).unwrap();
    assert_eq!(table.find("all").unwrap().definition().path(), Some("/orders"));
}

#[test]
fn test_lenient_body_arguments() {
    let ty = HandlerType::class("Search").path("/search").method(
        HandlerMethod::new("search")
            .get()
            .param(FormalParam::new("q", ValueType::String).query("q"))
            .param(FormalParam::new("session", ValueType::optional(ValueType::String))),
    );

    assert!(compile(&ty).is_err());

    let config = RestConfig {
        strict_body_arguments: false,
        ..Default::default()
    };
    let table = RouteCompiler::new(config).compile(&ty).unwrap();
    let definition = table.find("search").unwrap().definition();
    assert_eq!(definition.parameters()[1].source(), ParameterSource::Unknown);
}

#[test]
fn test_invalid_regex_is_compilation_error() {
    let ty = HandlerType::class("Files")
        .path("/files")
        .method(HandlerMethod::new("get").get().path("/{name: [a-z}"));

    let error = compile(&ty).unwrap_err();
    assert!(error.to_string().starts_with("Files.get() - "));
}
