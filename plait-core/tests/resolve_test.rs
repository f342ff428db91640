use plait_common::config::Config;
use plait_common::error::PlaitError;
use plait_common::model::claim::Claim;
use plait_common::model::declaration::{DeclFlags, Declaration, RawParameter};
use plait_common::model::edge::Edge;
use plait_common::model::tags::{TagMatchPolicy, TagSet};
use plait_common::model::token::TypeToken;
use plait_core::extension::{Extension, Synthesized, TemplateLibrary};
use plait_core::plan::Role;
use plait_core::registry::Registry;
use plait_core::resolve::{Resolution, Resolver};

fn token(text: &str) -> TypeToken {
    TypeToken::parse(text).unwrap()
}

fn tags(items: &[&str]) -> TagSet {
    items.iter().copied().collect()
}

fn decl(produces: &str, source: &str, params: &[(&str, &str)]) -> Declaration {
    let mut d = Declaration::new(token(produces), source);
    d.params = params
        .iter()
        .map(|(name, ty)| RawParameter::new(*name, *ty))
        .collect();
    d
}

fn root(text: &str) -> Claim {
    plait_core::claims::parse_root(text, TagSet::new()).unwrap()
}

fn root_tagged(text: &str, t: &[&str]) -> Claim {
    plait_core::claims::parse_root(text, tags(t)).unwrap()
}

fn resolve(registry: Registry, roots: &[Claim]) -> Resolution {
    Resolver::new(registry, TagMatchPolicy::default()).resolve_roots(roots)
}

/// Every non-deferred edge must reference a strictly smaller table index
/// than its owning component.
fn assert_instantiation_order(resolution: &Resolution) {
    fn check(edge: &Edge, owner: usize) {
        match edge {
            Edge::Collect { elements } => {
                for element in elements {
                    check(element, owner);
                }
            }
            e if e.is_deferred() => {}
            e => {
                for target in e.references() {
                    assert!(
                        target < owner,
                        "edge {e:?} of component {owner} points forward"
                    );
                }
            }
        }
    }
    for component in resolution.plan.components() {
        for edge in &component.edges {
            check(edge, component.index);
        }
    }
}

#[test]
fn zero_dependency_root_resolves_to_index_zero() {
    let mut registry = Registry::new(&Config::default());
    registry.add(decl("svc.Clock", "svc/clock.fac#clock", &[]));

    let resolution = resolve(registry, &[root("svc.Clock")]);

    assert!(resolution.is_success());
    assert_eq!(resolution.plan.len(), 1);
    let component = &resolution.plan.components()[0];
    assert_eq!(component.index, 0);
    assert!(component.edges.is_empty());
    assert_eq!(
        resolution.roots[0].result.as_ref().unwrap(),
        &Edge::Direct { target: 0 }
    );
}

#[test]
fn dependencies_come_before_dependents() {
    let mut registry = Registry::new(&Config::default());
    registry.add(decl("svc.App", "svc/app.fac#app", &[("db", "svc.Db")]));
    registry.add(decl("svc.Db", "svc/db.fac#db", &[]));

    let resolution = resolve(registry, &[root("svc.App")]);

    assert!(resolution.is_success());
    let produced: Vec<String> = resolution
        .plan
        .components()
        .iter()
        .map(|c| c.produced.to_string())
        .collect();
    assert_eq!(produced, vec!["svc.Db", "svc.App"]);
    assert_eq!(
        resolution.plan.components()[1].edges,
        vec![Edge::Direct { target: 0 }]
    );
    assert_instantiation_order(&resolution);
}

#[test]
fn collect_all_takes_every_match_in_registration_order() {
    let mut registry = Registry::new(&Config::default());
    registry.add(decl("svc.Handler", "svc/h.fac#h1", &[]));
    registry.add(decl("svc.Handler", "svc/h.fac#h2", &[]));
    registry.add(decl("svc.Handler", "svc/h.fac#h3", &[]));

    let resolution = resolve(registry, &[root("All<svc.Handler>")]);

    assert!(resolution.is_success());
    let edge = resolution.roots[0].result.as_ref().unwrap();
    let Edge::Collect { elements } = edge else {
        panic!("expected collect edge, got {edge:?}");
    };
    assert_eq!(elements.len(), 3);
    let sources: Vec<&str> = elements
        .iter()
        .map(|e| match e {
            Edge::Direct { target } => resolution.plan.components()[*target].source.as_str(),
            other => panic!("expected direct element, got {other:?}"),
        })
        .collect();
    assert_eq!(sources, vec!["svc/h.fac#h1", "svc/h.fac#h2", "svc/h.fac#h3"]);
}

#[test]
fn collect_all_with_no_matches_is_an_empty_collection() {
    let registry = Registry::new(&Config::default());
    let resolution = resolve(registry, &[root("All<svc.Handler>")]);

    assert!(resolution.is_success());
    assert_eq!(
        resolution.roots[0].result.as_ref().unwrap(),
        &Edge::Collect { elements: vec![] }
    );
}

#[test]
fn cyclic_pair_terminates_with_exactly_one_proxy_edge() {
    let mut registry = Registry::new(&Config::default());
    registry.add(decl("svc.A", "svc/a.fac#a", &[("b", "svc.B")]));
    registry.add(decl("svc.B", "svc/b.fac#b", &[("a", "svc.A")]));

    let resolution = resolve(registry, &[root("svc.A")]);
    assert!(resolution.is_success());

    let proxy_edges: Vec<&Edge> = resolution
        .plan
        .components()
        .iter()
        .flat_map(|c| c.edges.iter())
        .filter(|e| matches!(e, Edge::ProxyParam { .. }))
        .collect();
    assert_eq!(proxy_edges.len(), 1, "exactly one side breaks the cycle");

    // The proxy entry is patched to the real target after it lands.
    let proxy = resolution
        .plan
        .components()
        .iter()
        .find(|c| matches!(c.role, Role::Proxy { .. }))
        .expect("one proxy entry");
    let Role::Proxy { target: Some(target) } = &proxy.role else {
        panic!("proxy was never patched");
    };
    assert_eq!(
        resolution.plan.components()[*target].produced,
        proxy.produced
    );
    assert_instantiation_order(&resolution);
}

#[test]
fn identical_inputs_break_the_cycle_on_the_same_side() {
    let build = || {
        let mut registry = Registry::new(&Config::default());
        registry.add(decl("svc.A", "svc/a.fac#a", &[("b", "svc.B")]));
        registry.add(decl("svc.B", "svc/b.fac#b", &[("a", "svc.A")]));
        resolve(registry, &[root("svc.A")])
    };
    let first = serde_json::to_value(build().document()).unwrap();
    let second = serde_json::to_value(build().document()).unwrap();
    assert_eq!(first, second);
}

#[test]
fn promise_claim_through_a_cycle_binds_a_promise_to_the_proxy() {
    let mut registry = Registry::new(&Config::default());
    registry.add(decl("svc.A", "svc/a.fac#a", &[("b", "svc.B")]));
    registry.add(decl("svc.B", "svc/b.fac#b", &[("a", "Promise<svc.A>")]));

    let resolution = resolve(registry, &[root("svc.A")]);
    assert!(resolution.is_success());

    // Plan: [proxy for A, B, A]; B's edge defers through the proxy.
    let b = resolution
        .plan
        .components()
        .iter()
        .find(|c| c.produced == token("svc.B"))
        .unwrap();
    assert_eq!(b.edges, vec![Edge::Promise { target: 0 }]);
    assert!(matches!(
        resolution.plan.components()[0].role,
        Role::Proxy { target: Some(_) }
    ));
}

#[test]
fn missing_optional_binds_null_missing_required_fails() {
    let mut registry = Registry::new(&Config::default());
    registry.add(decl(
        "svc.App",
        "svc/app.fac#app",
        &[("metrics", "Option<svc.Metrics>")],
    ));

    let resolution = resolve(registry, &[root("svc.App"), root("svc.Metrics")]);

    assert_eq!(
        resolution.plan.components()[0].edges,
        vec![Edge::Null],
        "optional claim with zero matches binds null"
    );
    match resolution.roots[1].result.as_ref().unwrap_err() {
        PlaitError::Unresolvable { requested, .. } => {
            assert_eq!(requested, &token("svc.Metrics"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn failed_roots_do_not_abort_the_others() {
    let mut registry = Registry::new(&Config::default());
    registry.add(decl("svc.Ok", "svc/ok.fac#ok", &[]));

    let resolution = resolve(registry, &[root("svc.Missing"), root("svc.Ok")]);

    assert!(resolution.roots[0].result.is_err());
    assert!(resolution.roots[1].result.is_ok());
    assert_eq!(resolution.plan.len(), 1);
}

#[test]
fn tagged_claim_prefers_the_tagged_candidate() {
    let mut registry = Registry::new(&Config::default());
    let mut tagged = decl("svc.Queue", "svc/q.fac#fast", &[]);
    tagged.tags = tags(&["fast"]);
    registry.add(tagged);
    registry.add(decl("svc.Queue", "svc/q.fac#plain", &[]));

    let resolution = resolve(
        registry,
        &[root_tagged("svc.Queue", &["fast"]), root("svc.Queue")],
    );

    assert!(resolution.is_success());
    let target_source = |outcome: &plait_core::resolve::RootOutcome| match outcome
        .result
        .as_ref()
        .unwrap()
    {
        Edge::Direct { target } => resolution.plan.components()[*target].source.clone(),
        other => panic!("expected direct edge, got {other:?}"),
    };
    assert_eq!(target_source(&resolution.roots[0]), "svc/q.fac#fast");
    assert_eq!(target_source(&resolution.roots[1]), "svc/q.fac#plain");
}

#[test]
fn tagged_collect_includes_untagged_candidates() {
    let mut registry = Registry::new(&Config::default());
    let mut web = decl("svc.Handler", "svc/h.fac#web", &[]);
    web.tags = tags(&["web"]);
    registry.add(web);
    let mut cli = decl("svc.Handler", "svc/h.fac#cli", &[]);
    cli.tags = tags(&["cli"]);
    registry.add(cli);
    registry.add(decl("svc.Handler", "svc/h.fac#any", &[]));

    let resolution = resolve(registry, &[root_tagged("All<svc.Handler>", &["web"])]);

    let Edge::Collect { elements } = resolution.roots[0].result.as_ref().unwrap() else {
        panic!("expected collect edge");
    };
    let sources: Vec<&str> = elements
        .iter()
        .map(|e| match e {
            Edge::Direct { target } => resolution.plan.components()[*target].source.as_str(),
            other => panic!("expected direct element, got {other:?}"),
        })
        .collect();
    assert_eq!(sources, vec!["svc/h.fac#web", "svc/h.fac#any"]);
}

#[test]
fn ambiguity_without_a_default_is_terminal() {
    let mut registry = Registry::new(&Config::default());
    registry.add(decl("svc.Db", "svc/db.fac#one", &[]));
    registry.add(decl("svc.Db", "svc/db.fac#two", &[]));

    let resolution = resolve(registry, &[root("svc.Db")]);

    match resolution.roots[0].result.as_ref().unwrap_err() {
        PlaitError::Ambiguous { candidates, .. } => {
            assert_eq!(candidates, &vec![
                "svc/db.fac#one".to_string(),
                "svc/db.fac#two".to_string()
            ]);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn default_flag_settles_ambiguity() {
    let mut registry = Registry::new(&Config::default());
    registry.add(decl("svc.Db", "svc/db.fac#one", &[]));
    let mut preferred = decl("svc.Db", "svc/db.fac#two", &[]);
    preferred.flags |= DeclFlags::DEFAULT;
    registry.add(preferred);

    let resolution = resolve(registry, &[root("svc.Db")]);

    assert!(resolution.is_success());
    assert_eq!(resolution.plan.components()[0].source, "svc/db.fac#two");
}

#[test]
fn lazy_and_token_claims_produce_their_edge_shapes() {
    let mut registry = Registry::new(&Config::default());
    registry.add(decl(
        "svc.App",
        "svc/app.fac#app",
        &[("db", "Lazy<svc.Db>"), ("marker", "Token<svc.Unregistered>")],
    ));
    registry.add(decl("svc.Db", "svc/db.fac#db", &[]));

    let resolution = resolve(registry, &[root("svc.App")]);

    assert!(resolution.is_success());
    let app = resolution
        .plan
        .components()
        .iter()
        .find(|c| c.produced == token("svc.App"))
        .unwrap();
    assert_eq!(
        app.edges,
        vec![
            Edge::Lazy { target: 0 },
            Edge::TokenLiteral {
                token: token("svc.Unregistered")
            }
        ]
    );
}

#[test]
fn wrapper_producer_satisfies_the_unwrapped_claim() {
    let mut registry = Registry::new(&Config::default());
    registry.add(decl("Shared<svc.Config>", "svc/cfg.fac#shared", &[]));
    registry.add(decl("svc.App", "svc/app.fac#app", &[("cfg", "svc.Config")]));

    let resolution = resolve(registry, &[root("svc.App")]);

    assert!(resolution.is_success());
    let app = resolution
        .plan
        .components()
        .iter()
        .find(|c| c.produced == token("svc.App"))
        .unwrap();
    assert_eq!(app.edges, vec![Edge::Unwrap { target: 0 }]);
}

#[test]
fn unresolved_parameter_fails_only_its_own_subtree() {
    let mut registry = Registry::new(&Config::default());
    let mut broken = decl("svc.Broken", "svc/broken.fac#b", &[]);
    broken.params = vec![RawParameter {
        name: "mystery".to_string(),
        type_repr: None,
        tags: TagSet::new(),
        nullable: false,
    }];
    registry.add(broken);
    registry.add(decl("svc.Ok", "svc/ok.fac#ok", &[]));

    let resolution = resolve(registry, &[root("svc.Broken"), root("svc.Ok")]);

    match resolution.roots[0].result.as_ref().unwrap_err() {
        PlaitError::UnresolvedType { owner_source, parameter } => {
            assert_eq!(owner_source, "svc/broken.fac#b");
            assert_eq!(parameter, "mystery");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(resolution.roots[1].result.is_ok());
}

#[test]
fn identical_registries_produce_structurally_identical_plans() {
    let build = || {
        let mut registry = Registry::new(&Config::default());
        registry.add(decl(
            "svc.App",
            "svc/app.fac#app",
            &[("db", "svc.Db"), ("handlers", "All<svc.Handler>")],
        ));
        registry.add(decl("svc.Db", "svc/db.fac#db", &[("cfg", "Option<svc.Cfg>")]));
        registry.add(decl("svc.Handler", "svc/h.fac#h1", &[("db", "svc.Db")]));
        registry.add(decl("svc.Handler", "svc/h.fac#h2", &[]));
        resolve(registry, &[root("svc.App")])
    };

    let first = build();
    let second = build();
    assert_eq!(
        serde_json::to_value(first.document()).unwrap(),
        serde_json::to_value(second.document()).unwrap()
    );
    assert_instantiation_order(&first);
}

#[test]
fn template_specialization_resolves_through_the_extension() {
    let mut registry = Registry::new(&Config::default());
    registry.add(decl("repo.Codec<svc.User>", "repo/codec.fac#user", &[]));

    let mut template = decl("repo.Store<T>", "repo/store.fac#store", &[("codec", "repo.Codec<T>")]);
    template.type_params = vec!["T".to_string()];
    registry.add_template(template);

    let templates = TemplateLibrary::new(registry.templates().to_vec(), TagMatchPolicy::default());
    let resolver = Resolver::new(registry, TagMatchPolicy::default()).with_extension(&templates);
    let resolution = resolver.resolve_roots(&[root("repo.Store<svc.User>")]);

    assert!(resolution.is_success(), "{:?}", resolution.roots[0].result);
    let produced: Vec<String> = resolution
        .plan
        .components()
        .iter()
        .map(|c| c.produced.to_string())
        .collect();
    assert_eq!(produced, vec!["repo.Codec<svc.User>", "repo.Store<svc.User>"]);
}

#[test]
fn failed_specialization_is_rolled_back() {
    // The template needs a codec nobody declares, so the speculative branch
    // must be discarded without leaving partial components behind.
    let mut registry = Registry::new(&Config::default());
    registry.add(decl("svc.Ok", "svc/ok.fac#ok", &[]));
    let mut template = decl("repo.Store<T>", "repo/store.fac#store", &[("codec", "repo.Codec<T>")]);
    template.type_params = vec!["T".to_string()];
    registry.add_template(template);

    let templates = TemplateLibrary::new(registry.templates().to_vec(), TagMatchPolicy::default());
    let resolver = Resolver::new(registry, TagMatchPolicy::default()).with_extension(&templates);
    let resolution = resolver.resolve_roots(&[root("repo.Store<svc.User>"), root("svc.Ok")]);

    assert!(resolution.roots[0].result.is_err());
    assert!(resolution.roots[1].result.is_ok());
    let produced: Vec<String> = resolution
        .plan
        .components()
        .iter()
        .map(|c| c.produced.to_string())
        .collect();
    assert_eq!(produced, vec!["svc.Ok"], "speculative components were kept");
}

struct SelfReferential;

impl Extension for SelfReferential {
    fn resolve(&self, requested: &TypeToken, _tags: &TagSet) -> Option<Synthesized> {
        if requested == &TypeToken::new("svc.Weird") {
            // Produces something that does not satisfy the request but asks
            // for the request again, so synthesis re-enters itself.
            Some(Synthesized {
                produced: TypeToken::new("svc.WeirdImpl"),
                tags: TagSet::new(),
                provides: vec![],
                params: vec![RawParameter::new("again", "svc.Weird")],
                source: "ext#weird".to_string(),
            })
        } else {
            None
        }
    }
}

#[test]
fn re_entrant_synthesis_is_a_cyclic_template_error() {
    let registry = Registry::new(&Config::default());
    let extension = SelfReferential;
    let resolver = Resolver::new(registry, TagMatchPolicy::default()).with_extension(&extension);
    let resolution = resolver.resolve_roots(&[root("svc.Weird")]);

    match resolution.roots[0].result.as_ref().unwrap_err() {
        PlaitError::CyclicTemplate { requested } => {
            assert_eq!(requested, &TypeToken::new("svc.Weird"));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(resolution.plan.is_empty());
}

#[test]
fn interceptors_wrap_matching_components_first_registered_outermost() {
    let mut registry = Registry::new(&Config::default());
    registry.add(decl("svc.Api", "svc/api.fac#api", &[]));
    let mut tracing_int = decl("Intercept<svc.Api>", "svc/trace.fac#trace", &[]);
    tracing_int.flags |= DeclFlags::INTERCEPTOR;
    registry.add(tracing_int);
    let mut auth_int = decl("Intercept<svc.Api>", "svc/auth.fac#auth", &[("log", "svc.Log")]);
    auth_int.flags |= DeclFlags::INTERCEPTOR;
    registry.add(auth_int);
    registry.add(decl("svc.Log", "svc/log.fac#log", &[]));

    let resolution = resolve(registry, &[root("svc.Api")]);

    assert!(resolution.is_success());
    let api = resolution
        .plan
        .components()
        .iter()
        .find(|c| c.produced == token("svc.Api"))
        .unwrap();
    assert_eq!(api.wrappers.len(), 2);
    let wrapper_sources: Vec<&str> = api
        .wrappers
        .iter()
        .map(|w| resolution.plan.components()[*w].source.as_str())
        .collect();
    assert_eq!(wrapper_sources, vec!["svc/trace.fac#trace", "svc/auth.fac#auth"]);
}
