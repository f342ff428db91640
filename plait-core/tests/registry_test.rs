use plait_common::config::Config;
use plait_common::model::declaration::{DeclFlags, Declaration};
use plait_common::model::token::TypeToken;
use plait_core::registry::{Access, Registry};

fn token(text: &str) -> TypeToken {
    TypeToken::parse(text).unwrap()
}

fn decl(produces: &str, source: &str) -> Declaration {
    Declaration::new(token(produces), source)
}

#[test]
fn registered_declaration_is_found_under_its_produced_type() {
    let mut registry = Registry::new(&Config::default());
    let index = registry.add(decl("svc.Database", "svc/db.fac#db"));

    let candidates = registry.get_by_type(&token("svc.Database"));
    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0].decl, index);
    assert_eq!(candidates[0].access, Access::Direct);
}

#[test]
fn unknown_type_has_no_candidates() {
    let registry = Registry::new(&Config::default());
    assert!(registry.get_by_type(&token("svc.Nothing")).is_empty());
}

#[test]
fn provided_supertypes_are_indexed_too() {
    let mut registry = Registry::new(&Config::default());
    let mut d = decl("svc.PgDatabase", "svc/db.fac#pg");
    d.provides = vec![token("svc.Database"), token("svc.HealthCheck")];
    let index = registry.add(d);

    for ty in ["svc.PgDatabase", "svc.Database", "svc.HealthCheck"] {
        let candidates = registry.get_by_type(&token(ty));
        assert_eq!(candidates.len(), 1, "missing candidate under {ty}");
        assert_eq!(candidates[0].decl, index);
        assert_eq!(candidates[0].access, Access::Direct);
    }
}

#[test]
fn wrapper_producers_are_indexed_under_the_unwrapped_form() {
    let mut registry = Registry::new(&Config::default());
    let index = registry.add(decl("Shared<svc.Config>", "svc/cfg.fac#shared"));

    let direct = registry.get_by_type(&token("Shared<svc.Config>"));
    assert_eq!(direct[0].access, Access::Direct);

    let unwrapped = registry.get_by_type(&token("svc.Config"));
    assert_eq!(unwrapped.len(), 1);
    assert_eq!(unwrapped[0].decl, index);
    assert_eq!(unwrapped[0].access, Access::Unwrap);
}

#[test]
fn candidates_keep_first_registered_order() {
    let mut registry = Registry::new(&Config::default());
    let first = registry.add(decl("svc.Handler", "svc/h.fac#h1"));
    let second = registry.add(decl("svc.Handler", "svc/h.fac#h2"));
    let third = registry.add(decl("svc.Handler", "svc/h.fac#h3"));

    let order: Vec<usize> = registry
        .get_by_type(&token("svc.Handler"))
        .iter()
        .map(|c| c.decl)
        .collect();
    assert_eq!(order, vec![first, second, third]);
}

#[test]
fn interceptors_listed_in_registration_order() {
    let mut registry = Registry::new(&Config::default());
    registry.add(decl("svc.Api", "svc/api.fac#api"));
    let mut i1 = decl("Intercept<svc.Api>", "svc/trace.fac#i1");
    i1.flags |= DeclFlags::INTERCEPTOR;
    let mut i2 = decl("Intercept<svc.Api>", "svc/auth.fac#i2");
    i2.flags |= DeclFlags::INTERCEPTOR;
    let first = registry.add(i1);
    let second = registry.add(i2);

    assert_eq!(registry.interceptors(), vec![first, second]);
}

#[test]
#[should_panic(expected = "template declaration")]
fn templates_are_rejected_by_add() {
    let mut registry = Registry::new(&Config::default());
    let mut template = decl("repo.Store<T>", "repo/store.fac#store");
    template.type_params = vec!["T".to_string()];
    registry.add(template);
}
