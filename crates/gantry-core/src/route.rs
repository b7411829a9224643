//! Route inference: declared signature -> {verb, path}.

use crate::descriptor::{GatewayRoute, Verb};
use crate::signature::ParamDecl;

/// Function names that always map to DELETE, regardless of signature.
pub const DESTRUCTIVE_METHODS: [&str; 4] = ["destroy", "delete", "remove", "implode"];

/// Infer a gateway route from a function's namespace, short name and
/// declared parameter kinds.
///
/// The path starts with the lower-cased namespace components, then one
/// `:name` placeholder per required positional parameter in declaration
/// order, then the short name. The verb defaults to GET, flips to POST when
/// any keyword parameter is declared, and is forced to DELETE for the
/// destructive vocabulary. The name check runs last and wins over the
/// keyword rule.
pub fn infer_route(namespace: &[String], method: &str, params: &[ParamDecl]) -> GatewayRoute {
    let mut fragments: Vec<String> = namespace
        .iter()
        .map(|component| component.to_lowercase())
        .collect();
    let mut verb = Verb::Get;

    for param in params {
        if param.kind == crate::signature::ParamKind::Req {
            fragments.push(format!(":{}", param.name));
        }
        if param.kind.is_keyword() {
            verb = Verb::Post;
        }
    }

    if DESTRUCTIVE_METHODS.contains(&method) {
        verb = Verb::Delete;
    }

    fragments.push(method.to_string());
    GatewayRoute::new(verb, fragments.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signature::{to_decls, ParamSpec};

    fn namespace(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|p| p.to_string()).collect()
    }

    #[test]
    fn positional_params_become_placeholders_in_order() {
        let route = infer_route(
            &namespace(&["Calculator", "Algebra"]),
            "sum",
            &to_decls(&[ParamSpec::req("x"), ParamSpec::req("y"), ParamSpec::opt("z")]),
        );
        assert_eq!(route.verb, Verb::Get);
        assert_eq!(route.path, "calculator/algebra/:x/:y/sum");
    }

    #[test]
    fn no_params_is_a_bare_get() {
        let route = infer_route(&namespace(&["Pet"]), "list", &[]);
        assert_eq!(route.verb, Verb::Get);
        assert_eq!(route.path, "pet/list");
    }

    #[test]
    fn keyword_param_flips_to_post() {
        let route = infer_route(
            &namespace(&["Pet"]),
            "create",
            &to_decls(&[ParamSpec::opt("name"), ParamSpec::key("pet")]),
        );
        assert_eq!(route.verb, Verb::Post);
        assert_eq!(route.path, "pet/create");
    }

    #[test]
    fn required_keyword_also_flips_to_post() {
        let route = infer_route(
            &namespace(&["Pet"]),
            "rename",
            &to_decls(&[ParamSpec::req("id"), ParamSpec::key_req("name")]),
        );
        assert_eq!(route.verb, Verb::Post);
        assert_eq!(route.path, "pet/:id/rename");
    }

    #[test]
    fn destructive_name_forces_delete() {
        let route = infer_route(
            &namespace(&["Pet"]),
            "delete",
            &to_decls(&[ParamSpec::req("id")]),
        );
        assert_eq!(route.verb, Verb::Delete);
        assert_eq!(route.path, "pet/:id/delete");
    }

    #[test]
    fn destructive_name_wins_over_keyword_rule() {
        // keyword check runs first, the name check overrides it
        for method in DESTRUCTIVE_METHODS {
            let route = infer_route(
                &namespace(&["Pet"]),
                method,
                &to_decls(&[ParamSpec::req("id"), ParamSpec::key("opts")]),
            );
            assert_eq!(route.verb, Verb::Delete, "method {}", method);
        }
    }
}
