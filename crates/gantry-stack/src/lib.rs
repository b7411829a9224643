//! Resource graph synthesis: compile a handler registry into a deployable
//! infrastructure template, packaging code artifacts along the way.
//!
//! Synthesis is all-or-nothing: unknown policy names, unresolved
//! references and store failures abort the run with no partial template.

pub mod artifacts;
pub mod builder;
pub mod policies;
pub mod template;

use thiserror::Error;

pub use artifacts::{AppPaths, ArtifactStore, Artifacts, DirStore, MemoryStore, StoreError};
pub use builder::{synthesize, StackOptions, DEFAULT_MEMORY_SIZE, DEFAULT_TIMEOUT, RUNTIME};
pub use policies::{PolicySpec, APP_NAME_PREFIX, POLICY_CLOUDWATCH, POLICY_DYNAMO_DB};
pub use template::{Template, TemplateFormat};

#[derive(Debug, Error)]
pub enum SynthesisError {
    #[error("unknown policy '{0}'")]
    UnknownPolicy(String),
    #[error("artifact store failure: {0}")]
    Store(#[from] StoreError),
    #[error("{path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("archive failure: {0}")]
    Archive(String),
    #[error("render failure: {0}")]
    Render(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use gantry_core::{Call, FunctionDef, HandlerResult, ModuleDef, ParamSpec, Registry};
    use serde_json::{json, Value};
    use std::fs;
    use tempfile::TempDir;

    fn noop(_call: Call) -> HandlerResult {
        Ok(json!(null))
    }

    const PET: ModuleDef = ModuleDef {
        name: "Pet",
        functions: &[
            FunctionDef {
                name: "show",
                params: &[ParamSpec::req("id")],
                call: noop,
            },
            FunctionDef {
                name: "update",
                params: &[ParamSpec::req("id"), ParamSpec::key("pet")],
                call: noop,
            },
            FunctionDef {
                name: "delete",
                params: &[ParamSpec::req("id")],
                call: noop,
            },
        ],
    };

    const ALGEBRA: ModuleDef = ModuleDef {
        name: "Calculator::Algebra",
        functions: &[FunctionDef {
            name: "sum",
            params: &[ParamSpec::req("x"), ParamSpec::req("y"), ParamSpec::opt("z")],
            call: noop,
        }],
    };

    fn registry() -> Registry {
        let mut registry = Registry::new();
        registry.register(PET).unwrap();
        registry.register(ALGEBRA).unwrap();
        registry
    }

    fn app_fixture() -> (TempDir, AppPaths) {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("Cargo.lock"), "lock v1").unwrap();
        fs::write(dir.path().join("main.rs"), "fn main() {}").unwrap();
        let paths = AppPaths::new(dir.path());
        (dir, paths)
    }

    fn options() -> StackOptions {
        StackOptions::new("DemoApp", "demo-lambdas")
    }

    #[test]
    fn root_nodes_and_outputs() {
        let (_dir, paths) = app_fixture();
        let mut store = MemoryStore::new();
        let template = synthesize(&registry(), &options(), &paths, &mut store).unwrap();
        let value = template.to_value();

        assert_eq!(value["AWSTemplateFormatVersion"], json!("2010-09-09"));
        assert_eq!(
            value["Parameters"]["ApiGatewayStageName"]["Default"],
            json!("v1")
        );
        assert_eq!(
            value["Parameters"]["AppEnvironment"]["AllowedValues"],
            json!(["development"])
        );
        assert_eq!(
            value["Outputs"]["ApiGatewayInvokeURL"]["Value"]["Fn::Sub"],
            json!("https://${ApiGateway}.execute-api.${AWS::Region}.amazonaws.com/${ApiGatewayStageName}")
        );
        assert_eq!(
            value["Outputs"]["ApiGatewayInvokeURL"]["Export"]["Name"],
            json!("DemoAppRootUrl")
        );
        assert_eq!(
            value["Resources"]["ApiGateway"]["Properties"]["Name"],
            json!("DemoApp")
        );
    }

    #[test]
    fn role_always_carries_the_log_write_policy() {
        let (_dir, paths) = app_fixture();
        let mut store = MemoryStore::new();
        let template = synthesize(&registry(), &options(), &paths, &mut store).unwrap();
        let value = template.to_value();

        let policies = value["Resources"]["LambdaRole"]["Properties"]["Policies"]
            .as_array()
            .unwrap();
        assert_eq!(policies.len(), 1);
        assert_eq!(policies[0]["PolicyName"], json!("cloud-watch-access"));
    }

    #[test]
    fn configured_policies_come_before_the_log_write_policy() {
        let (_dir, paths) = app_fixture();
        let mut store = MemoryStore::new();
        let mut opts = options();
        opts.policies.push(PolicySpec {
            name: POLICY_DYNAMO_DB.to_string(),
            prefixes: vec![APP_NAME_PREFIX.to_string(), "prefix".to_string()],
            prefix_separator: Some("-sep-".to_string()),
        });
        let template = synthesize(&registry(), &opts, &paths, &mut store).unwrap();
        let value = template.to_value();

        let policies = value["Resources"]["LambdaRole"]["Properties"]["Policies"]
            .as_array()
            .unwrap();
        assert_eq!(policies.len(), 2);
        assert_eq!(policies[0]["PolicyName"], json!("dynamo-db-access"));
        assert_eq!(policies[1]["PolicyName"], json!("cloud-watch-access"));
        assert_eq!(
            policies[0]["PolicyDocument"]["Statement"][0]["Resource"]["Fn::Sub"],
            json!("arn:aws:dynamodb:${AWS::Region}:${AWS::AccountId}:table/demo-sep-app-sep-prefix-sep-*")
        );
    }

    #[test]
    fn unknown_policy_aborts_the_run() {
        let (_dir, paths) = app_fixture();
        let mut store = MemoryStore::new();
        let mut opts = options();
        opts.policies.push(PolicySpec::named("secret_manager"));
        let result = synthesize(&registry(), &opts, &paths, &mut store);
        assert!(matches!(result, Err(SynthesisError::UnknownPolicy(_))));
        // nothing was packaged for the aborted run
        assert_eq!(store.puts, 0);
    }

    #[test]
    fn shared_path_prefixes_produce_one_node() {
        // pet/:id/show, pet/:id/update, pet/:id/delete share pet and :id
        let (_dir, paths) = app_fixture();
        let mut store = MemoryStore::new();
        let template = synthesize(&registry(), &options(), &paths, &mut store).unwrap();

        let gateway_resources = template.resources_of_kind("AWS::ApiGateway::Resource");
        let pet_nodes: Vec<&&str> = gateway_resources
            .iter()
            .filter(|id| id.starts_with("Pet"))
            .collect();
        // Pet, PetId, PetIdShow, PetIdUpdate, PetIdDelete: one per prefix
        assert_eq!(pet_nodes.len(), 5);
        assert!(template.contains("Pet"));
        assert!(template.contains("PetId"));

        let value = template.to_value();
        assert_eq!(
            value["Resources"]["PetId"]["Properties"]["PathPart"],
            json!("{id}")
        );
        assert_eq!(
            value["Resources"]["PetId"]["Properties"]["ParentId"],
            json!({ "Ref": "Pet" })
        );
        assert_eq!(
            value["Resources"]["Pet"]["Properties"]["ParentId"],
            json!({ "Fn::GetAtt": ["ApiGateway", "RootResourceId"] })
        );
    }

    #[test]
    fn deployment_depends_on_every_method_node_exactly_once() {
        let (_dir, paths) = app_fixture();
        let mut store = MemoryStore::new();
        let template = synthesize(&registry(), &options(), &paths, &mut store).unwrap();

        let methods = template.resources_of_kind("AWS::ApiGateway::Method");
        let deployment = template.resource("ApiGatewayDeployment").unwrap();

        assert_eq!(deployment.depends_on.len(), methods.len());
        let mut sorted_deps = deployment.depends_on.clone();
        sorted_deps.sort();
        sorted_deps.dedup();
        assert_eq!(sorted_deps.len(), methods.len());
        for method in methods {
            assert!(deployment.depends_on.iter().any(|dep| dep == method));
        }
    }

    #[test]
    fn lambda_env_vars_are_namespaced_by_group() {
        let (_dir, paths) = app_fixture();
        let mut store = MemoryStore::new();
        let template = synthesize(&registry(), &options(), &paths, &mut store).unwrap();
        let value = template.to_value();

        let variables =
            &value["Resources"]["LambdaCalculatorAlgebraSum"]["Properties"]["Environment"]["Variables"];
        assert_eq!(variables["gateway_verb"], json!("GET"));
        assert_eq!(variables["gateway_path"], json!("calculator/algebra/:x/:y/sum"));
        assert_eq!(variables["module_name"], json!("Calculator::Algebra"));
        assert_eq!(variables["module_method"], json!("sum"));
        assert_eq!(variables["module_path"], json!("calculator/algebra"));
        assert_eq!(variables["app_env"], json!({ "Ref": "AppEnvironment" }));
        assert!(variables.get("wrapper_name").is_none());
    }

    #[test]
    fn lambda_function_shape() {
        let (_dir, paths) = app_fixture();
        let mut store = MemoryStore::new();
        let template = synthesize(&registry(), &options(), &paths, &mut store).unwrap();
        let value = template.to_value();

        let lambda = &value["Resources"]["LambdaCalculatorAlgebraSum"]["Properties"];
        assert_eq!(
            lambda["FunctionName"],
            json!("demo-app-calculator-algebra-sum")
        );
        assert_eq!(lambda["Handler"], json!("gantry-dispatcher.dispatch"));
        assert_eq!(lambda["Timeout"], json!(15));
        assert_eq!(lambda["MemorySize"], json!(128));
        assert_eq!(lambda["Runtime"], json!(RUNTIME));
        assert_eq!(lambda["Code"]["S3Bucket"], json!("demo-lambdas"));
        assert_eq!(lambda["Code"]["S3Key"], json!("gantry-dispatcher.zip"));
        assert!(lambda["Code"]["S3ObjectVersion"].is_string());
        assert_eq!(
            lambda["Layers"],
            json!([{ "Ref": "DemoAppLayer" }, { "Ref": "DemoAppDepsLayer" }])
        );
        assert_eq!(lambda["Role"], json!({ "Fn::GetAtt": ["LambdaRole", "Arn"] }));
    }

    #[test]
    fn stack_level_settings_override_defaults() {
        let (_dir, paths) = app_fixture();
        let mut store = MemoryStore::new();
        let mut opts = options();
        opts.timeout = Some(20);
        opts.memory_size = Some(256);
        let template = synthesize(&registry(), &opts, &paths, &mut store).unwrap();
        let value = template.to_value();

        let lambda = &value["Resources"]["LambdaPetShow"]["Properties"];
        assert_eq!(lambda["Timeout"], json!(20));
        assert_eq!(lambda["MemorySize"], json!(256));
    }

    #[test]
    fn invoke_permission_widens_dynamic_segments() {
        let (_dir, paths) = app_fixture();
        let mut store = MemoryStore::new();
        let template = synthesize(&registry(), &options(), &paths, &mut store).unwrap();
        let value = template.to_value();

        let permission =
            &value["Resources"]["LambdaCalculatorAlgebraSumInvokePermission"]["Properties"];
        assert_eq!(
            permission["SourceArn"]["Fn::Sub"],
            json!("arn:aws:execute-api:${AWS::Region}:${AWS::AccountId}:${ApiGateway}/*/GET/calculator/algebra/*/*/sum")
        );
    }

    #[test]
    fn method_node_wires_the_integration() {
        let (_dir, paths) = app_fixture();
        let mut store = MemoryStore::new();
        let template = synthesize(&registry(), &options(), &paths, &mut store).unwrap();
        let value = template.to_value();

        let method = &value["Resources"]["EndpointForCalculatorAlgebraXYSum"]["Properties"];
        assert_eq!(method["HttpMethod"], json!("GET"));
        assert_eq!(method["AuthorizationType"], json!("NONE"));
        assert_eq!(method["Integration"]["Type"], json!("AWS_PROXY"));
        assert_eq!(
            method["Integration"]["Uri"]["Fn::Sub"][1]["lambdaArn"],
            json!({ "Fn::GetAtt": ["LambdaCalculatorAlgebraSum", "Arn"] })
        );
        assert_eq!(method["ResourceId"], json!({ "Ref": "CalculatorAlgebraXYSum" }));
    }

    #[test]
    fn synthesis_twice_without_changes_never_re_uploads() {
        let (_dir, paths) = app_fixture();
        let mut store = MemoryStore::new();

        let first = synthesize(&registry(), &options(), &paths, &mut store).unwrap();
        assert_eq!(store.puts, 3);

        let second = synthesize(&registry(), &options(), &paths, &mut store).unwrap();
        assert_eq!(store.puts, 3);

        // version tokens are re-read, not re-minted
        let version = |template: &Template, id: &str| -> Value {
            template.to_value()["Resources"][id]["Properties"]["Content"]["S3ObjectVersion"].clone()
        };
        assert_eq!(version(&first, "DemoAppLayer"), version(&second, "DemoAppLayer"));
        assert_eq!(
            version(&first, "DemoAppDepsLayer"),
            version(&second, "DemoAppDepsLayer")
        );
    }

    #[test]
    fn skip_upload_renders_a_template_without_packaging() {
        let (_dir, paths) = app_fixture();
        let mut store = MemoryStore::new();
        let mut opts = options();
        opts.skip_upload = true;

        let template = synthesize(&registry(), &opts, &paths, &mut store).unwrap();
        assert_eq!(store.puts, 0);
        assert!(!template.contains("DemoAppLayer"));

        let value = template.to_value();
        let lambda = &value["Resources"]["LambdaPetShow"]["Properties"];
        assert!(lambda["Code"]["S3ObjectVersion"].is_null());
    }

    #[test]
    fn store_failure_aborts_with_no_template() {
        struct FailingStore;
        impl ArtifactStore for FailingStore {
            fn put(&mut self, _key: &str, _bytes: &[u8]) -> Result<String, StoreError> {
                Err(StoreError("put refused".to_string()))
            }
            fn get(&self, _key: &str) -> Result<Option<(Vec<u8>, String)>, StoreError> {
                Ok(None)
            }
        }

        let (_dir, paths) = app_fixture();
        let mut store = FailingStore;
        let result = synthesize(&registry(), &options(), &paths, &mut store);
        assert!(matches!(result, Err(SynthesisError::Store(_))));
    }

    #[test]
    fn renders_json_and_yaml_equivalently() {
        let (_dir, paths) = app_fixture();
        let mut store = MemoryStore::new();
        let template = synthesize(&registry(), &options(), &paths, &mut store).unwrap();

        let from_json: Value =
            serde_json::from_str(&template.render(TemplateFormat::Json).unwrap()).unwrap();
        let from_yaml: Value =
            serde_yaml::from_str(&template.render(TemplateFormat::Yaml).unwrap()).unwrap();
        assert_eq!(from_json, from_yaml);
    }
}
