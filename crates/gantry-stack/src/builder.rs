//! Compile the whole registry into one infrastructure graph.
//!
//! One synthesis run is strictly sequential: root nodes, role policies,
//! artifact packaging, then one expansion per registered descriptor. Later
//! nodes reference ids created earlier, so creation order matters. Any
//! failure aborts the run; no partial template is returned.

use serde_json::{json, Map, Value};

use gantry_core::strings::{camelize, capitalize, dasherize, module_components};
use gantry_core::{RegisteredLambda, Registry};

use crate::artifacts::{self, AppPaths, ArtifactStore, Artifacts, DISPATCHER_FILE_NAME};
use crate::policies::{self, PolicySpec};
use crate::template::{get_att, reference, sub, sub_with, Output, Parameter, Resource, Template};
use crate::SynthesisError;

pub const RUNTIME: &str = "provided.al2023";
pub const DEFAULT_TIMEOUT: u32 = 15;
pub const DEFAULT_MEMORY_SIZE: u32 = 128;

const API_GATEWAY_ID: &str = "ApiGateway";
const DEPLOYMENT_ID: &str = "ApiGatewayDeployment";
const ROLE_ID: &str = "LambdaRole";

/// Build-time options for one synthesis run.
#[derive(Debug, Clone)]
pub struct StackOptions {
    /// Application name; camelized into the stack name and resource ids.
    pub app_name: String,
    /// Remote bucket artifacts are addressed under.
    pub bucket: String,
    /// Allowed values of the app-environment parameter.
    pub app_envs: Vec<String>,
    pub timeout: Option<u32>,
    pub memory_size: Option<u32>,
    /// Role policies beyond the always-attached log-write policy.
    pub policies: Vec<PolicySpec>,
    /// Skip artifact packaging entirely (template preview).
    pub skip_upload: bool,
}

impl StackOptions {
    pub fn new(app_name: &str, bucket: &str) -> Self {
        Self {
            app_name: app_name.to_string(),
            bucket: bucket.to_string(),
            app_envs: vec!["development".to_string()],
            timeout: None,
            memory_size: None,
            policies: Vec::new(),
            skip_upload: false,
        }
    }
}

/// Synthesize the registry into a template, packaging artifacts through the
/// injected store.
pub fn synthesize(
    registry: &Registry,
    opts: &StackOptions,
    paths: &AppPaths,
    store: &mut dyn ArtifactStore,
) -> Result<Template, SynthesisError> {
    stdio::log("stack", "initializing stack");
    let app_name = camelize(&dasherize(&opts.app_name).replace('-', "_"));
    let mut builder = StackBuilder {
        template: Template::new(&app_name),
        app_name,
        app_dir: paths.app_dir(),
        opts,
    };

    builder.add_root_nodes();
    builder.attach_policies()?;

    let artifacts = if opts.skip_upload {
        stdio::log("stack", "skipping upload");
        None
    } else {
        Some(artifacts::package(paths, store)?)
    };
    builder.add_layers(artifacts.as_ref());

    stdio::log("stack", "generating endpoints");
    for entry in registry.iter() {
        stdio::log(
            "stack",
            &format!(
                "- adding {} to {}",
                entry.descriptor.qualified_target(),
                entry.descriptor.gateway.path
            ),
        );
        builder.add_lambda_endpoint(entry, artifacts.as_ref());
    }

    Ok(builder.template)
}

struct StackBuilder<'a> {
    template: Template,
    app_name: String,
    app_dir: String,
    opts: &'a StackOptions,
}

impl StackBuilder<'_> {
    fn add_root_nodes(&mut self) {
        self.template.add_parameter(
            "AppEnvironment",
            Parameter {
                description: Some("Application environment".to_string()),
                allowed_values: Some(self.opts.app_envs.clone()),
                constraint_description: Some(format!(
                    "Must be one of {}",
                    self.opts.app_envs.join(", ")
                )),
                ..Default::default()
            },
        );
        self.template.add_parameter(
            "ApiGatewayStageName",
            Parameter {
                description: Some("Gateway deployment stage".to_string()),
                default: Some("v1".to_string()),
                ..Default::default()
            },
        );

        self.template.add(
            API_GATEWAY_ID,
            Resource::new(
                "AWS::ApiGateway::RestApi",
                json!({
                    "Name": self.app_name,
                    "Description": format!("{} API", self.app_name),
                }),
            ),
        );

        // routes are wired to the deployment via explicit dependencies as
        // they are created
        self.template.add(
            DEPLOYMENT_ID,
            Resource::new(
                "AWS::ApiGateway::Deployment",
                json!({
                    "RestApiId": reference(API_GATEWAY_ID),
                    "StageName": reference("ApiGatewayStageName"),
                }),
            ),
        );
        self.template.add_output(
            "ApiGatewayInvokeURL",
            Output {
                value: sub(&format!(
                    "https://${{{}}}.execute-api.${{AWS::Region}}.amazonaws.com/${{ApiGatewayStageName}}",
                    API_GATEWAY_ID
                )),
                description: Some("API root url".to_string()),
                export_name: Some(format!("{}RootUrl", self.app_name)),
            },
        );

        self.template.add(
            ROLE_ID,
            Resource::new(
                "AWS::IAM::Role",
                json!({
                    "AssumeRolePolicyDocument": {
                        "Version": "2012-10-17",
                        "Statement": [
                            {
                                "Action": ["sts:AssumeRole"],
                                "Effect": "Allow",
                                "Principal": { "Service": ["lambda.amazonaws.com"] }
                            }
                        ]
                    },
                    "Policies": []
                }),
            ),
        );
    }

    /// Render configured policies onto the role; the log-write policy is
    /// always attached last.
    fn attach_policies(&mut self) -> Result<(), SynthesisError> {
        let mut rendered: Vec<Value> = Vec::new();
        for spec in &self.opts.policies {
            rendered.push(policies::render(spec, &self.app_name)?);
        }
        rendered.push(policies::cloudwatch());

        if let Some(role) = self.template.resource_mut(ROLE_ID) {
            if let Some(list) = role
                .properties
                .get_mut("Policies")
                .and_then(Value::as_array_mut)
            {
                list.extend(rendered);
            }
        }
        Ok(())
    }

    fn add_layers(&mut self, artifacts: Option<&Artifacts>) {
        let Some(artifacts) = artifacts else {
            return;
        };

        if let Some(deps) = &artifacts.deps {
            let name = format!("{}Deps", self.app_name);
            self.add_layer(&name, "App dependencies", deps);
        }
        let name = self.app_name.clone();
        let description = format!("App source. SHA256: {}", artifacts.app_checksum);
        self.add_layer(&name, &description, &artifacts.app);
    }

    fn add_layer(&mut self, name: &str, description: &str, artifact: &artifacts::ArtifactRef) {
        self.template.add(
            &format!("{}Layer", name),
            Resource::new(
                "AWS::Lambda::LayerVersion",
                json!({
                    "CompatibleRuntimes": [RUNTIME],
                    "LayerName": name,
                    "Description": description,
                    "Content": {
                        "S3Bucket": self.opts.bucket,
                        "S3Key": artifact.key,
                        "S3ObjectVersion": artifact.version,
                    }
                }),
            ),
        );
    }

    fn add_lambda_endpoint(&mut self, entry: &RegisteredLambda, artifacts: Option<&Artifacts>) {
        let lambda_id = self.add_lambda(entry, artifacts);
        self.add_gateway_resources(entry, &lambda_id);
    }

    /// Compute-function node plus its invoke permission.
    fn add_lambda(&mut self, entry: &RegisteredLambda, artifacts: Option<&Artifacts>) -> String {
        let descriptor = &entry.descriptor;
        let name_parts = module_components(&descriptor.module.name);

        // namespace each descriptor group, keep custom env entries as-is
        let mut variables = Map::new();
        for (key, value) in &descriptor.env {
            variables.insert(key.clone(), json!(value));
        }
        variables.insert("gateway_verb".to_string(), json!(descriptor.gateway.verb.as_str()));
        variables.insert("gateway_path".to_string(), json!(descriptor.gateway.path));
        variables.insert("module_name".to_string(), json!(descriptor.module.name));
        variables.insert("module_method".to_string(), json!(descriptor.module.method));
        variables.insert("module_path".to_string(), json!(descriptor.module.path));
        if let Some(wrapper) = &descriptor.wrapper {
            variables.insert("wrapper_name".to_string(), json!(wrapper.name));
            variables.insert("wrapper_method".to_string(), json!(wrapper.method));
            variables.insert("wrapper_path".to_string(), json!(wrapper.path));
        }
        variables.insert("app_dir".to_string(), json!(self.app_dir));
        variables.insert("app_env".to_string(), reference("AppEnvironment"));

        let function_name = dasherize(
            &std::iter::once(self.app_name.as_str())
                .chain(name_parts.iter().map(String::as_str))
                .chain(std::iter::once(descriptor.module.method.as_str()))
                .collect::<Vec<&str>>()
                .join("-"),
        );

        let mut code = Map::new();
        code.insert("S3Bucket".to_string(), json!(self.opts.bucket));
        code.insert(
            "S3Key".to_string(),
            json!(format!("{}.zip", DISPATCHER_FILE_NAME)),
        );
        if let Some(artifacts) = artifacts {
            code.insert(
                "S3ObjectVersion".to_string(),
                json!(artifacts.dispatcher.version),
            );
        }

        let properties = json!({
            "Description": format!("Lambda for {}", descriptor.qualified_target()),
            "FunctionName": function_name,
            "Handler": format!("{}.dispatch", DISPATCHER_FILE_NAME),
            "Environment": { "Variables": Value::Object(variables) },
            "Role": get_att(ROLE_ID, "Arn"),
            "Timeout": descriptor.settings.timeout
                .or(self.opts.timeout)
                .unwrap_or(DEFAULT_TIMEOUT),
            "MemorySize": descriptor.settings.memory_size
                .or(self.opts.memory_size)
                .unwrap_or(DEFAULT_MEMORY_SIZE),
            "Runtime": RUNTIME,
            "Code": Value::Object(code),
            "Layers": [
                reference(&format!("{}Layer", self.app_name)),
                reference(&format!("{}DepsLayer", self.app_name)),
            ],
        });

        let id = format!(
            "Lambda{}{}",
            name_parts.join(""),
            capitalize(&descriptor.module.method)
        );
        self.template
            .add(&id, Resource::new("AWS::Lambda::Function", properties));
        self.add_invoke_permission(&id, entry);
        id
    }

    /// Invoke permission scoped to the exact verb, with every dynamic path
    /// segment widened to a wildcard.
    fn add_invoke_permission(&mut self, lambda_id: &str, entry: &RegisteredLambda) {
        let gateway = &entry.descriptor.gateway;
        let matcher = gateway
            .path
            .split('/')
            .map(|fragment| if fragment.starts_with(':') { "*" } else { fragment })
            .collect::<Vec<&str>>()
            .join("/");

        self.template.add(
            &format!("{}InvokePermission", lambda_id),
            Resource::new(
                "AWS::Lambda::Permission",
                json!({
                    "Action": "lambda:InvokeFunction",
                    "FunctionName": get_att(lambda_id, "Arn"),
                    "Principal": "apigateway.amazonaws.com",
                    "SourceArn": sub(&format!(
                        "arn:aws:execute-api:${{AWS::Region}}:${{AWS::AccountId}}:${{{}}}/*/{}/{}",
                        API_GATEWAY_ID, gateway.verb, matcher
                    )),
                }),
            ),
        );
    }

    /// One gateway-resource node per unique path prefix, shared across
    /// descriptors, then the method node on the final segment.
    fn add_gateway_resources(&mut self, entry: &RegisteredLambda, lambda_id: &str) {
        let gateway = &entry.descriptor.gateway;
        let segments: Vec<&str> = gateway.path.split('/').collect();

        let mut parent_id = String::new();
        for (position, segment) in segments.iter().enumerate() {
            let (fragment, path_part) = match segment.strip_prefix(':') {
                Some(name) => (name, format!("{{{}}}", name)),
                None => (*segment, segment.to_string()),
            };
            let id = format!("{}{}", parent_id, camelize(fragment));

            if !self.template.contains(&id) {
                let parent: Value = if position == 0 {
                    get_att(API_GATEWAY_ID, "RootResourceId")
                } else {
                    reference(&parent_id)
                };
                self.template.add(
                    &id,
                    Resource::new(
                        "AWS::ApiGateway::Resource",
                        json!({
                            "RestApiId": reference(API_GATEWAY_ID),
                            "ParentId": parent,
                            "PathPart": path_part,
                        }),
                    ),
                );
            }
            parent_id = id;
        }

        let method_id = format!(
            "EndpointFor{}",
            camelize(&gateway.path.replace(':', "").replace('/', "_"))
        );
        self.template.add(
            &method_id,
            Resource::new(
                "AWS::ApiGateway::Method",
                json!({
                    "AuthorizationType": "NONE",
                    "HttpMethod": gateway.verb.as_str(),
                    "Integration": {
                        "IntegrationHttpMethod": "POST",
                        "Type": "AWS_PROXY",
                        "Uri": sub_with(
                            "arn:aws:apigateway:${AWS::Region}:lambda:path/2015-03-31/functions/${lambdaArn}/invocations",
                            json!({ "lambdaArn": get_att(lambda_id, "Arn") }),
                        ),
                    },
                    "RestApiId": reference(API_GATEWAY_ID),
                    "ResourceId": reference(&parent_id),
                }),
            ),
        );

        // the provider must apply routes only after the method exists
        self.template.push_dependency(DEPLOYMENT_ID, &method_id);
    }
}
