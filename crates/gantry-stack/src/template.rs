//! The serializable infrastructure graph.
//!
//! Nodes reference each other by id (`Ref` / `Fn::GetAtt`), never by
//! ownership. References are resolved by the deployment service at render
//! time. Insertion order is preserved because later nodes build on ids
//! created earlier in the same run.

use std::collections::HashMap;
use std::str::FromStr;

use serde_json::{json, Map, Value};

use crate::SynthesisError;

pub const TEMPLATE_FORMAT_VERSION: &str = "2010-09-09";

/// Output encodings of a rendered template. Interchangeable: both encode
/// the same id -> {kind, properties, dependency list} mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateFormat {
    Json,
    Yaml,
}

impl FromStr for TemplateFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(TemplateFormat::Json),
            "yaml" | "yml" => Ok(TemplateFormat::Yaml),
            other => Err(format!("unknown template format '{}'", other)),
        }
    }
}

/// One resource node: provider kind, properties bag, explicit dependencies.
#[derive(Debug, Clone)]
pub struct Resource {
    pub kind: String,
    pub properties: Value,
    pub depends_on: Vec<String>,
}

impl Resource {
    pub fn new(kind: &str, properties: Value) -> Self {
        Self {
            kind: kind.to_string(),
            properties,
            depends_on: Vec::new(),
        }
    }
}

/// Template parameter node.
#[derive(Debug, Clone, Default)]
pub struct Parameter {
    pub description: Option<String>,
    pub default: Option<String>,
    pub allowed_values: Option<Vec<String>>,
    pub constraint_description: Option<String>,
}

/// Template output node.
#[derive(Debug, Clone)]
pub struct Output {
    pub value: Value,
    pub description: Option<String>,
    pub export_name: Option<String>,
}

/// The whole graph: parameters, resources and outputs in insertion order.
#[derive(Debug, Default)]
pub struct Template {
    pub name: String,
    parameters: Vec<(String, Parameter)>,
    resources: Vec<(String, Resource)>,
    index: HashMap<String, usize>,
    outputs: Vec<(String, Output)>,
}

impl Template {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn add_parameter(&mut self, id: &str, parameter: Parameter) {
        self.parameters.push((id.to_string(), parameter));
    }

    pub fn add_output(&mut self, id: &str, output: Output) {
        self.outputs.push((id.to_string(), output));
    }

    /// Add or replace a resource node.
    pub fn add(&mut self, id: &str, resource: Resource) {
        match self.index.get(id) {
            Some(&position) => self.resources[position].1 = resource,
            None => {
                self.index.insert(id.to_string(), self.resources.len());
                self.resources.push((id.to_string(), resource));
            }
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn resource(&self, id: &str) -> Option<&Resource> {
        self.index.get(id).map(|&position| &self.resources[position].1)
    }

    pub fn resource_mut(&mut self, id: &str) -> Option<&mut Resource> {
        let position = *self.index.get(id)?;
        Some(&mut self.resources[position].1)
    }

    /// Append to a node's explicit dependency list.
    pub fn push_dependency(&mut self, id: &str, dependency: &str) {
        if let Some(resource) = self.resource_mut(id) {
            resource.depends_on.push(dependency.to_string());
        }
    }

    /// Resource ids in creation order.
    pub fn resource_ids(&self) -> Vec<&str> {
        self.resources.iter().map(|(id, _)| id.as_str()).collect()
    }

    pub fn resources_of_kind(&self, kind: &str) -> Vec<&str> {
        self.resources
            .iter()
            .filter(|(_, resource)| resource.kind == kind)
            .map(|(id, _)| id.as_str())
            .collect()
    }

    pub fn to_value(&self) -> Value {
        let mut root = Map::new();
        root.insert(
            "AWSTemplateFormatVersion".to_string(),
            json!(TEMPLATE_FORMAT_VERSION),
        );

        if !self.parameters.is_empty() {
            let mut parameters = Map::new();
            for (id, parameter) in &self.parameters {
                let mut node = Map::new();
                node.insert("Type".to_string(), json!("String"));
                if let Some(description) = &parameter.description {
                    node.insert("Description".to_string(), json!(description));
                }
                if let Some(default) = &parameter.default {
                    node.insert("Default".to_string(), json!(default));
                }
                if let Some(allowed) = &parameter.allowed_values {
                    node.insert("AllowedValues".to_string(), json!(allowed));
                }
                if let Some(constraint) = &parameter.constraint_description {
                    node.insert("ConstraintDescription".to_string(), json!(constraint));
                }
                parameters.insert(id.clone(), Value::Object(node));
            }
            root.insert("Parameters".to_string(), Value::Object(parameters));
        }

        let mut resources = Map::new();
        for (id, resource) in &self.resources {
            let mut node = Map::new();
            if !resource.depends_on.is_empty() {
                node.insert("DependsOn".to_string(), json!(resource.depends_on));
            }
            node.insert("Type".to_string(), json!(resource.kind));
            node.insert("Properties".to_string(), resource.properties.clone());
            resources.insert(id.clone(), Value::Object(node));
        }
        root.insert("Resources".to_string(), Value::Object(resources));

        if !self.outputs.is_empty() {
            let mut outputs = Map::new();
            for (id, output) in &self.outputs {
                let mut node = Map::new();
                node.insert("Value".to_string(), output.value.clone());
                if let Some(description) = &output.description {
                    node.insert("Description".to_string(), json!(description));
                }
                if let Some(export_name) = &output.export_name {
                    node.insert("Export".to_string(), json!({ "Name": export_name }));
                }
                outputs.insert(id.clone(), Value::Object(node));
            }
            root.insert("Outputs".to_string(), Value::Object(outputs));
        }

        Value::Object(root)
    }

    pub fn render(&self, format: TemplateFormat) -> Result<String, SynthesisError> {
        let value = self.to_value();
        match format {
            TemplateFormat::Json => serde_json::to_string_pretty(&value)
                .map_err(|err| SynthesisError::Render(err.to_string())),
            TemplateFormat::Yaml => {
                serde_yaml::to_string(&value).map_err(|err| SynthesisError::Render(err.to_string()))
            }
        }
    }
}

/// `{"Ref": id}`
pub fn reference(id: &str) -> Value {
    json!({ "Ref": id })
}

/// `{"Fn::GetAtt": [id, attribute]}`
pub fn get_att(id: &str, attribute: &str) -> Value {
    json!({ "Fn::GetAtt": [id, attribute] })
}

/// `{"Fn::Sub": expression}`
pub fn sub(expression: &str) -> Value {
    json!({ "Fn::Sub": expression })
}

/// `{"Fn::Sub": [expression, variables]}`
pub fn sub_with(expression: &str, variables: Value) -> Value {
    json!({ "Fn::Sub": [expression, variables] })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_is_idempotent_per_id() {
        let mut template = Template::new("Demo");
        template.add("Pets", Resource::new("AWS::ApiGateway::Resource", json!({ "PathPart": "pets" })));
        template.add("Pets", Resource::new("AWS::ApiGateway::Resource", json!({ "PathPart": "pets" })));
        assert_eq!(template.resource_ids(), vec!["Pets"]);
    }

    #[test]
    fn dependencies_accumulate() {
        let mut template = Template::new("Demo");
        template.add("Deployment", Resource::new("AWS::ApiGateway::Deployment", json!({})));
        template.push_dependency("Deployment", "EndpointA");
        template.push_dependency("Deployment", "EndpointB");
        assert_eq!(
            template.resource("Deployment").unwrap().depends_on,
            vec!["EndpointA", "EndpointB"]
        );
    }

    #[test]
    fn renders_both_encodings() {
        let mut template = Template::new("Demo");
        template.add_parameter(
            "Stage",
            Parameter {
                description: Some("deployment stage".to_string()),
                default: Some("v1".to_string()),
                ..Default::default()
            },
        );
        template.add(
            "Fn",
            Resource::new("AWS::Lambda::Function", json!({ "Handler": "dispatch" })),
        );
        template.add_output(
            "Url",
            Output {
                value: sub("https://${Fn}.example.com"),
                description: None,
                export_name: Some("DemoUrl".to_string()),
            },
        );

        let rendered_json = template.render(TemplateFormat::Json).unwrap();
        let from_json: Value = serde_json::from_str(&rendered_json).unwrap();

        let rendered_yaml = template.render(TemplateFormat::Yaml).unwrap();
        let from_yaml: Value = serde_yaml::from_str(&rendered_yaml).unwrap();

        assert_eq!(from_json, from_yaml);
        assert_eq!(from_json["AWSTemplateFormatVersion"], json!(TEMPLATE_FORMAT_VERSION));
        assert_eq!(from_json["Resources"]["Fn"]["Type"], json!("AWS::Lambda::Function"));
        assert_eq!(from_json["Parameters"]["Stage"]["Default"], json!("v1"));
        assert_eq!(from_json["Outputs"]["Url"]["Export"]["Name"], json!("DemoUrl"));
    }

    #[test]
    fn intrinsics_shapes() {
        assert_eq!(reference("ApiGateway"), json!({ "Ref": "ApiGateway" }));
        assert_eq!(
            get_att("LambdaRole", "Arn"),
            json!({ "Fn::GetAtt": ["LambdaRole", "Arn"] })
        );
        assert_eq!(sub("${AWS::Region}"), json!({ "Fn::Sub": "${AWS::Region}" }));
    }
}
