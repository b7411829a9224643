//! Role policy vocabulary.
//!
//! Two policy names are recognized: `cloudwatch` (log-write access, always
//! attached) and `dynamo_db` (table access scoped to a key prefix). Anything
//! else fails the synthesis run.

use serde_json::{json, Value};

use gantry_core::strings::dasherize;

use crate::SynthesisError;

/// Prefix placeholder resolved to the application name at render time.
pub const APP_NAME_PREFIX: &str = ":app_name";

pub const POLICY_CLOUDWATCH: &str = "cloudwatch";
pub const POLICY_DYNAMO_DB: &str = "dynamo_db";

/// A configured policy: a name from the fixed vocabulary plus its options.
#[derive(Debug, Clone, Default)]
pub struct PolicySpec {
    pub name: String,
    pub prefixes: Vec<String>,
    pub prefix_separator: Option<String>,
}

impl PolicySpec {
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }
}

/// Render one policy statement for the role's policy list.
pub fn render(spec: &PolicySpec, app_name: &str) -> Result<Value, SynthesisError> {
    match spec.name.as_str() {
        POLICY_CLOUDWATCH => Ok(cloudwatch()),
        POLICY_DYNAMO_DB => Ok(dynamo_db(spec, app_name)),
        other => Err(SynthesisError::UnknownPolicy(other.to_string())),
    }
}

/// Log-write access scoped to the account.
pub fn cloudwatch() -> Value {
    json!({
        "PolicyDocument": {
            "Version": "2012-10-17",
            "Statement": [
                {
                    "Sid": "AllowLogCreation",
                    "Action": ["logs:CreateLogStream", "logs:PutLogEvents"],
                    "Effect": "Allow",
                    "Resource": { "Fn::Sub": "arn:aws:logs:${AWS::Region}:${AWS::AccountId}:*" }
                },
                {
                    "Sid": "AllowLogGroupCreation",
                    "Action": ["logs:CreateLogGroup"],
                    "Effect": "Allow",
                    "Resource": "*"
                }
            ]
        },
        "PolicyName": "cloud-watch-access"
    })
}

/// Table access scoped to prefixed table names. The `:app_name` placeholder
/// expands to the dasherized application name, each dash component separated
/// by the configured separator.
fn dynamo_db(spec: &PolicySpec, app_name: &str) -> Value {
    let separator = spec.prefix_separator.as_deref().unwrap_or("-");
    let wildcard = if spec.prefixes.is_empty() {
        "*".to_string()
    } else {
        let mut parts: Vec<String> = Vec::new();
        for prefix in &spec.prefixes {
            if prefix == APP_NAME_PREFIX {
                parts.extend(dasherize(app_name).split('-').map(str::to_string));
            } else {
                parts.push(prefix.clone());
            }
        }
        parts.push("*".to_string());
        parts.join(separator)
    };

    json!({
        "PolicyDocument": {
            "Version": "2012-10-17",
            "Statement": [
                {
                    "Sid": "AllowAllActionsOnPrefixedTable",
                    "Effect": "Allow",
                    "Action": ["dynamodb:*"],
                    "Resource": {
                        "Fn::Sub": format!("arn:aws:dynamodb:${{AWS::Region}}:${{AWS::AccountId}}:table/{}", wildcard)
                    }
                },
                {
                    "Sid": "AdditionalPrivileges",
                    "Effect": "Allow",
                    "Action": ["dynamodb:ListTables", "dynamodb:DescribeTable"],
                    "Resource": "*"
                }
            ]
        },
        "PolicyName": "dynamo-db-access"
    })
}
