use std::collections::{HashMap, HashSet};

use crate::registry::CommandRegistry;

#[derive(Debug, Clone, Default)]
pub struct Args {
    pub flags: HashMap<String, bool>,
    pub params: HashMap<String, String>,
    pub command: Option<String>,
    pub positionals: Vec<String>,
}

impl Args {
    pub fn flag(&self, name: &str, aliases: &[&str]) -> bool {
        self.flags.contains_key(name) || aliases.iter().any(|alias| self.flags.contains_key(*alias))
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }
}

#[derive(Debug, Clone)]
pub struct ParseOutcome {
    pub args: Args,
    pub errors: Vec<ParseError>,
}

#[derive(Debug, Clone)]
pub struct ParseError {
    pub token: String,
    pub kind: ParseErrorKind,
    pub suggestions: Vec<String>,
}

#[derive(Debug, Clone)]
pub enum ParseErrorKind {
    UnknownToken,
    MissingParamValue { param: String },
}

impl ParseError {
    fn unknown(token: String, suggestions: Vec<String>) -> Self {
        Self {
            token,
            kind: ParseErrorKind::UnknownToken,
            suggestions,
        }
    }

    fn missing_param(param: String) -> Self {
        Self {
            token: param.clone(),
            kind: ParseErrorKind::MissingParamValue { param },
            suggestions: Vec::new(),
        }
    }
}

impl Args {
    pub fn collect(tokens: Vec<String>, registry: &CommandRegistry) -> ParseOutcome {
        let mut args = Args::default();
        let mut errors = Vec::new();

        let mut flag_tokens: HashSet<&'static str> = HashSet::new();
        for flag in registry.flags() {
            flag_tokens.insert(flag.name);
            for alias in flag.aliases {
                flag_tokens.insert(alias);
            }
        }
        let param_tokens: HashSet<&'static str> =
            registry.params().iter().map(|param| param.name).collect();
        let suggestion_tokens = registry.suggestion_tokens();

        let mut iter = tokens.into_iter();
        while let Some(token) = iter.next() {
            if flag_tokens.contains(token.as_str()) {
                args.flags.insert(token, true);
                continue;
            }

            if param_tokens.contains(token.as_str()) {
                match iter.next() {
                    Some(value) => {
                        args.params.insert(token, value);
                    }
                    None => errors.push(ParseError::missing_param(token)),
                }
                continue;
            }

            if args.command.is_none() {
                if let Some(command) = registry.command_for(&token) {
                    args.command = Some(command.name.to_string());
                    continue;
                }
            }

            if token.starts_with('-') || args.command.is_none() {
                let suggestions = suggest(&token, &suggestion_tokens);
                errors.push(ParseError::unknown(token, suggestions));
                continue;
            }

            args.positionals.push(token);
        }

        ParseOutcome { args, errors }
    }
}

pub fn format_parse_errors(errors: &[ParseError]) -> String {
    let mut output = String::new();
    for error in errors {
        match &error.kind {
            ParseErrorKind::UnknownToken => {
                output.push_str(&format!("unknown argument '{}'", error.token));
                if !error.suggestions.is_empty() {
                    let quoted: Vec<String> = error
                        .suggestions
                        .iter()
                        .map(|suggestion| format!("'{}'", suggestion))
                        .collect();
                    output.push_str(&format!(". did you mean {}?", quoted.join(", ")));
                }
                output.push('\n');
            }
            ParseErrorKind::MissingParamValue { param } => {
                output.push_str(&format!("missing value for '{}'\n", param));
            }
        }
    }
    output
}

fn suggest(token: &str, candidates: &[String]) -> Vec<String> {
    let threshold = if token.len() <= 4 {
        1
    } else if token.len() <= 7 {
        2
    } else {
        3
    };

    let mut scored: Vec<(usize, &String)> = candidates
        .iter()
        .map(|candidate| (levenshtein(token, candidate), candidate))
        .collect();
    scored.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(b.1)));

    scored
        .into_iter()
        .take_while(|(distance, _)| *distance <= threshold)
        .take(3)
        .map(|(_, candidate)| candidate.clone())
        .collect()
}

fn levenshtein(a: &str, b: &str) -> usize {
    if a.is_empty() {
        return b.chars().count();
    }
    if b.is_empty() {
        return a.chars().count();
    }

    let b_len = b.chars().count();
    let mut prev: Vec<usize> = (0..=b_len).collect();
    let mut curr = vec![0; b_len + 1];

    for (i, ca) in a.chars().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.chars().enumerate() {
            let cost = if ca == cb { 0 } else { 1 };
            curr[j + 1] =
                std::cmp::min(std::cmp::min(curr[j] + 1, prev[j + 1] + 1), prev[j] + cost);
        }
        prev.clone_from_slice(&curr);
    }

    prev[b_len]
}
