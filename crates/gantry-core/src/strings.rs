//! Case helpers used for resource ids and function names.

/// `calculator_algebra` -> `CalculatorAlgebra`
pub fn camelize(s: &str) -> String {
    s.split('_')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect()
}

/// `DemoApp` -> `demo_app`, `APIGateway` -> `api_gateway`
pub fn underscore(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let mut out = String::with_capacity(s.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if c.is_ascii_uppercase() {
            let after_lower = i > 0 && (chars[i - 1].is_ascii_lowercase() || chars[i - 1].is_ascii_digit());
            let upper_run_end = i > 0
                && chars[i - 1].is_ascii_uppercase()
                && i + 1 < chars.len()
                && chars[i + 1].is_ascii_lowercase();
            if after_lower || upper_run_end {
                out.push('_');
            }
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// `DemoApp` -> `demo-app`
pub fn dasherize(s: &str) -> String {
    underscore(s).replace('_', "-")
}

/// `Calculator::Algebra` -> `["Calculator", "Algebra"]`
pub fn module_components(name: &str) -> Vec<String> {
    name.split("::").map(|part| part.to_string()).collect()
}

/// Capitalize the first letter only: `create` -> `Create`
pub fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}
