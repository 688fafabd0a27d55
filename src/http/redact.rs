use reqwest::header::HeaderValue;

const REDACTION: &str = "***REDACTED***";
const SENSITIVE_HEADERS: [&str; 4] = [
    "authorization",
    "x-amz-security-token",
    "x-api-key",
    "proxy-authorization",
];

pub fn redact_header_value(name: &str, value: &HeaderValue) -> String {
    if is_sensitive_header(name) {
        REDACTION.to_string()
    } else {
        value
            .to_str()
            .map(std::string::ToString::to_string)
            .unwrap_or_else(|_| "<non-utf8>".to_string())
    }
}

pub fn truncate_for_log(input: &str, max_chars: usize) -> String {
    let count = input.chars().count();
    if count <= max_chars {
        return input.to_string();
    }

    let truncated = input.chars().take(max_chars).collect::<String>();
    format!("{truncated}... <truncated {} chars>", count - max_chars)
}

fn is_sensitive_header(name: &str) -> bool {
    let name = name.to_ascii_lowercase();
    SENSITIVE_HEADERS.iter().any(|s| *s == name)
}
