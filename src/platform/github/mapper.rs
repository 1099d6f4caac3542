use reqwest::StatusCode;

use crate::platform::types::{CreateRepoOutcome, PagesOutcome};

/// Pull the human-readable message out of a GitHub error body.
///
/// GitHub puts a generic `message` at the top and the specific reason in
/// `errors[].message`; both are joined. Non-JSON bodies are returned as-is.
pub fn error_message(body: &str) -> String {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(body) else {
        return body.trim().to_string();
    };

    let mut parts = Vec::new();
    if let Some(message) = value["message"].as_str() {
        parts.push(message.to_string());
    }
    if let Some(errors) = value["errors"].as_array() {
        for error in errors {
            match error["message"].as_str() {
                Some(message) => parts.push(message.to_string()),
                None => {
                    if let Some(code) = error["code"].as_str() {
                        parts.push(code.to_string());
                    }
                }
            }
        }
    }

    if parts.is_empty() {
        body.trim().to_string()
    } else {
        parts.join(": ")
    }
}

/// Classify the response to a repository creation request.
pub fn classify_create_response(status: StatusCode, body: &str, fallback_url: &str) -> CreateRepoOutcome {
    if status.is_success() {
        let url = serde_json::from_str::<serde_json::Value>(body)
            .ok()
            .and_then(|v| v["html_url"].as_str().map(str::to_string))
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| fallback_url.to_string());
        return CreateRepoOutcome::Created { url };
    }

    let message = error_message(body);
    if message.contains("already exists") || status == StatusCode::UNPROCESSABLE_ENTITY {
        return CreateRepoOutcome::AlreadyExists {
            url: fallback_url.to_string(),
        };
    }

    CreateRepoOutcome::Failed {
        status: status.as_u16(),
        message: if message.is_empty() {
            status.to_string()
        } else {
            message
        },
    }
}

/// Classify the response to a Pages activation request.
pub fn classify_pages_response(status: StatusCode, body: &str) -> PagesOutcome {
    if status.is_success() {
        return PagesOutcome::Activated;
    }

    if body.contains("already enabled")
        || status == StatusCode::CONFLICT
        || status == StatusCode::UNPROCESSABLE_ENTITY
    {
        return PagesOutcome::AlreadyActive;
    }

    let message = error_message(body);
    PagesOutcome::Failed {
        status: status.as_u16(),
        message: if message.is_empty() {
            status.to_string()
        } else {
            message
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const URL: &str = "https://github.com/octocat/reservoirs";

    #[test]
    fn test_created_uses_html_url() {
        let body = r#"{"html_url":"https://github.com/octocat/reservoirs-x"}"#;
        assert_eq!(
            classify_create_response(StatusCode::CREATED, body, URL),
            CreateRepoOutcome::Created {
                url: "https://github.com/octocat/reservoirs-x".to_string()
            }
        );
    }

    #[test]
    fn test_created_without_html_url_falls_back() {
        assert_eq!(
            classify_create_response(StatusCode::CREATED, "{}", URL),
            CreateRepoOutcome::Created { url: URL.to_string() }
        );
    }

    #[test]
    fn test_already_exists_by_message() {
        // Status alone would be a failure; the wording makes it tolerated
        let body = r#"{"message":"name already exists on this account"}"#;
        assert_eq!(
            classify_create_response(StatusCode::BAD_REQUEST, body, URL),
            CreateRepoOutcome::AlreadyExists { url: URL.to_string() }
        );
    }

    #[test]
    fn test_already_exists_by_nested_error_message() {
        let body = r#"{"message":"Repository creation failed.","errors":[{"resource":"Repository","code":"custom","field":"name","message":"name already exists on this account"}]}"#;
        assert_eq!(
            classify_create_response(StatusCode::FORBIDDEN, body, URL),
            CreateRepoOutcome::AlreadyExists { url: URL.to_string() }
        );
    }

    #[test]
    fn test_already_exists_by_status() {
        let body = r#"{"message":"Validation Failed"}"#;
        assert_eq!(
            classify_create_response(StatusCode::UNPROCESSABLE_ENTITY, body, URL),
            CreateRepoOutcome::AlreadyExists { url: URL.to_string() }
        );
    }

    #[test]
    fn test_create_failure_keeps_message() {
        let body = r#"{"message":"Bad credentials","documentation_url":"https://docs.github.com/rest"}"#;
        assert_eq!(
            classify_create_response(StatusCode::UNAUTHORIZED, body, URL),
            CreateRepoOutcome::Failed {
                status: 401,
                message: "Bad credentials".to_string()
            }
        );
    }

    #[test]
    fn test_create_failure_with_plain_body() {
        assert_eq!(
            classify_create_response(StatusCode::BAD_GATEWAY, "upstream down\n", URL),
            CreateRepoOutcome::Failed {
                status: 502,
                message: "upstream down".to_string()
            }
        );
    }

    #[test]
    fn test_pages_activated() {
        assert_eq!(
            classify_pages_response(StatusCode::CREATED, "{}"),
            PagesOutcome::Activated
        );
    }

    #[test]
    fn test_pages_already_enabled_by_message() {
        let body = r#"{"message":"GitHub Pages is already enabled."}"#;
        assert_eq!(
            classify_pages_response(StatusCode::BAD_REQUEST, body),
            PagesOutcome::AlreadyActive
        );
    }

    #[test]
    fn test_pages_already_enabled_by_status() {
        assert_eq!(
            classify_pages_response(StatusCode::CONFLICT, "{}"),
            PagesOutcome::AlreadyActive
        );
        assert_eq!(
            classify_pages_response(StatusCode::UNPROCESSABLE_ENTITY, "{}"),
            PagesOutcome::AlreadyActive
        );
    }

    #[test]
    fn test_pages_failure() {
        let body = r#"{"message":"Not Found"}"#;
        assert_eq!(
            classify_pages_response(StatusCode::NOT_FOUND, body),
            PagesOutcome::Failed {
                status: 404,
                message: "Not Found".to_string()
            }
        );
    }
}
