//! Site configuration and its startup check.

use crate::error::{HandlerError, Result};
use crate::handler::HandlerRegistry;
use serde::{Deserialize, Serialize};

/// One selectable handler: a dotted path and a human label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandlerChoice {
    pub path: String,
    #[serde(default)]
    pub label: String,
}

impl HandlerChoice {
    pub fn new(path: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            label: label.into(),
        }
    }
}

/// Settings read at startup.
///
/// # JSON shape
///
/// ```json
/// {
///   "allowed_handlers": [
///     { "path": "navtree.handlers.RedirectHandler", "label": "Redirect" }
///   ]
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Handlers an editor may assign to a node.
    #[serde(default)]
    pub allowed_handlers: Vec<HandlerChoice>,
}

impl Settings {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn is_allowed(&self, handler: &str) -> bool {
        self.allowed_handlers.iter().any(|c| c.path == handler)
    }
}

/// A configuration problem found by [`check`]. Reported, never fatal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckMessage {
    pub id: &'static str,
    pub msg: String,
}

const SETTING: &str = "allowed handlers";

/// Every allowed handler must resolve to a handler in `registry`.
pub fn check(settings: &Settings, registry: &HandlerRegistry) -> Vec<CheckMessage> {
    let mut errors = Vec::new();
    for choice in &settings.allowed_handlers {
        let message = match registry.resolve_handler(&choice.path) {
            Ok(_) => continue,
            Err(HandlerError::NotAHandler(_)) => CheckMessage {
                id: "navtree.E002",
                msg: format!(
                    "Expected '{}' from {} to be a handler",
                    choice.path, SETTING
                ),
            },
            Err(HandlerError::Malformed(_) | HandlerError::Import(_)) => CheckMessage {
                id: "navtree.E001",
                msg: format!("Error importing '{}' from {}", choice.path, SETTING),
            },
        };
        tracing::warn!(id = message.id, "{}", message.msg);
        errors.push(message);
    }
    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::redirect::RedirectHandler;

    fn settings(paths: &[&str]) -> Settings {
        Settings {
            allowed_handlers: paths.iter().map(|p| HandlerChoice::new(*p, "label")).collect(),
        }
    }

    #[test]
    fn test_no_choices() {
        assert!(check(&Settings::default(), &HandlerRegistry::builtin()).is_empty());
    }

    #[test]
    fn test_good_choices() {
        let errors = check(&settings(&[RedirectHandler::PATH]), &HandlerRegistry::builtin());
        assert!(errors.is_empty());
    }

    #[test]
    fn test_wrong_choice_kind() {
        let errors = check(&settings(&["navtree.handlers"]), &HandlerRegistry::builtin());
        assert_eq!(errors.len(), 1);
        assert_eq!(
            errors[0].msg,
            "Expected 'navtree.handlers' from allowed handlers to be a handler"
        );
    }

    #[test]
    fn test_bad_path() {
        let errors = check(&settings(&["broken"]), &HandlerRegistry::builtin());
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].msg, "Error importing 'broken' from allowed handlers");
        assert_eq!(errors[0].id, "navtree.E001");
    }

    #[test]
    fn test_unknown_path() {
        let errors = check(
            &settings(&["site.handlers.Missing", RedirectHandler::PATH]),
            &HandlerRegistry::builtin(),
        );
        assert_eq!(errors.len(), 1);
        assert!(errors[0].msg.contains("site.handlers.Missing"));
    }

    #[test]
    fn test_settings_from_json() {
        let json = r#"{"allowed_handlers":[{"path":"a.b","label":"AB"},{"path":"c.d"}]}"#;
        let settings = Settings::from_json(json).unwrap();
        assert_eq!(settings.allowed_handlers.len(), 2);
        assert_eq!(settings.allowed_handlers[1].label, "");
        assert!(settings.is_allowed("a.b"));
        assert!(!settings.is_allowed("x.y"));
    }

    #[test]
    fn test_settings_from_empty_object() {
        assert_eq!(Settings::from_json("{}").unwrap(), Settings::default());
    }
}
