use core::str::FromStr;

use thiserror::Error;

/// The action part of a policy rule: either every method or an explicit set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Any,
    Methods(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid action '{0}'")]
pub struct InvalidAction(pub String);

impl Action {
    /// Case-insensitive match against an HTTP method name. `HEAD` is
    /// permitted wherever `GET` is, since the router answers both.
    pub fn permits(&self, method: &str) -> bool {
        match self {
            Action::Any => true,
            Action::Methods(methods) => methods.iter().any(|m| {
                m.eq_ignore_ascii_case(method) || (m == "GET" && method.eq_ignore_ascii_case("HEAD"))
            }),
        }
    }
}

impl FromStr for Action {
    type Err = InvalidAction;

    /// Accepts `*`, `GET`, `GET|POST` and the regex-flavoured `(GET)|(POST)`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s == "*" {
            return Ok(Action::Any);
        }

        let mut methods = Vec::new();
        for part in s.split('|') {
            let method = part.trim().trim_start_matches('(').trim_end_matches(')').trim();
            if method.is_empty() || !method.chars().all(|c| c.is_ascii_alphabetic()) {
                return Err(InvalidAction(s.to_string()));
            }
            methods.push(method.to_ascii_uppercase());
        }
        Ok(Action::Methods(methods))
    }
}
