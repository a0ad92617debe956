/// Replace `${ENV_VAR}` placeholders in config string values.
///
/// Unresolvable variables are left as-is.
pub fn substitute_env(input: &str) -> String {
    substitute_with(input, |name| std::env::var(name).ok())
}

/// Replace `${ENV_VAR}` placeholders using a custom lookup function.
///
/// Separate from [`substitute_env`] so tests don't have to mutate the
/// process environment.
fn substitute_with(input: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find('}') {
            Some(end) if end > 0 => {
                let name = &after[..end];
                match lookup(name) {
                    Some(value) => out.push_str(&value),
                    None => {
                        // Leave unresolved placeholder as-is.
                        out.push_str("${");
                        out.push_str(name);
                        out.push('}');
                    },
                }
                rest = &after[end + 1..];
            },
            // Malformed (no closing brace or empty name): emit literally.
            _ => {
                out.push_str("${");
                rest = after;
            },
        }
    }

    out.push_str(rest);
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn lookup(name: &str) -> Option<String> {
        match name {
            "VOLLEY_HOME" => Some("/srv/volley".to_string()),
            "PORT" => Some("3180".to_string()),
            _ => None,
        }
    }

    #[test]
    fn substitutes_known_var() {
        assert_eq!(
            substitute_with("dir = ${VOLLEY_HOME}/media", lookup),
            "dir = /srv/volley/media"
        );
    }

    #[test]
    fn substitutes_multiple_vars() {
        assert_eq!(
            substitute_with("${VOLLEY_HOME}:${PORT}", lookup),
            "/srv/volley:3180"
        );
    }

    #[test]
    fn leaves_unknown_var() {
        assert_eq!(substitute_with("x = ${NOPE}", lookup), "x = ${NOPE}");
    }

    #[test]
    fn leaves_unclosed_placeholder() {
        assert_eq!(substitute_with("x = ${OOPS", lookup), "x = ${OOPS");
    }

    #[test]
    fn passes_through_plain_text() {
        assert_eq!(substitute_with("no placeholders", lookup), "no placeholders");
    }
}
