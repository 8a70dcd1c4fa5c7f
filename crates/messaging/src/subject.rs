//! Bus subject naming and wildcard matching.

/// Prefix shared by every project subject.
pub const PROJECTS_PREFIX: &str = "projects";

/// Pattern matching traffic of every project.
pub const ALL_PROJECTS: &str = "projects.>";

pub fn for_project(project: &str, subtopic: &str) -> String {
    if subtopic.is_empty() {
        format!("{PROJECTS_PREFIX}.{project}")
    } else {
        format!("{PROJECTS_PREFIX}.{project}.{subtopic}")
    }
}

/// Whether `pattern` is a well-formed subscription pattern.
///
/// Tokens are non-empty; `>` may only appear as the last token.
pub fn is_valid_pattern(pattern: &str) -> bool {
    let tokens: Vec<&str> = pattern.split('.').collect();
    let last = tokens.len() - 1;
    tokens
        .iter()
        .enumerate()
        .all(|(i, t)| !t.is_empty() && (*t != ">" || i == last))
}

/// NATS-style subject match: `*` matches one token, a trailing `>` matches
/// one or more.
pub fn matches(pattern: &str, subject: &str) -> bool {
    let mut pat = pattern.split('.');
    let mut sub = subject.split('.');

    loop {
        match (pat.next(), sub.next()) {
            (Some(">"), Some(_)) => return true,
            (Some("*"), Some(_)) => {}
            (Some(p), Some(s)) if p == s => {}
            (None, None) => return true,
            _ => return false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_and_wildcard_matches() {
        assert!(matches("projects.p1", "projects.p1"));
        assert!(!matches("projects.p1", "projects.p1.a"));
        assert!(matches("projects.*", "projects.p1"));
        assert!(!matches("projects.*", "projects.p1.a"));
        assert!(matches("projects.*.a", "projects.p1.a"));
    }

    #[test]
    fn tail_wildcard_needs_at_least_one_token() {
        assert!(matches(ALL_PROJECTS, "projects.p1"));
        assert!(matches(ALL_PROJECTS, "projects.p1.a.b"));
        assert!(!matches(ALL_PROJECTS, "projects"));
        assert!(!matches(ALL_PROJECTS, "things.p1"));
    }

    #[test]
    fn pattern_validation() {
        assert!(is_valid_pattern("projects.>"));
        assert!(is_valid_pattern("projects.*.x"));
        assert!(!is_valid_pattern("projects.>.x"));
        assert!(!is_valid_pattern("projects..x"));
        assert!(!is_valid_pattern(""));
    }
}
