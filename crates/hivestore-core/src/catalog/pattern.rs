//! Hive-style name patterns: `*` matches any run of characters, `|`
//! separates alternatives, and matching ignores case.

/// A compiled name pattern.
#[derive(Debug, Clone)]
pub struct NamePattern {
    alternatives: Vec<Vec<char>>,
}

impl NamePattern {
    pub fn new(pattern: &str) -> Self {
        let alternatives = pattern
            .split('|')
            .map(|alt| alt.trim().to_lowercase().chars().collect())
            .collect();
        Self { alternatives }
    }

    pub fn matches(&self, name: &str) -> bool {
        let name: Vec<char> = name.to_lowercase().chars().collect();
        self.alternatives.iter().any(|alt| glob_match(alt, &name))
    }
}

/// Greedy wildcard match with single-star backtracking.
fn glob_match(pattern: &[char], text: &[char]) -> bool {
    let (mut p, mut t) = (0, 0);
    let mut star: Option<(usize, usize)> = None;
    while t < text.len() {
        if p < pattern.len() && pattern[p] == '*' {
            star = Some((p, t));
            p += 1;
        } else if p < pattern.len() && pattern[p] == text[t] {
            p += 1;
            t += 1;
        } else if let Some((sp, st)) = star {
            p = sp + 1;
            t = st + 1;
            star = Some((sp, st + 1));
        } else {
            return false;
        }
    }
    pattern[p..].iter().all(|&c| c == '*')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_and_case() {
        let p = NamePattern::new("Sales");
        assert!(p.matches("sales"));
        assert!(p.matches("SALES"));
        assert!(!p.matches("sales2"));
    }

    #[test]
    fn test_wildcards() {
        let p = NamePattern::new("s*_db");
        assert!(p.matches("s_db"));
        assert!(p.matches("sales_db"));
        assert!(!p.matches("sales_dbx"));
        assert!(NamePattern::new("*").matches(""));
        assert!(NamePattern::new("*a*b*").matches("xxaxxbxx"));
        assert!(!NamePattern::new("*a*b").matches("xxbxxa"));
    }

    #[test]
    fn test_alternatives() {
        let p = NamePattern::new("foo | bar*");
        assert!(p.matches("foo"));
        assert!(p.matches("barn"));
        assert!(!p.matches("baz"));
    }
}
