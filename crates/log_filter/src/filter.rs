//! Pattern-based redaction: a list of regex rules, each naming which
//! capture groups of a match get replaced with `***`.

use regex::Regex;

use crate::error::LogFilterError;

struct Rule {
    regex: Regex,
    groups: Vec<usize>,
}

/// A list of redaction rules applied to a line of text in the order they
/// were added.
///
/// Each rule's regex is matched once per `filter()` call; if it matches,
/// the byte spans of the named capture groups are replaced with `***`,
/// leaving everything else in the line untouched. A rule that doesn't
/// match leaves the line as-is.
#[derive(Default)]
pub struct LogFilter {
    rules: Vec<Rule>,
}

impl LogFilter {
    /// Builds a filter with no rules; `filter()` is the identity function
    /// until rules are added.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a redaction rule: `pattern` is matched against each line, and
    /// the 1-based capture groups named in `groups` are replaced with
    /// `***` wherever the pattern matches.
    pub fn add_pattern(
        &mut self,
        pattern: &str,
        groups: impl Into<Vec<usize>>,
    ) -> Result<(), LogFilterError> {
        let regex = Regex::new(pattern).map_err(|e| LogFilterError::InvalidPattern {
            pattern: pattern.to_owned(),
            reason: e.to_string(),
        })?;
        self.rules.push(Rule {
            regex,
            groups: groups.into(),
        });
        Ok(())
    }

    /// Tries each rule against `line`, in the order they were added, and
    /// applies only the first one that matches — a line is redacted by at
    /// most one rule. Safe to call repeatedly on already redacted output: a
    /// `***` placeholder still satisfies the same capture groups, so
    /// re-filtering is a no-op.
    #[must_use]
    pub fn filter(&self, line: &str) -> String {
        for rule in &self.rules {
            if rule.regex.is_match(line) {
                return apply_rule(rule, line);
            }
        }
        line.to_owned()
    }
}

fn apply_rule(rule: &Rule, input: &str) -> String {
    let Some(captures) = rule.regex.captures(input) else {
        return input.to_owned();
    };

    let mut spans: Vec<(usize, usize)> = rule
        .groups
        .iter()
        .filter_map(|&g| captures.get(g).map(|m| (m.start(), m.end())))
        .collect();
    spans.sort_unstable_by_key(|s| s.0);

    let mut out = String::with_capacity(input.len());
    let mut last = 0;
    for (start, end) in spans {
        if start < last {
            // Overlapping groups; skip rather than produce a garbled line.
            continue;
        }
        out.push_str(&input[last..start]);
        out.push_str("***");
        last = end;
    }
    out.push_str(&input[last..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statement_is_unchanged_when_no_pattern_matches() {
        let filter = LogFilter::new();
        let stmt = "CREATE USER router_xxxx WITH mysql_native_password AS 'password123'";
        assert_eq!(filter.filter(stmt), stmt);
    }

    #[test]
    fn password_is_hidden_when_pattern_matches() {
        let mut filter = LogFilter::new();
        filter
            .add_pattern(
                r"CREATE USER (\S+) WITH mysql_native_password AS (\S*)",
                [2],
            )
            .unwrap();

        let stmt = "CREATE USER router_xxxx WITH mysql_native_password AS 'password123'";
        assert_eq!(
            filter.filter(stmt),
            "CREATE USER router_xxxx WITH mysql_native_password AS ***"
        );
    }

    #[test]
    fn empty_password_is_still_hidden() {
        let mut filter = LogFilter::new();
        filter
            .add_pattern(
                r"CREATE USER (\S+) WITH mysql_native_password AS (\S*)",
                [2],
            )
            .unwrap();

        let stmt = "CREATE USER router_xxxx WITH mysql_native_password AS ''";
        assert_eq!(
            filter.filter(stmt),
            "CREATE USER router_xxxx WITH mysql_native_password AS ***"
        );
    }

    #[test]
    fn more_than_one_group_is_hidden() {
        let mut filter = LogFilter::new();
        filter
            .add_pattern(
                r"ALTER USER (\S+) IDENTIFIED WITH (\S*) BY (\S*) PASSWORD EXPIRE INTERVAL 180 DAY",
                [2, 3],
            )
            .unwrap();

        let stmt = "ALTER USER 'jeffrey'@'localhost' IDENTIFIED WITH sha256_password BY 'new_password' PASSWORD EXPIRE INTERVAL 180 DAY";
        let expected = "ALTER USER 'jeffrey'@'localhost' IDENTIFIED WITH *** BY *** PASSWORD EXPIRE INTERVAL 180 DAY";
        assert_eq!(filter.filter(stmt), expected);
    }

    #[test]
    fn filtering_is_idempotent() {
        let mut filter = LogFilter::new();
        filter
            .add_pattern(
                r"CREATE USER (\S+) WITH mysql_native_password AS (\S*)",
                [2],
            )
            .unwrap();

        let stmt = "CREATE USER router_xxxx WITH mysql_native_password AS 'password123'";
        let once = filter.filter(stmt);
        let twice = filter.filter(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn invalid_pattern_is_rejected() {
        let mut filter = LogFilter::new();
        assert!(filter.add_pattern("(unterminated", [1]).is_err());
    }
}
