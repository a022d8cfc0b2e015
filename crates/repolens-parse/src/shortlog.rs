use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;
use repolens_core::Contributor;
use tracing::debug;

use crate::numstat::parse_count;

fn shortlog_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*(\d+)\s+(\S.*?)\s*<([^<>]*)>\s*$").expect("valid shortlog regex")
    })
}

/// Parse `git shortlog -sne` output into contributor stubs.
///
/// Each line is `<count><whitespace>Name <email>`. Only `total_commits`,
/// `name` and `email` are filled in. Lines of any other shape, and entries
/// with an empty email, are skipped. Names are copied byte-for-byte.
///
/// `-e` groups by name and email, so one address can appear under several
/// names. Such lines merge into one contributor: counts are summed and the
/// first name seen is kept, in first-seen order.
///
/// # Examples
///
/// ```
/// use repolens_parse::parse_contributors;
///
/// let contributors = parse_contributors("    42\tJohn Doe <john@example.com>");
/// assert_eq!(contributors.len(), 1);
/// assert_eq!(contributors[0].total_commits, 42);
/// assert_eq!(contributors[0].email, "john@example.com");
/// ```
pub fn parse_contributors(text: &str) -> Vec<Contributor> {
    let mut contributors: Vec<Contributor> = Vec::new();
    let mut by_email: HashMap<String, usize> = HashMap::new();
    let mut merged = 0usize;
    let mut skipped = 0usize;

    for line in text.lines() {
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() {
            continue;
        }

        let parsed = shortlog_re().captures(line).and_then(|caps| {
            let count = parse_count(&caps[1])?;
            let email = caps[3].trim();
            if email.is_empty() {
                return None;
            }
            let mut contributor = Contributor::new(&caps[2], email);
            contributor.total_commits = count;
            Some(contributor)
        });

        match parsed {
            Some(contributor) => match by_email.get(&contributor.email) {
                Some(&i) => {
                    let existing = &mut contributors[i];
                    existing.total_commits =
                        existing.total_commits.saturating_add(contributor.total_commits);
                    merged += 1;
                }
                None => {
                    by_email.insert(contributor.email.clone(), contributors.len());
                    contributors.push(contributor);
                }
            },
            None => skipped += 1,
        }
    }

    if skipped > 0 {
        debug!(skipped, "shortlog lines not recognized");
    }
    if merged > 0 {
        debug!(merged, "shortlog lines merged by email");
    }
    contributors
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_multiple_lines() {
        let text = "   120\tAlice Smith <alice@example.com>\n     7\tBob <bob@corp.io>\n";
        let contributors = parse_contributors(text);
        assert_eq!(contributors.len(), 2);
        assert_eq!(contributors[0].name, "Alice Smith");
        assert_eq!(contributors[0].total_commits, 120);
        assert_eq!(contributors[1].email, "bob@corp.io");
        assert_eq!(contributors[1].insertions, 0);
    }

    #[test]
    fn same_email_under_two_names_merges() {
        let text = "     2\tAda <ada@x.io>\n\
                    \x20    5\tBob <bob@x.io>\n\
                    \x20    1\tAda Lovelace <ada@x.io>\n";
        let contributors = parse_contributors(text);
        assert_eq!(contributors.len(), 2);
        assert_eq!(contributors[0].email, "ada@x.io");
        assert_eq!(contributors[0].name, "Ada");
        assert_eq!(contributors[0].total_commits, 3);
        assert_eq!(contributors[1].total_commits, 5);
    }

    #[test]
    fn preserves_unicode_names_exactly() {
        let name = "Zoë Ñúñez 张伟";
        let contributors = parse_contributors(&format!("3\t{name} <zoe@example.com>"));
        assert_eq!(contributors[0].name.as_bytes(), name.as_bytes());
    }

    #[test]
    fn skips_malformed_lines() {
        let text = "garbage line\n\
                    42 No Email Here\n\
                    x\tBad Count <bad@example.com>\n\
                    5\tEmpty Email <>\n\
                    9\tGood One <good@example.com>\n";
        let contributors = parse_contributors(text);
        assert_eq!(contributors.len(), 1);
        assert_eq!(contributors[0].name, "Good One");
    }

    #[test]
    fn space_separated_count_is_accepted() {
        let contributors = parse_contributors("  8  Carol  <carol@example.com>  ");
        assert_eq!(contributors[0].name, "Carol");
        assert_eq!(contributors[0].total_commits, 8);
    }
}
