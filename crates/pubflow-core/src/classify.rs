//! Kind recognition from labels, issue titles and commit messages, plus the
//! issue-number ↔ branch-name mapping.

use regex::Regex;

use crate::domain::Kind;

/// Commit-message prefix that marks a registry publish commit.
pub const PUBLISH_MARKER: &str = ":beers: publish";

/// Prefix of every submission branch.
pub const BRANCH_PREFIX: &str = "publish/issue";

/// First label whose name is exactly a kind label.
pub fn by_labels<S: AsRef<str>>(labels: &[S]) -> Option<Kind> {
    labels.iter().find_map(|l| Kind::from_label(l.as_ref()))
}

/// Kind named by a `"<Kind>:"` title prefix.
pub fn by_title(title: &str) -> Option<Kind> {
    Kind::ALL
        .into_iter()
        .find(|k| title.starts_with(&format!("{}:", k.label())))
}

/// Kind named by a publish commit message (`":beers: publish plugin …"`).
pub fn by_commit_message(message: &str) -> Option<Kind> {
    let rest = message.strip_prefix(PUBLISH_MARKER)?;
    Kind::ALL.into_iter().find(|k| {
        rest.strip_prefix(' ')
            .and_then(|r| r.strip_prefix(k.keyword()))
            .is_some_and(|tail| tail.is_empty() || tail.starts_with(char::is_whitespace))
    })
}

/// Commit message for publishing `name` of `kind`.
pub fn commit_message(kind: Kind, name: &str) -> String {
    format!("{PUBLISH_MARKER} {} {name}", kind.keyword())
}

/// Branch holding the submission for issue `number`.
pub fn branch_name(number: u64) -> String {
    format!("{BRANCH_PREFIX}{number}")
}

/// Inverse of [`branch_name`]; accepts full refs such as `refs/heads/publish/issue7`.
pub fn issue_number_from_ref(git_ref: &str) -> Option<u64> {
    let re = Regex::new(&format!(r"{}(\d+)", regex::escape(BRANCH_PREFIX))).ok()?;
    re.captures(git_ref)?.get(1)?.as_str().parse().ok()
}
