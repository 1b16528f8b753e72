use super::manifest_parser::{split_comment, ManifestParser};
use crate::remediation::domain::{PackageName, PackageVersion};

/// How a pin edit was applied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinEdit {
    /// This many existing lines were rewritten
    Replaced(usize),
    /// The package had no line of its own, so a pin was appended
    Appended,
}

/// Rewrites a single package's pin inside manifest text.
pub struct ManifestEditor;

impl ManifestEditor {
    /// Sets `name` to `==version` everywhere it is declared.
    ///
    /// Extras, environment markers, trailing comments and the original
    /// spelling of the name are preserved. `--hash` continuation lines of
    /// an edited requirement are dropped because they belong to the old
    /// release. A package with no line (a transitive dependency) gets a new
    /// pin appended.
    pub fn apply_pin(
        content: &str,
        name: &PackageName,
        version: &PackageVersion,
    ) -> (String, PinEdit) {
        let mut output: Vec<String> = Vec::new();
        let mut replaced = 0;
        let mut dropping_continuation = false;

        for line in content.lines() {
            if dropping_continuation {
                dropping_continuation = line.trim_end().ends_with('\\');
                continue;
            }

            match rewrite_line(line, name, version) {
                Some((rewritten, had_continuation)) => {
                    output.push(rewritten);
                    replaced += 1;
                    dropping_continuation = had_continuation;
                }
                None => output.push(line.to_string()),
            }
        }

        let edit = if replaced > 0 {
            PinEdit::Replaced(replaced)
        } else {
            output.push(format!("{}=={}", name, version));
            PinEdit::Appended
        };

        let mut text = output.join("\n");
        if content.ends_with('\n') || edit == PinEdit::Appended {
            text.push('\n');
        }
        (text, edit)
    }
}

/// Returns the rewritten line and whether the original continued onto
/// following lines.
fn rewrite_line(
    line: &str,
    name: &PackageName,
    version: &PackageVersion,
) -> Option<(String, bool)> {
    let (body, comment) = split_comment(line);
    let trimmed = body.trim();
    if trimmed.is_empty() || trimmed.starts_with('-') {
        return None;
    }

    let (declaration, continues) = match trimmed.strip_suffix('\\') {
        Some(rest) => (rest.trim_end(), true),
        None => (trimmed, false),
    };

    let parsed = ManifestParser::parse_requirement(declaration).ok()?;
    if &parsed.name != name {
        return None;
    }

    let requirement_part = declaration
        .split_once(';')
        .map_or(declaration, |(req, _)| req);
    let written_name = requirement_part
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.'))
        .map_or(requirement_part, |end| &requirement_part[..end])
        .trim();

    let mut rewritten = written_name.to_string();
    if !parsed.extras.is_empty() {
        rewritten.push_str(&format!("[{}]", parsed.extras.join(",")));
    }
    rewritten.push_str(&format!("=={}", version));
    if let Some(marker) = parsed.marker.as_deref() {
        rewritten.push_str(&format!(" ; {}", marker));
    }
    rewritten.push_str(comment);
    Some((rewritten, continues))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(n: &str) -> PackageName {
        PackageName::new(n).unwrap()
    }

    fn version(v: &str) -> PackageVersion {
        PackageVersion::parse(v).unwrap()
    }

    #[test]
    fn test_replaces_pin_and_keeps_other_lines() {
        let content = "# deps\nrequests==2.25.0\nflask==2.0.0\n";
        let (text, edit) = ManifestEditor::apply_pin(content, &name("requests"), &version("2.31.0"));
        assert_eq!(text, "# deps\nrequests==2.31.0\nflask==2.0.0\n");
        assert_eq!(edit, PinEdit::Replaced(1));
    }

    #[test]
    fn test_preserves_extras_marker_comment_and_spelling() {
        let content = "Requests[socks]==2.25.0 ; python_version >= \"3.8\"  # pinned for CI\n";
        let (text, _) = ManifestEditor::apply_pin(content, &name("requests"), &version("2.31.0"));
        assert_eq!(
            text,
            "Requests[socks]==2.31.0 ; python_version >= \"3.8\"  # pinned for CI\n"
        );
    }

    #[test]
    fn test_constraint_lines_become_pins() {
        let content = "urllib3>=1.21,<2\n";
        let (text, _) = ManifestEditor::apply_pin(content, &name("urllib3"), &version("1.26.18"));
        assert_eq!(text, "urllib3==1.26.18\n");
    }

    #[test]
    fn test_matches_canonical_names() {
        let content = "Zope.Interface==5.0\n";
        let (text, edit) =
            ManifestEditor::apply_pin(content, &name("zope-interface"), &version("6.0"));
        assert_eq!(text, "Zope.Interface==6.0\n");
        assert_eq!(edit, PinEdit::Replaced(1));
    }

    #[test]
    fn test_transitive_package_is_appended() {
        let content = "requests==2.31.0";
        let (text, edit) = ManifestEditor::apply_pin(content, &name("urllib3"), &version("2.0.7"));
        assert_eq!(text, "requests==2.31.0\nurllib3==2.0.7\n");
        assert_eq!(edit, PinEdit::Appended);
    }

    #[test]
    fn test_hash_continuations_are_dropped() {
        let content = "\
certifi==2023.5.7 \\
    --hash=sha256:aaaa \\
    --hash=sha256:bbbb
idna==3.4
";
        let (text, _) = ManifestEditor::apply_pin(content, &name("certifi"), &version("2023.7.22"));
        assert_eq!(text, "certifi==2023.7.22\nidna==3.4\n");
    }

    #[test]
    fn test_similar_names_untouched() {
        let content = "requests-oauthlib==1.3.0\nrequests==2.25.0\n";
        let (text, edit) = ManifestEditor::apply_pin(content, &name("requests"), &version("2.31.0"));
        assert_eq!(text, "requests-oauthlib==1.3.0\nrequests==2.31.0\n");
        assert_eq!(edit, PinEdit::Replaced(1));
    }
}
