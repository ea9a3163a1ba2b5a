//! Install-instruction rendering.

use std::fmt::Write;

use chrono::{DateTime, Utc};

use crate::types::PackageManager;

const PUBLISHED_LINE: &str = "A new package containing your PR commits has been published! Run one of the commands below to update this package in your application:";

/// `name@version`, as passed to a package manager's install command.
pub fn name_and_version(name: &str, version: &str) -> String {
    format!("{name}@{version}")
}

/// GitHub-flavored markdown for the pull-request comment.
///
/// The output starts with `marker` so later runs can find it. GitHub strips
/// text colors from markdown, so the timestamp sits in a `diff` block to
/// render light grey.
pub fn render_comment_markdown(
    package_name: &str,
    name_and_version: &str,
    marker: &str,
    now: DateTime<Utc>,
) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{marker}");
    let _ = writeln!(out, "### {package_name}");
    let _ = writeln!(out);
    let _ = writeln!(out, "{PUBLISHED_LINE}");

    for pm in PackageManager::ALL {
        let _ = writeln!(out);
        let _ = writeln!(out, "#### {}:", pm.label());
        let _ = writeln!(out);
        let _ = writeln!(out, "```shell");
        let _ = writeln!(out, "{}", pm.install_command(name_and_version));
        let _ = writeln!(out, "```");
    }

    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "_Note: if you continue to push commits to this PR, new packages will be deployed and this comment will update itself with the new version to install._"
    );
    let _ = writeln!(out);
    let _ = writeln!(out, "---");
    let _ = writeln!(out);
    let _ = writeln!(out, "```diff");
    let _ = writeln!(out, "# {}", format_timestamp(now));
    let _ = writeln!(out, "```");
    out
}

/// Plain-text variant shown as a workflow annotation outside pull requests.
pub fn render_annotation(package_name: &str, name_and_version: &str) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{package_name}");
    let _ = writeln!(out);
    let _ = write!(out, "{PUBLISHED_LINE}");
    for pm in PackageManager::ALL {
        let _ = write!(out, "\n\n  * {}", pm.install_command(name_and_version));
    }
    out
}

/// e.g. `Fri Oct 16 2026 / 14:03:07 UTC`
pub fn format_timestamp(now: DateTime<Utc>) -> String {
    now.format("%a %b %d %Y / %H:%M:%S UTC").to_string()
}
