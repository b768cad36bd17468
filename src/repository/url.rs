// src/repository/url.rs

//! Mirror URL template expansion

/// Placeholder replaced by the machine architecture
pub const ARCH_VAR: &str = "$arch";
/// Placeholder replaced by the repository name
pub const REPO_VAR: &str = "$repo";

/// Expand a mirror template into the download URL for `repo`
///
/// `$arch` is substituted first, then `$repo`; each is a single
/// non-recursive pass. The result is `<expanded>/<repo><suffix>`.
///
/// ```
/// use filesdb::repository::prepare_url;
///
/// let url = prepare_url("http://mirror/$repo/os/$arch", "core", "x86_64", ".files");
/// assert_eq!(url, "http://mirror/core/os/x86_64/core.files");
/// ```
pub fn prepare_url(template: &str, repo: &str, arch: &str, suffix: &str) -> String {
    let expanded = template.replace(ARCH_VAR, arch).replace(REPO_VAR, repo);
    format!("{expanded}/{repo}{suffix}")
}
