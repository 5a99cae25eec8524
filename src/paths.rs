use std::path::{Component, Path, PathBuf};

/// Directory that marks the top of a repository; upward searches stop here.
const VCS_DIR: &str = ".git";

/// Directory name packages are installed under.
const NODE_MODULES: &str = "node_modules";

/// Expand a leading `~` to the current user's home directory.
///
/// Only the bare `~` and `~/...` forms are expanded; `~user` and paths without
/// a leading tilde are returned unchanged. If the home directory cannot be
/// determined the path is returned as given.
pub fn expand_home(path: &Path) -> PathBuf {
    let mut components = path.components();
    match components.next() {
        Some(Component::Normal(first)) if first == "~" => match dirs::home_dir() {
            Some(home) => home.join(components.as_path()),
            None => path.to_path_buf(),
        },
        _ => path.to_path_buf(),
    }
}

/// Expand `~` and make `raw` absolute against `cwd`.
pub fn resolve_destination(raw: &Path, cwd: &Path) -> PathBuf {
    let expanded = expand_home(raw);
    if expanded.is_absolute() {
        expanded
    } else {
        cwd.join(expanded)
    }
}

/// Directory inside `destination` that receives the package named `package_name`.
///
/// `node_modules` is appended unless the destination already points at one, then
/// each `/`-separated piece of the name is appended, so scoped packages land in
/// `node_modules/@scope/pkg`.
pub fn install_dir(destination: &Path, package_name: &str) -> PathBuf {
    let mut dir = if destination.file_name().is_some_and(|n| n == NODE_MODULES) {
        destination.to_path_buf()
    } else {
        destination.join(NODE_MODULES)
    };
    for piece in package_name.split('/').filter(|p| !p.is_empty()) {
        dir.push(piece);
    }
    dir
}

/// True if joining `rel` onto a directory can only name something inside it:
/// no root, drive prefix or `..` component.
pub fn is_contained(rel: &Path) -> bool {
    rel.components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

/// Find `name` in `start` or the nearest ancestor that has it.
///
/// The walk stops without a match at the first directory containing `.git`
/// (after checking that directory itself) and at the filesystem root.
pub fn find_closest_file(start: &Path, name: &str) -> Option<PathBuf> {
    let mut current = Some(start);

    while let Some(dir) = current {
        let candidate = dir.join(name);
        if candidate.exists() {
            return Some(candidate);
        }
        if dir.join(VCS_DIR).exists() {
            return None;
        }
        current = dir.parent();
    }

    None
}
