//! Include/exclude resolution
//!
//! Turns the symbolic add-on and folder names of a request into the canonical
//! slug and folder-id lists the provider understands.
//!
//! Add-on tokens match by display name (case-insensitive) and by slug as a
//! shell-style wildcard pattern (case-sensitive, via `globset`). A token may
//! match several add-ons; a token matching the same add-on by both rules yields
//! the slug twice. Duplicates are deliberately kept: the provider is idempotent
//! about repeated slugs and de-duplicating here would hide name collisions in
//! the untrusted add-on list.
//!
//! Unmatched tokens are passed through unchanged with a warning, so tokens that
//! are already canonical keep working even when the add-on list is stale.

use std::collections::BTreeSet;

use globset::Glob;
use tracing::warn;

use crate::providers::Addon;
use crate::request::ItemSelection;

/// Maps a human-friendly folder alias to its canonical folder id
///
/// Lookups are case-insensitive; callers lowercase the alias first.
pub fn default_folder(alias: &str) -> Option<&'static str> {
    match alias {
        "ssl" => Some("ssl"),
        "share" => Some("share"),
        "media" => Some("media"),
        "addons" | "local add-ons" => Some("addons/local"),
        "config" | "home assistant configuration" => Some("homeassistant"),
        _ => None,
    }
}

/// Returns the distinct canonical folder ids of the default folder table
pub fn default_folder_ids() -> BTreeSet<&'static str> {
    ["ssl", "share", "media", "addons/local", "homeassistant"]
        .into_iter()
        .collect()
}

/// Resolves add-on names and wildcard patterns to slugs
///
/// Unmatched tokens are emitted unchanged, on the assumption they are already
/// canonical slugs.
pub fn resolve_addons(tokens: &[String], installed: &[Addon]) -> Vec<String> {
    let mut slugs = Vec::new();

    for token in tokens {
        let matcher = Glob::new(token).ok().map(|g| g.compile_matcher());
        let mut matched = false;

        for addon in installed {
            if token.to_lowercase() == addon.name.to_lowercase() {
                slugs.push(addon.slug.clone());
                matched = true;
            }
            if matcher.as_ref().is_some_and(|m| m.is_match(&addon.slug)) {
                slugs.push(addon.slug.clone());
                matched = true;
            }
        }

        if !matched {
            warn!(addon = %token, "Addon does not exist");
            slugs.push(token.clone());
        }
    }

    slugs
}

/// Resolves folder aliases to canonical folder ids
///
/// Unmapped tokens pass through lowercased, assumed already canonical.
pub fn resolve_folders(tokens: &[String]) -> Vec<String> {
    tokens
        .iter()
        .map(|token| {
            let folder = token.to_lowercase();
            match default_folder(&folder) {
                Some(id) => id.to_string(),
                None => folder,
            }
        })
        .collect()
}

/// Resolves both sides of an include or exclude block
pub fn resolve_inclusion(selection: &ItemSelection, installed: &[Addon]) -> (Vec<String>, Vec<String>) {
    (
        resolve_addons(&selection.addons, installed),
        resolve_folders(&selection.folders),
    )
}

/// Resolves a request's include/exclude blocks into concrete partial-backup sets
///
/// With no include, the candidate sets start from everything installed plus all
/// default folders; the provider's partial primitive only understands positive
/// inclusion lists, so "full minus excluded" has to be synthesized here. The
/// exclude sets are then subtracted from the candidates.
pub fn resolve_selection(
    include: Option<&ItemSelection>,
    exclude: Option<&ItemSelection>,
    installed: &[Addon],
) -> (Vec<String>, Vec<String>) {
    let mut addons: Vec<String> = installed.iter().map(|a| a.slug.clone()).collect();
    let mut folders: Vec<String> = default_folder_ids()
        .into_iter()
        .map(str::to_string)
        .collect();

    if let Some(include) = include {
        (addons, folders) = resolve_inclusion(include, installed);
    }

    if let Some(exclude) = exclude {
        let (excluded_addons, excluded_folders) = resolve_inclusion(exclude, installed);
        addons.retain(|slug| !excluded_addons.contains(slug));
        folders.retain(|folder| !excluded_folders.contains(folder));
    }

    (addons, folders)
}
