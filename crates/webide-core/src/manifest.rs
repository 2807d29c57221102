//! Manifest-derived presentation: icon selection, icon URL resolution,
//! display name, and the hosted-app origin helpers used at install time.

use std::path::Path;

use url::Url;

use crate::error::{Error, Result};
use crate::types::{Manifest, ProjectKind};

/// Pick the icon path declared for the largest size.
///
/// Size tokens are compared numerically; tokens that don't parse rank
/// below every numeric size.
pub fn largest_icon(manifest: &Manifest) -> Option<&str> {
    let icons = manifest.icons.as_ref()?;
    icons
        .iter()
        .max_by_key(|(size, _)| size.trim().parse::<u64>().ok())
        .map(|(_, path)| path.as_str())
}

/// Display name declared by the manifest, or `fallback`.
pub fn display_name(manifest: &Manifest, fallback: &str) -> String {
    manifest
        .name
        .clone()
        .unwrap_or_else(|| fallback.to_string())
}

/// Resolve a manifest icon path to an absolute URL.
///
/// Hosted apps resolve against the origin of their manifest URL; packaged
/// apps resolve against the `file://` URL of their folder. Other project
/// kinds have no base, so the path is returned unchanged.
pub fn resolve_icon_url(kind: &ProjectKind, location: &str, icon_path: &str) -> Result<String> {
    match kind {
        ProjectKind::Hosted => {
            let origin = origin_url(location)?;
            Ok(origin.join(icon_path)?.to_string())
        }
        ProjectKind::Packaged { .. } => {
            let folder = Url::from_directory_path(Path::new(location))
                .map_err(|_| Error::manifest(location, "project folder is not an absolute path"))?;
            let relative = icon_path
                .strip_prefix('/')
                .or_else(|| icon_path.strip_prefix('\\'))
                .unwrap_or(icon_path);
            Ok(format!("{}{}", folder, relative))
        }
        _ => Ok(icon_path.to_string()),
    }
}

/// The origin of a URL as a URL with an empty path (`http://host:port/`).
pub fn origin_url(location: &str) -> Result<Url> {
    let url = Url::parse(location)?;
    Ok(url.join("/")?)
}

/// Identifier the runtime uses for a hosted app: the host of its origin.
pub fn hosted_app_id(location: &str) -> Result<String> {
    let url = Url::parse(location)?;
    url.host_str()
        .map(str::to_string)
        .ok_or_else(|| Error::install(format!("hosted manifest URL has no host: {}", location)))
}
