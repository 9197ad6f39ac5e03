//! Node paths used inside a dataset hierarchy

pub const MAX_PROJECTIONS_GROUP: &str = "/analysis/max_projections";
pub const MAX_Z: &str = "/analysis/max_projections/maxz";
pub const MAX_X: &str = "/analysis/max_projections/maxx";
pub const MAX_Y: &str = "/analysis/max_projections/maxy";
pub const SLICED_MAX_PROJECTIONS_GROUP: &str = "/analysis/sliced_max_projections";
pub const SLICED_MAX_X: &str = "/analysis/sliced_max_projections/sliced_maxx";
pub const SLICED_MAX_Y: &str = "/analysis/sliced_max_projections/sliced_maxy";
pub const MOVIES_GROUP: &str = "/movies";

/// Raw volume of one resolution level.
pub fn resolution_level(level: usize) -> String {
    format!("/0/{level}")
}

/// Normalise a node path to the `/a/b` form.
pub fn normalize(path: &str) -> String {
    let trimmed = path.trim_matches('/');
    format!("/{trimmed}")
}

/// Every ancestor of `path`, outermost first, excluding the root.
pub fn ancestors(path: &str) -> Vec<String> {
    let normalized = normalize(path);
    let parts: Vec<&str> = normalized.split('/').filter(|p| !p.is_empty()).collect();
    (1..parts.len())
        .map(|n| format!("/{}", parts[..n].join("/")))
        .collect()
}
