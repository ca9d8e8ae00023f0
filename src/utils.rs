//! Shared helpers: file-type tables and size formatting.

/// File type detection for the load entry points.
pub mod media {
    use std::path::Path;

    use crate::entities::EntityKind;

    /// Structure file extensions the loading layer understands.
    pub const STRUCTURE_EXTS: &[&str] = &["pdb", "ent", "gro", "cif", "mmcif", "mcif", "pqr"];

    /// Surface/mesh file extensions.
    pub const SURFACE_EXTS: &[&str] = &["obj", "ply"];

    /// Script file extensions.
    pub const SCRIPT_EXTS: &[&str] = &["ngl"];

    /// Trajectory file extensions.
    pub const TRAJECTORY_EXTS: &[&str] = &["xtc", "trr", "dcd", "nctraj", "netcdf"];

    /// Lowercased extension of a path, if any.
    pub fn extension(path: &Path) -> Option<String> {
        path.extension()
            .and_then(|s| s.to_str())
            .map(|s| s.to_lowercase())
    }

    /// Component kind a file would load as, None for unknown extensions.
    pub fn kind_for_path(path: &Path) -> Option<EntityKind> {
        let ext = extension(path)?;
        let ext = ext.as_str();
        if STRUCTURE_EXTS.contains(&ext) {
            Some(EntityKind::Structure)
        } else if SURFACE_EXTS.contains(&ext) {
            Some(EntityKind::Surface)
        } else if SCRIPT_EXTS.contains(&ext) {
            Some(EntityKind::Script)
        } else {
            None
        }
    }

    pub fn is_trajectory(path: &Path) -> bool {
        extension(path)
            .map(|ext| TRAJECTORY_EXTS.contains(&ext.as_str()))
            .unwrap_or(false)
    }
}

/// SI file-size label for directory listings: "512 Bytes", "1.23 kB", ...
pub fn file_size_si(bytes: u64) -> String {
    const UNITS: &[&str] = &["kB", "MB", "GB", "TB", "PB"];
    if bytes < 1000 {
        return format!("{bytes} Bytes");
    }
    // First division lands on "kB"; the loop only climbs further.
    let mut value = bytes as f64 / 1000.0;
    let mut unit = 0;
    while value >= 1000.0 && unit < UNITS.len() - 1 {
        value /= 1000.0;
        unit += 1;
    }
    format!("{:.2} {}", value, UNITS[unit])
}
