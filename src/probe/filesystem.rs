//! File and directory probes

use std::fs;
use std::path::Path;

use convergence::{ProbeState, Resource};

/// A file is `Present` when it exists and, if the resource declares a
/// content digest, that digest matches. A digest mismatch is
/// `Modified` so the runner rewrites stale artifacts when parameters
/// change.
pub fn file_state(resource: &Resource, digest: Option<&str>) -> ProbeState {
    let path = Path::new(&resource.id);
    if !path.is_file() && !path.is_symlink() {
        return ProbeState::Absent;
    }

    match digest {
        None => ProbeState::Present,
        Some(expected) => match fs::read(path) {
            Ok(content) if blake3::hash(&content).to_hex().as_str() == expected => {
                ProbeState::Present
            }
            // Unreadable counts as modified; the action will rewrite it.
            _ => ProbeState::Modified,
        },
    }
}

pub fn directory_state(resource: &Resource) -> ProbeState {
    if Path::new(&resource.id).is_dir() {
        ProbeState::Present
    } else {
        ProbeState::Absent
    }
}

/// Digest helper for declaring file resources pinned to content
pub fn content_digest(content: &str) -> String {
    blake3::hash(content.as_bytes()).to_hex().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use convergence::ResourceKind;

    fn file_resource(path: &Path) -> Resource {
        Resource::new(
            ResourceKind::File { digest: None },
            path.display().to_string(),
        )
    }

    #[test]
    fn missing_file_is_absent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.conf");
        assert_eq!(file_state(&file_resource(&path), None), ProbeState::Absent);
    }

    #[test]
    fn existing_file_without_digest_is_present() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.conf");
        fs::write(&path, "workers = 5\n").unwrap();
        assert_eq!(file_state(&file_resource(&path), None), ProbeState::Present);
    }

    #[test]
    fn digest_mismatch_is_modified() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.conf");
        fs::write(&path, "workers = 5\n").unwrap();

        let expected = content_digest("workers = 7\n");
        assert_eq!(
            file_state(&file_resource(&path), Some(&expected)),
            ProbeState::Modified
        );
    }

    #[test]
    fn digest_match_is_present() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.conf");
        fs::write(&path, "workers = 5\n").unwrap();

        let expected = content_digest("workers = 5\n");
        assert_eq!(
            file_state(&file_resource(&path), Some(&expected)),
            ProbeState::Present
        );
    }

    #[test]
    fn directory_probe_distinguishes_files() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("plain");
        fs::write(&file, "").unwrap();

        let dir_resource = Resource::new(
            ResourceKind::Directory,
            dir.path().display().to_string(),
        );
        let file_as_dir = Resource::new(ResourceKind::Directory, file.display().to_string());

        assert_eq!(directory_state(&dir_resource), ProbeState::Present);
        assert_eq!(directory_state(&file_as_dir), ProbeState::Absent);
    }
}
