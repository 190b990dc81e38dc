//! Path naming scheme for everything under the storage root.
//!
//! ```text
//! <root>/
//! ├── projects/
//! │   └── <projectId>/
//! │       ├── permissions.json
//! │       ├── priorOwner.json
//! │       ├── orders/<orderId>.json
//! │       └── data/                       # project repository
//! │           ├── project.json
//! │           └── blocks/<blockId>/block.json
//! └── sequences/<md5>
//! ```
//!
//! Nothing here touches the file system.

use std::env;
use std::path::{Path, PathBuf};

use crate::ids::{BlockId, OrderId, ProjectId, SequenceHash};

pub const PROJECTS_DIR: &str = "projects";
pub const SEQUENCES_DIR: &str = "sequences";
pub const PROJECT_DATA_DIR: &str = "data";
pub const PROJECT_MANIFEST: &str = "project.json";
pub const BLOCKS_DIR: &str = "blocks";
pub const BLOCK_MANIFEST: &str = "block.json";
pub const ORDERS_DIR: &str = "orders";
pub const PERMISSIONS_FILE: &str = "permissions.json";
pub const PRIOR_OWNER_FILE: &str = "priorOwner.json";

/// Return the user's home directory path.
///
/// Uses HOME on Unix-like systems and USERPROFILE on Windows.
pub fn get_home_dir() -> Result<String, String> {
    if let Ok(home) = env::var("HOME") {
        if !home.is_empty() {
            return Ok(home);
        }
    }

    if let Ok(profile) = env::var("USERPROFILE") {
        if !profile.is_empty() {
            return Ok(profile);
        }
    }

    Err("Home directory not set".to_string())
}

/// Resolves entity identifiers to paths under a storage root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePaths {
    root: PathBuf,
}

impl FilePaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn projects_root(&self) -> PathBuf {
        self.root.join(PROJECTS_DIR)
    }

    pub fn project_path(&self, project_id: &ProjectId) -> PathBuf {
        self.projects_root().join(project_id.as_str())
    }

    /// Root of the project's repository.
    pub fn project_data_path(&self, project_id: &ProjectId) -> PathBuf {
        self.project_path(project_id).join(PROJECT_DATA_DIR)
    }

    pub fn project_manifest_path(&self, project_id: &ProjectId) -> PathBuf {
        self.project_data_path(project_id).join(PROJECT_MANIFEST)
    }

    pub fn project_permissions_path(&self, project_id: &ProjectId) -> PathBuf {
        self.project_path(project_id).join(PERMISSIONS_FILE)
    }

    pub fn project_prior_owner_path(&self, project_id: &ProjectId) -> PathBuf {
        self.project_path(project_id).join(PRIOR_OWNER_FILE)
    }

    pub fn order_directory_path(&self, project_id: &ProjectId) -> PathBuf {
        self.project_path(project_id).join(ORDERS_DIR)
    }

    pub fn order_manifest_path(&self, order_id: &OrderId, project_id: &ProjectId) -> PathBuf {
        self.order_directory_path(project_id)
            .join(format!("{}.json", order_id.as_str()))
    }

    pub fn block_directory_path(&self, project_id: &ProjectId) -> PathBuf {
        self.project_data_path(project_id).join(BLOCKS_DIR)
    }

    pub fn block_path(&self, block_id: &BlockId, project_id: &ProjectId) -> PathBuf {
        self.block_directory_path(project_id).join(block_id.as_str())
    }

    pub fn block_manifest_path(&self, block_id: &BlockId, project_id: &ProjectId) -> PathBuf {
        self.block_path(block_id, project_id).join(BLOCK_MANIFEST)
    }

    pub fn sequences_root(&self) -> PathBuf {
        self.root.join(SEQUENCES_DIR)
    }

    pub fn sequence_path(&self, hash: &SequenceHash) -> PathBuf {
        self.sequences_root().join(hash.as_str())
    }
}

/// Manifest path of a project relative to its repository root.
pub fn project_manifest_relative() -> String {
    PROJECT_MANIFEST.to_string()
}

/// Manifest path of a block relative to its project's repository root.
///
/// Always `/`-separated, whatever the host platform.
pub fn block_manifest_relative(block_id: &BlockId) -> String {
    format!("{BLOCKS_DIR}/{}/{BLOCK_MANIFEST}", block_id.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Mutex;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn with_env<F: FnOnce()>(home: Option<&str>, userprofile: Option<&str>, f: F) {
        let _guard = ENV_LOCK.lock().unwrap();
        let prev_home = env::var("HOME").ok();
        let prev_userprofile = env::var("USERPROFILE").ok();

        match home {
            Some(value) => env::set_var("HOME", value),
            None => env::remove_var("HOME"),
        }
        match userprofile {
            Some(value) => env::set_var("USERPROFILE", value),
            None => env::remove_var("USERPROFILE"),
        }

        f();

        match prev_home {
            Some(value) => env::set_var("HOME", value),
            None => env::remove_var("HOME"),
        }
        match prev_userprofile {
            Some(value) => env::set_var("USERPROFILE", value),
            None => env::remove_var("USERPROFILE"),
        }
    }

    fn pid(s: &str) -> ProjectId {
        ProjectId::parse(s).unwrap()
    }

    fn bid(s: &str) -> BlockId {
        BlockId::parse(s).unwrap()
    }

    #[test]
    fn get_home_dir_prefers_home() {
        with_env(Some("/tmp/home"), Some("/tmp/profile"), || {
            let home = get_home_dir().expect("home dir");
            assert_eq!(home, "/tmp/home");
        });
    }

    #[test]
    fn get_home_dir_falls_back_to_userprofile() {
        with_env(None, Some("/tmp/profile"), || {
            let home = get_home_dir().expect("home dir");
            assert_eq!(home, "/tmp/profile");
        });
    }

    #[test]
    fn resolution_is_idempotent() {
        let paths = FilePaths::new("/storage");
        let p = pid("p1");
        let b = bid("b1");

        assert_eq!(
            paths.block_manifest_path(&b, &p),
            paths.block_manifest_path(&b, &p)
        );
        assert_eq!(
            paths.block_manifest_path(&b, &p),
            PathBuf::from("/storage/projects/p1/data/blocks/b1/block.json")
        );
        assert_eq!(
            paths.project_manifest_path(&p),
            PathBuf::from("/storage/projects/p1/data/project.json")
        );
    }

    #[test]
    fn distinct_keys_never_collide() {
        let paths = FilePaths::new("/storage");
        let projects = ["p1", "p2", "p1.b1", "blocks"];
        let entities = ["b1", "b2", "data", "p1"];

        let mut seen = HashSet::new();
        for p in projects {
            let p = pid(p);
            assert!(seen.insert(paths.project_manifest_path(&p)));
            assert!(seen.insert(paths.project_permissions_path(&p)));
            assert!(seen.insert(paths.project_prior_owner_path(&p)));
            for e in entities {
                assert!(seen.insert(paths.block_manifest_path(&bid(e), &p)));
                let order = OrderId::parse(e).unwrap();
                assert!(seen.insert(paths.order_manifest_path(&order, &p)));
            }
        }
    }

    #[test]
    fn relative_manifest_paths_sit_inside_the_repository() {
        let paths = FilePaths::new("/storage");
        let p = pid("p1");
        let b = bid("b1");

        let data = paths.project_data_path(&p);
        assert_eq!(
            data.join(block_manifest_relative(&b)),
            paths.block_manifest_path(&b, &p)
        );
        assert_eq!(
            data.join(project_manifest_relative()),
            paths.project_manifest_path(&p)
        );
    }

    #[test]
    fn sequences_live_outside_projects() {
        let paths = FilePaths::new("/storage");
        let hash = SequenceHash::of("ACGT");
        assert_eq!(
            paths.sequence_path(&hash),
            PathBuf::from("/storage/sequences/f1f8f4bf413b16ad135722aa4591043e")
        );
    }
}
