#![allow(dead_code)]

pub mod module_tree {
    use modroute::{CachePolicy, DispatchConfig, Dispatcher, ModuleParser, ModuleStore};
    use std::path::{Path, PathBuf};
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::TempDir;

    /// A temporary directory of module files, removed on drop.
    pub struct ModuleTree {
        dir: TempDir,
    }

    impl ModuleTree {
        pub fn new() -> Self {
            Self {
                dir: tempfile::tempdir().unwrap(),
            }
        }

        /// Build a tree from `(relative path, source)` pairs.
        pub fn with_files(files: &[(&str, &str)]) -> Self {
            let tree = Self::new();
            for (name, source) in files {
                tree.write(name, source);
            }
            tree
        }

        pub fn root(&self) -> &Path {
            self.dir.path()
        }

        pub fn path(&self, name: &str) -> PathBuf {
            self.dir.path().join(name)
        }

        /// Write a file, creating parent directories.
        pub fn write(&self, name: &str, source: &str) -> PathBuf {
            let path = self.path(name);
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).unwrap();
            }
            std::fs::write(&path, source).unwrap();
            path
        }

        pub fn remove(&self, name: &str) {
            std::fs::remove_file(self.path(name)).unwrap();
        }

        /// Config rooted at this tree.
        pub fn config(&self, parse_interval_ms: i64) -> DispatchConfig {
            DispatchConfig {
                web_path: self.root().to_path_buf(),
                parse_interval_ms,
                tick_ms: 10,
                ..DispatchConfig::default()
            }
        }

        pub fn dispatcher(&self) -> Dispatcher {
            Dispatcher::new(&self.config(-1)).unwrap()
        }

        pub fn store(&self, policy: CachePolicy, parser: Arc<dyn ModuleParser>) -> ModuleStore {
            ModuleStore::new(
                self.root(),
                &DispatchConfig::default().extensions,
                policy,
                parser,
            )
        }
    }

    /// Poll `check` until it holds or `timeout` passes.
    pub fn wait_for(timeout: Duration, mut check: impl FnMut() -> bool) -> bool {
        let deadline = std::time::Instant::now() + timeout;
        while std::time::Instant::now() < deadline {
            if check() {
                return true;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        check()
    }
}

pub mod sources {
    /// One path function
    pub fn path_fn(name: &str, path: &str) -> String {
        format!(
            "declare %rest:path(\"{}\") function local:{}() {{ () }};\n",
            path, name
        )
    }

    /// One path function producing the given media types
    pub fn producing(name: &str, path: &str, produces: &[&str]) -> String {
        let types: Vec<String> = produces.iter().map(|p| format!("\"{}\"", p)).collect();
        format!(
            "declare %rest:path(\"{}\") %rest:produces({}) function local:{}() {{ () }};\n",
            path,
            types.join(", "),
            name
        )
    }
}
