//! External tool and color config resolution
//!
//! Each logical role is looked up through its configured key (an
//! environment variable by default). Unset or empty keys resolve to nothing
//! rather than an error; the only hard default is `maketx` on `PATH`.

use crate::options::{Backend, EnvBindings, ToolRole};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolPaths {
    pub maketx: PathBuf,
    pub txmake: Option<PathBuf>,
    pub imaketx: Option<PathBuf>,
    pub ocio_config: Option<PathBuf>,
}

impl ToolPaths {
    /// Resolve from the process environment.
    pub fn resolve(bindings: &EnvBindings) -> Self {
        Self::resolve_with(bindings, |key| std::env::var(key).ok())
    }

    /// Resolve through an arbitrary lookup (settings store, tests).
    pub fn resolve_with<F>(bindings: &EnvBindings, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |role: ToolRole| {
            let key = bindings.key(role);
            if key.is_empty() {
                return None;
            }
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .map(PathBuf::from)
        };

        let maketx = get(ToolRole::Maketx).unwrap_or_else(|| PathBuf::from("maketx"));
        let txmake = get(ToolRole::RendermanRoot).map(|root| root.join("bin").join(exe("txmake")));
        let imaketx = get(ToolRole::Imaketx)
            .or_else(|| get(ToolRole::HoudiniRoot).map(|root| root.join("bin").join(exe("imaketx"))));
        let ocio_config = get(ToolRole::OcioConfig);

        let paths = Self {
            maketx,
            txmake,
            imaketx,
            ocio_config,
        };
        debug!(?paths, "Resolved texture tools");
        paths
    }

    pub fn executable_for(&self, backend: Backend) -> Option<&Path> {
        match backend {
            Backend::Arnold => Some(self.maketx.as_path()),
            Backend::RenderMan => self.txmake.as_deref(),
            Backend::Houdini => self.imaketx.as_deref(),
        }
    }

    /// The backend actually used for a run.
    ///
    /// Falls back to Arnold when the requested compiler cannot be located;
    /// the second value is a user-facing note describing the fallback.
    pub fn select_backend(&self, requested: Backend) -> (Backend, Option<String>) {
        if requested == Backend::Arnold {
            return (Backend::Arnold, None);
        }
        match self.executable_for(requested) {
            Some(path) if is_locatable(path) => (requested, None),
            found => {
                let detail = found
                    .map(|p| format!("{} not found", p.display()))
                    .unwrap_or_else(|| "location not configured".to_string());
                warn!(requested = %requested, detail = %detail, "Falling back to maketx");
                (
                    Backend::Arnold,
                    Some(format!(
                        "⚠️ {} unavailable ({}), converting to Arnold .tx instead",
                        requested.tool_name(),
                        detail
                    )),
                )
            }
        }
    }
}

fn is_locatable(path: &Path) -> bool {
    path.is_file() || which::which(path).is_ok()
}

fn exe(name: &str) -> String {
    if cfg!(windows) {
        format!("{}.exe", name)
    } else {
        name.to_string()
    }
}
