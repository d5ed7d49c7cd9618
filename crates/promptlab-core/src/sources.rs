use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathRoot {
    Home,
    XdgData,
    EnvVar {
        var: &'static str,
        fallback_relative: &'static str,
    },
}

impl PathRoot {
    pub fn resolve(&self, home_dir: &str) -> PathBuf {
        match self {
            PathRoot::Home => PathBuf::from(home_dir),
            PathRoot::XdgData => std::env::var("XDG_DATA_HOME")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(home_dir).join(".local/share")),
            PathRoot::EnvVar {
                var,
                fallback_relative,
            } => std::env::var(var)
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(home_dir).join(fallback_relative)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SourceDef {
    pub id: &'static str,
    pub display_name: &'static str,
    pub root: PathRoot,
    pub relative_path: &'static str,
    pub pattern: &'static str,
}

impl SourceDef {
    pub fn resolve_path(&self, home_dir: &str) -> PathBuf {
        self.root.resolve(home_dir).join(self.relative_path)
    }
}

macro_rules! define_sources {
    ( $( $variant:ident = $index:expr => { id: $id:expr, name: $name:expr, root: $root:expr, relative: $rel:expr, pattern: $pat:expr } ),+ $(,)? ) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(usize)]
        pub enum SourceId {
            $( $variant = $index ),+
        }

        impl SourceId {
            pub const COUNT: usize = [ $( $index ),+ ].len();

            pub fn data(&self) -> &'static SourceDef {
                &SOURCES[*self as usize]
            }

            pub fn as_str(&self) -> &'static str {
                self.data().id
            }

            pub fn display_name(&self) -> &'static str {
                self.data().display_name
            }

            pub fn file_pattern(&self) -> &'static str {
                self.data().pattern
            }
        }

        pub const SOURCES: [SourceDef; SourceId::COUNT] = [
            $( SourceDef {
                id: $id,
                display_name: $name,
                root: $root,
                relative_path: $rel,
                pattern: $pat,
            } ),+
        ];

        const _: () = {
            let mut i = 0;
            $(
                assert!($index == i, "SourceId indices must be sequential");
                i += 1;
                let _ = i;
            )+
        };
    };
}

define_sources!(
    Claude = 0 => {
        id: "claude",
        name: "Claude Code",
        root: PathRoot::EnvVar {
            var: "CLAUDE_CONFIG_DIR",
            fallback_relative: ".claude",
        },
        relative: "projects",
        pattern: "*.jsonl"
    },
    OpenCode = 1 => {
        id: "opencode",
        name: "OpenCode",
        root: PathRoot::XdgData,
        relative: "opencode",
        pattern: "*.json"
    }
);

/// Home directory used to resolve default source roots.
pub fn home_dir_string(home_dir_option: &Option<String>) -> Option<String> {
    home_dir_option
        .clone()
        .or_else(|| std::env::var("HOME").ok())
        .or_else(|| dirs::home_dir().map(|p| p.to_string_lossy().into_owned()))
}

/// Expands a leading `~` to the home directory.
pub fn expand_path(path: &str) -> PathBuf {
    if path == "~" {
        if let Some(home) = home_dir_string(&None) {
            return PathBuf::from(home);
        }
    } else if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = home_dir_string(&None) {
            return PathBuf::from(home).join(rest);
        }
    }
    PathBuf::from(path)
}
