use crate::utils::user_paths::expand_home_path;
use std::path::PathBuf;

/// Host environment the server was launched from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    ClaudeCode,
    ClaudeDesktop,
    Termux,
    Docker,
    Standalone,
}

impl Platform {
    pub fn detect() -> Self {
        Self::detect_with(|key| std::env::var(key).ok())
    }

    pub fn detect_with(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let is_set = |key: &str| lookup(key).map(|v| !v.is_empty()).unwrap_or(false);
        if is_set("CLAUDE_CODE") || is_set("CLAUDE_PROJECT_DIR") {
            return Platform::ClaudeCode;
        }
        if is_set("CLAUDE_DESKTOP") || is_set("CLAUDE_DESKTOP_CONFIG") {
            return Platform::ClaudeDesktop;
        }
        if lookup("PREFIX")
            .map(|prefix| prefix.contains("com.termux"))
            .unwrap_or(false)
        {
            return Platform::Termux;
        }
        if is_set("DOCKER_CONTAINER") || lookup("container").as_deref() == Some("docker") {
            return Platform::Docker;
        }
        Platform::Standalone
    }

    pub fn name(self) -> &'static str {
        match self {
            Platform::ClaudeCode => "claude-code",
            Platform::ClaudeDesktop => "claude-desktop",
            Platform::Termux => "termux",
            Platform::Docker => "docker",
            Platform::Standalone => "standalone",
        }
    }

    /// Config files specific to this platform, tried after the generic
    /// candidates.
    pub fn config_paths(self) -> Vec<PathBuf> {
        let raw: &[&str] = match self {
            Platform::ClaudeCode => &[".claude/.clio-config.json"],
            Platform::ClaudeDesktop => &["~/.claude-desktop/clio-config.json"],
            Platform::Termux => &["/data/data/com.termux/files/home/.clio-mcp/config.json"],
            Platform::Docker | Platform::Standalone => &[],
        };
        raw.iter().map(expand_home_path).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn detect(pairs: &[(&str, &str)]) -> Platform {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Platform::detect_with(|key| env.get(key).cloned())
    }

    #[test]
    fn claude_code_wins_over_desktop() {
        assert_eq!(
            detect(&[("CLAUDE_PROJECT_DIR", "/p"), ("CLAUDE_DESKTOP", "1")]),
            Platform::ClaudeCode
        );
    }

    #[test]
    fn detects_termux_and_docker() {
        assert_eq!(
            detect(&[("PREFIX", "/data/data/com.termux/files/usr")]),
            Platform::Termux
        );
        assert_eq!(detect(&[("container", "docker")]), Platform::Docker);
        assert_eq!(detect(&[]), Platform::Standalone);
    }
}
