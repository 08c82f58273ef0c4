use serde::{Deserialize, Serialize};

/// 内置支持的工具 ID
pub const CLAUDE_CODE: &str = "claude-code";
pub const CODEX: &str = "codex";
pub const GEMINI_CLI: &str = "gemini-cli";

/// 工具状态（由外部安装检测提供，本模块只读）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolStatus {
    pub id: String,
    pub name: String,
    pub installed: bool,
    #[serde(default)]
    pub version: Option<String>,
    /// 安装路径等附加元数据
    #[serde(default)]
    pub install_path: Option<String>,
}

impl ToolStatus {
    pub fn new(id: impl Into<String>, name: impl Into<String>, installed: bool) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            installed,
            version: None,
            install_path: None,
        }
    }
}

/// 按原顺序筛出已安装的工具
pub fn installed_tools(tools: &[ToolStatus]) -> Vec<ToolStatus> {
    tools.iter().filter(|t| t.installed).cloned().collect()
}

/// 工具显示名（找不到时回退为 ID）
pub fn display_name<'a>(tools: &'a [ToolStatus], tool_id: &'a str) -> &'a str {
    tools
        .iter()
        .find(|t| t.id == tool_id)
        .map(|t| t.name.as_str())
        .unwrap_or(tool_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<ToolStatus> {
        vec![
            ToolStatus::new(CLAUDE_CODE, "Claude Code", false),
            ToolStatus::new(CODEX, "CodeX", true),
            ToolStatus::new(GEMINI_CLI, "Gemini CLI", true),
        ]
    }

    #[test]
    fn installed_tools_keeps_order() {
        let ids: Vec<_> = installed_tools(&sample()).into_iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![CODEX, GEMINI_CLI]);
    }

    #[test]
    fn display_name_falls_back_to_id() {
        let tools = sample();
        assert_eq!(display_name(&tools, CODEX), "CodeX");
        assert_eq!(display_name(&tools, "unknown"), "unknown");
    }
}
