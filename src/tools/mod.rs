//! Built-in MCP tools.
//!
//! - `basic` - `echo` and `add`

pub mod basic;

use crate::mcp::handler::ToolRegistry;

/// Register the built-in tools.
pub fn register_builtin_tools(registry: &mut ToolRegistry) {
    registry.register(basic::EchoTool);
    registry.register(basic::AddTool);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_tools_sorted() {
        let mut registry = ToolRegistry::new();
        register_builtin_tools(&mut registry);

        let names: Vec<_> = registry.list().into_iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["add", "echo"]);
    }
}
