//! `--check`: which merge methods can run here, and where the tools are.

use anyhow::Result;
use comfy_table::{Attribute, Cell, Color, ContentArrangement, Table, presets};
use crossterm::style::Stylize;

use apkget_core::tools::capability::{self, MethodCapability, ToolStatus};

use crate::Cli;
use crate::ui::Theme;

pub async fn check(cli: &Cli) -> Result<()> {
    let (settings, gateway) = super::local_gateway().await?;
    let (methods, tools) = tokio::task::spawn_blocking(move || {
        (capability::probe(&gateway), capability::tool_report(&gateway))
    })
    .await?;

    let theme = Theme::default();
    println!();
    println!("{}", "Merge methods".bold());
    println!("{}", method_table(&methods));
    println!();
    println!("{}", "Tools".bold());
    println!("{}", tool_table(&tools));
    println!();

    let available = methods.iter().filter(|m| m.available).count();
    println!(
        "  {} {available}/{} merge methods available",
        theme.icons.info.blue(),
        methods.len()
    );
    println!(
        "  {} Tools directory: {}",
        theme.icons.info.blue(),
        settings.tools_dir().display()
    );
    if available < methods.len() && cli.interactive() {
        println!(
            "  {} Run with --setup to install missing tools",
            theme.icons.pointer.cyan()
        );
    }
    Ok(())
}

fn header(names: &[&str]) -> Vec<Cell> {
    names
        .iter()
        .map(|name| {
            Cell::new(name)
                .fg(Color::Cyan)
                .add_attribute(Attribute::Bold)
        })
        .collect()
}

fn new_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

fn method_table(methods: &[MethodCapability]) -> Table {
    let theme = Theme::default();
    let mut table = new_table();
    table.set_header(header(&["#", "Method", "Status", "Details"]));
    for cap in methods {
        let status = if cap.available {
            Cell::new(format!("{} Available", theme.icons.success)).fg(Color::Green)
        } else {
            Cell::new(format!("{} Unavailable", theme.icons.error)).fg(Color::Red)
        };
        table.add_row(vec![
            Cell::new(cap.method.index()),
            Cell::new(cap.method.name()),
            status,
            Cell::new(&cap.status).fg(Color::DarkGrey),
        ]);
    }
    table
}

fn tool_table(tools: &[ToolStatus]) -> Table {
    let theme = Theme::default();
    let mut table = new_table();
    table.set_header(header(&["Tool", "Installed", "Path"]));
    for status in tools {
        let installed = if status.installed {
            Cell::new(theme.icons.success).fg(Color::Green)
        } else {
            Cell::new(theme.icons.error).fg(Color::Red)
        };
        let path = if status.path.as_os_str().is_empty() {
            "-".to_string()
        } else {
            status.path.display().to_string()
        };
        table.add_row(vec![
            Cell::new(status.tool.display_name()),
            installed,
            Cell::new(path).fg(Color::DarkGrey),
        ]);
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use apkget_core::tools::Tool;
    use apkget_schema::MergeMethod;
    use std::path::PathBuf;

    #[test]
    fn test_method_table_lists_every_method() {
        let methods: Vec<MethodCapability> = MergeMethod::ALL
            .into_iter()
            .map(|method| MethodCapability {
                method,
                available: method.index() <= 2,
                status: if method.index() <= 2 {
                    "Always available".into()
                } else {
                    "Missing: Java".into()
                },
            })
            .collect();
        let mut table = method_table(&methods);
        table.set_content_arrangement(ContentArrangement::Disabled);
        let rendered = table.to_string();
        for method in MergeMethod::ALL {
            assert!(rendered.contains(method.name()), "{rendered}");
        }
        assert!(rendered.contains("Missing: Java"));
    }

    #[test]
    fn test_tool_table_shows_expected_path() {
        let tools = vec![ToolStatus {
            tool: Tool::ApkEditor,
            path: PathBuf::from("/cfg/tools/APKEditor.jar"),
            installed: false,
        }];
        let mut table = tool_table(&tools);
        table.set_content_arrangement(ContentArrangement::Disabled);
        let rendered = table.to_string();
        assert!(rendered.contains("APKEditor"));
        assert!(rendered.contains("/cfg/tools/APKEditor.jar"));
    }
}
