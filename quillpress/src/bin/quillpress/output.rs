use anyhow::Result;
use clap::ValueEnum;
use colored::Colorize;
use comfy_table::{Attribute, Cell, Color as TableColor, Table};
use quillpress::{Category, PostPage, PostSummary, PublicUser};
use serde::Serialize;

use crate::theme::{ICONS, THEME};

/// Output format options for CLI commands
#[derive(Clone, Debug, ValueEnum, Default, PartialEq)]
pub enum OutputFormat {
    /// Formatted table output (default)
    #[default]
    Table,
    /// JSON output for scripting
    Json,
}

/// Global CLI options that affect output
#[derive(Clone, Debug, Default)]
pub struct GlobalOptions {
    pub output_format: OutputFormat,
    pub quiet: bool,
    pub no_color: bool,
}

/// Data that can be rendered as a table
pub trait TableDisplay {
    fn to_table(&self, output: &OutputManager) -> Table;
}

pub struct OutputManager {
    pub options: GlobalOptions,
}

impl OutputManager {
    pub fn new(options: GlobalOptions) -> Self {
        Self { options }
    }

    /// Display data according to the configured output format
    pub fn display<T>(&self, data: &T) -> Result<()>
    where
        T: Serialize + TableDisplay,
    {
        if self.options.quiet {
            return Ok(());
        }

        match self.options.output_format {
            OutputFormat::Json => {
                let json = serde_json::to_string_pretty(data)?;
                println!("{json}");
            }
            OutputFormat::Table => {
                let table = data.to_table(self);
                println!("{table}");
            }
        }
        Ok(())
    }

    fn is_json(&self) -> bool {
        matches!(self.options.output_format, OutputFormat::Json)
    }

    pub fn success(&self, message: &str) {
        if !self.options.quiet && !self.is_json() {
            let output = if self.options.no_color {
                format!("{} {message}", ICONS.success)
            } else {
                format!("{} {}", ICONS.success.color(THEME.success), message.color(THEME.success))
            };
            println!("{output}");
        }
    }

    pub fn error(&self, message: &str) {
        let output = if self.options.no_color {
            format!("{} {message}", ICONS.error)
        } else {
            format!("{} {}", ICONS.error.color(THEME.error), message.color(THEME.error))
        };
        eprintln!("{output}");
    }

    pub fn warning(&self, message: &str) {
        if !self.options.quiet {
            let output = if self.options.no_color {
                format!("{} {message}", ICONS.warning)
            } else {
                format!("{} {}", ICONS.warning.color(THEME.warning), message.color(THEME.warning))
            };
            eprintln!("{output}");
        }
    }

    pub fn info(&self, message: &str) {
        if !self.options.quiet && !self.is_json() {
            let output = if self.options.no_color {
                format!("{} {message}", ICONS.info)
            } else {
                format!("{} {}", ICONS.info.color(THEME.info), message.color(THEME.info))
            };
            println!("{output}");
        }
    }

    pub fn key_value(&self, key: &str, value: &str) {
        if !self.options.quiet && !self.is_json() {
            let output = if self.options.no_color {
                format!("{key}: {value}")
            } else {
                format!("{}: {}", key.color(THEME.key).bold(), value.color(THEME.value))
            };
            println!("{output}");
        }
    }

    pub fn create_table(&self) -> Table {
        let mut table = Table::new();
        if self.options.no_color {
            table.load_preset(comfy_table::presets::ASCII_FULL);
        } else {
            table.load_preset(comfy_table::presets::UTF8_FULL_CONDENSED);
        }
        table
    }

    pub fn add_table_header(&self, table: &mut Table, headers: &[&str]) {
        let header_cells: Vec<Cell> = headers
            .iter()
            .map(|h| {
                let cell = Cell::new(h).add_attribute(Attribute::Bold);
                if self.options.no_color { cell } else { cell.fg(TableColor::Cyan) }
            })
            .collect();
        table.set_header(header_cells);
    }
}

fn record_table(output: &OutputManager, rows: &[(&str, String)]) -> Table {
    let mut table = output.create_table();
    output.add_table_header(&mut table, &["Field", "Value"]);
    for (field, value) in rows {
        table.add_row(vec![Cell::new(field), Cell::new(value)]);
    }
    table
}

impl TableDisplay for PublicUser {
    fn to_table(&self, output: &OutputManager) -> Table {
        record_table(
            output,
            &[
                ("Id", self.id.clone()),
                ("User name", self.user_name.clone()),
                ("Name", format!("{} {}", self.first_name, self.last_name)),
                ("Email", self.email.clone()),
                ("Avatar", self.avatar.clone().unwrap_or_else(|| "-".to_string())),
            ],
        )
    }
}

impl TableDisplay for PostSummary {
    fn to_table(&self, output: &OutputManager) -> Table {
        record_table(
            output,
            &[
                ("Id", self.id.clone()),
                ("Title", self.title.clone()),
                ("Slug", self.slug.clone()),
                ("Reading time", format!("{} min", self.reading_minutes)),
                ("Tags", self.tags.join(", ")),
                ("Image", self.image_url.clone()),
                ("Created", self.created_at.to_rfc3339()),
            ],
        )
    }
}

impl TableDisplay for PostPage {
    fn to_table(&self, output: &OutputManager) -> Table {
        let mut table = output.create_table();
        output.add_table_header(&mut table, &["Title", "Slug", "Reading", "Tags", "Created"]);
        if self.posts.is_empty() {
            table.add_row(vec![Cell::new("No posts found")]);
        }
        for post in &self.posts {
            table.add_row(vec![
                Cell::new(&post.title),
                Cell::new(&post.slug),
                Cell::new(format!("{} min", post.reading_minutes)),
                Cell::new(post.tags.join(", ")),
                Cell::new(post.created_at.format("%Y-%m-%d %H:%M").to_string()),
            ]);
        }
        table
    }
}

impl TableDisplay for Category {
    fn to_table(&self, output: &OutputManager) -> Table {
        record_table(
            output,
            &[
                ("Id", self.id.clone()),
                ("Name", self.name.clone()),
                ("Slug", self.slug.clone()),
            ],
        )
    }
}

impl TableDisplay for Vec<Category> {
    fn to_table(&self, output: &OutputManager) -> Table {
        let mut table = output.create_table();
        output.add_table_header(&mut table, &["Name", "Slug", "Id"]);
        if self.is_empty() {
            table.add_row(vec![Cell::new("No categories found")]);
        }
        for category in self {
            table.add_row(vec![
                Cell::new(&category.name),
                Cell::new(&category.slug),
                Cell::new(&category.id),
            ]);
        }
        table
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> PublicUser {
        PublicUser {
            id: "u1".to_string(),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            user_name: "ada".to_string(),
            email: "ada@example.com".to_string(),
            avatar: None,
        }
    }

    #[test]
    fn test_output_manager_json() {
        let manager = OutputManager::new(GlobalOptions {
            output_format: OutputFormat::Json,
            ..Default::default()
        });
        assert!(manager.display(&user()).is_ok());
    }

    #[test]
    fn test_output_manager_quiet() {
        let manager = OutputManager::new(GlobalOptions {
            quiet: true,
            ..Default::default()
        });
        assert!(manager.display(&user()).is_ok());
    }

    #[test]
    fn test_user_table_lists_fields() {
        let manager = OutputManager::new(GlobalOptions {
            no_color: true,
            ..Default::default()
        });
        let rendered = user().to_table(&manager).to_string();
        assert!(rendered.contains("ada@example.com"));
        assert!(rendered.contains("Ada Lovelace"));
    }
}
