use anyhow::Result;
use clap::Subcommand;
use quillpress::{BlogRepository, DocumentStore};

use crate::{examples::ExampleGroup, output::OutputManager};

pub const EXAMPLES: &[ExampleGroup] = &[ExampleGroup {
    title: "Manage categories",
    commands: &["quillpress categories add \"Systems Programming\"", "quillpress categories list"],
}];

#[derive(Subcommand)]
pub enum CategoriesCommands {
    /// Create a category
    Add {
        name: String,
    },

    /// List categories by name
    List,
}

pub async fn handle_categories_commands<S: DocumentStore>(
    command: CategoriesCommands,
    repository: &BlogRepository<S>,
    output: &OutputManager,
) -> Result<()> {
    match command {
        CategoriesCommands::Add { name } => {
            let category = repository.create_category(&name).await?;
            output.success(&format!("Created category {}", category.name));
            output.display(&category)?;
        }
        CategoriesCommands::List => {
            let categories = repository.list_categories().await?;
            output.display(&categories)?;
        }
    }
    Ok(())
}
