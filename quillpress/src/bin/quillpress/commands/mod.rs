pub mod categories;
pub mod posts;
pub mod serve;
pub mod users;

use anyhow::Result;
use quillpress::{BlogRepository, DocumentStore};

use crate::{context::AppContext, output::OutputManager};

use self::{
    categories::{CategoriesCommands, handle_categories_commands},
    posts::{PostsCommands, handle_posts_commands},
    users::{UsersCommands, handle_users_commands},
};

/// Commands that run once against the configured store.
pub enum AdminCommand {
    Users(UsersCommands),
    Posts(PostsCommands),
    Categories(CategoriesCommands),
}

impl AdminCommand {
    pub async fn run<S: DocumentStore>(
        self,
        repository: BlogRepository<S>,
        context: &AppContext,
        output: &OutputManager,
    ) -> Result<()> {
        match self {
            AdminCommand::Users(command) => handle_users_commands(command, &repository, output).await,
            AdminCommand::Posts(command) => handle_posts_commands(command, &repository, context, output).await,
            AdminCommand::Categories(command) => handle_categories_commands(command, &repository, output).await,
        }
    }
}
