use anyhow::{Result, anyhow};
use clap::{Args, Subcommand};
use quillpress::{BlogRepository, DocumentStore, Registration};

use crate::{examples::ExampleGroup, output::OutputManager};

pub const EXAMPLES: &[ExampleGroup] = &[
    ExampleGroup {
        title: "Create a reader account",
        commands: &[
            "quillpress users register --user-name ada --first-name Ada --last-name Lovelace --email ada@example.com",
        ],
    },
    ExampleGroup {
        title: "Look a user up",
        commands: &["quillpress users show ada", "quillpress --output json users show ada"],
    },
];

#[derive(Subcommand)]
pub enum UsersCommands {
    /// Register a new user
    Register(RegisterArgs),

    /// Show a user by user name
    Show {
        /// User name (case-insensitive)
        user_name: String,
    },
}

#[derive(Args)]
pub struct RegisterArgs {
    #[arg(long)]
    pub user_name: String,

    #[arg(long)]
    pub first_name: String,

    #[arg(long)]
    pub last_name: String,

    #[arg(long)]
    pub email: String,

    /// Password; read from QUILLPRESS_PASSWORD when omitted
    #[arg(long, env = "QUILLPRESS_PASSWORD", hide_env_values = true)]
    pub password: String,

    /// Stored avatar path
    #[arg(long)]
    pub avatar: Option<String>,
}

pub async fn handle_users_commands<S: DocumentStore>(
    command: UsersCommands,
    repository: &BlogRepository<S>,
    output: &OutputManager,
) -> Result<()> {
    match command {
        UsersCommands::Register(args) => {
            let user = repository
                .register_user(Registration {
                    user_name: args.user_name,
                    first_name: args.first_name,
                    last_name: args.last_name,
                    email: args.email,
                    password: args.password,
                    confirm_password: None,
                    avatar: args.avatar,
                })
                .await?;
            output.success(&format!("Registered {}", user.user_name));
            output.display(&user)?;
        }
        UsersCommands::Show { user_name } => {
            let user = repository
                .find_user_by_name(&user_name)
                .await?
                .ok_or_else(|| anyhow!("No user named {user_name}"))?;
            output.display(&user)?;
        }
    }
    Ok(())
}
