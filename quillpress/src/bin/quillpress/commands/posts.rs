use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Args, Subcommand};
use quillpress::{BlogRepository, DocumentStore, NewPost, PostQuery};

use crate::{context::AppContext, examples::ExampleGroup, output::OutputManager};

pub const EXAMPLES: &[ExampleGroup] = &[
    ExampleGroup {
        title: "Publish",
        commands: &[
            "quillpress posts create --title \"Hello\" --content-file hello.html --reading-minutes 4 --image uploads/hello.png --tag intro",
        ],
    },
    ExampleGroup {
        title: "Browse",
        commands: &[
            "quillpress posts list",
            "quillpress posts list --page 2 --title rust",
            "quillpress posts saved <USER_ID>",
        ],
    },
];

#[derive(Subcommand)]
pub enum PostsCommands {
    /// Publish a new post
    Create(CreateArgs),

    /// List posts, newest first
    List {
        #[arg(long)]
        page: Option<u64>,

        /// Case-insensitive title filter
        #[arg(long)]
        title: Option<String>,
    },

    /// List the posts a user has saved
    Saved {
        user_id: String,
    },
}

#[derive(Args)]
pub struct CreateArgs {
    #[arg(long)]
    pub title: String,

    /// HTML content
    #[arg(long, conflicts_with = "content_file")]
    pub content: Option<String>,

    /// Read HTML content from a file
    #[arg(long)]
    pub content_file: Option<PathBuf>,

    #[arg(long)]
    pub reading_minutes: u32,

    /// Stored image path
    #[arg(long)]
    pub image: String,

    /// Tag (repeatable)
    #[arg(long = "tag")]
    pub tags: Vec<String>,

    /// Category id (repeatable)
    #[arg(long = "category")]
    pub categories: Vec<String>,

    /// Author user id
    #[arg(long)]
    pub author: Option<String>,
}

pub async fn handle_posts_commands<S: DocumentStore>(
    command: PostsCommands,
    repository: &BlogRepository<S>,
    context: &AppContext,
    output: &OutputManager,
) -> Result<()> {
    let origin = context.origin();
    match command {
        PostsCommands::Create(args) => {
            let content = match (args.content, args.content_file) {
                (Some(content), _) => content,
                (None, Some(path)) => tokio::fs::read_to_string(&path)
                    .await
                    .with_context(|| format!("Failed to read {}", path.display()))?,
                (None, None) => bail!("Provide --content or --content-file"),
            };
            let post = repository
                .create_post(
                    NewPost {
                        title: args.title,
                        content,
                        reading_minutes: args.reading_minutes,
                        tags: args.tags,
                        categories: args.categories,
                        image: args.image,
                        author: args.author,
                    },
                    &origin,
                )
                .await?;
            output.success(&format!("Published /{}", post.slug));
            output.display(&post)?;
        }
        PostsCommands::List { page, title } => {
            let params = PostQuery { page, title }.into_params();
            let listing = repository.list_posts(params.clone(), &origin).await?;
            output.display(&listing)?;
            output.info(&format!(
                "Page {} of {} ({} posts)",
                params.page,
                params.total_pages(listing.count).max(1),
                listing.count
            ));
        }
        PostsCommands::Saved { user_id } => {
            let saved = repository.saved_posts(&user_id, &origin).await?;
            output.display(&saved)?;
        }
    }
    Ok(())
}
