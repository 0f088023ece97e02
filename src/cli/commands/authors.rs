use clap::Subcommand;

use crate::api::catalog::{self, AuthorSearchParams};
use crate::cli::utils::*;
use crate::cli::{CliContext, OutputFormat};

#[derive(Subcommand)]
pub enum AuthorCommands {
    #[command(about = "Search authors")]
    Search {
        #[arg(long, help = "Full name contains")]
        name: Option<String>,
        #[arg(long, help = "Only authors listed on Goodreads")]
        goodreads: Option<bool>,
        #[arg(long, help = "Authors of this book ID")]
        book: Option<i64>,
        #[arg(long, help = "Zero-based page number")]
        page: Option<u32>,
        #[arg(long, help = "Page size")]
        size: Option<u32>,
        #[arg(long, help = "Sort field")]
        sort_by: Option<String>,
        #[arg(long, help = "ASC or DESC")]
        sort_direction: Option<String>,
    },
}

pub async fn handle(cmd: AuthorCommands, ctx: &CliContext) -> anyhow::Result<()> {
    match cmd {
        AuthorCommands::Search { name, goodreads, book, page, size, sort_by, sort_direction } => {
            let params = AuthorSearchParams {
                full_name: name,
                is_on_goodreads: goodreads,
                book_id: book,
                page,
                size,
                sort_by,
                sort_direction: sort_direction.map(|d| d.to_ascii_uppercase()),
            };
            let page = catalog::fetch_authors(&ctx.gateway, &params).await?;

            match ctx.output {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&page)?),
                OutputFormat::Text => {
                    output_collection(&ctx.output, "authors", &page.content, "No authors found", |author| {
                        let marker = if author.is_on_goodreads { "goodreads" } else { "" };
                        format!("{:>6}  {:<40} {}", author.id, author.full_name, marker)
                    })?;
                    println!("{}", page_footer(page.page_number, page.total_pages, page.total_elements));
                }
            }
            Ok(())
        }
    }
}
