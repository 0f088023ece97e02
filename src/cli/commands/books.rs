use clap::Subcommand;
use serde_json::json;

use crate::api::catalog::{self, BookSearchParams};
use crate::cli::utils::*;
use crate::cli::{CliContext, OutputFormat};

#[derive(Subcommand)]
pub enum BookCommands {
    #[command(about = "Search the catalog")]
    Search {
        #[arg(long, help = "Title contains")]
        title: Option<String>,
        #[arg(long, help = "Author name contains")]
        author: Option<String>,
        #[arg(long, help = "Author ID")]
        author_id: Option<i64>,
        #[arg(long, help = "Language name")]
        language: Option<String>,
        #[arg(long, help = "Genre name")]
        genre: Option<String>,
        #[arg(long, help = "Character name")]
        character: Option<String>,
        #[arg(long, help = "ISBN")]
        isbn: Option<String>,
        #[arg(long, help = "Zero-based page number")]
        page: Option<u32>,
        #[arg(long, help = "Page size")]
        size: Option<u32>,
        #[arg(long, help = "Sort field")]
        sort_by: Option<String>,
        #[arg(long, help = "ASC or DESC")]
        sort_direction: Option<String>,
    },

    #[command(about = "Show a book with its authors and copies")]
    Show {
        #[arg(help = "Book ID")]
        id: i64,
    },
}

pub async fn handle(cmd: BookCommands, ctx: &CliContext) -> anyhow::Result<()> {
    match cmd {
        BookCommands::Search {
            title,
            author,
            author_id,
            language,
            genre,
            character,
            isbn,
            page,
            size,
            sort_by,
            sort_direction,
        } => {
            let params = BookSearchParams {
                title,
                author_name: author,
                author_id,
                language_name: language,
                genre,
                character_name: character,
                isbn,
                page,
                size,
                sort_by,
                sort_direction: sort_direction.map(|d| d.to_ascii_uppercase()),
            };
            let page = catalog::fetch_books(&ctx.gateway, &params).await?;

            match ctx.output {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&page)?),
                OutputFormat::Text => {
                    output_collection(&ctx.output, "books", &page.content, "No books found", |book| {
                        format!(
                            "{:>6}  {:<50} {}",
                            book.id,
                            book.title.as_deref().unwrap_or("(untitled)"),
                            book.isbn.as_deref().unwrap_or("")
                        )
                    })?;
                    println!("{}", page_footer(page.page_number, page.total_pages, page.total_elements));
                }
            }
            Ok(())
        }
        BookCommands::Show { id } => {
            let (book, authors, instances) = tokio::try_join!(
                catalog::fetch_book(&ctx.gateway, id),
                catalog::fetch_authors_by_book(&ctx.gateway, id),
                catalog::fetch_book_instances(&ctx.gateway, id),
            )?;

            match ctx.output {
                OutputFormat::Json => {
                    let details = json!({
                        "book": book,
                        "authors": authors,
                        "instances": instances,
                    });
                    println!("{}", serde_json::to_string_pretty(&details)?);
                }
                OutputFormat::Text => {
                    let credits = authors
                        .iter()
                        .map(|a| match &a.author_role {
                            Some(role) => format!("{} ({})", a.full_name, role),
                            None => a.full_name.clone(),
                        })
                        .collect::<Vec<_>>()
                        .join(", ");
                    let available = instances
                        .iter()
                        .filter(|i| i.status.as_deref() == Some("AVAILABLE"))
                        .count();

                    output_record(
                        &ctx.output,
                        &book,
                        &[
                            ("id", book.id.to_string()),
                            ("title", book.title.clone().unwrap_or_default()),
                            ("authors", credits),
                            ("isbn", book.isbn.clone().unwrap_or_default()),
                            ("published", book.publish_date.clone().unwrap_or_default()),
                            ("format", book.format.clone().unwrap_or_default()),
                            ("price", book.price.map(|p| format!("{:.2}", p)).unwrap_or_default()),
                            ("copies", format!("{} ({} available)", instances.len(), available)),
                        ],
                    )?;
                }
            }
            Ok(())
        }
    }
}
