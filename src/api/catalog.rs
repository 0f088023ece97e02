// api/catalog.rs - books, authors and reference data

use tracing::debug;

use crate::api::contracts::{
    read_json, Author, AuthorCredit, BookInstance, BookSummary, Character, Genre, Language, Page,
};
use crate::api::gateway::{Gateway, RequestOptions};
use crate::api::with_query;
use crate::config::{config, CatalogConfig};
use crate::error::ClientError;

/// Filters for GET /api/books
#[derive(Debug, Clone, Default)]
pub struct BookSearchParams {
    pub title: Option<String>,
    pub author_name: Option<String>,
    pub author_id: Option<i64>,
    pub language_name: Option<String>,
    pub genre: Option<String>,
    pub character_name: Option<String>,
    pub isbn: Option<String>,
    pub page: Option<u32>,
    pub size: Option<u32>,
    pub sort_by: Option<String>,
    pub sort_direction: Option<String>,
}

impl BookSearchParams {
    /// Query path with paging defaults filled in
    pub fn to_path(&self, defaults: &CatalogConfig) -> String {
        with_query(
            "/api/books",
            &[
                ("title", self.title.clone()),
                ("authorName", self.author_name.clone()),
                ("authorId", self.author_id.map(|v| v.to_string())),
                ("languageName", self.language_name.clone()),
                ("genre", self.genre.clone()),
                ("characterName", self.character_name.clone()),
                ("isbn", self.isbn.clone()),
                ("page", Some(self.page.unwrap_or(0).to_string())),
                ("size", Some(self.size.unwrap_or(defaults.books_page_size).to_string())),
                ("sortBy", self.sort_by.clone()),
                (
                    "sortDirection",
                    Some(
                        self.sort_direction
                            .clone()
                            .unwrap_or_else(|| defaults.default_sort_direction.clone()),
                    ),
                ),
            ],
        )
    }
}

/// Filters for GET /api/authors
#[derive(Debug, Clone, Default)]
pub struct AuthorSearchParams {
    pub full_name: Option<String>,
    pub is_on_goodreads: Option<bool>,
    pub book_id: Option<i64>,
    pub page: Option<u32>,
    pub size: Option<u32>,
    pub sort_by: Option<String>,
    pub sort_direction: Option<String>,
}

impl AuthorSearchParams {
    pub fn to_path(&self, defaults: &CatalogConfig) -> String {
        with_query(
            "/api/authors",
            &[
                ("fullName", self.full_name.clone()),
                ("isOnGoodreads", self.is_on_goodreads.map(|v| v.to_string())),
                ("bookId", self.book_id.map(|v| v.to_string())),
                ("page", Some(self.page.unwrap_or(0).to_string())),
                ("size", Some(self.size.unwrap_or(defaults.books_page_size).to_string())),
                ("sortBy", self.sort_by.clone()),
                (
                    "sortDirection",
                    Some(
                        self.sort_direction
                            .clone()
                            .unwrap_or_else(|| defaults.default_sort_direction.clone()),
                    ),
                ),
            ],
        )
    }
}

pub async fn fetch_books(
    gateway: &Gateway,
    params: &BookSearchParams,
) -> Result<Page<BookSummary>, ClientError> {
    let path = params.to_path(&config().catalog);
    debug!(%path, "fetching books");
    read_json(gateway.fetch(&path, RequestOptions::get()).await?).await
}

pub async fn fetch_book(gateway: &Gateway, id: i64) -> Result<BookSummary, ClientError> {
    let path = format!("/api/books/{}", id);
    read_json(gateway.fetch(&path, RequestOptions::get()).await?).await
}

pub async fn fetch_book_instances(
    gateway: &Gateway,
    book_id: i64,
) -> Result<Vec<BookInstance>, ClientError> {
    let path = with_query("/api/book-instances", &[("bookId", Some(book_id.to_string()))]);
    read_json(gateway.fetch(&path, RequestOptions::get()).await?).await
}

pub async fn fetch_authors(
    gateway: &Gateway,
    params: &AuthorSearchParams,
) -> Result<Page<Author>, ClientError> {
    let path = params.to_path(&config().catalog);
    debug!(%path, "fetching authors");
    read_json(gateway.fetch(&path, RequestOptions::get()).await?).await
}

pub async fn fetch_authors_by_book(
    gateway: &Gateway,
    book_id: i64,
) -> Result<Vec<AuthorCredit>, ClientError> {
    let path = format!("/api/books/{}/authors", book_id);
    read_json(gateway.fetch(&path, RequestOptions::get()).await?).await
}

pub async fn fetch_characters_by_book(
    gateway: &Gateway,
    book_id: i64,
) -> Result<Vec<Character>, ClientError> {
    let path = format!("/api/books/{}/characters", book_id);
    read_json(gateway.fetch(&path, RequestOptions::get()).await?).await
}

pub async fn fetch_genres(gateway: &Gateway) -> Result<Vec<Genre>, ClientError> {
    read_json(gateway.fetch("/api/genres", RequestOptions::get()).await?).await
}

pub async fn fetch_genres_by_book(gateway: &Gateway, book_id: i64) -> Result<Vec<Genre>, ClientError> {
    let path = format!("/api/books/{}/genres", book_id);
    read_json(gateway.fetch(&path, RequestOptions::get()).await?).await
}

pub async fn fetch_languages(gateway: &Gateway) -> Result<Vec<Language>, ClientError> {
    read_json(gateway.fetch("/api/languages", RequestOptions::get()).await?).await
}
