//! Books repository for database operations

use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::book::{Book, CreateBook, UpdateBook},
};

#[derive(Clone)]
pub struct BooksRepository {
    pool: Pool<Postgres>,
}

impl BooksRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// List all books
    pub async fn list(&self) -> AppResult<Vec<Book>> {
        let rows = sqlx::query_as::<_, Book>("SELECT * FROM books ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    /// Get book by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Book> {
        sqlx::query_as::<_, Book>("SELECT * FROM books WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book {} not found", id)))
    }

    /// Create book
    pub async fn create(&self, data: &CreateBook) -> AppResult<Book> {
        let available = data.available_copies.unwrap_or(data.total_copies);
        if available > data.total_copies {
            return Err(AppError::Validation(
                "available_copies can not exceed total_copies".to_string(),
            ));
        }

        if let Some(ref isbn) = data.isbn {
            self.ensure_isbn_free(isbn, None).await?;
        }

        let row = sqlx::query_as::<_, Book>(
            r#"
            INSERT INTO books (title, author_id, isbn, genre, total_copies, available_copies)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(&data.title)
        .bind(data.author_id)
        .bind(&data.isbn)
        .bind(&data.genre)
        .bind(data.total_copies)
        .bind(available)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    /// Update the provided book fields
    pub async fn update(&self, id: i32, data: &UpdateBook) -> AppResult<Book> {
        let current = self.get_by_id(id).await?;

        if let Some(ref isbn) = data.isbn {
            self.ensure_isbn_free(isbn, Some(id)).await?;
        }

        let mut columns = Vec::new();

        macro_rules! add_field {
            ($field:expr, $name:expr) => {
                if $field.is_some() {
                    columns.push($name);
                }
            };
        }

        add_field!(data.title, "title");
        add_field!(data.author_id, "author_id");
        add_field!(data.isbn, "isbn");
        add_field!(data.genre, "genre");

        let mut new_available = None;
        if let Some(total) = data.total_copies {
            let available = current.available_after_resize(total).ok_or_else(|| {
                AppError::Validation(format!(
                    "total_copies can not be lower than the {} copies on loan",
                    current.copies_on_loan()
                ))
            })?;
            columns.push("total_copies");
            columns.push("available_copies");
            new_available = Some(available);
        }

        if columns.is_empty() {
            return Ok(current);
        }

        // A loan or return landing between the read and the write leaves the
        // row unmatched.
        let expected_available = new_available.map(|_| current.available_copies);
        let query = update_statement(&columns, expected_available);
        let mut builder = sqlx::query_as::<_, Book>(&query).bind(id);

        macro_rules! bind_field {
            ($field:expr) => {
                if let Some(ref val) = $field {
                    builder = builder.bind(val);
                }
            };
        }

        bind_field!(data.title);
        bind_field!(data.author_id);
        bind_field!(data.isbn);
        bind_field!(data.genre);
        bind_field!(data.total_copies);
        bind_field!(new_available);

        builder.fetch_optional(&self.pool).await?.ok_or_else(|| {
            AppError::Conflict(format!("Book {} changed while updating, retry", id))
        })
    }

    /// Delete book together with its loan history
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let active: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM loans WHERE book_id = $1 AND is_returned = FALSE)",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;

        if active {
            return Err(AppError::Conflict(format!("Book {} has active loans", id)));
        }

        let result = sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Book {} not found", id)));
        }
        Ok(())
    }

    async fn ensure_isbn_free(&self, isbn: &str, exclude_id: Option<i32>) -> AppResult<()> {
        let taken: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM books WHERE isbn = $1 AND ($2::int IS NULL OR id != $2))",
        )
        .bind(isbn)
        .bind(exclude_id)
        .fetch_one(&self.pool)
        .await?;

        if taken {
            return Err(AppError::Conflict(format!("A book with ISBN {} already exists", isbn)));
        }
        Ok(())
    }
}

/// `UPDATE` for the given columns, bound from `$2` on; `$1` is the id
fn update_statement(columns: &[&str], expected_available: Option<i32>) -> String {
    let sets: Vec<String> = columns
        .iter()
        .enumerate()
        .map(|(i, column)| format!("{} = ${}", column, i + 2))
        .collect();
    let guard = match expected_available {
        Some(available) => format!(" AND available_copies = {}", available),
        None => String::new(),
    };
    format!(
        "UPDATE books SET {} WHERE id = $1{} RETURNING *",
        sets.join(", "),
        guard
    )
}
