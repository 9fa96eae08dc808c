use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::{RepoError, RepoResult, Repository};
use crate::models::{
    Comment, CreateTermRequest, NewComment, NewReview, NewTitle, NewUser, Review, ReviewChanges,
    Term, TermKind, TitleChanges, TitleFilter, TitleView, User, UserChanges,
};

const USER_COLUMNS: &str =
    "id, username, email, first_name, last_name, bio, role, is_superuser, created_at";

/// Title rows carry the rating as a correlated `AVG` so it always reflects the current
/// review set. `AVG` over zero rows is NULL, which becomes `None`.
const TITLE_SELECT: &str = r#"
    SELECT t.id, t.name, t.year, t.description,
           (SELECT AVG(r.score)::float8 FROM reviews r WHERE r.title_id = t.id) AS rating,
           c.id AS category_id, c.name AS category_name, c.slug AS category_slug
    FROM titles t
    LEFT JOIN categories c ON c.id = t.category_id
    WHERE TRUE
"#;

const REVIEW_SELECT: &str = r#"
    SELECT r.id, r.title_id, r.author_id, u.username AS author, r.text, r.score, r.pub_date
    FROM reviews r
    JOIN users u ON u.id = r.author_id
"#;

const COMMENT_SELECT: &str = r#"
    SELECT c.id, c.review_id, c.author_id, u.username AS author, c.text, c.pub_date
    FROM comments c
    JOIN users u ON u.id = c.author_id
"#;

#[derive(FromRow)]
struct TitleRow {
    id: i64,
    name: String,
    year: Option<i32>,
    description: String,
    rating: Option<f64>,
    category_id: Option<i64>,
    category_name: Option<String>,
    category_slug: Option<String>,
}

#[derive(FromRow)]
struct TitleGenreRow {
    title_id: i64,
    id: i64,
    name: String,
    slug: String,
}

/// PostgresRepository
///
/// The concrete implementation of the `Repository` trait, backed by PostgreSQL.
/// Queries are checked at runtime (no `DATABASE_URL` needed to build).
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// attach_genres
    ///
    /// Loads the genres of all `rows` in one query and assembles the read views.
    async fn attach_genres(&self, rows: Vec<TitleRow>) -> RepoResult<Vec<TitleView>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<i64> = rows.iter().map(|row| row.id).collect();
        let genre_rows = sqlx::query_as::<_, TitleGenreRow>(
            r#"
            SELECT tg.title_id, g.id, g.name, g.slug
            FROM title_genres tg
            JOIN genres g ON g.id = tg.genre_id
            WHERE tg.title_id = ANY($1)
            ORDER BY g.name
            "#,
        )
        .bind(ids.as_slice())
        .fetch_all(&self.pool)
        .await?;

        let mut genres: HashMap<i64, Vec<Term>> = HashMap::new();
        for row in genre_rows {
            genres.entry(row.title_id).or_default().push(Term {
                id: row.id,
                name: row.name,
                slug: row.slug,
            });
        }

        Ok(rows
            .into_iter()
            .map(|row| {
                let category = match (row.category_id, row.category_name, row.category_slug) {
                    (Some(id), Some(name), Some(slug)) => Some(Term { id, name, slug }),
                    _ => None,
                };
                TitleView {
                    genre: genres.remove(&row.id).unwrap_or_default(),
                    id: row.id,
                    name: row.name,
                    year: row.year,
                    rating: row.rating,
                    description: row.description,
                    category,
                }
            })
            .collect())
    }

    async fn replace_genres(
        tx: &mut sqlx::Transaction<'_, Postgres>,
        title_id: i64,
        genre_ids: &[i64],
    ) -> RepoResult<()> {
        sqlx::query("DELETE FROM title_genres WHERE title_id = $1")
            .bind(title_id)
            .execute(&mut **tx)
            .await?;
        for genre_id in genre_ids {
            sqlx::query(
                "INSERT INTO title_genres (title_id, genre_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
            )
            .bind(title_id)
            .bind(*genre_id)
            .execute(&mut **tx)
            .await?;
        }
        Ok(())
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    // --- USER DIRECTORY ---

    async fn get_user(&self, id: Uuid) -> RepoResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn get_user_by_username(&self, username: &str) -> RepoResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE username = $1");
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(username)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn get_user_by_email(&self, email: &str) -> RepoResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?)
    }

    /// list_users
    ///
    /// Case-insensitive substring search on the username, ordered by username. `%` and
    /// `_` in the search text match literally.
    async fn list_users(&self, search: Option<String>) -> RepoResult<Vec<User>> {
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users \
             WHERE ($1::text IS NULL OR strpos(lower(username), lower($1)) > 0) \
             ORDER BY username, email"
        );
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(search)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn create_user(&self, user: NewUser) -> RepoResult<User> {
        let sql = format!(
            "INSERT INTO users (id, username, email, first_name, last_name, bio, role, is_superuser) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING {USER_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(Uuid::new_v4())
            .bind(user.username)
            .bind(user.email)
            .bind(user.first_name)
            .bind(user.last_name)
            .bind(user.bio)
            .bind(user.role.as_str())
            .bind(user.is_superuser)
            .fetch_one(&self.pool)
            .await?)
    }

    /// update_user
    ///
    /// `COALESCE` keeps every column whose change is `None`.
    async fn update_user(&self, id: Uuid, changes: UserChanges) -> RepoResult<Option<User>> {
        let sql = format!(
            "UPDATE users SET \
                username = COALESCE($2, username), \
                email = COALESCE($3, email), \
                first_name = COALESCE($4, first_name), \
                last_name = COALESCE($5, last_name), \
                bio = COALESCE($6, bio), \
                role = COALESCE($7, role), \
                is_superuser = COALESCE($8, is_superuser) \
             WHERE id = $1 RETURNING {USER_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .bind(changes.username)
            .bind(changes.email)
            .bind(changes.first_name)
            .bind(changes.last_name)
            .bind(changes.bio)
            .bind(changes.role.map(|role| role.as_str()))
            .bind(changes.is_superuser)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn delete_user(&self, id: Uuid) -> RepoResult<bool> {
        let res = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    async fn set_confirmation_code(&self, id: Uuid, code: &str) -> RepoResult<bool> {
        let res = sqlx::query("UPDATE users SET confirmation_code = $2 WHERE id = $1")
            .bind(id)
            .bind(code)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    async fn get_confirmation_code(&self, id: Uuid) -> RepoResult<Option<String>> {
        let code = sqlx::query_scalar::<_, Option<String>>(
            "SELECT confirmation_code FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(code.flatten())
    }

    // --- CATEGORIES & GENRES ---

    async fn list_terms(&self, kind: TermKind, search: Option<String>) -> RepoResult<Vec<Term>> {
        let sql = format!(
            "SELECT id, name, slug FROM {} \
             WHERE ($1::text IS NULL OR strpos(lower(name), lower($1)) > 0) \
             ORDER BY name, slug",
            kind.table()
        );
        Ok(sqlx::query_as::<_, Term>(&sql)
            .bind(search)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn get_term(&self, kind: TermKind, slug: &str) -> RepoResult<Option<Term>> {
        let sql = format!("SELECT id, name, slug FROM {} WHERE slug = $1", kind.table());
        Ok(sqlx::query_as::<_, Term>(&sql)
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn create_term(&self, kind: TermKind, req: CreateTermRequest) -> RepoResult<Term> {
        let sql = format!(
            "INSERT INTO {} (name, slug) VALUES ($1, $2) RETURNING id, name, slug",
            kind.table()
        );
        Ok(sqlx::query_as::<_, Term>(&sql)
            .bind(req.name)
            .bind(req.slug)
            .fetch_one(&self.pool)
            .await?)
    }

    /// delete_term
    ///
    /// Foreign keys do the rest: `titles.category_id` is `ON DELETE SET NULL`,
    /// `title_genres` rows cascade.
    async fn delete_term(&self, kind: TermKind, slug: &str) -> RepoResult<bool> {
        let sql = format!("DELETE FROM {} WHERE slug = $1", kind.table());
        let res = sqlx::query(&sql).bind(slug).execute(&self.pool).await?;
        Ok(res.rows_affected() > 0)
    }

    // --- TITLES ---

    /// list_titles
    ///
    /// Builds the filter with `QueryBuilder` so every user value is a bound parameter.
    async fn list_titles(&self, filter: TitleFilter) -> RepoResult<Vec<TitleView>> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(TITLE_SELECT);

        if let Some(name) = filter.name {
            builder.push(" AND LOWER(t.name) = LOWER(");
            builder.push_bind(name);
            builder.push(")");
        }
        if let Some(category) = filter.category {
            builder.push(" AND c.slug = ");
            builder.push_bind(category);
        }
        if let Some(genre) = filter.genre {
            builder.push(
                " AND EXISTS (SELECT 1 FROM title_genres tg JOIN genres g ON g.id = tg.genre_id \
                 WHERE tg.title_id = t.id AND g.slug = ",
            );
            builder.push_bind(genre);
            builder.push(")");
        }
        if let Some(year) = filter.year {
            builder.push(" AND t.year = ");
            builder.push_bind(year);
        }
        builder.push(" ORDER BY t.name, t.id");

        let rows = builder
            .build_query_as::<TitleRow>()
            .fetch_all(&self.pool)
            .await?;
        self.attach_genres(rows).await
    }

    async fn get_title(&self, id: i64) -> RepoResult<Option<TitleView>> {
        let sql = format!("{TITLE_SELECT} AND t.id = $1");
        let row = sqlx::query_as::<_, TitleRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        match row {
            Some(row) => Ok(self.attach_genres(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    /// create_title
    ///
    /// Title row and genre links are written in one transaction.
    async fn create_title(&self, title: NewTitle) -> RepoResult<TitleView> {
        let mut tx = self.pool.begin().await?;
        let id = sqlx::query_scalar::<_, i64>(
            "INSERT INTO titles (name, year, description, category_id) \
             VALUES ($1, $2, $3, $4) RETURNING id",
        )
        .bind(&title.name)
        .bind(title.year)
        .bind(&title.description)
        .bind(title.category_id)
        .fetch_one(&mut *tx)
        .await?;
        Self::replace_genres(&mut tx, id, &title.genre_ids).await?;
        tx.commit().await?;

        self.get_title(id)
            .await?
            .ok_or(RepoError::Database(sqlx::Error::RowNotFound))
    }

    async fn update_title(&self, id: i64, changes: TitleChanges) -> RepoResult<Option<TitleView>> {
        let mut tx = self.pool.begin().await?;
        let res = sqlx::query(
            "UPDATE titles SET \
                name = COALESCE($2, name), \
                year = COALESCE($3, year), \
                description = COALESCE($4, description), \
                category_id = COALESCE($5, category_id) \
             WHERE id = $1",
        )
        .bind(id)
        .bind(changes.name)
        .bind(changes.year)
        .bind(changes.description)
        .bind(changes.category_id)
        .execute(&mut *tx)
        .await?;
        if res.rows_affected() == 0 {
            return Ok(None);
        }
        if let Some(genre_ids) = changes.genre_ids {
            Self::replace_genres(&mut tx, id, &genre_ids).await?;
        }
        tx.commit().await?;

        self.get_title(id).await
    }

    async fn delete_title(&self, id: i64) -> RepoResult<bool> {
        let res = sqlx::query("DELETE FROM titles WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    // --- REVIEWS ---

    async fn list_reviews(&self, title_id: i64) -> RepoResult<Vec<Review>> {
        let sql = format!("{REVIEW_SELECT} WHERE r.title_id = $1 ORDER BY r.pub_date, r.id");
        Ok(sqlx::query_as::<_, Review>(&sql)
            .bind(title_id)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn get_review(&self, title_id: i64, id: i64) -> RepoResult<Option<Review>> {
        let sql = format!("{REVIEW_SELECT} WHERE r.title_id = $1 AND r.id = $2");
        Ok(sqlx::query_as::<_, Review>(&sql)
            .bind(title_id)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_review_by_author(&self, title_id: i64, author_id: Uuid) -> RepoResult<Option<Review>> {
        let sql = format!("{REVIEW_SELECT} WHERE r.title_id = $1 AND r.author_id = $2");
        Ok(sqlx::query_as::<_, Review>(&sql)
            .bind(title_id)
            .bind(author_id)
            .fetch_optional(&self.pool)
            .await?)
    }

    /// create_review
    ///
    /// Insert and author join in one statement (CTE). A concurrent duplicate trips
    /// `reviews_title_author_key` and surfaces as `RepoError::UniqueViolation`.
    async fn create_review(&self, review: NewReview) -> RepoResult<Review> {
        Ok(sqlx::query_as::<_, Review>(
            r#"
            WITH inserted AS (
                INSERT INTO reviews (title_id, author_id, text, score)
                VALUES ($1, $2, $3, $4)
                RETURNING id, title_id, author_id, text, score, pub_date
            )
            SELECT i.id, i.title_id, i.author_id, u.username AS author, i.text, i.score, i.pub_date
            FROM inserted i JOIN users u ON u.id = i.author_id
            "#,
        )
        .bind(review.title_id)
        .bind(review.author_id)
        .bind(review.text)
        .bind(review.score)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn update_review(&self, id: i64, changes: ReviewChanges) -> RepoResult<Option<Review>> {
        Ok(sqlx::query_as::<_, Review>(
            r#"
            WITH updated AS (
                UPDATE reviews
                SET text = COALESCE($2, text), score = COALESCE($3, score)
                WHERE id = $1
                RETURNING id, title_id, author_id, text, score, pub_date
            )
            SELECT up.id, up.title_id, up.author_id, u.username AS author, up.text, up.score, up.pub_date
            FROM updated up JOIN users u ON u.id = up.author_id
            "#,
        )
        .bind(id)
        .bind(changes.text)
        .bind(changes.score)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn delete_review(&self, id: i64) -> RepoResult<bool> {
        let res = sqlx::query("DELETE FROM reviews WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    // --- COMMENTS ---

    async fn list_comments(&self, review_id: i64) -> RepoResult<Vec<Comment>> {
        let sql = format!("{COMMENT_SELECT} WHERE c.review_id = $1 ORDER BY c.pub_date, c.id");
        Ok(sqlx::query_as::<_, Comment>(&sql)
            .bind(review_id)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn get_comment(&self, review_id: i64, id: i64) -> RepoResult<Option<Comment>> {
        let sql = format!("{COMMENT_SELECT} WHERE c.review_id = $1 AND c.id = $2");
        Ok(sqlx::query_as::<_, Comment>(&sql)
            .bind(review_id)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn create_comment(&self, comment: NewComment) -> RepoResult<Comment> {
        Ok(sqlx::query_as::<_, Comment>(
            r#"
            WITH inserted AS (
                INSERT INTO comments (review_id, author_id, text)
                VALUES ($1, $2, $3)
                RETURNING id, review_id, author_id, text, pub_date
            )
            SELECT i.id, i.review_id, i.author_id, u.username AS author, i.text, i.pub_date
            FROM inserted i JOIN users u ON u.id = i.author_id
            "#,
        )
        .bind(comment.review_id)
        .bind(comment.author_id)
        .bind(comment.text)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn update_comment(&self, id: i64, text: String) -> RepoResult<Option<Comment>> {
        Ok(sqlx::query_as::<_, Comment>(
            r#"
            WITH updated AS (
                UPDATE comments SET text = $2 WHERE id = $1
                RETURNING id, review_id, author_id, text, pub_date
            )
            SELECT up.id, up.review_id, up.author_id, u.username AS author, up.text, up.pub_date
            FROM updated up JOIN users u ON u.id = up.author_id
            "#,
        )
        .bind(id)
        .bind(text)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn delete_comment(&self, id: i64) -> RepoResult<bool> {
        let res = sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }
}
