use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{RepoError, RepoResult, Repository, constraints};
use crate::models::{
    Comment, CreateTermRequest, NewComment, NewReview, NewTitle, NewUser, Review, ReviewChanges,
    Term, TermKind, TitleChanges, TitleFilter, TitleView, User, UserChanges,
};
use crate::rating::average_score;

struct StoredUser {
    user: User,
    confirmation_code: Option<String>,
}

struct StoredTitle {
    id: i64,
    name: String,
    year: Option<i32>,
    description: String,
    category_id: Option<i64>,
    genre_ids: Vec<i64>,
}

struct StoredReview {
    id: i64,
    title_id: i64,
    author_id: Uuid,
    text: String,
    score: i32,
    pub_date: DateTime<Utc>,
}

struct StoredComment {
    id: i64,
    review_id: i64,
    author_id: Uuid,
    text: String,
    pub_date: DateTime<Utc>,
}

#[derive(Default)]
struct Store {
    users: Vec<StoredUser>,
    categories: BTreeMap<i64, Term>,
    genres: BTreeMap<i64, Term>,
    titles: BTreeMap<i64, StoredTitle>,
    reviews: BTreeMap<i64, StoredReview>,
    comments: BTreeMap<i64, StoredComment>,
    last_id: i64,
}

impl Store {
    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }

    fn terms(&self, kind: TermKind) -> &BTreeMap<i64, Term> {
        match kind {
            TermKind::Category => &self.categories,
            TermKind::Genre => &self.genres,
        }
    }

    fn terms_mut(&mut self, kind: TermKind) -> &mut BTreeMap<i64, Term> {
        match kind {
            TermKind::Category => &mut self.categories,
            TermKind::Genre => &mut self.genres,
        }
    }

    fn username_of(&self, id: Uuid) -> String {
        self.users
            .iter()
            .find(|stored| stored.user.id == id)
            .map(|stored| stored.user.username.clone())
            .unwrap_or_default()
    }

    /// Enforces `users_username_key` / `users_email_key`, ignoring `except` (the row
    /// being updated).
    fn check_user_unique(
        &self,
        username: Option<&str>,
        email: Option<&str>,
        except: Option<Uuid>,
    ) -> RepoResult<()> {
        for stored in self.users.iter().filter(|s| Some(s.user.id) != except) {
            if username == Some(stored.user.username.as_str()) {
                return Err(RepoError::UniqueViolation(constraints::USERNAME.into()));
            }
            if email == Some(stored.user.email.as_str()) {
                return Err(RepoError::UniqueViolation(constraints::EMAIL.into()));
            }
        }
        Ok(())
    }

    fn title_view(&self, title: &StoredTitle) -> TitleView {
        let scores = self
            .reviews
            .values()
            .filter(|review| review.title_id == title.id)
            .map(|review| review.score);
        let mut genre: Vec<Term> = title
            .genre_ids
            .iter()
            .filter_map(|id| self.genres.get(id).cloned())
            .collect();
        genre.sort_by(|a, b| a.name.cmp(&b.name));

        TitleView {
            id: title.id,
            name: title.name.clone(),
            year: title.year,
            rating: average_score(scores),
            description: title.description.clone(),
            genre,
            category: title
                .category_id
                .and_then(|id| self.categories.get(&id).cloned()),
        }
    }

    fn review_view(&self, review: &StoredReview) -> Review {
        Review {
            id: review.id,
            title_id: review.title_id,
            author_id: review.author_id,
            author: self.username_of(review.author_id),
            text: review.text.clone(),
            score: review.score,
            pub_date: review.pub_date,
        }
    }

    fn comment_view(&self, comment: &StoredComment) -> Comment {
        Comment {
            id: comment.id,
            review_id: comment.review_id,
            author_id: comment.author_id,
            author: self.username_of(comment.author_id),
            text: comment.text.clone(),
            pub_date: comment.pub_date,
        }
    }

    /// Removes reviews matching `pred` together with their comments.
    fn remove_reviews_where(&mut self, pred: impl Fn(&StoredReview) -> bool) {
        let doomed: Vec<i64> = self
            .reviews
            .values()
            .filter(|review| pred(review))
            .map(|review| review.id)
            .collect();
        for id in &doomed {
            self.reviews.remove(id);
        }
        self.comments
            .retain(|_, comment| !doomed.contains(&comment.review_id));
    }
}

/// InMemoryRepository
///
/// A process-local `Repository` that mirrors the Postgres store's constraints and
/// cascades. Used by the test suites and for running the API without a database.
/// All state sits behind one lock, so check-then-insert sequences are atomic.
#[derive(Default)]
pub struct InMemoryRepository {
    store: Mutex<Store>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn get_user(&self, id: Uuid) -> RepoResult<Option<User>> {
        let store = self.store.lock().await;
        Ok(store
            .users
            .iter()
            .find(|s| s.user.id == id)
            .map(|s| s.user.clone()))
    }

    async fn get_user_by_username(&self, username: &str) -> RepoResult<Option<User>> {
        let store = self.store.lock().await;
        Ok(store
            .users
            .iter()
            .find(|s| s.user.username == username)
            .map(|s| s.user.clone()))
    }

    async fn get_user_by_email(&self, email: &str) -> RepoResult<Option<User>> {
        let store = self.store.lock().await;
        Ok(store
            .users
            .iter()
            .find(|s| s.user.email == email)
            .map(|s| s.user.clone()))
    }

    async fn list_users(&self, search: Option<String>) -> RepoResult<Vec<User>> {
        let store = self.store.lock().await;
        let mut users: Vec<User> = store
            .users
            .iter()
            .filter(|s| {
                search
                    .as_deref()
                    .is_none_or(|needle| contains_ci(&s.user.username, needle))
            })
            .map(|s| s.user.clone())
            .collect();
        users.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(users)
    }

    async fn create_user(&self, new: NewUser) -> RepoResult<User> {
        let mut store = self.store.lock().await;
        store.check_user_unique(Some(&new.username), Some(&new.email), None)?;
        let user = User {
            id: Uuid::new_v4(),
            username: new.username,
            email: new.email,
            first_name: new.first_name,
            last_name: new.last_name,
            bio: new.bio,
            role: new.role,
            is_superuser: new.is_superuser,
            created_at: Utc::now(),
        };
        store.users.push(StoredUser {
            user: user.clone(),
            confirmation_code: None,
        });
        Ok(user)
    }

    async fn update_user(&self, id: Uuid, changes: UserChanges) -> RepoResult<Option<User>> {
        let mut store = self.store.lock().await;
        store.check_user_unique(changes.username.as_deref(), changes.email.as_deref(), Some(id))?;
        let Some(stored) = store.users.iter_mut().find(|s| s.user.id == id) else {
            return Ok(None);
        };
        let user = &mut stored.user;
        if let Some(username) = changes.username {
            user.username = username;
        }
        if let Some(email) = changes.email {
            user.email = email;
        }
        if let Some(first_name) = changes.first_name {
            user.first_name = first_name;
        }
        if let Some(last_name) = changes.last_name {
            user.last_name = last_name;
        }
        if let Some(bio) = changes.bio {
            user.bio = bio;
        }
        if let Some(role) = changes.role {
            user.role = role;
        }
        if let Some(is_superuser) = changes.is_superuser {
            user.is_superuser = is_superuser;
        }
        Ok(Some(user.clone()))
    }

    async fn delete_user(&self, id: Uuid) -> RepoResult<bool> {
        let mut store = self.store.lock().await;
        let before = store.users.len();
        store.users.retain(|s| s.user.id != id);
        if store.users.len() == before {
            return Ok(false);
        }
        store.remove_reviews_where(|review| review.author_id == id);
        store.comments.retain(|_, comment| comment.author_id != id);
        Ok(true)
    }

    async fn set_confirmation_code(&self, id: Uuid, code: &str) -> RepoResult<bool> {
        let mut store = self.store.lock().await;
        match store.users.iter_mut().find(|s| s.user.id == id) {
            Some(stored) => {
                stored.confirmation_code = Some(code.to_string());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn get_confirmation_code(&self, id: Uuid) -> RepoResult<Option<String>> {
        let store = self.store.lock().await;
        Ok(store
            .users
            .iter()
            .find(|s| s.user.id == id)
            .and_then(|s| s.confirmation_code.clone()))
    }

    async fn list_terms(&self, kind: TermKind, search: Option<String>) -> RepoResult<Vec<Term>> {
        let store = self.store.lock().await;
        let mut terms: Vec<Term> = store
            .terms(kind)
            .values()
            .filter(|term| {
                search
                    .as_deref()
                    .is_none_or(|needle| contains_ci(&term.name, needle))
            })
            .cloned()
            .collect();
        terms.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.slug.cmp(&b.slug)));
        Ok(terms)
    }

    async fn get_term(&self, kind: TermKind, slug: &str) -> RepoResult<Option<Term>> {
        let store = self.store.lock().await;
        Ok(store.terms(kind).values().find(|t| t.slug == slug).cloned())
    }

    async fn create_term(&self, kind: TermKind, req: CreateTermRequest) -> RepoResult<Term> {
        let mut store = self.store.lock().await;
        if store.terms(kind).values().any(|t| t.slug == req.slug) {
            let constraint = match kind {
                TermKind::Category => constraints::CATEGORY_SLUG,
                TermKind::Genre => constraints::GENRE_SLUG,
            };
            return Err(RepoError::UniqueViolation(constraint.into()));
        }
        let term = Term {
            id: store.next_id(),
            name: req.name,
            slug: req.slug,
        };
        store.terms_mut(kind).insert(term.id, term.clone());
        Ok(term)
    }

    async fn delete_term(&self, kind: TermKind, slug: &str) -> RepoResult<bool> {
        let mut store = self.store.lock().await;
        let Some(id) = store
            .terms(kind)
            .values()
            .find(|t| t.slug == slug)
            .map(|t| t.id)
        else {
            return Ok(false);
        };
        store.terms_mut(kind).remove(&id);
        for title in store.titles.values_mut() {
            match kind {
                TermKind::Category if title.category_id == Some(id) => title.category_id = None,
                TermKind::Genre => title.genre_ids.retain(|genre_id| *genre_id != id),
                _ => {}
            }
        }
        Ok(true)
    }

    async fn list_titles(&self, filter: TitleFilter) -> RepoResult<Vec<TitleView>> {
        let store = self.store.lock().await;
        let mut titles: Vec<TitleView> = store
            .titles
            .values()
            .map(|title| store.title_view(title))
            .filter(|view| {
                filter
                    .name
                    .as_deref()
                    .is_none_or(|name| view.name.to_lowercase() == name.to_lowercase())
            })
            .filter(|view| {
                filter.category.as_deref().is_none_or(|slug| {
                    view.category.as_ref().is_some_and(|c| c.slug == slug)
                })
            })
            .filter(|view| {
                filter
                    .genre
                    .as_deref()
                    .is_none_or(|slug| view.genre.iter().any(|g| g.slug == slug))
            })
            .filter(|view| filter.year.is_none_or(|year| view.year == Some(year)))
            .collect();
        titles.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(titles)
    }

    async fn get_title(&self, id: i64) -> RepoResult<Option<TitleView>> {
        let store = self.store.lock().await;
        Ok(store.titles.get(&id).map(|title| store.title_view(title)))
    }

    async fn create_title(&self, new: NewTitle) -> RepoResult<TitleView> {
        let mut store = self.store.lock().await;
        let mut genre_ids = new.genre_ids;
        genre_ids.sort_unstable();
        genre_ids.dedup();
        let title = StoredTitle {
            id: store.next_id(),
            name: new.name,
            year: new.year,
            description: new.description,
            category_id: new.category_id,
            genre_ids,
        };
        let view = store.title_view(&title);
        store.titles.insert(title.id, title);
        Ok(view)
    }

    async fn update_title(&self, id: i64, changes: TitleChanges) -> RepoResult<Option<TitleView>> {
        let mut store = self.store.lock().await;
        let Some(title) = store.titles.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(name) = changes.name {
            title.name = name;
        }
        if let Some(year) = changes.year {
            title.year = Some(year);
        }
        if let Some(description) = changes.description {
            title.description = description;
        }
        if let Some(category_id) = changes.category_id {
            title.category_id = Some(category_id);
        }
        if let Some(mut genre_ids) = changes.genre_ids {
            genre_ids.sort_unstable();
            genre_ids.dedup();
            title.genre_ids = genre_ids;
        }
        Ok(store.titles.get(&id).map(|title| store.title_view(title)))
    }

    async fn delete_title(&self, id: i64) -> RepoResult<bool> {
        let mut store = self.store.lock().await;
        if store.titles.remove(&id).is_none() {
            return Ok(false);
        }
        store.remove_reviews_where(|review| review.title_id == id);
        Ok(true)
    }

    async fn list_reviews(&self, title_id: i64) -> RepoResult<Vec<Review>> {
        let store = self.store.lock().await;
        Ok(store
            .reviews
            .values()
            .filter(|review| review.title_id == title_id)
            .map(|review| store.review_view(review))
            .collect())
    }

    async fn get_review(&self, title_id: i64, id: i64) -> RepoResult<Option<Review>> {
        let store = self.store.lock().await;
        Ok(store
            .reviews
            .get(&id)
            .filter(|review| review.title_id == title_id)
            .map(|review| store.review_view(review)))
    }

    async fn find_review_by_author(&self, title_id: i64, author_id: Uuid) -> RepoResult<Option<Review>> {
        let store = self.store.lock().await;
        Ok(store
            .reviews
            .values()
            .find(|review| review.title_id == title_id && review.author_id == author_id)
            .map(|review| store.review_view(review)))
    }

    async fn create_review(&self, new: NewReview) -> RepoResult<Review> {
        let mut store = self.store.lock().await;
        let taken = store
            .reviews
            .values()
            .any(|review| review.title_id == new.title_id && review.author_id == new.author_id);
        if taken {
            return Err(RepoError::UniqueViolation(
                constraints::REVIEW_TITLE_AUTHOR.into(),
            ));
        }
        let review = StoredReview {
            id: store.next_id(),
            title_id: new.title_id,
            author_id: new.author_id,
            text: new.text,
            score: new.score,
            pub_date: Utc::now(),
        };
        let view = store.review_view(&review);
        store.reviews.insert(review.id, review);
        Ok(view)
    }

    async fn update_review(&self, id: i64, changes: ReviewChanges) -> RepoResult<Option<Review>> {
        let mut store = self.store.lock().await;
        let Some(review) = store.reviews.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(text) = changes.text {
            review.text = text;
        }
        if let Some(score) = changes.score {
            review.score = score;
        }
        Ok(store.reviews.get(&id).map(|review| store.review_view(review)))
    }

    async fn delete_review(&self, id: i64) -> RepoResult<bool> {
        let mut store = self.store.lock().await;
        let existed = store.reviews.contains_key(&id);
        store.remove_reviews_where(|review| review.id == id);
        Ok(existed)
    }

    async fn list_comments(&self, review_id: i64) -> RepoResult<Vec<Comment>> {
        let store = self.store.lock().await;
        Ok(store
            .comments
            .values()
            .filter(|comment| comment.review_id == review_id)
            .map(|comment| store.comment_view(comment))
            .collect())
    }

    async fn get_comment(&self, review_id: i64, id: i64) -> RepoResult<Option<Comment>> {
        let store = self.store.lock().await;
        Ok(store
            .comments
            .get(&id)
            .filter(|comment| comment.review_id == review_id)
            .map(|comment| store.comment_view(comment)))
    }

    async fn create_comment(&self, new: NewComment) -> RepoResult<Comment> {
        let mut store = self.store.lock().await;
        let comment = StoredComment {
            id: store.next_id(),
            review_id: new.review_id,
            author_id: new.author_id,
            text: new.text,
            pub_date: Utc::now(),
        };
        let view = store.comment_view(&comment);
        store.comments.insert(comment.id, comment);
        Ok(view)
    }

    async fn update_comment(&self, id: i64, text: String) -> RepoResult<Option<Comment>> {
        let mut store = self.store.lock().await;
        let Some(comment) = store.comments.get_mut(&id) else {
            return Ok(None);
        };
        comment.text = text;
        Ok(store.comments.get(&id).map(|comment| store.comment_view(comment)))
    }

    async fn delete_comment(&self, id: i64) -> RepoResult<bool> {
        let mut store = self.store.lock().await;
        Ok(store.comments.remove(&id).is_some())
    }
}
