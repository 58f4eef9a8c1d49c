use std::collections::HashSet;

use chrono::Utc;

use super::{BlogRepository, SLUG_FIELD};
use crate::{
    errors::{IssueCollector, RepoError, ValidationError},
    id::{generate_entity_id, generate_slug_suffix},
    models::{Category, NewPost, Post, PostSummary, User},
    origin::ServingOrigin,
    store::{DocumentStore, UniqueValue},
    validators::slugify,
};

/// Numbered slugs (`-2` up to this) tried before falling back to a random
/// suffix.
pub const MAX_NUMBERED_SLUGS: usize = 20;

const FALLBACK_SLUG: &str = "post";

/// Trims tags, drops empty ones and removes duplicates, keeping the first
/// occurrence of each.
pub fn normalize_tags(tags: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    tags.into_iter()
        .map(|tag| tag.trim().to_string())
        .filter(|tag| !tag.is_empty() && seen.insert(tag.clone()))
        .collect()
}

/// Slugs to try for a title, in order: the bare slug, `-2` through
/// `-MAX_NUMBERED_SLUGS`, then one randomly suffixed slug.
pub fn slug_candidates(title: &str) -> Vec<String> {
    let mut base = slugify(title);
    if base.is_empty() {
        base = FALLBACK_SLUG.to_string();
    }
    let mut candidates = Vec::with_capacity(MAX_NUMBERED_SLUGS + 1);
    candidates.push(base.clone());
    candidates.extend((2..=MAX_NUMBERED_SLUGS).map(|n| format!("{base}-{n}")));
    candidates.push(format!("{base}-{}", generate_slug_suffix()));
    candidates
}

fn dedup_ids(ids: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    ids.into_iter()
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty() && seen.insert(id.clone()))
        .collect()
}

fn is_slug_clash(err: &RepoError) -> bool {
    matches!(err, RepoError::UniqueConstraintViolation { fields, .. } if fields.iter().any(|f| f == SLUG_FIELD))
}

impl<S> BlogRepository<S>
where
    S: DocumentStore,
{
    /// Publishes a post. Its slug is derived from the title and made unique
    /// by suffixing; categories and the author must already exist.
    pub async fn create_post(&self, input: NewPost, origin: &ServingOrigin) -> Result<PostSummary, RepoError> {
        let mut issues = IssueCollector::new();
        issues.require_non_empty("title", &input.title);
        issues.require_non_empty("image", &input.image);
        if input.reading_minutes < 1 {
            issues.push("readingMinutes", "validation.range", "value must be at least 1");
        }
        issues.finish()?;

        let categories = dedup_ids(input.categories);
        for category_id in &categories {
            self.store.require::<Category>(category_id).await?;
        }
        let author = match input.author.as_deref().map(str::trim) {
            Some(author_id) if !author_id.is_empty() => Some(self.store.require::<User>(author_id).await?.id),
            _ => None,
        };

        let now = Utc::now();
        let title = input.title.trim().to_string();
        let mut post = Post {
            id: generate_entity_id(),
            slug: String::new(),
            content: input.content,
            reading_minutes: input.reading_minutes,
            tags: normalize_tags(input.tags),
            categories,
            image: input.image.trim().to_string(),
            author,
            likes: 0,
            comments: Vec::new(),
            created_at: now,
            updated_at: now,
            title,
        };

        let mut last_clash = None;
        for candidate in slug_candidates(&post.title) {
            post.slug = candidate;
            match self
                .store
                .insert(&post, &[UniqueValue::exact(SLUG_FIELD, post.slug.clone())])
                .await
            {
                Ok(()) => {
                    log::info!("published post {} as /{}", post.id, post.slug);
                    return Ok(post.summary(origin));
                }
                Err(err) if is_slug_clash(&err) => {
                    log::debug!("slug {} taken", post.slug);
                    last_clash = Some(err);
                }
                Err(err) => return Err(err),
            }
        }

        Err(last_clash.unwrap_or_else(|| RepoError::other("no slug candidates")))
    }

    pub async fn create_category(&self, name: &str) -> Result<Category, RepoError> {
        let name = name.trim();
        let slug = slugify(name);
        if slug.is_empty() {
            return Err(ValidationError::single("name", "validation.required", "must contain letters or digits").into());
        }

        let category = Category {
            id: generate_entity_id(),
            name: name.to_string(),
            slug,
            created_at: Utc::now(),
        };
        self.store
            .insert(&category, &[UniqueValue::case_insensitive("name", name)])
            .await?;
        log::info!("created category {} ({})", category.name, category.id);
        Ok(category)
    }

    /// All categories, sorted by name ignoring case.
    pub async fn list_categories(&self) -> Result<Vec<Category>, RepoError> {
        let mut categories: Vec<Category> = self.store.list_all().await?;
        categories.sort_by_key(|category| category.name.to_lowercase());
        Ok(categories)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_are_trimmed_and_deduplicated() {
        let tags = vec![" rust ".into(), "".into(), "async".into(), "rust".into(), "  ".into()];
        assert_eq!(normalize_tags(tags), ["rust", "async"]);
    }

    #[test]
    fn slug_candidates_count_up_then_randomize() {
        let candidates = slug_candidates("Hello, World!");
        assert_eq!(candidates[0], "hello-world");
        assert_eq!(candidates[1], "hello-world-2");
        assert_eq!(candidates[MAX_NUMBERED_SLUGS - 1], format!("hello-world-{MAX_NUMBERED_SLUGS}"));
        let last = candidates.last().unwrap();
        assert!(last.starts_with("hello-world-"));
        assert_eq!(candidates.len(), MAX_NUMBERED_SLUGS + 1);
    }

    #[test]
    fn titles_without_slug_characters_fall_back() {
        assert_eq!(slug_candidates("!!!")[0], "post");
    }

    #[test]
    fn only_slug_violations_count_as_clashes() {
        let clash = RepoError::UniqueConstraintViolation {
            fields: vec!["slug".into()],
            values: vec!["a".into()],
            existing_entity_id: "p1".into(),
        };
        assert!(is_slug_clash(&clash));
        assert!(!is_slug_clash(&RepoError::other("boom")));
    }
}
