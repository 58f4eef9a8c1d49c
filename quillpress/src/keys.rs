/// Key-construction helpers for the Redis store.
#[derive(Debug, Clone)]
pub struct KeyContext<'a> {
    pub prefix: &'a str,
    pub service: &'a str,
}

impl<'a> KeyContext<'a> {
    pub fn new(prefix: &'a str, service: &'a str) -> Self {
        Self { prefix, service }
    }

    pub fn entity(&self, collection: &str, entity_id: &str) -> String {
        format!("{}:{}:{}:{}", self.prefix, self.service, collection, entity_id)
    }

    /// Key prefix shared by every document of a collection (used for index
    /// definitions and scans).
    pub fn collection_prefix(&self, collection: &str) -> String {
        format!("{}:{}:{}:", self.prefix, self.service, collection)
    }

    /// Key holding the id of the document that owns a unique value.
    /// Format: prefix:service:unique:collection:field:value
    pub fn unique(&self, collection: &str, field: &str, value: &str) -> String {
        format!(
            "{}:{}:unique:{}:{}:{}",
            self.prefix, self.service, collection, field, value
        )
    }

    pub fn index(&self, collection: &str) -> String {
        format!("{}:{}:idx:{}", self.prefix, self.service, collection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_entity_keys() {
        let ctx = KeyContext::new("quill", "blog");
        assert_eq!(ctx.entity("posts", "abc"), "quill:blog:posts:abc");
        assert_eq!(ctx.collection_prefix("posts"), "quill:blog:posts:");
    }

    #[test]
    fn unique_keys_live_outside_collection_prefix() {
        let ctx = KeyContext::new("quill", "blog");
        let key = ctx.unique("users", "email", "ada@example.com");
        assert_eq!(key, "quill:blog:unique:users:email:ada@example.com");
        assert!(!key.starts_with(&ctx.collection_prefix("users")));
    }
}
