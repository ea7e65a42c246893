//! End-to-end tests for the sanitization pipelines
//!
//! These tests verify that:
//! - Output sanitization strips passwords and private fields at any depth
//! - Relation visibility follows the verifier's decision exactly
//! - Input sanitization drops unknown and read-only fields
//! - Every pipeline is idempotent
//! - Whole-query sanitization touches only the fragments present

use std::sync::Arc;

use sift::prelude::*;

// =============================================================================
// Fixtures
// =============================================================================

fn init_tracing() {
    // Repeat initialization across tests is expected; only the first wins
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn registry() -> Arc<InMemoryRegistry> {
    init_tracing();
    let mut registry = InMemoryRegistry::new();
    registry.register(
        Schema::builder("api::author")
            .attribute("name", Attribute::scalar())
            .attribute("email", Attribute::scalar().private())
            .attribute("password_hash", Attribute::password())
            .attribute("avatar", Attribute::media())
            .build(),
    );
    registry.register(
        Schema::builder("api::comment")
            .attribute("body", Attribute::scalar())
            .attribute("author", Attribute::relation(RelationKind::ManyToOne, "api::author"))
            .build(),
    );
    registry.register(
        Schema::builder("blocks.quote")
            .attribute("text", Attribute::scalar())
            .attribute("attribution", Attribute::relation(RelationKind::ManyToOne, "api::author"))
            .build(),
    );
    registry.register(
        Schema::builder("blocks.gallery")
            .attribute("images", Attribute::multiple_media())
            .build(),
    );
    registry.register(
        Schema::builder("api::article")
            .attribute("title", Attribute::scalar())
            .attribute("views", Attribute::scalar().read_only())
            .attribute("internal_notes", Attribute::scalar().private())
            .attribute("author", Attribute::relation(RelationKind::ManyToOne, "api::author"))
            .attribute("comments", Attribute::relation(RelationKind::OneToMany, "api::comment"))
            .attribute("blocks", Attribute::dynamic_zone(["blocks.quote", "blocks.gallery"]))
            .build(),
    );
    Arc::new(registry)
}

fn article_schema(registry: &InMemoryRegistry) -> Arc<Schema> {
    registry.get_model("api::article").unwrap()
}

fn token(scopes: &[&str]) -> AuthContext {
    AuthContext::ApiToken {
        name: "test".to_string(),
        scopes: scopes.iter().map(|s| s.to_string()).collect(),
    }
}

// =============================================================================
// Output Sanitization Tests
// =============================================================================

mod output_tests {
    use super::*;

    #[tokio::test]
    async fn test_passwords_never_survive_at_any_depth() {
        let registry = registry();
        let schema = article_schema(&registry);
        let sanitizer = Sanitizer::new(registry);

        let out = sanitizer
            .sanitize_output(
                &AuthContext::Anonymous,
                schema,
                json!({
                    "title": "t",
                    "author": {"name": "ada", "password_hash": "root"},
                    "comments": [
                        {"body": "hi", "author": {"name": "bob", "password_hash": "nested"}}
                    ],
                    "blocks": [
                        {
                            "__component": "blocks.quote",
                            "text": "q",
                            "attribution": {"name": "eve", "password_hash": "deep"}
                        }
                    ]
                }),
            )
            .await
            .unwrap();

        let serialized = serde_json::to_string(&out).unwrap();
        assert!(!serialized.contains("password_hash"));
        assert!(!serialized.contains("root"));
        assert!(!serialized.contains("nested"));
        assert!(!serialized.contains("deep"));
    }

    #[tokio::test]
    async fn test_private_fields_removed_through_media() {
        let registry = registry();
        let schema = article_schema(&registry);
        let sanitizer = Sanitizer::new(registry);

        // The built-in file schema marks `hash` private
        let out = sanitizer
            .sanitize_output(
                &AuthContext::Anonymous,
                schema,
                json!({
                    "title": "t",
                    "author": {
                        "name": "ada",
                        "avatar": {"url": "/a.png", "hash": "abc123"}
                    }
                }),
            )
            .await
            .unwrap();

        assert_eq!(
            out,
            json!({
                "title": "t",
                "author": {"name": "ada", "avatar": {"url": "/a.png"}}
            })
        );
    }

    #[tokio::test]
    async fn test_relation_removed_exactly_when_scope_missing() {
        let registry = registry();
        let schema = article_schema(&registry);
        let sanitizer = Sanitizer::new(registry).with_verifier(Arc::new(TokenScopeVerifier));

        let entity = json!({
            "title": "t",
            "author": {"name": "ada"},
            "comments": [{"body": "hi"}]
        });

        // findOne grants the to-one, find is still missing for the to-many
        let out = sanitizer
            .sanitize_output(
                &token(&["api::author.findOne"]),
                schema.clone(),
                entity.clone(),
            )
            .await
            .unwrap();
        assert_eq!(out, json!({"title": "t", "author": {"name": "ada"}}));

        let out = sanitizer
            .sanitize_output(
                &token(&["api::author.findOne", "api::comment.find"]),
                schema,
                entity.clone(),
            )
            .await
            .unwrap();
        assert_eq!(out, entity);
    }

    #[tokio::test]
    async fn test_anonymous_with_allow_all_keeps_relations() {
        let registry = registry();
        let schema = article_schema(&registry);
        let sanitizer = Sanitizer::new(registry).with_verifier(Arc::new(AllowAllVerifier));

        let entity = json!({"title": "t", "author": {"name": "ada"}});
        let out = sanitizer
            .sanitize_output(&AuthContext::Anonymous, schema, entity.clone())
            .await
            .unwrap();
        assert_eq!(out, entity);
    }

    #[tokio::test]
    async fn test_output_sanitization_is_idempotent() {
        let registry = registry();
        let schema = article_schema(&registry);
        let sanitizer = Sanitizer::new(registry).with_verifier(Arc::new(TokenScopeVerifier));

        let once = sanitizer
            .sanitize_output(
                &token(&["api::author.findOne"]),
                schema.clone(),
                json!({
                    "title": "t",
                    "internal_notes": "n",
                    "author": {"name": "ada", "email": "a@b.c"},
                    "comments": [{"body": "hi"}]
                }),
            )
            .await
            .unwrap();
        let twice = sanitizer
            .sanitize_output(&token(&["api::author.findOne"]), schema, once.clone())
            .await
            .unwrap();
        assert_eq!(once, twice);
    }
}

// =============================================================================
// Input Sanitization Tests
// =============================================================================

mod input_tests {
    use super::*;

    #[tokio::test]
    async fn test_unknown_and_read_only_fields_dropped() {
        let registry = registry();
        let schema = article_schema(&registry);
        let sanitizer = Sanitizer::new(registry);

        let out = sanitizer
            .sanitize_input(
                schema,
                json!({
                    "title": "t",
                    "views": 9000,
                    "injected": {"$gt": 1},
                    "author": {"name": "ada", "bogus": true}
                }),
            )
            .await
            .unwrap();

        assert_eq!(
            out,
            json!({"title": "t", "author": {"name": "ada"}})
        );
    }

    #[tokio::test]
    async fn test_id_survives_input_sanitization() {
        let registry = registry();
        let schema = article_schema(&registry);
        let sanitizer = Sanitizer::new(registry);

        let out = sanitizer
            .sanitize_input(schema, json!({"id": 7, "title": "t"}))
            .await
            .unwrap();

        assert_eq!(out, json!({"id": 7, "title": "t"}));
    }

    #[tokio::test]
    async fn test_input_extension_runs_after_builtin_passes() {
        struct Slugify;

        #[async_trait]
        impl SanitizerExtension for Slugify {
            async fn sanitize(
                &self,
                _schema: Arc<Schema>,
                mut data: Value,
            ) -> std::result::Result<Value, SiftError> {
                if let Some(title) = data.get("title").and_then(Value::as_str) {
                    let slug = title.to_lowercase().replace(' ', "-");
                    data.as_object_mut()
                        .unwrap()
                        .insert("slug".to_string(), json!(slug));
                }
                Ok(data)
            }
        }

        let registry = registry();
        let schema = article_schema(&registry);
        let sanitizer = Sanitizer::new(registry).with_input_extension(Arc::new(Slugify));

        let out = sanitizer
            .sanitize_input(schema, json!({"title": "Hello World", "bogus": 1}))
            .await
            .unwrap();

        assert_eq!(out, json!({"title": "Hello World", "slug": "hello-world"}));
    }
}

// =============================================================================
// Whole-Query Sanitization Tests
// =============================================================================

mod query_tests {
    use super::*;

    #[tokio::test]
    async fn test_all_fragments_sanitized_together() {
        let registry = registry();
        let schema = article_schema(&registry);
        let sanitizer = Sanitizer::new(registry);

        let query = Query {
            filters: Some(json!({
                "$and": [
                    {"title": {"$eq": "x"}},
                    {"internal_notes": {"$eq": "y"}}
                ]
            })),
            sort: Some(json!("title:desc,internal_notes:asc")),
            fields: Some(json!(["title", "internal_notes", "author"])),
            populate: Some(json!({"author": {"fields": ["name", "email"], "count": true}})),
        };

        let out = sanitizer
            .sanitize_query(&AuthContext::Anonymous, schema, query)
            .await
            .unwrap();

        assert_eq!(out.filters, Some(json!({"$and": [{"title": {"$eq": "x"}}]})));
        assert_eq!(out.sort, Some(json!("title:desc")));
        assert_eq!(out.fields, Some(json!(["id", "title"])));
        assert_eq!(
            out.populate,
            Some(json!({"author": {"fields": ["id", "name"], "count": true}}))
        );
    }

    #[tokio::test]
    async fn test_absent_fragments_stay_absent() {
        let registry = registry();
        let schema = article_schema(&registry);
        let sanitizer = Sanitizer::new(registry);

        let out = sanitizer
            .sanitize_query(
                &AuthContext::Anonymous,
                schema,
                Query {
                    filters: Some(json!({"title": "x"})),
                    ..Query::default()
                },
            )
            .await
            .unwrap();

        assert!(out.sort.is_none());
        assert!(out.fields.is_none());
        assert!(out.populate.is_none());
    }

    #[tokio::test]
    async fn test_restricted_relation_removed_from_every_fragment() {
        let registry = registry();
        let schema = article_schema(&registry);
        let sanitizer = Sanitizer::new(registry).with_verifier(Arc::new(TokenScopeVerifier));

        let query = Query {
            filters: Some(json!({"author": {"name": {"$eq": "ada"}}, "title": "x"})),
            populate: Some(json!({"author": {}, "comments": {}})),
            ..Query::default()
        };

        let out = sanitizer
            .sanitize_query(&token(&["api::comment.find"]), schema, query)
            .await
            .unwrap();

        assert_eq!(out.filters, Some(json!({"title": "x"})));
        assert_eq!(out.populate, Some(json!({"comments": {}})));
    }

    #[tokio::test]
    async fn test_invalid_fragment_shape_fails_the_query() {
        let registry = registry();
        let schema = article_schema(&registry);
        let sanitizer = Sanitizer::new(registry);

        let query = Query {
            sort: Some(json!(42)),
            ..Query::default()
        };
        let err = sanitizer
            .sanitize_query(&AuthContext::Anonymous, schema, query)
            .await
            .unwrap_err();
        assert!(matches!(err, SiftError::InvalidSort));
    }
}
