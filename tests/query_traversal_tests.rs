//! Integration tests for the query-shape adapters and strict validation
//!
//! These tests verify that:
//! - Each adapter preserves the input's syntactic shape
//! - Collapsed clauses are dropped where the shape calls for it
//! - Wildcard populate expands deterministically in declaration order
//! - Allow-lists and deny-lists match on attribute paths, not raw paths
//! - Strict validation reports the first offending path

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

fn registry() -> InMemoryRegistry {
    init_tracing();
    let mut registry = InMemoryRegistry::new();
    registry.register(
        Schema::builder("api::author")
            .attribute("name", Attribute::scalar())
            .attribute("email", Attribute::scalar().private())
            .attribute("avatar", Attribute::media())
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
            .attribute("rating", Attribute::scalar())
            .attribute("secret", Attribute::scalar().private())
            .attribute("author", Attribute::relation(RelationKind::ManyToOne, "api::author"))
            .attribute("cover", Attribute::media())
            .attribute("blocks", Attribute::dynamic_zone(["blocks.quote", "blocks.gallery"]))
            .attribute("mentions", Attribute::morph_relation(RelationKind::MorphToMany))
            .build(),
    );
    registry
}

fn article(registry: &InMemoryRegistry) -> Arc<Schema> {
    registry.get_model("api::article").unwrap()
}

// =============================================================================
// Filters Tests
// =============================================================================

mod filters_tests {
    use super::*;
    use sift::traverse::query::filters;

    #[tokio::test]
    async fn test_nested_operators_recurse_against_same_schema() {
        let registry = registry();

        let out = filters::traverse(
            &RemovePrivate,
            &registry,
            article(&registry),
            json!({
                "$or": [
                    {"$and": [{"title": {"$eq": "a"}}, {"secret": "x"}]},
                    {"rating": {"$gt": 3}}
                ]
            }),
        )
        .await
        .unwrap();

        assert_eq!(
            out,
            json!({
                "$or": [
                    {"$and": [{"title": {"$eq": "a"}}]},
                    {"rating": {"$gt": 3}}
                ]
            })
        );
    }

    #[tokio::test]
    async fn test_fully_collapsed_clause_leaves_empty_array() {
        let registry = registry();

        let out = filters::traverse(
            &RemovePrivate,
            &registry,
            article(&registry),
            json!({"$and": [{"secret": "x"}, {"author": {"email": "a@b.c"}}]}),
        )
        .await
        .unwrap();

        assert_eq!(out, json!({"$and": []}));
    }

    #[tokio::test]
    async fn test_morph_relations_removed_from_filters() {
        let registry = registry();

        let out = filters::traverse(
            &RemoveMorphRelations,
            &registry,
            article(&registry),
            json!({"title": "x", "mentions": {"id": {"$eq": 1}}}),
        )
        .await
        .unwrap();

        assert_eq!(out, json!({"title": "x"}));
    }
}

// =============================================================================
// Sort Tests
// =============================================================================

mod sort_tests {
    use super::*;
    use sift::traverse::query::sort;

    #[tokio::test]
    async fn test_comma_string_shape_round_trips() {
        let registry = registry();

        let out = sort::traverse(
            &RemovePrivate,
            &registry,
            article(&registry),
            json!("title:desc,secret:asc,rating"),
        )
        .await
        .unwrap();

        assert_eq!(out, json!("title:desc,rating"));
    }

    #[tokio::test]
    async fn test_array_and_object_shapes_round_trip() {
        let registry = registry();

        let out = sort::traverse(
            &RemovePrivate,
            &registry,
            article(&registry),
            json!(["title:desc", "secret"]),
        )
        .await
        .unwrap();
        assert_eq!(out, json!(["title:desc"]));

        let out = sort::traverse(
            &RemovePrivate,
            &registry,
            article(&registry),
            json!({"title": "desc", "secret": "asc"}),
        )
        .await
        .unwrap();
        assert_eq!(out, json!({"title": "desc"}));
    }

    #[tokio::test]
    async fn test_dotted_path_carries_order_to_deepest_segment() {
        let registry = registry();

        let out = sort::traverse(
            &RemovePrivate,
            &registry,
            article(&registry),
            json!("author.name:asc,author.email:desc"),
        )
        .await
        .unwrap();

        assert_eq!(out, json!("author.name:asc"));
    }

    #[tokio::test]
    async fn test_unsupported_shape_rejected() {
        let registry = registry();

        let err = sort::traverse(&RemovePrivate, &registry, article(&registry), json!(true))
            .await
            .unwrap_err();
        assert!(matches!(err, SiftError::InvalidSort));
    }
}

// =============================================================================
// Fields Tests
// =============================================================================

mod fields_tests {
    use super::*;
    use sift::traverse::query::fields;

    #[tokio::test]
    async fn test_selection_reduced_to_scalars_with_id() {
        let registry = registry();

        let out = fields::traverse(
            &RemovePrivate,
            &registry,
            article(&registry),
            json!(["title", "secret", "author", "cover", "nope"]),
        )
        .await
        .unwrap();

        assert_eq!(out, json!(["id", "title"]));
    }

    #[tokio::test]
    async fn test_star_selection_passes_through() {
        let registry = registry();

        let out = fields::traverse(&RemovePrivate, &registry, article(&registry), json!("*"))
            .await
            .unwrap();
        assert_eq!(out, json!("*"));
    }

    #[tokio::test]
    async fn test_existing_id_not_duplicated() {
        let registry = registry();

        let out = fields::traverse(
            &RemovePrivate,
            &registry,
            article(&registry),
            json!(["id", "rating"]),
        )
        .await
        .unwrap();
        assert_eq!(out, json!(["id", "rating"]));
    }
}

// =============================================================================
// Populate Tests
// =============================================================================

mod populate_tests {
    use super::*;
    use sift::traverse::query::populate;

    #[tokio::test]
    async fn test_wildcard_expansion_is_deterministic() {
        let registry = registry();

        let first = populate::traverse(&RemovePrivate, &registry, article(&registry), json!("*"))
            .await
            .unwrap();
        let second = populate::traverse(&RemovePrivate, &registry, article(&registry), json!("*"))
            .await
            .unwrap();

        // Declaration order: author, cover, blocks, mentions
        assert_eq!(first, second);
        let keys: Vec<&String> = first.as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["author", "cover", "blocks", "mentions"]);
    }

    #[tokio::test]
    async fn test_nested_wildcard_expands_in_target_scope() {
        let registry = registry();

        let out = populate::traverse(
            &RemovePrivate,
            &registry,
            article(&registry),
            json!({"author": {"populate": "*"}}),
        )
        .await
        .unwrap();

        assert_eq!(out, json!({"author": {"populate": {"avatar": {}}}}));
    }

    #[tokio::test]
    async fn test_dynamic_zone_generic_fragment_merges_types() {
        let registry = registry();

        let out = populate::traverse(
            &RemovePrivate,
            &registry,
            article(&registry),
            json!({"blocks": {"populate": "*"}}),
        )
        .await
        .unwrap();

        assert_eq!(
            out["blocks"]["populate"],
            json!({"attribution": {}, "images": {}})
        );
    }

    #[tokio::test]
    async fn test_dynamic_zone_on_fragment_filters_unallowed_types() {
        let registry = registry();

        let out = populate::traverse(
            &RemovePrivate,
            &registry,
            article(&registry),
            json!({"blocks": {"on": {
                "blocks.quote": {"populate": ["attribution"]},
                "api::author": {"populate": ["avatar"]}
            }}}),
        )
        .await
        .unwrap();

        assert_eq!(
            out,
            json!({"blocks": {"on": {"blocks.quote": {"populate": ["attribution"]}}}})
        );
    }

    #[tokio::test]
    async fn test_deep_options_sanitized_in_target_scope() {
        let registry = registry();

        let out = populate::traverse(
            &RemovePrivate,
            &registry,
            article(&registry),
            json!({"author": {
                "fields": ["name", "email"],
                "sort": "name:asc,email:desc",
                "filters": {"email": {"$eq": "a@b.c"}, "name": "ada"}
            }}),
        )
        .await
        .unwrap();

        assert_eq!(
            out,
            json!({"author": {
                "fields": ["id", "name"],
                "sort": "name:asc",
                "filters": {"name": "ada"}
            }})
        );
    }
}

// =============================================================================
// Field List Tests
// =============================================================================

mod field_list_tests {
    use super::*;
    use sift::traverse::query::filters;

    #[tokio::test]
    async fn test_allow_list_matches_attribute_path_through_operators() {
        let registry = registry();
        let visitor = AllowedFields::new(Some(vec!["title".to_string()]));

        let out = filters::traverse(
            &visitor,
            &registry,
            article(&registry),
            json!({"$and": [{"title": {"$eq": "x"}}, {"rating": {"$gt": 3}}]}),
        )
        .await
        .unwrap();

        assert_eq!(out, json!({"$and": [{"title": {"$eq": "x"}}]}));
    }

    #[tokio::test]
    async fn test_deny_list_removes_relation_subtree() {
        let registry = registry();
        let visitor = RestrictedFields::new(Some(vec!["author".to_string()]));

        let out = filters::traverse(
            &visitor,
            &registry,
            article(&registry),
            json!({"title": "x", "author": {"name": {"$eq": "ada"}}}),
        )
        .await
        .unwrap();

        assert_eq!(out, json!({"title": "x"}));
    }
}

// =============================================================================
// Validation Tests
// =============================================================================

mod validation_tests {
    use super::*;

    #[tokio::test]
    async fn test_validate_reports_raw_path_of_unknown_key() {
        let registry = registry();

        let err = validate_filters(
            &registry,
            article(&registry),
            &json!({"$or": [{"title": "x"}, {"typo_field": "y"}]}),
        )
        .await
        .unwrap_err();

        match err {
            SiftError::UnrecognizedField { path } => assert_eq!(path, "$or.1.typo_field"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_validate_rejects_private_in_sort() {
        let registry = registry();

        let err = validate_sort(&registry, article(&registry), &json!("secret:asc"))
            .await
            .unwrap_err();
        assert!(matches!(err, SiftError::RestrictedField { .. }));
    }

    #[tokio::test]
    async fn test_validate_accepts_clean_query() {
        let registry = registry();

        let query = Query {
            filters: Some(json!({"author": {"name": {"$contains": "a"}}})),
            sort: Some(json!(["title:desc", "rating"])),
            fields: Some(json!("title,rating")),
            populate: Some(json!({"author": {"fields": ["name"]}})),
        };
        assert!(
            validate_query(&registry, article(&registry), &query)
                .await
                .is_ok()
        );
    }
}
