use std::collections::HashSet;

use serde_json::{Value, json};

use quarry::{Document, DocumentStore, DuplicatePolicy, QuarryError};

fn ids(documents: &[Document]) -> HashSet<String> {
    documents.iter().map(|d| d.id().to_string()).collect()
}

fn catalog() -> quarry::Result<DocumentStore> {
    let mut store = DocumentStore::new();
    store.write_documents(
        vec![
            Document::text("n1", "Markets rally on rate cut")
                .with_meta("type", "News Paper")
                .with_meta("date", "2018-03-02")
                .with_meta("rating", 4)
                .with_meta("genre", "economy"),
            Document::text("n2", "Election results")
                .with_meta("type", "News Paper")
                .with_meta("date", "2020-11-04")
                .with_meta("rating", 2)
                .with_meta("genre", "politics"),
            Document::text("b1", "My favourite pasta")
                .with_meta("type", "Blog Post")
                .with_meta("date", "2017-05-10")
                .with_meta("rating", 5),
            Document::text("b2", "Ten tips for Rust")
                .with_meta("type", "Blog Post")
                .with_meta("date", "2021-01-15")
                .with_meta("rating", "3")
                .with_meta("publisher", "nytimes"),
        ],
        DuplicatePolicy::Fail,
    )?;
    Ok(store)
}

fn filtered(store: &DocumentStore, expression: Value) -> quarry::Result<HashSet<String>> {
    Ok(ids(&store.filter_documents_json(&expression)?))
}

fn set(items: &[&str]) -> HashSet<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[test]
fn test_empty_filter_returns_everything() -> quarry::Result<()> {
    let store = catalog()?;
    assert_eq!(filtered(&store, json!({}))?, set(&["n1", "n2", "b1", "b2"]));
    assert_eq!(filtered(&store, Value::Null)?, set(&["n1", "n2", "b1", "b2"]));
    Ok(())
}

#[test]
fn test_article_rating_scenario() -> quarry::Result<()> {
    let mut store = DocumentStore::new();
    store.write_documents(
        vec![
            Document::text("1", "first").with_meta("type", "article").with_meta("rating", 5),
            Document::text("2", "second").with_meta("type", "blog").with_meta("rating", 5),
        ],
        DuplicatePolicy::Fail,
    )?;
    let matched = filtered(&store, json!({"type": "article", "rating": {"GTE": 3}}))?;
    assert_eq!(matched, set(&["1"]));
    Ok(())
}

#[test]
fn test_and_is_intersection() -> quarry::Result<()> {
    let store = catalog()?;
    let pairs = [
        (json!({"type": "News Paper"}), json!({"rating": {"GTE": 3}})),
        (json!({"date": {"LT": "2019-01-01"}}), json!({"rating": {"LTE": 4}})),
        (json!({"genre": ["economy", "politics"]}), json!({"NOT": {"rating": 2}})),
    ];
    for (left, right) in pairs {
        let expected: HashSet<String> = filtered(&store, left.clone())?
            .intersection(&filtered(&store, right.clone())?)
            .cloned()
            .collect();
        let combined = filtered(&store, json!({"AND": [left, right]}))?;
        assert_eq!(combined, expected);
    }
    Ok(())
}

#[test]
fn test_documented_example() -> quarry::Result<()> {
    let store = catalog()?;
    let matched = filtered(
        &store,
        json!({
            "$and": {
                "type": {"$eq": "News Paper"},
                "date": {"$gte": "2015-01-01", "$lt": "2021-01-01"},
                "rating": {"$gte": 3},
                "$or": {
                    "genre": {"$in": ["economy", "politics"]},
                    "publisher": {"$eq": "nytimes"}
                }
            }
        }),
    )?;
    assert_eq!(matched, set(&["n1"]));
    Ok(())
}

#[test]
fn test_repeated_operator_via_list() -> quarry::Result<()> {
    let store = catalog()?;
    let matched = filtered(
        &store,
        json!({
            "OR": [
                {"AND": {"type": "News Paper", "date": {"LT": "2019-01-01"}}},
                {"AND": {"type": "Blog Post", "date": {"GTE": "2019-01-01"}}}
            ]
        }),
    )?;
    assert_eq!(matched, set(&["n1", "b2"]));
    Ok(())
}

#[test]
fn test_numeric_string_metadata() -> quarry::Result<()> {
    let store = catalog()?;
    // b2 stores its rating as the string "3".
    assert_eq!(filtered(&store, json!({"rating": 3}))?, set(&["b2"]));
    assert_eq!(
        filtered(&store, json!({"rating": {"GT": 2, "LT": 5}}))?,
        set(&["n1", "b2"])
    );
    Ok(())
}

#[test]
fn test_missing_fields_with_in_and_nin() -> quarry::Result<()> {
    let store = catalog()?;
    assert_eq!(
        filtered(&store, json!({"publisher": {"IN": ["nytimes", "guardian"]}}))?,
        set(&["b2"])
    );
    assert_eq!(
        filtered(&store, json!({"publisher": {"NIN": ["nytimes"]}}))?,
        set(&["n1", "n2", "b1"])
    );
    Ok(())
}

#[test]
fn test_filter_by_id() -> quarry::Result<()> {
    let store = catalog()?;
    let found = store.filter_documents_json(&json!({"id": {"EQ": "b1"}}))?;
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id(), "b1");
    Ok(())
}

#[test]
fn test_filter_errors() -> quarry::Result<()> {
    let store = catalog()?;
    let cases = [
        json!({"type": {"GT": 3}}),
        json!({"NOT": [{"type": "Blog Post"}, {"rating": 5}]}),
        json!({"type": {"$contains": "Blog"}}),
        json!({"type": {"genre": "economy"}}),
    ];
    for case in cases {
        let err = store.filter_documents_json(&case).unwrap_err();
        assert!(matches!(err, QuarryError::Filter(_)), "{case}: {err}");
    }
    Ok(())
}
