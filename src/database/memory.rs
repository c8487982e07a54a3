//! In-process document store. Backs `DATABASE_URL=memory://` deployments and
//! the interactor tests. It understands the subset of the MongoDB query and
//! update language the interactors actually use.
//!
//! Null follows MongoDB: `{field: null}` matches a stored null and a missing
//! field, while `$exists` only looks at presence, so a stored null exists.
//! Update paths support plain keys, numeric indexes, `$[]` and `$[name]`
//! with array filters. The positional `$` operator is not supported.

use super::collection::{Collection, Entity, Page};
use crate::utils::error::AppError;
use async_trait::async_trait;
use mongodb::bson::{self, Bson, Document};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;

pub struct MemoryCollection<T> {
    items: RwLock<Vec<T>>,
    inserts: AtomicUsize,
    reads: AtomicUsize,
}

impl<T: Entity> MemoryCollection<T> {
    pub fn new() -> Self {
        Self::with_items(Vec::new())
    }

    pub fn with_items(items: Vec<T>) -> Self {
        Self {
            items: RwLock::new(items),
            inserts: AtomicUsize::new(0),
            reads: AtomicUsize::new(0),
        }
    }

    /// Number of `insert_item` calls observed.
    pub fn insert_calls(&self) -> usize {
        self.inserts.load(Ordering::SeqCst)
    }

    /// Number of read calls observed (item, items, count).
    pub fn read_calls(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub async fn snapshot(&self) -> Vec<T> {
        self.items.read().await.clone()
    }

    fn matching(items: &[T], filter: &Document) -> Result<Vec<T>, AppError> {
        let mut out = Vec::new();
        for item in items {
            let document = bson::to_document(item)?;
            if matches_filter(&document, filter)? {
                out.push(item.clone());
            }
        }
        Ok(out)
    }
}

impl<T: Entity> Default for MemoryCollection<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<T: Entity> Collection<T> for MemoryCollection<T> {
    async fn item(&self, filter: Document) -> Result<Option<T>, AppError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let items = self.items.read().await;
        Ok(Self::matching(&items, &filter)?.into_iter().next())
    }

    async fn items(&self, filter: Document, page: Page) -> Result<Vec<T>, AppError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let items = self.items.read().await;
        let found = Self::matching(&items, &filter)?.into_iter().skip(page.offset as usize);
        Ok(match page.limit {
            Some(limit) => found.take(limit as usize).collect(),
            None => found.collect(),
        })
    }

    async fn insert_item(&self, item: &T) -> Result<(), AppError> {
        self.inserts.fetch_add(1, Ordering::SeqCst);
        let mut items = self.items.write().await;
        if items.iter().any(|existing| existing.id() == item.id()) {
            return Err(AppError::DatabaseError(format!("duplicate id {}", item.id())));
        }
        items.push(item.clone());
        Ok(())
    }

    async fn update_item(&self, item: &T) -> Result<(), AppError> {
        let mut items = self.items.write().await;
        match items.iter_mut().find(|existing| existing.id() == item.id()) {
            Some(existing) => {
                *existing = item.clone();
                Ok(())
            }
            None => Err(AppError::NotFound(format!("document {}", item.id()))),
        }
    }

    async fn update_items(
        &self,
        filter: Document,
        update: Document,
        array_filters: Vec<Document>,
    ) -> Result<u64, AppError> {
        let mut items = self.items.write().await;
        let mut matched = 0;
        for item in items.iter_mut() {
            let mut document = bson::to_document(&*item)?;
            if !matches_filter(&document, &filter)? {
                continue;
            }
            apply_update(&mut document, &update, &array_filters)?;
            *item = bson::from_document(document)?;
            matched += 1;
        }
        Ok(matched)
    }

    async fn delete_item(&self, id: &str) -> Result<bool, AppError> {
        let mut items = self.items.write().await;
        let before = items.len();
        items.retain(|existing| existing.id() != id);
        Ok(items.len() != before)
    }

    async fn delete_items(&self, filter: Document) -> Result<u64, AppError> {
        let mut items = self.items.write().await;
        let mut kept = Vec::with_capacity(items.len());
        let mut deleted = 0;
        for item in items.drain(..) {
            if matches_filter(&bson::to_document(&item)?, &filter)? {
                deleted += 1;
            } else {
                kept.push(item);
            }
        }
        *items = kept;
        Ok(deleted)
    }

    async fn count(&self, filter: Document) -> Result<u64, AppError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let items = self.items.read().await;
        Ok(Self::matching(&items, &filter)?.len() as u64)
    }
}

pub fn matches_filter(document: &Document, filter: &Document) -> Result<bool, AppError> {
    for (key, expected) in filter {
        let ok = match key.as_str() {
            "$or" => any_of(document, expected)?,
            "$and" => all_of(document, expected)?,
            field => matches_field(lookup(document, field), expected)?,
        };
        if !ok {
            return Ok(false);
        }
    }
    Ok(true)
}

fn subfilters(value: &Bson) -> Result<Vec<&Document>, AppError> {
    match value {
        Bson::Array(filters) => filters
            .iter()
            .map(|f| match f {
                Bson::Document(d) => Ok(d),
                other => Err(AppError::DatabaseError(format!("invalid logical clause {}", other))),
            })
            .collect(),
        other => Err(AppError::DatabaseError(format!("expected array, got {}", other))),
    }
}

fn any_of(document: &Document, value: &Bson) -> Result<bool, AppError> {
    for filter in subfilters(value)? {
        if matches_filter(document, filter)? {
            return Ok(true);
        }
    }
    Ok(false)
}

fn all_of(document: &Document, value: &Bson) -> Result<bool, AppError> {
    for filter in subfilters(value)? {
        if !matches_filter(document, filter)? {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Resolves a dotted path. Arrays along the way fan out, so `roles.org_id`
/// yields every role's org id.
fn lookup<'a>(document: &'a Document, path: &str) -> Vec<&'a Bson> {
    let mut current: Vec<&Bson> = Vec::new();
    let mut parts = path.split('.');
    match parts.next().and_then(|first| document.get(first)) {
        Some(value) => current.push(value),
        None => return current,
    }
    for part in parts {
        let mut next = Vec::new();
        for value in current {
            match value {
                Bson::Document(d) => next.extend(d.get(part)),
                Bson::Array(values) => {
                    for v in values {
                        if let Bson::Document(d) = v {
                            next.extend(d.get(part));
                        }
                    }
                }
                _ => {}
            }
        }
        current = next;
    }
    current
}

fn is_operator_document(value: &Bson) -> Option<&Document> {
    match value {
        Bson::Document(d) if d.keys().next().map_or(false, |k| k.starts_with('$')) => Some(d),
        _ => None,
    }
}

fn matches_field(values: Vec<&Bson>, expected: &Bson) -> Result<bool, AppError> {
    let Some(operators) = is_operator_document(expected) else {
        if matches!(expected, Bson::Null) && values.is_empty() {
            return Ok(true);
        }
        return Ok(values.iter().any(|v| equals(v, expected)));
    };

    for (op, arg) in operators {
        let ok = match op.as_str() {
            "$eq" => values.iter().any(|v| equals(v, arg)),
            "$ne" => !values.iter().any(|v| equals(v, arg)),
            "$in" => {
                let options = array(arg)?;
                values.iter().any(|v| options.iter().any(|o| equals(v, o)))
            }
            "$nin" => {
                let options = array(arg)?;
                !values.iter().any(|v| options.iter().any(|o| equals(v, o)))
            }
            "$exists" => !values.is_empty() == matches!(arg, Bson::Boolean(true)),
            "$regex" => {
                let flags = match operators.get("$options") {
                    Some(Bson::String(flags)) => flags.as_str(),
                    _ => "",
                };
                let pattern = match arg {
                    Bson::String(p) => p.clone(),
                    Bson::RegularExpression(r) => r.pattern.clone(),
                    other => return Err(AppError::DatabaseError(format!("invalid $regex {}", other))),
                };
                let re = regex::RegexBuilder::new(&pattern)
                    .case_insensitive(flags.contains('i'))
                    .build()
                    .map_err(|e| AppError::UserInput(format!("invalid pattern: {}", e)))?;
                values.iter().any(|v| match v {
                    Bson::String(s) => re.is_match(s),
                    Bson::Array(items) => items
                        .iter()
                        .any(|i| matches!(i, Bson::String(s) if re.is_match(s))),
                    _ => false,
                })
            }
            "$options" => true,
            other => {
                return Err(AppError::DatabaseError(format!("unsupported operator {}", other)));
            }
        };
        if !ok {
            return Ok(false);
        }
    }
    Ok(true)
}

fn array(value: &Bson) -> Result<&Vec<Bson>, AppError> {
    match value {
        Bson::Array(values) => Ok(values),
        other => Err(AppError::DatabaseError(format!("expected array, got {}", other))),
    }
}

fn equals(actual: &Bson, expected: &Bson) -> bool {
    if actual == expected {
        return true;
    }
    match actual {
        Bson::Array(values) => values.iter().any(|v| v == expected),
        Bson::Int32(a) => matches!(expected, Bson::Int64(b) if i64::from(*a) == *b),
        Bson::Int64(a) => matches!(expected, Bson::Int32(b) if *a == i64::from(*b)),
        _ => false,
    }
}

pub fn apply_update(
    document: &mut Document,
    update: &Document,
    array_filters: &[Document],
) -> Result<(), AppError> {
    for (op, fields) in update {
        let Bson::Document(fields) = fields else {
            return Err(AppError::DatabaseError(format!("{} expects a document", op)));
        };
        for (path, value) in fields {
            let parts: Vec<&str> = path.split('.').collect();
            let create = matches!(op.as_str(), "$set" | "$push" | "$addToSet");
            walk(document, &parts, create, array_filters, &mut |parent: &mut Document, key: &str| {
                apply_operator(op, parent, key, value)
            })?;
        }
    }
    Ok(())
}

type Apply<'a> = dyn FnMut(&mut Document, &str) -> Result<(), AppError> + 'a;

/// Visits the parent document of every field the path selects.
fn walk(
    document: &mut Document,
    parts: &[&str],
    create: bool,
    array_filters: &[Document],
    apply: &mut Apply<'_>,
) -> Result<(), AppError> {
    let Some((key, rest)) = parts.split_first() else {
        return Ok(());
    };
    if rest.is_empty() {
        return apply(document, key);
    }
    if matches!(document.get(*key), None | Some(Bson::Null)) {
        if !create {
            return Ok(());
        }
        document.insert(*key, Document::new());
    }
    match document.get_mut(*key) {
        Some(Bson::Document(inner)) => walk(inner, rest, create, array_filters, apply),
        Some(Bson::Array(items)) => {
            let Some((selector, rest)) = rest.split_first() else {
                return Ok(());
            };
            if rest.is_empty() {
                return Err(AppError::DatabaseError(format!(
                    "cannot update array element {}.{} in place",
                    key, selector
                )));
            }
            for (index, item) in items.iter_mut().enumerate() {
                let Bson::Document(element) = item else {
                    continue;
                };
                if selects(selector, index, element, array_filters)? {
                    walk(element, rest, create, array_filters, apply)?;
                }
            }
            Ok(())
        }
        _ => Err(AppError::DatabaseError(format!("cannot traverse {}", key))),
    }
}

fn selects(
    selector: &str,
    index: usize,
    element: &Document,
    array_filters: &[Document],
) -> Result<bool, AppError> {
    if selector == "$[]" {
        return Ok(true);
    }
    let Some(name) = selector.strip_prefix("$[").and_then(|s| s.strip_suffix(']')) else {
        return Ok(selector.parse::<usize>().map_or(false, |i| i == index));
    };
    let prefix = format!("{}.", name);
    let mut bound = Document::new();
    for filter in array_filters {
        for (path, expected) in filter {
            if let Some(field) = path.strip_prefix(&prefix) {
                bound.insert(field, expected.clone());
            }
        }
    }
    if bound.is_empty() {
        return Err(AppError::DatabaseError(format!("no array filter for {}", selector)));
    }
    matches_filter(element, &bound)
}

fn apply_operator(op: &str, parent: &mut Document, key: &str, value: &Bson) -> Result<(), AppError> {
    match op {
        "$set" => {
            parent.insert(key, value.clone());
        }
        "$unset" => {
            parent.remove(key);
        }
        "$push" | "$addToSet" => {
            let additions = match value {
                Bson::Document(d) => match d.get("$each") {
                    Some(each) => array(each)?.clone(),
                    None => vec![value.clone()],
                },
                other => vec![other.clone()],
            };
            if !parent.contains_key(key) {
                parent.insert(key, Bson::Array(Vec::new()));
            }
            let Some(Bson::Array(items)) = parent.get_mut(key) else {
                return Err(AppError::DatabaseError(format!("{} on non-array {}", op, key)));
            };
            for addition in additions {
                if op == "$push" || !items.contains(&addition) {
                    items.push(addition);
                }
            }
        }
        "$pull" => {
            let Some(Bson::Array(items)) = parent.get_mut(key) else {
                return Ok(());
            };
            let mut kept = Vec::with_capacity(items.len());
            for item in items.drain(..) {
                if !pull_matches(&item, value)? {
                    kept.push(item);
                }
            }
            *items = kept;
        }
        other => {
            return Err(AppError::DatabaseError(format!("unsupported update operator {}", other)));
        }
    }
    Ok(())
}

/// `$pull` condition: a query over document elements, an operator document
/// over scalars, or a plain value.
fn pull_matches(item: &Bson, condition: &Bson) -> Result<bool, AppError> {
    if is_operator_document(condition).is_some() {
        return matches_field(vec![item], condition);
    }
    match (item, condition) {
        (Bson::Document(element), Bson::Document(query)) => matches_filter(element, query),
        _ => Ok(item == condition),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::doc;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
    struct Row {
        id: String,
        name: String,
        tags: Vec<String>,
        roles: Vec<Document>,
        status: Option<String>,
    }

    impl Entity for Row {
        fn id(&self) -> &str {
            &self.id
        }
    }

    fn row(id: &str, name: &str, tags: &[&str], org: &str) -> Row {
        Row {
            id: id.into(),
            name: name.into(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            roles: vec![doc! { "org_id": org, "role_type": "USER" }],
            status: None,
        }
    }

    fn store() -> MemoryCollection<Row> {
        MemoryCollection::with_items(vec![
            row("1", "Alice", &["a", "b"], "org1"),
            row("2", "bob", &["b"], "org2"),
            row("3", "Carol", &[], "org1"),
        ])
    }

    #[tokio::test]
    async fn array_fields_match_by_containment() {
        let found = store().items(doc! { "tags": "b" }, Page::default()).await.unwrap();
        assert_eq!(found.len(), 2);
    }

    #[tokio::test]
    async fn dotted_paths_fan_out_over_arrays() {
        let found = store()
            .items(doc! { "roles.org_id": "org1" }, Page::default())
            .await
            .unwrap();
        let ids: Vec<_> = found.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "3"]);
    }

    #[tokio::test]
    async fn regex_with_case_insensitive_option() {
        let found = store()
            .items(
                doc! { "$or": [ { "name": { "$regex": "^B", "$options": "i" } } ] },
                Page::default(),
            )
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "2");
    }

    #[tokio::test]
    async fn in_ne_and_exists_operators() {
        let s = store();
        assert_eq!(s.count(doc! { "id": { "$in": ["1", "3"] } }).await.unwrap(), 2);
        assert_eq!(s.count(doc! { "id": { "$ne": "1" } }).await.unwrap(), 2);
        assert_eq!(s.count(doc! { "status": { "$exists": false } }).await.unwrap(), 0);
        assert_eq!(s.count(doc! { "status": null }).await.unwrap(), 3);
        assert_eq!(s.count(doc! { "nickname": { "$exists": false } }).await.unwrap(), 3);
        assert_eq!(s.count(doc! { "nickname": null }).await.unwrap(), 3);
        assert_eq!(s.count(doc! { "id": { "$nin": ["1"] } }).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn pagination_and_deletion() {
        let s = store();
        let page = s.items(doc! {}, Page { offset: 1, limit: Some(1) }).await.unwrap();
        assert_eq!(page[0].id, "2");
        assert_eq!(s.delete_items(doc! { "roles.org_id": "org1" }).await.unwrap(), 2);
        assert_eq!(s.count(doc! {}).await.unwrap(), 1);
        assert!(s.delete_item("2").await.unwrap());
        assert!(!s.delete_item("2").await.unwrap());
    }

    #[tokio::test]
    async fn update_replaces_and_rejects_missing() {
        let s = store();
        let mut alice = s.item_by_id("1").await.unwrap().unwrap();
        alice.name = "Alicia".into();
        s.update_item(&alice).await.unwrap();
        assert_eq!(s.item_by_id("1").await.unwrap().unwrap().name, "Alicia");

        let ghost = row("9", "Ghost", &[], "org1");
        assert!(matches!(s.update_item(&ghost).await, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn operator_updates_touch_only_named_fields() {
        let s = store();
        let matched = s
            .update_items(
                doc! { "roles.org_id": "org1" },
                doc! { "$push": { "tags": "z" }, "$set": { "status": "seen" } },
                Vec::new(),
            )
            .await
            .unwrap();
        assert_eq!(matched, 2);
        let alice = s.item_by_id("1").await.unwrap().unwrap();
        assert_eq!(alice.tags, vec!["a", "b", "z"]);
        assert_eq!(alice.status.as_deref(), Some("seen"));
        assert_eq!(s.item_by_id("2").await.unwrap().unwrap().status, None);

        assert!(s.update_by_id("1", doc! { "$pull": { "tags": { "$in": ["a", "z"] } } }).await.unwrap());
        assert!(s.update_by_id("1", doc! { "$addToSet": { "tags": "b" } }).await.unwrap());
        assert_eq!(s.item_by_id("1").await.unwrap().unwrap().tags, vec!["b"]);
        assert!(!s.update_by_id("9", doc! { "$set": { "name": "x" } }).await.unwrap());
    }

    #[tokio::test]
    async fn array_filters_select_elements() {
        let s = store();
        s.update_by_id("1", doc! { "$push": { "roles": { "org_id": "org2", "role_type": "USER" } } })
            .await
            .unwrap();
        s.update_items(
            doc! { "id": "1" },
            doc! { "$set": { "roles.$[r].role_type": "ADMIN" } },
            vec![doc! { "r.org_id": "org2" }],
        )
        .await
        .unwrap();
        let alice = s.item_by_id("1").await.unwrap().unwrap();
        assert_eq!(alice.roles[0].get_str("role_type").unwrap(), "USER");
        assert_eq!(alice.roles[1].get_str("role_type").unwrap(), "ADMIN");

        s.update_by_id("1", doc! { "$set": { "roles.$[].role_type": "USER" } }).await.unwrap();
        s.update_by_id("1", doc! { "$pull": { "roles": { "org_id": "org1" } } }).await.unwrap();
        let alice = s.item_by_id("1").await.unwrap().unwrap();
        assert_eq!(alice.roles, vec![doc! { "org_id": "org2", "role_type": "USER" }]);
    }
}
