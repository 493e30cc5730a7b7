pub(crate) mod query;
pub(crate) mod vendor;
pub(crate) mod venue;

use std::{marker::PhantomData, path::Path};

use anyhow::{Context, Result};
use serde::{de::DeserializeOwned, Serialize};
use sled::{Db, Tree};

pub(crate) use self::query::{Field, Predicate, Query};
pub(crate) use self::vendor::Vendor;
pub(crate) use self::venue::VenuePackage;

const VENDOR_TREE: &str = "vendors";
const VENUE_TREE: &str = "venuepackages";

/// A record stored in one of the catalog trees.
pub(crate) trait Document: Serialize + DeserializeOwned {
    fn tree(db: &Database) -> &Tree;

    fn id(&self) -> &str;

    fn set_id(&mut self, id: String);

    /// Looks up a (possibly dotted) attribute for predicate evaluation.
    fn field(&self, name: &str) -> Option<Field<'_>>;

    /// Resets every attribute not named in `fields` to its default.
    #[must_use]
    fn project(self, fields: &[&str]) -> Self;
}

#[derive(Clone)]
pub struct Database {
    db: Db,
    vendor_tree: Tree,
    venue_tree: Tree,
}

impl Database {
    pub fn connect(path: &Path) -> Result<Database> {
        let db = sled::open(path)
            .with_context(|| format!("cannot open database at {}", path.display()))?;
        let vendor_tree = db.open_tree(VENDOR_TREE)?;
        let venue_tree = db.open_tree(VENUE_TREE)?;
        Ok(Database {
            db,
            vendor_tree,
            venue_tree,
        })
    }

    /// Stores a document, assigning an identifier when it has none.
    pub(crate) fn insert<D: Document>(&self, mut doc: D) -> Result<String> {
        if doc.id().is_empty() {
            doc.set_id(format!("{:024x}", self.db.generate_id()?));
        }
        let key = doc.id().to_string();
        D::tree(self).insert(key.as_bytes(), bincode::serialize(&doc)?)?;
        Ok(key)
    }

    #[allow(unused)]
    pub(crate) fn select<D: Document>(&self, id: &str) -> Result<Option<D>> {
        D::tree(self)
            .get(id.as_bytes())?
            .map(|val| bincode::deserialize(&val).map_err(Into::into))
            .transpose()
    }

    pub(crate) fn iter<D: Document>(&self) -> Iter<D> {
        Iter::new(D::tree(self).iter())
    }

    /// Runs `query` against the tree of `D`, in key order.
    pub(crate) fn find<D: Document>(&self, query: &Query) -> Result<Vec<D>> {
        let mut found = Vec::new();
        for doc in self.iter::<D>() {
            if query.row_limit().is_some_and(|limit| found.len() >= limit) {
                break;
            }
            let doc = doc?;
            if query.matches(&doc) {
                found.push(match query.projection() {
                    Some(fields) => doc.project(fields),
                    None => doc,
                });
            }
        }
        Ok(found)
    }

    pub(crate) fn count<D: Document>(&self) -> usize {
        D::tree(self).len()
    }

    /// Cheap read used by the health endpoint.
    pub fn ping(&self) -> Result<()> {
        self.vendor_tree.first()?;
        self.venue_tree.first()?;
        Ok(())
    }
}

pub(crate) struct Iter<T> {
    inner: sled::Iter,
    phantom: PhantomData<T>,
}

impl<T> Iter<T> {
    fn new(inner: sled::Iter) -> Self {
        Self {
            inner,
            phantom: PhantomData,
        }
    }
}

impl<T: DeserializeOwned> Iterator for Iter<T> {
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        let item = self.inner.next()?;
        Some(
            item.map_err(anyhow::Error::from)
                .and_then(|(_, value)| bincode::deserialize(&value).map_err(Into::into)),
        )
    }
}
