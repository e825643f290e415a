//! Document store: the sole owner of loaded articles.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::corpus::CorpusSource;
use crate::error::LoadError;

/// Dense internal document number, assigned in ascending `id` order.
pub type DocId = u32;

/// One handbook article, flattened to plain text.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// Stable identifier, unique within the corpus.
    pub id: String,
    pub title: String,
    pub body: String,
    /// Original location, for citation only.
    pub source_path: String,
}

/// Immutable collection of documents with id lookup.
#[derive(Debug, Clone)]
pub struct DocumentStore {
    docs: Vec<Document>,
    by_id: HashMap<String, DocId>,
}

impl DocumentStore {
    /// Load every article from `source`.
    ///
    /// Fails with [`LoadError::Empty`] when the source yields nothing and
    /// [`LoadError::DuplicateId`] when two articles share an id.
    pub fn load(source: &dyn CorpusSource) -> Result<Self, LoadError> {
        let docs = source.load_documents()?;
        if docs.is_empty() {
            return Err(LoadError::Empty { source_desc: source.describe() });
        }
        Self::from_documents(docs)
    }

    /// Build from already-loaded documents (e.g. a persisted snapshot).
    pub fn from_documents(mut docs: Vec<Document>) -> Result<Self, LoadError> {
        if docs.is_empty() {
            return Err(LoadError::Empty { source_desc: "document list".to_string() });
        }
        docs.sort_by(|a, b| a.id.cmp(&b.id));

        let mut by_id = HashMap::with_capacity(docs.len());
        for (i, doc) in docs.iter().enumerate() {
            if by_id.insert(doc.id.clone(), i as DocId).is_some() {
                return Err(LoadError::DuplicateId { id: doc.id.clone() });
            }
        }
        Ok(Self { docs, by_id })
    }

    pub fn get(&self, id: &str) -> Option<&Document> {
        self.by_id.get(id).map(|&d| &self.docs[d as usize])
    }

    pub fn doc_id(&self, id: &str) -> Option<DocId> {
        self.by_id.get(id).copied()
    }

    pub fn document(&self, doc_id: DocId) -> Option<&Document> {
        self.docs.get(doc_id as usize)
    }

    /// Documents in `DocId` order. Restartable: call again for a fresh pass.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = (DocId, &Document)> {
        self.docs.iter().enumerate().map(|(i, d)| (i as DocId, d))
    }

    pub fn documents(&self) -> &[Document] {
        &self.docs
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::MemoryCorpus;

    #[test]
    fn test_load_sorts_by_id() {
        let corpus = MemoryCorpus::default()
            .with("kerning", "Kerning", "kerning groups")
            .with("anchors", "Anchors", "mark to base");
        let store = DocumentStore::load(&corpus).unwrap();
        let ids: Vec<&str> = store.iter().map(|(_, d)| d.id.as_str()).collect();
        assert_eq!(ids, vec!["anchors", "kerning"]);
        assert_eq!(store.doc_id("kerning"), Some(1));
    }

    #[test]
    fn test_get_and_document() {
        let corpus = MemoryCorpus::default().with("anchors", "Anchors", "mark to base");
        let store = DocumentStore::load(&corpus).unwrap();
        assert_eq!(store.get("anchors").unwrap().title, "Anchors");
        assert!(store.get("missing").is_none());
        assert_eq!(store.document(0).unwrap().id, "anchors");
        assert!(store.document(1).is_none());
    }

    #[test]
    fn test_empty_corpus_is_error() {
        let err = DocumentStore::load(&MemoryCorpus::default()).unwrap_err();
        assert!(matches!(err, LoadError::Empty { .. }));
    }

    #[test]
    fn test_duplicate_id_is_error() {
        let corpus = MemoryCorpus::default()
            .with("a", "One", "x")
            .with("a", "Two", "y");
        let err = DocumentStore::load(&corpus).unwrap_err();
        assert!(matches!(err, LoadError::DuplicateId { ref id } if id == "a"));
    }

    #[test]
    fn test_iter_is_restartable() {
        let corpus = MemoryCorpus::default().with("a", "A", "x").with("b", "B", "y");
        let store = DocumentStore::load(&corpus).unwrap();
        assert_eq!(store.iter().count(), 2);
        assert_eq!(store.iter().count(), 2);
        assert_eq!(store.iter().len(), store.len());
    }
}
