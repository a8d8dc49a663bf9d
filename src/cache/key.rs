use std::fmt;

use super::Collection;

/// Which slice of a collection a cached query covers.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum KeyScope {
    List,
    /// Query parameters, kept sorted so equal filters always build equal keys.
    Filtered(Vec<(String, String)>),
    Detail(String),
    BySpool(String),
    Count(String),
}

/// Identifies one cached query. Parameters are part of the key, so two
/// barcode searches with different values never share an entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey {
    pub collection: Collection,
    pub scope: KeyScope,
}

impl QueryKey {
    pub fn list(collection: Collection) -> Self {
        Self {
            collection,
            scope: KeyScope::List,
        }
    }

    pub fn filtered<K, V>(collection: Collection, params: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let mut params: Vec<(String, String)> = params
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        params.sort();
        if params.is_empty() {
            return Self::list(collection);
        }
        Self {
            collection,
            scope: KeyScope::Filtered(params),
        }
    }

    pub fn detail(collection: Collection, id: impl Into<String>) -> Self {
        Self {
            collection,
            scope: KeyScope::Detail(id.into()),
        }
    }

    pub fn by_spool(collection: Collection, spool_id: impl Into<String>) -> Self {
        Self {
            collection,
            scope: KeyScope::BySpool(spool_id.into()),
        }
    }

    pub fn count(collection: Collection, spool_id: impl Into<String>) -> Self {
        Self {
            collection,
            scope: KeyScope::Count(spool_id.into()),
        }
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:", self.collection)?;
        match &self.scope {
            KeyScope::List => write!(f, "list"),
            KeyScope::Filtered(params) => {
                let params_str = params
                    .iter()
                    .map(|(k, v)| format!("{}={}", k, v))
                    .collect::<Vec<_>>()
                    .join("&");
                write!(f, "list:{}", params_str)
            }
            KeyScope::Detail(id) => write!(f, "detail:{}", id),
            KeyScope::BySpool(id) => write!(f, "by_spool:{}", id),
            KeyScope::Count(id) => write!(f, "count:{}", id),
        }
    }
}
