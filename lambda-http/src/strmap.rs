use std::{
    collections::{hash_map::Keys, HashMap},
    iter::FromIterator,
    sync::Arc,
};

/// A read-only view into a map of string data which may contain multiple values
///
/// Internally data is always represented as many valued
#[derive(Default, Debug, PartialEq)]
pub struct StrMap(pub(crate) Arc<HashMap<String, Vec<String>>>);

impl StrMap {
    /// Return a named value where available.
    /// If there is more than one value associated with this name,
    /// the first one will be returned
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .get(key)
            .and_then(|values| values.first().map(|owned| owned.as_str()))
    }

    /// Return all values associated with name where available
    pub fn get_all(&self, key: &str) -> Option<Vec<&str>> {
        self.0
            .get(key)
            .map(|values| values.iter().map(|owned| owned.as_str()).collect::<Vec<_>>())
    }

    /// Return true if the underlying map is empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Return an iterator over keys and values
    pub fn iter(&self) -> StrMapIter<'_> {
        StrMapIter {
            data: self,
            keys: self.0.keys(),
        }
    }
}

impl Clone for StrMap {
    fn clone(&self) -> Self {
        // only clone the inner data
        StrMap(self.0.clone())
    }
}

impl From<HashMap<String, Vec<String>>> for StrMap {
    fn from(inner: HashMap<String, Vec<String>>) -> Self {
        StrMap(Arc::new(inner))
    }
}

impl From<HashMap<String, String>> for StrMap {
    fn from(inner: HashMap<String, String>) -> Self {
        StrMap(Arc::new(inner.into_iter().map(|(k, v)| (k, vec![v])).collect()))
    }
}

/// Values for repeated keys accumulate in order of appearance.
impl FromIterator<(String, String)> for StrMap {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        let mut inner: HashMap<String, Vec<String>> = HashMap::new();
        for (key, value) in iter {
            inner.entry(key).or_default().push(value);
        }
        StrMap(Arc::new(inner))
    }
}

/// A read only reference to `StrMap` key and value slice pairings
pub struct StrMapIter<'a> {
    data: &'a StrMap,
    keys: Keys<'a, String, Vec<String>>,
}

impl<'a> Iterator for StrMapIter<'a> {
    type Item = (&'a str, &'a str);

    #[inline]
    fn next(&mut self) -> Option<(&'a str, &'a str)> {
        self.keys
            .next()
            .and_then(|k| self.data.get(k).map(|v| (k.as_str(), v)))
    }
}
