use serde::ser::{Serialize, SerializeMap, SerializeStruct, Serializer};

/// Error messages grouped by field name or category key.
///
/// Keys are unique and keep the order in which they were first added.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorMap {
    entries: Vec<(String, Vec<String>)>,
}

impl ErrorMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `message` under `key`, creating the key if needed.
    pub fn push(&mut self, key: impl Into<String>, message: impl Into<String>) {
        let key = key.into();
        let message = message.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, messages)) => messages.push(message),
            None => self.entries.push((key, vec![message])),
        }
    }

    pub fn extend(&mut self, other: ErrorMap) {
        for (key, messages) in other.entries {
            for message in messages {
                self.push(key.clone(), message);
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&[String]> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_slice())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Errors that belong directly to the component at `prefix`.
    ///
    /// `paymentRequests[0].frn` scoped to `paymentRequests[0].` yields `frn`;
    /// deeper paths such as `paymentRequests[0].invoiceLines[1].value` are
    /// left to the nested component.
    pub fn scoped(&self, prefix: &str) -> ErrorMap {
        let mut out = ErrorMap::new();
        for (key, messages) in &self.entries {
            let Some(rest) = key.strip_prefix(prefix) else {
                continue;
            };
            if rest.contains('.') || out.contains_key(rest) {
                continue;
            }
            out.entries.push((rest.to_string(), messages.clone()));
        }
        out
    }
}

impl Serialize for ErrorMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, v) in &self.entries {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

/// Uniform result envelope for remote calls and workflow operations.
///
/// Success is derived from the error map: a response is successful exactly
/// when it carries no errors.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse<T> {
    pub data: Option<T>,
    pub errors: ErrorMap,
}

impl<T> ApiResponse<T> {
    pub fn success(data: Option<T>) -> Self {
        Self {
            data,
            errors: ErrorMap::new(),
        }
    }

    pub fn ok(data: T) -> Self {
        Self::success(Some(data))
    }

    pub fn failure(key: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = ErrorMap::new();
        errors.push(key, message);
        Self { data: None, errors }
    }

    pub fn from_errors(errors: ErrorMap) -> Self {
        Self { data: None, errors }
    }

    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, key: impl Into<String>, message: impl Into<String>) {
        self.errors.push(key, message);
    }

    pub fn with_error(mut self, key: impl Into<String>, message: impl Into<String>) -> Self {
        self.add_error(key, message);
        self
    }

    pub fn data(&self) -> Option<&T> {
        self.data.as_ref()
    }

    pub fn into_data(self) -> Option<T> {
        self.data
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> ApiResponse<U> {
        ApiResponse {
            data: self.data.map(f),
            errors: self.errors,
        }
    }
}

impl<T: Serialize> Serialize for ApiResponse<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("ApiResponse", 3)?;
        s.serialize_field("isSuccess", &self.is_success())?;
        s.serialize_field("data", &self.data)?;
        s.serialize_field("errors", &self.errors)?;
        s.end()
    }
}
