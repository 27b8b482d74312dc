use serde_json::Value;

/// Field map of a stored document
pub type Fields = serde_json::Map<String, Value>;

/// A document as read back from the store
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub fields: Fields,
}

impl Document {
    pub fn new(id: impl Into<String>, fields: Fields) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }
}

/// A document about to be appended to a collection
#[derive(Debug, Clone)]
pub struct NewDocument {
    pub fields: Fields,
    /// Field the store fills with its own commit timestamp
    pub server_timestamp_field: Option<String>,
}

impl NewDocument {
    pub fn new(fields: Fields) -> Self {
        Self {
            fields,
            server_timestamp_field: None,
        }
    }

    pub fn with_server_timestamp(mut self, field: impl Into<String>) -> Self {
        self.server_timestamp_field = Some(field.into());
        self
    }
}

/// Equality filter for live queries
#[derive(Debug, Clone, PartialEq)]
pub struct FieldFilter {
    pub field: String,
    pub equals: Value,
}

impl FieldFilter {
    pub fn eq(field: impl Into<String>, equals: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            equals: equals.into(),
        }
    }

    pub fn matches(&self, fields: &Fields) -> bool {
        fields.get(&self.field) == Some(&self.equals)
    }
}

/// Notification that one document in a collection was written
#[derive(Debug, Clone)]
pub struct StoreChange {
    pub document_id: String,
    /// Document contents after the write
    pub fields: Fields,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(value: Value) -> Fields {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_filter_matches_equal_field() {
        let filter = FieldFilter::eq("roomId", "ABC123");
        assert!(filter.matches(&fields(json!({"roomId": "ABC123", "rating": 4}))));
    }

    #[test]
    fn test_filter_rejects_other_values_and_missing_field() {
        let filter = FieldFilter::eq("roomId", "ABC123");
        assert!(!filter.matches(&fields(json!({"roomId": "XYZ999"}))));
        assert!(!filter.matches(&fields(json!({"rating": 4}))));
    }
}
