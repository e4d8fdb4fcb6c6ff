//! Resource query parsing.
//!
//! A leading `ds:`, `tab:` or `col:` narrows a query to datasets, tables or
//! columns. Every query is scoped to a single project.

use kat_core::enums::EntityType;

const ALL_TYPES: [EntityType; 3] = [EntityType::Dataset, EntityType::Table, EntityType::Column];

/// A parsed, project-scoped resource query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceQuery {
    pub project_id: String,
    pub text: String,
    pub types: Vec<EntityType>,
}

impl ResourceQuery {
    /// Parse raw user input. The prefix is case-insensitive and the
    /// remaining text is trimmed; an empty remainder matches everything
    /// of the selected type.
    #[must_use]
    pub fn parse(project_id: impl Into<String>, raw: &str) -> Self {
        let raw = raw.trim();
        let (types, text) = match raw.split_once(':') {
            Some((prefix, rest)) => match prefix.to_ascii_lowercase().as_str() {
                "ds" => (vec![EntityType::Dataset], rest),
                "tab" => (vec![EntityType::Table], rest),
                "col" => (vec![EntityType::Column], rest),
                _ => (ALL_TYPES.to_vec(), raw),
            },
            None => (ALL_TYPES.to_vec(), raw),
        };
        Self {
            project_id: project_id.into(),
            text: text.trim().to_string(),
            types,
        }
    }

    /// Whether `entity_type` is selected.
    #[must_use]
    pub fn includes(&self, entity_type: EntityType) -> bool {
        self.types.contains(&entity_type)
    }

    /// Meilisearch filter expression.
    #[must_use]
    pub fn filter(&self) -> String {
        let type_filter = match self.types.as_slice() {
            [single] => format!("type = {}", single.as_str()),
            many => format!(
                "type IN [{}]",
                many.iter().map(|t| t.as_str()).collect::<Vec<_>>().join(", ")
            ),
        };
        format!("project_id = {} AND {type_filter}", quote(&self.project_id))
    }
}

fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

/// A search request against the resource index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub query: ResourceQuery,
    pub limit: usize,
}

impl SearchRequest {
    #[must_use]
    pub const fn new(query: ResourceQuery, limit: usize) -> Self {
        Self { query, limit }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case("ds:sales", vec![EntityType::Dataset], "sales")]
    #[case("tab: orders ", vec![EntityType::Table], "orders")]
    #[case("COL:amount", vec![EntityType::Column], "amount")]
    #[case("orders", ALL_TYPES.to_vec(), "orders")]
    #[case("ds:", vec![EntityType::Dataset], "")]
    #[case("url:https", ALL_TYPES.to_vec(), "url:https")]
    fn parses_type_prefix(#[case] raw: &str, #[case] types: Vec<EntityType>, #[case] text: &str) {
        let q = ResourceQuery::parse("prj-a", raw);
        assert_eq!(q.types, types);
        assert_eq!(q.text, text);
    }

    #[test]
    fn filter_for_single_type() {
        let q = ResourceQuery::parse("prj-a", "col:id");
        assert_eq!(q.filter(), r#"project_id = "prj-a" AND type = column"#);
    }

    #[test]
    fn filter_for_all_types() {
        let q = ResourceQuery::parse("prj-a", "id");
        assert_eq!(
            q.filter(),
            r#"project_id = "prj-a" AND type IN [dataset, table, column]"#
        );
    }

    #[test]
    fn filter_escapes_quotes() {
        let q = ResourceQuery::parse(r#"prj-"x"#, "id");
        assert!(q.filter().starts_with(r#"project_id = "prj-\"x" AND"#));
    }
}
