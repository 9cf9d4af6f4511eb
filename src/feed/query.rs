//! Query documents built from the schema registry.

use serde_json::json;

use crate::error::SchemaError;
use crate::schema::SchemaRegistry;

use super::transport::GraphQlRequest;

/// Subscription announcing which entities changed.
pub const ENTITY_UPDATED_SUBSCRIPTION: &str = "subscription {
  entityUpdated {
    id
    keys
    componentNames
  }
}";

/// Builds the inline fragments selecting every field of `names`.
///
/// Each component contributes `... on Name { f1,f2 } `.
pub fn component_fragments<S: AsRef<str>>(schema: &SchemaRegistry, names: &[S]) -> Result<String, SchemaError> {
    let mut out = String::new();
    for name in names {
        let name = name.as_ref();
        let fields = schema.fields(name)?;
        out.push_str("... on ");
        out.push_str(name);
        out.push_str(" { ");
        out.push_str(&fields.join(","));
        out.push_str(" } ");
    }
    Ok(out)
}

#[must_use]
pub fn entity_updated_subscription() -> GraphQlRequest {
    GraphQlRequest::new(ENTITY_UPDATED_SUBSCRIPTION)
}

/// Point query for one entity, restricted to `names`.
pub fn entity_query<S: AsRef<str>>(
    schema: &SchemaRegistry,
    id: &[String],
    names: &[S],
) -> Result<GraphQlRequest, SchemaError> {
    let fragments = component_fragments(schema, names)?;
    let query = format!(
        "query EntityQuery($id: [String!]!) {{
  entity(id: $id) {{
    id
    keys
    __typename
    components {{
      __typename
      {fragments}
    }}
  }}
}}"
    );
    Ok(GraphQlRequest::new(query)
        .with_variables(json!({ "id": id }))
        .with_operation_name("EntityQuery"))
}

/// Bulk query for the latest `first` entities, selecting every registered
/// component.
pub fn latest_entities_query(schema: &SchemaRegistry, first: usize) -> Result<GraphQlRequest, SchemaError> {
    let names: Vec<&str> = schema.names().collect();
    let fragments = component_fragments(schema, &names)?;
    let query = format!(
        "query latestEntities {{
  entities(first: {first}) {{
    edges {{
      node {{
        __typename
        keys
        componentNames
        components {{
          __typename
          {fragments}
        }}
      }}
    }}
  }}
}}"
    );
    Ok(GraphQlRequest::new(query).with_operation_name("latestEntities"))
}
