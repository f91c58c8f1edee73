//! Registry of accepted request types.

use crate::ForwarderError;
use forwarder_types::{RegisteredType, RequestSchema, B256};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Request types keyed by schema hash.
#[derive(Debug, Default)]
pub struct TypeRegistry {
	types: RwLock<HashMap<B256, RegisteredType>>,
}

impl TypeRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	/// Registry holding only the default `ForwardRequest` type.
	pub fn with_default_type() -> Self {
		let schema = RequestSchema::forward_request();
		let record = RegisteredType {
			full_schema: schema.encode_type(),
			schema_hash: schema.type_hash(),
		};
		Self {
			types: RwLock::new(HashMap::from([(record.schema_hash, record)])),
		}
	}

	/// Parses and registers `type_name` with the extension `suffix`.
	///
	/// Returns the record, whether or not it was already present.
	pub async fn register(
		&self,
		type_name: &str,
		suffix: &str,
	) -> Result<RegisteredType, ForwarderError> {
		let schema = RequestSchema::parse(type_name, suffix)?;
		Ok(self.insert(&schema).await)
	}

	/// Registers an already parsed schema.
	pub async fn insert(&self, schema: &RequestSchema) -> RegisteredType {
		let full_schema = schema.encode_type();
		let schema_hash = schema.type_hash();
		let mut types = self.types.write().await;
		types
			.entry(schema_hash)
			.or_insert(RegisteredType {
				full_schema,
				schema_hash,
			})
			.clone()
	}

	pub async fn is_registered(&self, schema_hash: &B256) -> bool {
		self.types.read().await.contains_key(schema_hash)
	}

	pub async fn get(&self, schema_hash: &B256) -> Option<RegisteredType> {
		self.types.read().await.get(schema_hash).cloned()
	}

	/// All registered types, ordered by schema string.
	pub async fn all(&self) -> Vec<RegisteredType> {
		let mut all: Vec<_> = self.types.read().await.values().cloned().collect();
		all.sort_by(|a, b| a.full_schema.cmp(&b.full_schema));
		all
	}
}
