//! Request type grammar.
//!
//! A request type is the fixed list of base fields followed by an ordered
//! list of extension fields, optionally trailed by the struct definitions
//! those extensions reference. Callers describe extensions with a suffix
//! that closes the primary type, e.g. `bool extra)` or
//! `ExtraData extra)ExtraData(address extraAddr)`.
//!
//! The suffix is parsed into declarations before any schema string is
//! rendered, so a suffix that does not describe a well-formed trailing
//! field list is rejected instead of being hashed.

use crate::eip712::GENERIC_PARAMS;
use alloy_primitives::{keccak256, B256};
use std::collections::{HashMap, HashSet};
use std::fmt;
use thiserror::Error;

/// Base fields of every request type as `(type, name)` pairs.
pub const BASE_FIELDS: [(&str, &str); 7] = [
	("address", "from"),
	("address", "to"),
	("uint256", "value"),
	("uint256", "gas"),
	("uint256", "nonce"),
	("bytes", "data"),
	("uint256", "validUntilTime"),
];

/// Reasons a type name or extension suffix is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
	#[error("Invalid type name: {0:?}")]
	InvalidTypeName(String),
	#[error("Invalid field declaration: {0:?}")]
	InvalidFieldDeclaration(String),
	#[error("Malformed suffix: {0}")]
	MalformedSuffix(String),
	#[error("Field '{0}' redefines a base field")]
	BaseFieldRedefined(String),
	#[error("Duplicate field '{0}'")]
	DuplicateField(String),
	#[error("Duplicate struct definition '{0}'")]
	DuplicateStruct(String),
	#[error("Struct '{0}' has no fields")]
	EmptyStruct(String),
	#[error("Struct type '{0}' is referenced but not defined")]
	UndefinedStruct(String),
	#[error("Struct '{0}' is defined but never referenced")]
	UnusedStruct(String),
	#[error("Struct definitions must be sorted by name: '{next}' follows '{previous}'")]
	UnsortedStructs { previous: String, next: String },
}

/// A single `<type> <name>` declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDecl {
	pub type_name: String,
	pub name: String,
}

impl FieldDecl {
	fn parse(decl: &str) -> Result<Self, SchemaError> {
		let invalid = || SchemaError::InvalidFieldDeclaration(decl.to_string());
		let (type_name, name) = decl.split_once(' ').ok_or_else(invalid)?;
		if !is_identifier(name) || !is_type_reference(type_name) {
			return Err(invalid());
		}
		Ok(Self {
			type_name: type_name.to_string(),
			name: name.to_string(),
		})
	}

	/// The type with array dimensions stripped.
	pub fn base_type(&self) -> &str {
		match self.type_name.find('[') {
			Some(idx) => &self.type_name[..idx],
			None => &self.type_name,
		}
	}

	/// Struct type this field refers to, if it is not an elementary type.
	pub fn struct_reference(&self) -> Option<&str> {
		let base = self.base_type();
		(!is_elementary(base)).then_some(base)
	}
}

impl fmt::Display for FieldDecl {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{} {}", self.type_name, self.name)
	}
}

/// A struct definition trailing the primary type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructDef {
	pub name: String,
	pub fields: Vec<FieldDecl>,
}

impl fmt::Display for StructDef {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}({})", self.name, join_fields(&self.fields))
	}
}

/// A parsed request type: base fields, extension fields and referenced structs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestSchema {
	pub type_name: String,
	pub extensions: Vec<FieldDecl>,
	pub structs: Vec<StructDef>,
}

impl RequestSchema {
	/// Parses a type name and an extension suffix.
	///
	/// An empty suffix (or a bare `)`) declares no extension fields.
	pub fn parse(type_name: &str, suffix: &str) -> Result<Self, SchemaError> {
		if !is_identifier(type_name) {
			return Err(SchemaError::InvalidTypeName(type_name.to_string()));
		}

		let (extensions, structs) = if suffix.is_empty() {
			(Vec::new(), Vec::new())
		} else {
			let (fields, rest) = suffix.split_once(')').ok_or_else(|| {
				SchemaError::MalformedSuffix("missing ')' closing the request type".into())
			})?;
			(parse_field_list(fields)?, parse_struct_defs(rest)?)
		};

		let schema = Self {
			type_name: type_name.to_string(),
			extensions,
			structs,
		};
		schema.validate()?;
		Ok(schema)
	}

	/// The request type every engine registers on creation.
	pub fn forward_request() -> Self {
		Self {
			type_name: crate::eip712::FORWARD_REQUEST_TYPE_NAME.to_string(),
			extensions: Vec::new(),
			structs: Vec::new(),
		}
	}

	/// Canonical EIP-712 `encodeType` string for this request type.
	pub fn encode_type(&self) -> String {
		let mut out = format!("{}({}", self.type_name, GENERIC_PARAMS);
		for field in &self.extensions {
			out.push(',');
			out.push_str(&field.to_string());
		}
		out.push(')');
		for def in &self.structs {
			out.push_str(&def.to_string());
		}
		out
	}

	pub fn type_hash(&self) -> B256 {
		keccak256(self.encode_type().as_bytes())
	}

	fn validate(&self) -> Result<(), SchemaError> {
		let mut names: HashSet<&str> = BASE_FIELDS.iter().map(|(_, name)| *name).collect();
		for field in &self.extensions {
			if BASE_FIELDS.iter().any(|(_, name)| *name == field.name) {
				return Err(SchemaError::BaseFieldRedefined(field.name.clone()));
			}
			if !names.insert(&field.name) {
				return Err(SchemaError::DuplicateField(field.name.clone()));
			}
		}

		let mut defs: HashMap<&str, &StructDef> = HashMap::new();
		for def in &self.structs {
			if def.name == self.type_name || defs.insert(&def.name, def).is_some() {
				return Err(SchemaError::DuplicateStruct(def.name.clone()));
			}
			if def.fields.is_empty() {
				return Err(SchemaError::EmptyStruct(def.name.clone()));
			}
			let mut seen = HashSet::new();
			for field in &def.fields {
				if !seen.insert(&field.name) {
					return Err(SchemaError::DuplicateField(field.name.clone()));
				}
			}
		}
		for pair in self.structs.windows(2) {
			if pair[0].name >= pair[1].name {
				return Err(SchemaError::UnsortedStructs {
					previous: pair[0].name.clone(),
					next: pair[1].name.clone(),
				});
			}
		}

		// Walk references from the primary type; everything defined must be reached.
		let mut reached: HashSet<&str> = HashSet::new();
		let mut pending: Vec<&FieldDecl> = self.extensions.iter().collect();
		while let Some(field) = pending.pop() {
			let Some(reference) = field.struct_reference() else {
				continue;
			};
			if reference == self.type_name {
				continue;
			}
			let def: &StructDef = *defs
				.get(reference)
				.ok_or_else(|| SchemaError::UndefinedStruct(reference.to_string()))?;
			if reached.insert(&def.name) {
				pending.extend(def.fields.iter());
			}
		}
		if let Some(unused) = self.structs.iter().find(|d| !reached.contains(d.name.as_str())) {
			return Err(SchemaError::UnusedStruct(unused.name.clone()));
		}

		Ok(())
	}
}

fn join_fields(fields: &[FieldDecl]) -> String {
	fields
		.iter()
		.map(|f| f.to_string())
		.collect::<Vec<_>>()
		.join(",")
}

fn parse_field_list(list: &str) -> Result<Vec<FieldDecl>, SchemaError> {
	if list.contains('(') {
		return Err(SchemaError::MalformedSuffix(format!(
			"unexpected '(' in field list {:?}",
			list
		)));
	}
	if list.is_empty() {
		return Ok(Vec::new());
	}
	list.split(',').map(FieldDecl::parse).collect()
}

fn parse_struct_defs(mut rest: &str) -> Result<Vec<StructDef>, SchemaError> {
	let mut defs = Vec::new();
	while !rest.is_empty() {
		let (name, body) = rest.split_once('(').ok_or_else(|| {
			SchemaError::MalformedSuffix(format!("trailing input {:?} is not a struct definition", rest))
		})?;
		if !is_identifier(name) {
			return Err(SchemaError::InvalidTypeName(name.to_string()));
		}
		let (fields, tail) = body.split_once(')').ok_or_else(|| {
			SchemaError::MalformedSuffix(format!("struct '{}' is not closed", name))
		})?;
		defs.push(StructDef {
			name: name.to_string(),
			fields: parse_field_list(fields)?,
		});
		rest = tail;
	}
	Ok(defs)
}

fn is_identifier(s: &str) -> bool {
	let mut chars = s.chars();
	match chars.next() {
		Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$' => {},
		_ => return false,
	}
	chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

/// `Ident` or elementary type, followed by any number of `[]` / `[N]`.
fn is_type_reference(s: &str) -> bool {
	let (base, mut dims) = match s.find('[') {
		Some(idx) => s.split_at(idx),
		None => (s, ""),
	};
	if !is_identifier(base) {
		return false;
	}
	while !dims.is_empty() {
		let Some(inner) = dims.strip_prefix('[') else {
			return false;
		};
		let Some(end) = inner.find(']') else {
			return false;
		};
		let size = &inner[..end];
		if !size.is_empty() && !is_canonical_number(size) {
			return false;
		}
		dims = &inner[end + 1..];
	}
	true
}

fn is_canonical_number(s: &str) -> bool {
	!s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) && !s.starts_with('0')
}

fn is_elementary(t: &str) -> bool {
	match t {
		"address" | "bool" | "string" | "bytes" => true,
		_ => {
			if let Some(size) = t.strip_prefix("bytes") {
				return is_canonical_number(size)
					&& size.parse::<u8>().is_ok_and(|n| (1..=32).contains(&n));
			}
			let bits = t.strip_prefix("uint").or_else(|| t.strip_prefix("int"));
			bits.is_some_and(|bits| {
				is_canonical_number(bits)
					&& bits
						.parse::<u16>()
						.is_ok_and(|n| n % 8 == 0 && (8..=256).contains(&n))
			})
		},
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_default_request_type() {
		let schema = RequestSchema::forward_request();
		assert_eq!(
			schema.encode_type(),
			format!("ForwardRequest({})", GENERIC_PARAMS)
		);
		assert_eq!(
			RequestSchema::parse("ForwardRequest", "").unwrap(),
			schema
		);
	}

	#[test]
	fn test_base_fields_match_generic_params() {
		let rendered = BASE_FIELDS
			.iter()
			.map(|(t, n)| format!("{} {}", t, n))
			.collect::<Vec<_>>()
			.join(",");
		assert_eq!(rendered, GENERIC_PARAMS);
	}

	#[test]
	fn test_extension_field() {
		let schema = RequestSchema::parse("test2", "bool extra)").unwrap();
		let expected = "test2(address from,address to,uint256 value,uint256 gas,uint256 nonce,bytes data,uint256 validUntilTime,bool extra)";
		assert_eq!(schema.encode_type(), expected);
		assert_eq!(schema.type_hash(), keccak256(expected));
	}

	#[test]
	fn test_extension_with_struct() {
		let schema = RequestSchema::parse(
			"ExtendedMessage",
			"ExtraData extra)ExtraData(address extraAddr)",
		)
		.unwrap();
		assert_eq!(
			schema.encode_type(),
			format!(
				"ExtendedMessage({},ExtraData extra)ExtraData(address extraAddr)",
				GENERIC_PARAMS
			)
		);
		assert_eq!(schema.structs.len(), 1);
	}

	#[test]
	fn test_closing_paren_only_is_empty_extension() {
		let bare = RequestSchema::parse("test3", ")").unwrap();
		let empty = RequestSchema::parse("test3", "").unwrap();
		assert_eq!(bare.type_hash(), empty.type_hash());
	}

	#[test]
	fn test_nested_structs_and_arrays() {
		let schema = RequestSchema::parse(
			"Batch",
			"Item[] items,bytes32 tag)Inner(uint8 k)Item(Inner inner,uint256[2] amounts)",
		)
		.unwrap();
		assert_eq!(
			schema.encode_type(),
			format!(
				"Batch({},Item[] items,bytes32 tag)Inner(uint8 k)Item(Inner inner,uint256[2] amounts)",
				GENERIC_PARAMS
			)
		);
	}

	#[test]
	fn test_rejects_field_injection_through_type_name() {
		let err = RequestSchema::parse("asd(uint a,Request asd)Request(", ")").unwrap_err();
		assert!(matches!(err, SchemaError::InvalidTypeName(_)));
	}

	#[test]
	fn test_rejects_invalid_type_names() {
		for name in ["", "1abc", "a b", "a)", "a,b"] {
			assert!(
				matches!(
					RequestSchema::parse(name, ""),
					Err(SchemaError::InvalidTypeName(_))
				),
				"{:?} should be rejected",
				name
			);
		}
	}

	#[test]
	fn test_rejects_unbalanced_suffix() {
		assert!(matches!(
			RequestSchema::parse("t", "bool extra"),
			Err(SchemaError::MalformedSuffix(_))
		));
		assert!(matches!(
			RequestSchema::parse("t", "bool extra))"),
			Err(SchemaError::MalformedSuffix(_))
		));
		assert!(matches!(
			RequestSchema::parse("t", "Extra e)Extra(address a"),
			Err(SchemaError::MalformedSuffix(_))
		));
		assert!(matches!(
			RequestSchema::parse("t", "bool (extra)"),
			Err(SchemaError::MalformedSuffix(_))
		));
	}

	#[test]
	fn test_rejects_bad_declarations() {
		for suffix in [
			"bool)",
			"bool  extra)",
			" bool extra)",
			"bool extra,)",
			"bool extra,,uint256 more)",
			"uint256[ x)",
			"uint256[01] x)",
			"bool 1extra)",
		] {
			assert!(
				matches!(
					RequestSchema::parse("t", suffix),
					Err(SchemaError::InvalidFieldDeclaration(_))
				),
				"{:?} should be rejected",
				suffix
			);
		}
	}

	#[test]
	fn test_rejects_base_field_redefinition() {
		assert_eq!(
			RequestSchema::parse("t", "uint256 nonce)"),
			Err(SchemaError::BaseFieldRedefined("nonce".into()))
		);
		assert_eq!(
			RequestSchema::parse("t", "bool a,bool a)"),
			Err(SchemaError::DuplicateField("a".into()))
		);
	}

	#[test]
	fn test_struct_reference_rules() {
		assert_eq!(
			RequestSchema::parse("t", "Extra e)"),
			Err(SchemaError::UndefinedStruct("Extra".into()))
		);
		assert_eq!(
			RequestSchema::parse("t", "bool e)Extra(address a)"),
			Err(SchemaError::UnusedStruct("Extra".into()))
		);
		assert_eq!(
			RequestSchema::parse("t", "B b,A a)B(bool x)A(bool y)"),
			Err(SchemaError::UnsortedStructs {
				previous: "B".into(),
				next: "A".into()
			})
		);
		assert_eq!(
			RequestSchema::parse("t", "A a)A(bool x)A(bool x)"),
			Err(SchemaError::DuplicateStruct("A".into()))
		);
		assert_eq!(
			RequestSchema::parse("t", "A a)A()"),
			Err(SchemaError::EmptyStruct("A".into()))
		);
		// "uint" is not a canonical elementary type, so it reads as a struct name.
		assert_eq!(
			RequestSchema::parse("t", "uint a)"),
			Err(SchemaError::UndefinedStruct("uint".into()))
		);
	}

	#[test]
	fn test_elementary_types() {
		for t in ["address", "bool", "string", "bytes", "bytes1", "bytes32", "uint8", "int256"] {
			assert!(is_elementary(t), "{}", t);
		}
		for t in ["bytes0", "bytes33", "uint", "uint7", "int512", "uint08", "Foo"] {
			assert!(!is_elementary(t), "{}", t);
		}
	}
}
