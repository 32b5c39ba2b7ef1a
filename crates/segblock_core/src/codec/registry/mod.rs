use std::collections::BTreeMap;
use std::sync::Arc;

use crate::codec::{ArrayLen, CodecError, FieldDescriptor, FieldKind, Result, Vars, parse_field_decl};

const MAX_NESTING: u32 = 64;

/// Ordered field layout bound to a type name.
///
/// Immutable once built. Re-registering a name produces a new `TypeDecl`, so
/// blocks holding an older handle keep the layout they were built with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDecl {
	/// Registered type name.
	pub name: Box<str>,
	/// Parsed fields in declaration order.
	pub fields: Vec<FieldDescriptor>,
	/// Declaration text the fields were parsed from.
	pub sources: Vec<String>,
	/// Variable table the declarations were parsed with.
	pub vars: Vars,
}

impl TypeDecl {
	/// Position of the field answering to `name`, aliases included.
	pub fn field_index(&self, name: &str) -> Option<usize> {
		self.fields.iter().position(|field| field.answers_to(name))
	}

	/// Field answering to `name`, aliases included.
	pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
		self.fields.iter().find(|field| field.answers_to(name))
	}

	pub(crate) fn field_or_err(&self, name: &str) -> Result<(usize, &FieldDescriptor)> {
		self.fields
			.iter()
			.enumerate()
			.find(|(_, field)| field.answers_to(name))
			.ok_or_else(|| CodecError::FieldNotFound {
				type_name: self.name.to_string(),
				field: name.to_owned(),
			})
	}
}

/// Schema table mapping type names to their field layouts.
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
	types: BTreeMap<Box<str>, Arc<TypeDecl>>,
}

impl TypeRegistry {
	/// Create an empty registry.
	pub fn new() -> Self {
		Self::default()
	}

	/// Parse `decls` with `vars` bound and bind the result to `name`.
	///
	/// Any previous binding of `name` is replaced. Nested struct names are
	/// resolved lazily, so types may be registered in any order.
	pub fn register<S: AsRef<str>>(&mut self, name: &str, decls: &[S], vars: &Vars) -> Result<Arc<TypeDecl>> {
		let fields = decls
			.iter()
			.map(|decl| parse_field_decl(decl.as_ref(), vars))
			.collect::<Result<Vec<_>>>()?;

		let decl = Arc::new(TypeDecl {
			name: name.into(),
			fields,
			sources: decls.iter().map(|decl| decl.as_ref().to_owned()).collect(),
			vars: vars.clone(),
		});
		if self.types.insert(name.into(), Arc::clone(&decl)).is_some() {
			log::debug!("rebound type {name} ({} fields)", decl.fields.len());
		} else {
			log::debug!("registered type {name} ({} fields)", decl.fields.len());
		}
		Ok(decl)
	}

	/// Re-register `name` from its stored declaration text with a new variable table.
	pub fn rebind(&mut self, name: &str, vars: &Vars) -> Result<Arc<TypeDecl>> {
		let sources = self.decl(name)?.sources.clone();
		self.register(name, &sources, vars)
	}

	/// Current declaration bound to `name`.
	pub fn decl(&self, name: &str) -> Result<&Arc<TypeDecl>> {
		self.types.get(name).ok_or_else(|| CodecError::UnknownType { name: name.to_owned() })
	}

	/// Ordered field descriptors bound to `name`.
	pub fn fields(&self, name: &str) -> Result<&[FieldDescriptor]> {
		Ok(&self.decl(name)?.fields)
	}

	/// Whether `name` is registered.
	pub fn contains(&self, name: &str) -> bool {
		self.types.contains_key(name)
	}

	/// Registered type names in sorted order.
	pub fn names(&self) -> impl Iterator<Item = &str> {
		self.types.keys().map(|name| &**name)
	}

	/// Total byte size of `name`, recursing into nested structs.
	pub fn size_of(&self, name: &str) -> Result<usize> {
		self.size_of_impl(self.decl(name)?, 0)
	}

	/// Total byte size of a specific declaration handle.
	pub fn size_of_decl(&self, decl: &TypeDecl) -> Result<usize> {
		self.size_of_impl(decl, 0)
	}

	/// Sum of the sizes of every field declared before `field`.
	pub fn offset_of(&self, name: &str, field: &str) -> Result<usize> {
		self.offset_of_decl(self.decl(name)?, field)
	}

	/// `offset_of` against a specific declaration handle.
	pub fn offset_of_decl(&self, decl: &TypeDecl, field: &str) -> Result<usize> {
		let (index, _) = decl.field_or_err(field)?;
		let mut offset = 0_usize;
		for item in &decl.fields[..index] {
			offset = checked_size(decl, offset.checked_add(self.field_size_impl(decl, item, 0)?))?;
		}
		Ok(offset)
	}

	/// Byte size of one element of `field`.
	pub fn element_size(&self, field: &FieldDescriptor) -> Result<usize> {
		self.element_size_impl(field, 0)
	}

	/// Byte size of the whole of `field`, which belongs to `owner`.
	pub fn field_size(&self, owner: &TypeDecl, field: &FieldDescriptor) -> Result<usize> {
		self.field_size_impl(owner, field, 0)
	}

	fn size_of_impl(&self, decl: &TypeDecl, depth: u32) -> Result<usize> {
		if depth >= MAX_NESTING {
			return Err(CodecError::Size {
				type_name: decl.name.to_string(),
				reason: "struct nesting too deep or recursive",
			});
		}
		decl.fields
			.iter()
			.try_fold(0_usize, |acc, field| -> Result<usize> { checked_size(decl, acc.checked_add(self.field_size_impl(decl, field, depth)?)) })
	}

	fn field_size_impl(&self, owner: &TypeDecl, field: &FieldDescriptor, depth: u32) -> Result<usize> {
		let count = match field.array {
			ArrayLen::Scalar => 1,
			ArrayLen::Fixed(count) => count,
			ArrayLen::Unbounded => {
				return Err(CodecError::Size {
					type_name: owner.name.to_string(),
					reason: "runtime-sized array has no static size",
				});
			}
		};
		checked_size(owner, self.element_size_impl(field, depth)?.checked_mul(count))
	}

	fn element_size_impl(&self, field: &FieldDescriptor, depth: u32) -> Result<usize> {
		match &field.kind {
			FieldKind::Struct(name) => self.size_of_impl(self.decl(name)?, depth + 1),
			_ => Ok(field.scalar_element_size().unwrap_or(0)),
		}
	}
}

fn checked_size(decl: &TypeDecl, size: Option<usize>) -> Result<usize> {
	size.ok_or_else(|| CodecError::Size {
		type_name: decl.name.to_string(),
		reason: "size overflow",
	})
}
