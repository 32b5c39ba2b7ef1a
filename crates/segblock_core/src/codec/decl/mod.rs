use std::collections::BTreeMap;

use crate::codec::{CodecError, POINTER_SIZE, Primitive, Result};

/// Substitution variables bound while parsing array-size expressions.
pub type Vars = BTreeMap<String, i64>;

/// Storage class of a declared field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
	/// Fixed-size scalar.
	Primitive(Primitive),
	/// Inline nested record of a registered type.
	Struct(Box<str>),
	/// 32-bit address of a value of the named type. Never dereferenced by the codec.
	Pointer(Box<str>),
}

/// Array multiplicity of a declared field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrayLen {
	/// Not an array.
	Scalar,
	/// Fixed element count, the product of every bracket dimension.
	Fixed(usize),
	/// `[]`: length discovered from an end marker at read time.
	Unbounded,
}

/// One parsed field declaration such as `s16 vertices[N][3]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
	/// Declared type token (primitive keyword or struct name).
	pub type_name: Box<str>,
	/// Declared field name, `|`-joined for union alias groups.
	pub field_name: Box<str>,
	/// Individual names the field is reachable under.
	pub aliases: Vec<Box<str>>,
	/// Storage class.
	pub kind: FieldKind,
	/// Array multiplicity.
	pub array: ArrayLen,
}

impl FieldDescriptor {
	/// First alias, used as the canonical field name.
	pub fn name(&self) -> &str {
		&self.aliases[0]
	}

	/// Whether `name` is the declared name or one of its aliases.
	pub fn answers_to(&self, name: &str) -> bool {
		*self.field_name == *name || self.aliases.iter().any(|alias| **alias == *name)
	}

	/// Whether the field stores an address.
	pub fn is_pointer(&self) -> bool {
		matches!(self.kind, FieldKind::Pointer(_))
	}

	/// Whether the field is an inline nested record.
	pub fn is_struct(&self) -> bool {
		matches!(self.kind, FieldKind::Struct(_))
	}

	/// Whether the field is declared with brackets.
	pub fn is_array(&self) -> bool {
		!matches!(self.array, ArrayLen::Scalar)
	}

	/// Whether the field name is a union alias group.
	pub fn is_union(&self) -> bool {
		self.aliases.len() > 1
	}

	/// Resolved element count; `None` for unbounded arrays.
	pub fn array_size(&self) -> Option<usize> {
		match self.array {
			ArrayLen::Scalar => Some(1),
			ArrayLen::Fixed(count) => Some(count),
			ArrayLen::Unbounded => None,
		}
	}

	/// Size of one element when it does not depend on other registered types.
	pub fn scalar_element_size(&self) -> Option<usize> {
		match &self.kind {
			FieldKind::Primitive(primitive) => Some(primitive.size()),
			FieldKind::Pointer(_) => Some(POINTER_SIZE),
			FieldKind::Struct(_) => None,
		}
	}
}

/// Parse one declaration string with `vars` bound for array-size expressions.
pub fn parse_field_decl(raw: &str, vars: &Vars) -> Result<FieldDescriptor> {
	let text = raw.trim().trim_end_matches(';').trim_end();
	let err = |reason| CodecError::Parse { decl: raw.to_owned(), reason };

	let (has_struct_kw, text) = match text.strip_prefix("struct") {
		Some(rest) if rest.starts_with(char::is_whitespace) => (true, rest.trim_start()),
		_ => (false, text),
	};

	let (head, dims) = match text.find('[') {
		Some(idx) => (&text[..idx], &text[idx..]),
		None => (text, ""),
	};
	if head.contains(']') {
		return Err(err("unmatched ']'"));
	}

	let stars = head.matches('*').count();
	let head = head.replace('*', " ");
	let mut tokens = head.split_whitespace();
	let (Some(type_name), Some(field_name), None) = (tokens.next(), tokens.next(), tokens.next()) else {
		return Err(err("expected `<type> <name>`"));
	};
	if !is_ident(type_name) {
		return Err(err("invalid type name"));
	}

	let aliases: Vec<Box<str>> = field_name.split('|').map(Box::from).collect();
	if aliases.iter().any(|alias| !is_ident(alias)) {
		return Err(err("invalid field name"));
	}

	let kind = if stars > 0 {
		FieldKind::Pointer(type_name.into())
	} else if let (false, Some(primitive)) = (has_struct_kw, Primitive::from_name(type_name)) {
		FieldKind::Primitive(primitive)
	} else {
		FieldKind::Struct(type_name.into())
	};

	let array = parse_dims(raw, dims, vars)?;

	Ok(FieldDescriptor {
		type_name: type_name.into(),
		field_name: field_name.into(),
		aliases,
		kind,
		array,
	})
}

fn parse_dims(raw: &str, mut tail: &str, vars: &Vars) -> Result<ArrayLen> {
	let err = |reason| CodecError::Parse { decl: raw.to_owned(), reason };
	let mut dims = Vec::new();

	loop {
		tail = tail.trim_start();
		if tail.is_empty() {
			break;
		}
		let Some(rest) = tail.strip_prefix('[') else {
			return Err(err("unexpected text after field name"));
		};
		let Some(close) = rest.find(']') else {
			return Err(err("unmatched '['"));
		};
		let inner = &rest[..close];
		if inner.contains('[') {
			return Err(err("unmatched '['"));
		}
		dims.push(inner.trim());
		tail = &rest[close + 1..];
	}

	if dims.is_empty() {
		return Ok(ArrayLen::Scalar);
	}
	if dims.iter().any(|dim| dim.is_empty()) {
		if dims.len() > 1 {
			return Err(err("unbounded `[]` cannot be combined with other dimensions"));
		}
		return Ok(ArrayLen::Unbounded);
	}

	let mut total = 1_usize;
	for dim in dims {
		let value = eval_expr(raw, dim, vars)?;
		let value = usize::try_from(value).map_err(|_| err("negative array size"))?;
		total = total.checked_mul(value).ok_or_else(|| err("array size overflow"))?;
	}
	Ok(ArrayLen::Fixed(total))
}

fn is_ident(text: &str) -> bool {
	let mut chars = text.chars();
	matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_') && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[derive(Debug, Clone, PartialEq)]
enum Tok<'a> {
	Num(i64),
	Ident(&'a str),
	Op(char),
}

/// Evaluate an array-size expression: integers, variables, `+ - * /`, parentheses.
fn eval_expr(raw: &str, expr: &str, vars: &Vars) -> Result<i64> {
	let tokens = tokenize(raw, expr)?;
	let mut parser = ExprParser { raw, tokens, pos: 0, vars };
	let value = parser.sum()?;
	if parser.pos != parser.tokens.len() {
		return Err(parser.fail("trailing tokens in array size"));
	}
	Ok(value)
}

fn tokenize<'a>(raw: &str, expr: &'a str) -> Result<Vec<Tok<'a>>> {
	let err = |reason| CodecError::Parse { decl: raw.to_owned(), reason };
	let bytes = expr.as_bytes();
	let mut out = Vec::new();
	let mut idx = 0;

	while idx < bytes.len() {
		let byte = bytes[idx];
		if byte.is_ascii_whitespace() {
			idx += 1;
		} else if byte.is_ascii_digit() {
			let start = idx;
			while idx < bytes.len() && bytes[idx].is_ascii_alphanumeric() {
				idx += 1;
			}
			let lit = &expr[start..idx];
			let parsed = match lit.strip_prefix("0x").or_else(|| lit.strip_prefix("0X")) {
				Some(hex) => i64::from_str_radix(hex, 16),
				None => lit.parse::<i64>(),
			};
			out.push(Tok::Num(parsed.map_err(|_| err("invalid integer literal"))?));
		} else if byte.is_ascii_alphabetic() || byte == b'_' {
			let start = idx;
			while idx < bytes.len() && (bytes[idx].is_ascii_alphanumeric() || bytes[idx] == b'_') {
				idx += 1;
			}
			out.push(Tok::Ident(&expr[start..idx]));
		} else if matches!(byte, b'+' | b'-' | b'*' | b'/' | b'(' | b')') {
			out.push(Tok::Op(char::from(byte)));
			idx += 1;
		} else {
			return Err(err("unexpected character in array size"));
		}
	}

	Ok(out)
}

struct ExprParser<'a, 'v> {
	raw: &'a str,
	tokens: Vec<Tok<'a>>,
	pos: usize,
	vars: &'v Vars,
}

impl ExprParser<'_, '_> {
	fn fail(&self, reason: &'static str) -> CodecError {
		CodecError::Parse { decl: self.raw.to_owned(), reason }
	}

	fn eat(&mut self, op: char) -> bool {
		if self.tokens.get(self.pos) == Some(&Tok::Op(op)) {
			self.pos += 1;
			return true;
		}
		false
	}

	fn sum(&mut self) -> Result<i64> {
		let mut acc = self.product()?;
		loop {
			if self.eat('+') {
				let rhs = self.product()?;
				acc = acc.checked_add(rhs).ok_or_else(|| self.fail("array size overflow"))?;
			} else if self.eat('-') {
				let rhs = self.product()?;
				acc = acc.checked_sub(rhs).ok_or_else(|| self.fail("array size overflow"))?;
			} else {
				return Ok(acc);
			}
		}
	}

	fn product(&mut self) -> Result<i64> {
		let mut acc = self.atom()?;
		loop {
			if self.eat('*') {
				let rhs = self.atom()?;
				acc = acc.checked_mul(rhs).ok_or_else(|| self.fail("array size overflow"))?;
			} else if self.eat('/') {
				let rhs = self.atom()?;
				acc = acc.checked_div(rhs).ok_or_else(|| self.fail("division by zero in array size"))?;
			} else {
				return Ok(acc);
			}
		}
	}

	fn atom(&mut self) -> Result<i64> {
		if self.eat('-') {
			let value = self.atom()?;
			return value.checked_neg().ok_or_else(|| self.fail("array size overflow"));
		}
		if self.eat('(') {
			let value = self.sum()?;
			if !self.eat(')') {
				return Err(self.fail("unmatched '(' in array size"));
			}
			return Ok(value);
		}

		match self.tokens.get(self.pos).cloned() {
			Some(Tok::Num(value)) => {
				self.pos += 1;
				Ok(value)
			}
			Some(Tok::Ident(name)) => {
				self.pos += 1;
				self.vars.get(name).copied().ok_or_else(|| CodecError::UnboundVariable {
					var: name.to_owned(),
					decl: self.raw.to_owned(),
				})
			}
			_ => Err(self.fail("expected number or variable in array size")),
		}
	}
}
