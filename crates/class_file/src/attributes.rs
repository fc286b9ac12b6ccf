use std::{borrow::Cow, collections::HashMap, fmt, io::Read, sync::Arc};

use log::trace;

use crate::{reader::ByteReader, ClassFileError, ConstantPool, ParserFlags, Result};

/// How many structural attributes may enclose one another, e.g. a `Code`
/// attribute inside a `Code` attribute.
pub const MAX_ATTRIBUTE_DEPTH: usize = 64;

/// Decodes the payload of one attribute into its structural form.
///
/// The first argument is the name the decoder was registered under. The
/// reader is bounded to exactly the declared `attribute_length` bytes.
pub type AttributeDecodeFn =
    fn(&str, &mut ByteReader<&[u8]>, &DecodeContext<'_>) -> Result<Attribute>;

/// Which attribute names get structural treatment.
///
/// Every name without a registered decoder is kept as an [`OpaqueAttribute`].
#[derive(Clone)]
pub struct AttributeDecoders {
    decoders: HashMap<String, AttributeDecodeFn>,
}
impl AttributeDecoders {
    pub fn empty() -> Self {
        Self {
            decoders: HashMap::new(),
        }
    }

    pub fn register(mut self, name: impl Into<String>, decoder: AttributeDecodeFn) -> Self {
        self.decoders.insert(name.into(), decoder);
        self
    }

    pub fn without(mut self, name: &str) -> Self {
        self.decoders.remove(name);
        self
    }

    pub fn get(&self, name: &str) -> Option<AttributeDecodeFn> {
        self.decoders.get(name).copied()
    }
}
impl Default for AttributeDecoders {
    fn default() -> Self {
        Self::empty().register("Code", decode_code)
    }
}
impl fmt::Debug for AttributeDecoders {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.decoders.keys()).finish()
    }
}

/// What an attribute decoder can see besides its own payload.
#[derive(Clone, Copy)]
pub struct DecodeContext<'a> {
    pub constant_pool: &'a Arc<ConstantPool>,
    pub(crate) decoders: &'a AttributeDecoders,
    pub(crate) flags: ParserFlags,
    /// Number of structural attributes enclosing the table being read.
    pub depth: usize,
}
impl<'a> DecodeContext<'a> {
    pub(crate) fn new(
        constant_pool: &'a Arc<ConstantPool>,
        decoders: &'a AttributeDecoders,
        flags: ParserFlags,
    ) -> Self {
        Self {
            constant_pool,
            decoders,
            flags,
            depth: 0,
        }
    }

    fn nested(&self, name: &str) -> Result<DecodeContext<'a>> {
        if self.depth >= MAX_ATTRIBUTE_DEPTH {
            return Err(ClassFileError::AttributeNestingTooDeep {
                name: name.to_owned(),
                limit: MAX_ATTRIBUTE_DEPTH,
            });
        }

        Ok(DecodeContext {
            depth: self.depth + 1,
            ..*self
        })
    }
}

#[derive(Debug)]
pub enum Attribute {
    Code(CodeAttribute),
    /// Anything without a registered decoder, e.g. `ConstantValue`,
    /// `Exceptions`, `LineNumberTable`, `Signature`, `SourceFile` or the
    /// annotation attributes.
    Opaque(OpaqueAttribute),
}
impl Attribute {
    pub fn name(&self) -> &str {
        match self {
            Attribute::Code(code) => &code.name,
            Attribute::Opaque(opaque) => &opaque.name,
        }
    }
}

pub struct OpaqueAttribute {
    pub name: String,
    pub length: u32,
    pub info: Vec<u8>,
}
impl fmt::Debug for OpaqueAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpaqueAttribute")
            .field("name", &self.name)
            .field("info", &format!("({} bytes)", self.info.len()))
            .finish()
    }
}

#[derive(Debug, Default)]
pub struct Attributes(Vec<Attribute>);
impl Attributes {
    pub fn find_by_name(&self, name: &str) -> Option<&Attribute> {
        self.0.iter().find(|a| a.name() == name)
    }

    pub fn code(&self) -> Option<&CodeAttribute> {
        self.0.iter().find_map(|a| match a {
            Attribute::Code(code) => Some(code),
            _ => None,
        })
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Attribute> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
impl<'a> IntoIterator for &'a Attributes {
    type Item = &'a Attribute;
    type IntoIter = std::slice::Iter<'a, Attribute>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExceptionTableEntry {
    pub start_pc: u16,
    pub end_pc: u16,
    pub handler_pc: u16,
    pub catch_type: u16,
}

pub struct CodeAttribute {
    pub max_stack: u16,
    pub max_locals: u16,
    pub code: Vec<u8>,
    pub exception_table: Vec<ExceptionTableEntry>,
    pub attributes: Attributes,
    name: String,
    constant_pool: Arc<ConstantPool>,
}
impl CodeAttribute {
    /// The name this attribute was found under, normally `Code`.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn constant_pool(&self) -> &ConstantPool {
        &self.constant_pool
    }

    /// The class caught by `entry`, `None` for a handler that catches everything.
    pub fn catch_type_name(&self, entry: &ExceptionTableEntry) -> Result<Option<&str>> {
        if entry.catch_type == 0 {
            return Ok(None);
        }

        self.constant_pool.class_name(entry.catch_type).map(Some)
    }
}
impl fmt::Debug for CodeAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CodeAttribute")
            .field("name", &self.name)
            .field("max_stack", &self.max_stack)
            .field("max_locals", &self.max_locals)
            .field("code", &format!("({} bytes)", self.code.len()))
            .field("exception_table", &self.exception_table)
            .field("attributes", &self.attributes)
            .finish()
    }
}

/// Reads an `attributes_count` followed by that many attributes.
///
/// Each payload is copied out of `r` once.
pub fn parse_attributes<R: Read>(
    r: &mut ByteReader<R>,
    ctx: &DecodeContext<'_>,
) -> Result<Attributes> {
    parse_attribute_table(r, ctx, |r, len| r.read_bytes(len).map(Cow::Owned))
}

/// Reads an attribute table out of another attribute's payload.
///
/// Payloads are borrowed from the enclosing one, only opaque attributes are
/// copied.
pub fn parse_nested_attributes(
    r: &mut ByteReader<&[u8]>,
    ctx: &DecodeContext<'_>,
) -> Result<Attributes> {
    parse_attribute_table(r, ctx, |r, len| r.read_slice(len).map(Cow::Borrowed))
}

fn parse_attribute_table<'p, R: Read>(
    r: &mut ByteReader<R>,
    ctx: &DecodeContext<'_>,
    read_payload: impl Fn(&mut ByteReader<R>, usize) -> Result<Cow<'p, [u8]>>,
) -> Result<Attributes> {
    let attributes_count = r.read_u16()?;

    (0..attributes_count)
        .map(|_| {
            let attribute_name_index = r.read_u16()?;
            let name = ctx
                .constant_pool
                .utf8(attribute_name_index)
                .map_err(|_| ClassFileError::AttributeNameNotUtf8(attribute_name_index))?;
            let attribute_length = r.read_u32()?;
            let info = read_payload(r, attribute_length as usize)?;

            trace!("Attribute {} ({} bytes)", name, attribute_length);

            decode_attribute(name, attribute_length, info, ctx)
        })
        .collect::<Result<Vec<_>>>()
        .map(Attributes)
}

fn decode_attribute(
    name: &str,
    attribute_length: u32,
    info: Cow<'_, [u8]>,
    ctx: &DecodeContext<'_>,
) -> Result<Attribute> {
    let Some(decode) = ctx.decoders.get(name) else {
        return Ok(Attribute::Opaque(OpaqueAttribute {
            name: name.to_owned(),
            length: attribute_length,
            info: info.into_owned(),
        }));
    };

    let mismatch = || ClassFileError::AttributeLengthMismatch {
        name: name.to_owned(),
        declared: attribute_length,
    };

    let nested = ctx.nested(name)?;
    let mut payload = ByteReader::new(&info[..]);
    let attribute = decode(name, &mut payload, &nested).map_err(|e| match e {
        ClassFileError::TruncatedInput { .. } => mismatch(),
        e => e,
    })?;

    if payload.offset() != u64::from(attribute_length)
        && !ctx.flags.contains(ParserFlags::TRUST_ATTRIBUTE_LENGTHS)
    {
        return Err(mismatch());
    }

    Ok(attribute)
}

pub fn decode_code(
    name: &str,
    r: &mut ByteReader<&[u8]>,
    ctx: &DecodeContext<'_>,
) -> Result<Attribute> {
    let max_stack = r.read_u16()?;
    let max_locals = r.read_u16()?;
    let code_length = r.read_u32()?;
    let code = r.read_slice(code_length as usize)?.to_vec();
    let exception_table_length = r.read_u16()?;
    let exception_table = (0..exception_table_length)
        .map(|_| parse_exception_table_entry(r))
        .collect::<Result<Vec<_>>>()?;
    let attributes = parse_nested_attributes(r, ctx)?;

    Ok(Attribute::Code(CodeAttribute {
        max_stack,
        max_locals,
        code,
        exception_table,
        attributes,
        name: name.to_owned(),
        constant_pool: Arc::clone(ctx.constant_pool),
    }))
}

fn parse_exception_table_entry<R: Read>(r: &mut ByteReader<R>) -> Result<ExceptionTableEntry> {
    let start_pc = r.read_u16()?;
    let end_pc = r.read_u16()?;
    let handler_pc = r.read_u16()?;
    let catch_type = r.read_u16()?;

    Ok(ExceptionTableEntry {
        start_pc,
        end_pc,
        handler_pc,
        catch_type,
    })
}
