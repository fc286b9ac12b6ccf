use std::{io::Read, sync::Arc};

use crate::{
    attributes::{Attributes, CodeAttribute},
    parser::Parser,
    AccessFlags, ConstantPool, Result,
};

/// A decoded class file.
///
/// Built once by [`Parser::parse`] and never changed afterwards. Indices into
/// the constant pool are kept as read, the query methods resolve them.
#[derive(Debug)]
pub struct ClassFile {
    pub(crate) magic: u32,
    pub(crate) minor_version: u16,
    pub(crate) major_version: u16,
    pub(crate) constant_pool: Arc<ConstantPool>,
    pub(crate) access_flags: AccessFlags,
    pub(crate) this_class: u16,
    pub(crate) super_class: u16,
    pub(crate) interfaces: Vec<u16>,
    pub(crate) fields: Vec<MemberInfo>,
    pub(crate) methods: Vec<MemberInfo>,
    pub(crate) attributes: Attributes,
}
impl ClassFile {
    pub fn parse(bytes: impl Read) -> Result<ClassFile> {
        Parser::new(bytes).parse()
    }

    pub fn magic(&self) -> u32 {
        self.magic
    }

    /// `(major, minor)` exactly as found in the header.
    pub fn version(&self) -> (u16, u16) {
        (self.major_version, self.minor_version)
    }

    pub fn constant_pool(&self) -> &ConstantPool {
        &self.constant_pool
    }

    pub fn access_flags(&self) -> AccessFlags {
        self.access_flags
    }

    pub fn this_class(&self) -> u16 {
        self.this_class
    }

    pub fn super_class(&self) -> u16 {
        self.super_class
    }

    pub fn interfaces(&self) -> &[u16] {
        &self.interfaces
    }

    pub fn fields(&self) -> &[MemberInfo] {
        &self.fields
    }

    pub fn methods(&self) -> &[MemberInfo] {
        &self.methods
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    /// The internal name of this class, e.g. `com/example/App`.
    pub fn class_name(&self) -> Result<&str> {
        // The constant_pool entry at this_class must be a CONSTANT_Class_info structure
        // representing the class or interface defined by this class file.
        self.constant_pool.class_name(self.this_class)
    }

    /// The internal name of the direct superclass, `None` for `java/lang/Object`.
    pub fn super_class_name(&self) -> Result<Option<&str>> {
        // If the value of the super_class item is zero, then this class file must represent
        // the class Object, the only class or interface without a direct superclass.
        if self.super_class == 0 {
            return Ok(None);
        }

        self.constant_pool.class_name(self.super_class).map(Some)
    }

    pub fn interface_names(&self) -> Result<Vec<&str>> {
        self.interfaces
            .iter()
            .map(|index| self.constant_pool.class_name(*index))
            .collect()
    }

    pub fn member_name(&self, member: &MemberInfo) -> Result<&str> {
        self.constant_pool.utf8(member.name_index)
    }

    pub fn member_descriptor(&self, member: &MemberInfo) -> Result<&str> {
        self.constant_pool.utf8(member.descriptor_index)
    }

    /// Field names in declaration order.
    pub fn field_names(&self) -> Result<Vec<&str>> {
        self.fields.iter().map(|f| self.member_name(f)).collect()
    }

    /// Method names in declaration order, constructors are `<init>`.
    pub fn method_names(&self) -> Result<Vec<&str>> {
        self.methods.iter().map(|m| self.member_name(m)).collect()
    }
}

/// A field or a method, both share one layout.
#[derive(Debug)]
pub struct MemberInfo {
    pub access_flags: AccessFlags,
    pub name_index: u16,
    pub descriptor_index: u16,
    pub attributes: Attributes,
}
impl MemberInfo {
    pub fn code(&self) -> Option<&CodeAttribute> {
        self.attributes.code()
    }
}
