use std::convert::TryFrom;

use crate::Result;

macro_rules! matches_cp_info {
    ($cp:expr, $index:expr, $i:ident) => {{
        let index: u16 = $index;
        match $cp.get(index) {
            Some(CpInfo::$i(n)) => Ok(n),
            found => Err(crate::ClassFileError::MalformedReference {
                index,
                expected: stringify!($i),
                found: found.map_or("nothing", CpInfo::kind),
            }),
        }
    }};
}

/// The 1-indexed constant pool table.
///
/// Slot 0 is never a real entry. It is stored as [`CpInfo::Unusable`] so that
/// `len()` equals the `constant_pool_count` read from the class file.
#[derive(Debug, Default)]
pub struct ConstantPool {
    cp_infos: Vec<CpInfo>,
}
impl ConstantPool {
    pub(crate) fn new(cp_infos: Vec<CpInfo>) -> Self {
        Self { cp_infos }
    }

    pub fn len(&self) -> usize {
        self.cp_infos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cp_infos.len() <= 1
    }

    /// Returns the entry at `index`, `None` for index 0 or past the end.
    pub fn get(&self, index: u16) -> Option<&CpInfo> {
        match index {
            0 => None,
            _ => self.cp_infos.get(index as usize),
        }
    }

    pub fn utf8(&self, index: u16) -> Result<&str> {
        matches_cp_info!(self, index, Utf8).map(String::as_str)
    }

    /// Resolves a `CONSTANT_Class_info` index to its internal name.
    pub fn class_name(&self, index: u16) -> Result<&str> {
        let ClassInfo { name_index } = matches_cp_info!(self, index, Class)?;

        self.utf8(*name_index)
    }

    /// Resolves a `CONSTANT_NameAndType_info` index to `(name, descriptor)`.
    pub fn name_and_type(&self, index: u16) -> Result<(&str, &str)> {
        let NameAndTypeInfo {
            name_index,
            descriptor_index,
        } = matches_cp_info!(self, index, NameAndType)?;

        Ok((self.utf8(*name_index)?, self.utf8(*descriptor_index)?))
    }

    /// Usable entries together with their index.
    pub fn iter(&self) -> impl Iterator<Item = (u16, &CpInfo)> {
        self.cp_infos
            .iter()
            .enumerate()
            .filter(|(_, cp_info)| !matches!(cp_info, CpInfo::Unusable))
            .map(|(index, cp_info)| (index as u16, cp_info))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ConstantTag {
    Utf8 = 1,
    Integer = 3,
    Float = 4,
    Long = 5,
    Double = 6,
    Class = 7,
    String = 8,
    FieldRef = 9,
    MethodRef = 10,
    InterfaceMethodRef = 11,
    NameAndType = 12,
    MethodHandle = 15,
    MethodType = 16,
    InvokeDynamic = 18,
}
impl ConstantTag {
    /// Long and Double entries take up two slots in the pool.
    pub fn is_wide(self) -> bool {
        matches!(self, ConstantTag::Long | ConstantTag::Double)
    }
}
impl TryFrom<u8> for ConstantTag {
    type Error = u8;

    fn try_from(value: u8) -> std::result::Result<Self, Self::Error> {
        match value {
            1 => Ok(ConstantTag::Utf8),
            3 => Ok(ConstantTag::Integer),
            4 => Ok(ConstantTag::Float),
            5 => Ok(ConstantTag::Long),
            6 => Ok(ConstantTag::Double),
            7 => Ok(ConstantTag::Class),
            8 => Ok(ConstantTag::String),
            9 => Ok(ConstantTag::FieldRef),
            10 => Ok(ConstantTag::MethodRef),
            11 => Ok(ConstantTag::InterfaceMethodRef),
            12 => Ok(ConstantTag::NameAndType),
            15 => Ok(ConstantTag::MethodHandle),
            16 => Ok(ConstantTag::MethodType),
            18 => Ok(ConstantTag::InvokeDynamic),
            _ => Err(value),
        }
    }
}

#[derive(Debug, PartialEq, Clone)]
pub enum CpInfo {
    Utf8(String),
    Integer(i32),
    Float(f32),
    Long(i64),
    Double(f64),
    Class(ClassInfo),
    String { string_index: u16 },
    FieldRef(RefInfo),
    MethodRef(RefInfo),
    InterfaceMethodRef(RefInfo),
    NameAndType(NameAndTypeInfo),
    MethodHandle(MethodHandleInfo),
    MethodType(MethodTypeInfo),
    InvokeDynamic(InvokeDynamicInfo),
    /// Slot 0 and the slot following a Long or Double.
    Unusable,
}
impl CpInfo {
    pub fn tag(&self) -> Option<ConstantTag> {
        let tag = match self {
            CpInfo::Utf8(_) => ConstantTag::Utf8,
            CpInfo::Integer(_) => ConstantTag::Integer,
            CpInfo::Float(_) => ConstantTag::Float,
            CpInfo::Long(_) => ConstantTag::Long,
            CpInfo::Double(_) => ConstantTag::Double,
            CpInfo::Class(_) => ConstantTag::Class,
            CpInfo::String { .. } => ConstantTag::String,
            CpInfo::FieldRef(_) => ConstantTag::FieldRef,
            CpInfo::MethodRef(_) => ConstantTag::MethodRef,
            CpInfo::InterfaceMethodRef(_) => ConstantTag::InterfaceMethodRef,
            CpInfo::NameAndType(_) => ConstantTag::NameAndType,
            CpInfo::MethodHandle(_) => ConstantTag::MethodHandle,
            CpInfo::MethodType(_) => ConstantTag::MethodType,
            CpInfo::InvokeDynamic(_) => ConstantTag::InvokeDynamic,
            CpInfo::Unusable => return None,
        };
        Some(tag)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            CpInfo::Utf8(_) => "Utf8",
            CpInfo::Integer(_) => "Integer",
            CpInfo::Float(_) => "Float",
            CpInfo::Long(_) => "Long",
            CpInfo::Double(_) => "Double",
            CpInfo::Class(_) => "Class",
            CpInfo::String { .. } => "String",
            CpInfo::FieldRef(_) => "FieldRef",
            CpInfo::MethodRef(_) => "MethodRef",
            CpInfo::InterfaceMethodRef(_) => "InterfaceMethodRef",
            CpInfo::NameAndType(_) => "NameAndType",
            CpInfo::MethodHandle(_) => "MethodHandle",
            CpInfo::MethodType(_) => "MethodType",
            CpInfo::InvokeDynamic(_) => "InvokeDynamic",
            CpInfo::Unusable => "Unusable",
        }
    }
}

/// Shared by field, method and interface method references.
#[derive(Debug, PartialEq, Clone)]
pub struct RefInfo {
    pub class_index: u16,
    pub name_and_type_index: u16,
}

#[derive(Debug, PartialEq, Clone)]
pub struct ClassInfo {
    // The constant_pool entry at name_index must be a CONSTANT_Utf8_info structure
    // representing a valid binary class or interface name encoded in internal form.
    pub name_index: u16,
}

#[derive(Debug, PartialEq, Clone)]
pub struct NameAndTypeInfo {
    pub name_index: u16,
    pub descriptor_index: u16,
}

#[derive(Debug, PartialEq, Clone)]
pub struct InvokeDynamicInfo {
    pub bootstrap_method_attr_index: u16,
    pub name_and_type_index: u16,
}

#[derive(Debug, PartialEq, Clone)]
pub struct MethodHandleInfo {
    pub reference_kind: u8,
    pub reference_index: u16,
}

#[derive(Debug, PartialEq, Clone)]
pub struct MethodTypeInfo {
    pub descriptor_index: u16,
}
