use std::{convert::TryFrom, io::Read, sync::Arc};

use bitflags::bitflags;
use log::{debug, trace};

use crate::{
    attributes::{self, AttributeDecoders, DecodeContext},
    class_file::MemberInfo,
    constant_pool::{
        ClassInfo, ConstantTag, CpInfo, InvokeDynamicInfo, MethodHandleInfo, MethodTypeInfo,
        NameAndTypeInfo, RefInfo,
    },
    mutf8,
    reader::ByteReader,
    AccessFlags, ClassFile, ClassFileError, ConstantPool, Result,
};

pub const MAGIC: u32 = 0xCAFEBABE;

bitflags! {
    #[derive(Default)]
    pub struct ParserFlags: u8 {
        /// Give Long and Double constants a single pool slot, like the `jt`
        /// tool did. Every index after such a constant then disagrees with
        /// what `javac` wrote.
        const SINGLE_SLOT_WIDE_CONSTANTS = 0x01;
        /// Accept structural attributes that stop short of their declared
        /// `attribute_length`.
        const TRUST_ATTRIBUTE_LENGTHS = 0x02;
    }
}

/// Decodes one class file from a byte stream.
///
/// The stream is read without buffering and never past the end of the class
/// file, wrap it in a `BufReader` when reading from a file.
pub struct Parser<R> {
    r: ByteReader<R>,
    flags: ParserFlags,
    decoders: AttributeDecoders,
}
impl<R: Read> Parser<R> {
    pub fn new(r: R) -> Self {
        Self {
            r: ByteReader::new(r),
            flags: ParserFlags::default(),
            decoders: AttributeDecoders::default(),
        }
    }

    pub fn with_flags(mut self, flags: ParserFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn with_attribute_decoders(mut self, decoders: AttributeDecoders) -> Self {
        self.decoders = decoders;
        self
    }

    /// Bytes consumed so far.
    pub fn offset(&self) -> u64 {
        self.r.offset()
    }

    pub fn into_inner(self) -> R {
        self.r.into_inner()
    }

    pub fn parse(&mut self) -> Result<ClassFile> {
        let magic = self.parse_magic_identifier()?;
        let (major_version, minor_version) = self.parse_version()?;

        let constant_pool = Arc::new(self.parse_constant_pool()?);
        let access_flags = AccessFlags::from_bits_truncate(self.r.read_u16()?);
        let this_class = self.r.read_u16()?;
        let super_class = self.r.read_u16()?;
        let interfaces_count = self.r.read_u16()?;
        let interfaces = self.r.read_u16_vec(interfaces_count)?;

        let ctx = DecodeContext::new(&constant_pool, &self.decoders, self.flags);

        let fields = parse_members(&mut self.r, &ctx)?;
        let methods = parse_members(&mut self.r, &ctx)?;
        let attributes = attributes::parse_attributes(&mut self.r, &ctx)?;

        debug!(
            "Decoded class file version {}.{}: {} constants, {} fields, {} methods, {} bytes",
            major_version,
            minor_version,
            constant_pool.len(),
            fields.len(),
            methods.len(),
            self.r.offset()
        );

        Ok(ClassFile {
            magic,
            minor_version,
            major_version,
            constant_pool,
            access_flags,
            this_class,
            super_class,
            interfaces,
            fields,
            methods,
            attributes,
        })
    }

    fn parse_magic_identifier(&mut self) -> Result<u32> {
        match self.r.read_u32()? {
            MAGIC => Ok(MAGIC),
            magic_identifier => Err(ClassFileError::InvalidMagic(magic_identifier)),
        }
    }

    fn parse_version(&mut self) -> Result<(u16, u16)> {
        let minor = self.r.read_u16()?;
        let major = self.r.read_u16()?;
        Ok((major, minor))
    }

    fn parse_constant_pool(&mut self) -> Result<ConstantPool> {
        let constant_pool_count = self.r.read_u16()? as usize;
        trace!("Constant pool count: {}", constant_pool_count);

        let mut res = Vec::with_capacity(constant_pool_count.max(1));
        res.push(CpInfo::Unusable);
        while res.len() < constant_pool_count {
            let (cp_info, tag) = self.parse_cp_info()?;
            res.push(cp_info);

            if tag.is_wide()
                && !self.flags.contains(ParserFlags::SINGLE_SLOT_WIDE_CONSTANTS)
                && res.len() < constant_pool_count
            {
                res.push(CpInfo::Unusable);
            }
        }
        Ok(ConstantPool::new(res))
    }

    fn parse_cp_info(&mut self) -> Result<(CpInfo, ConstantTag)> {
        let tag = self.r.read_u8()?;
        let tag = ConstantTag::try_from(tag).map_err(ClassFileError::UnknownConstantTag)?;

        let cp_info = match tag {
            ConstantTag::Utf8 => self.parse_utf8()?,
            ConstantTag::Integer => CpInfo::Integer(self.r.read_i32()?),
            ConstantTag::Float => CpInfo::Float(self.r.read_f32()?),
            ConstantTag::Long => CpInfo::Long(self.r.read_i64()?),
            ConstantTag::Double => CpInfo::Double(self.r.read_f64()?),
            ConstantTag::Class => self.parse_class_info()?,
            ConstantTag::String => self.parse_string()?,
            ConstantTag::FieldRef => CpInfo::FieldRef(self.parse_ref_info()?),
            ConstantTag::MethodRef => CpInfo::MethodRef(self.parse_ref_info()?),
            ConstantTag::InterfaceMethodRef => {
                CpInfo::InterfaceMethodRef(self.parse_ref_info()?)
            }
            ConstantTag::NameAndType => self.parse_name_and_type_info()?,
            ConstantTag::MethodHandle => self.parse_method_handle()?,
            ConstantTag::MethodType => self.parse_method_type_info()?,
            ConstantTag::InvokeDynamic => self.parse_invoke_dynamic_info()?,
        };

        Ok((cp_info, tag))
    }

    fn parse_utf8(&mut self) -> Result<CpInfo> {
        let length = self.r.read_u16()?;
        let bytes = self.r.read_bytes(length as usize)?;

        Ok(CpInfo::Utf8(mutf8::decode(&bytes)?))
    }

    fn parse_class_info(&mut self) -> Result<CpInfo> {
        let name_index = self.r.read_u16()?;

        Ok(CpInfo::Class(ClassInfo { name_index }))
    }

    fn parse_string(&mut self) -> Result<CpInfo> {
        let string_index = self.r.read_u16()?;

        Ok(CpInfo::String { string_index })
    }

    fn parse_name_and_type_info(&mut self) -> Result<CpInfo> {
        let name_index = self.r.read_u16()?;
        let descriptor_index = self.r.read_u16()?;

        Ok(CpInfo::NameAndType(NameAndTypeInfo {
            name_index,
            descriptor_index,
        }))
    }

    fn parse_method_handle(&mut self) -> Result<CpInfo> {
        let reference_kind = self.r.read_u8()?;
        let reference_index = self.r.read_u16()?;

        Ok(CpInfo::MethodHandle(MethodHandleInfo {
            reference_kind,
            reference_index,
        }))
    }

    fn parse_method_type_info(&mut self) -> Result<CpInfo> {
        let descriptor_index = self.r.read_u16()?;

        Ok(CpInfo::MethodType(MethodTypeInfo { descriptor_index }))
    }

    fn parse_invoke_dynamic_info(&mut self) -> Result<CpInfo> {
        let bootstrap_method_attr_index = self.r.read_u16()?;
        let name_and_type_index = self.r.read_u16()?;

        Ok(CpInfo::InvokeDynamic(InvokeDynamicInfo {
            bootstrap_method_attr_index,
            name_and_type_index,
        }))
    }

    fn parse_ref_info(&mut self) -> Result<RefInfo> {
        let class_index = self.r.read_u16()?;
        let name_and_type_index = self.r.read_u16()?;

        Ok(RefInfo {
            class_index,
            name_and_type_index,
        })
    }
}

fn parse_members<R: Read>(
    r: &mut ByteReader<R>,
    ctx: &DecodeContext<'_>,
) -> Result<Vec<MemberInfo>> {
    let count = r.read_u16()?;

    (0..count).map(|_| parse_member_info(r, ctx)).collect()
}

fn parse_member_info<R: Read>(
    r: &mut ByteReader<R>,
    ctx: &DecodeContext<'_>,
) -> Result<MemberInfo> {
    let access_flags = AccessFlags::from_bits_truncate(r.read_u16()?);
    let name_index = r.read_u16()?;
    let descriptor_index = r.read_u16()?;
    let attributes = attributes::parse_attributes(r, ctx)?;

    Ok(MemberInfo {
        access_flags,
        name_index,
        descriptor_index,
        attributes,
    })
}

#[cfg(test)]
mod parse_magic_identifier_tests {
    use super::*;

    #[test]
    fn it_should_be_able_to_parse_the_correct_identifier() {
        assert!(Parser::new(&[0xca, 0xfe, 0xba, 0xbe][..])
            .parse_magic_identifier()
            .is_ok());
    }

    #[test]
    fn it_should_fail_if_there_is_not_enough_data() {
        assert!(matches!(
            Parser::new(&[0xca, 0xfe, 0xba][..]).parse_magic_identifier(),
            Err(ClassFileError::TruncatedInput { .. })
        ));
    }

    #[test]
    fn it_should_fail_if_the_magic_identifier_is_incorrect() {
        assert!(matches!(
            Parser::new(&[0xca, 0xfe, 0xda, 0xda][..]).parse_magic_identifier(),
            Err(ClassFileError::InvalidMagic(0xCAFEDADA))
        ));
    }
}
