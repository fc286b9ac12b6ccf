// https://docs.oracle.com/javase/specs/jvms/se19/html/jvms-4.html

mod access_flags;
pub mod attributes;
mod class_file;
pub mod constant_pool;
mod error;
pub mod mutf8;
mod parser;
pub mod reader;

pub use self::class_file::{ClassFile, MemberInfo};
pub use access_flags::AccessFlags;
pub use attributes::{Attribute, AttributeDecoders, Attributes, CodeAttribute};
pub use constant_pool::{ConstantPool, CpInfo};
pub use error::ClassFileError;
pub use parser::{Parser, ParserFlags, MAGIC};

pub type Result<T, E = ClassFileError> = std::result::Result<T, E>;
