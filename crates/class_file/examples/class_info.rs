use std::{env, fs::File, path::Path};

use jt_class_file::{ClassFile, Result};
use memmap::Mmap;

fn main() {
    pretty_env_logger::init();

    for path in env::args().skip(1) {
        if let Err(e) = print_class(Path::new(&path)) {
            log::warn!("Cannot read {}: {}", path, e);
        }
    }
}

fn print_class(path: &Path) -> Result<()> {
    let file = File::open(path)?;
    let mmap = unsafe { Mmap::map(&file)? };

    let class_file = ClassFile::parse(&mmap[..])?;
    let (major, minor) = class_file.version();

    println!("{}:", path.display());
    println!("    Class:      {}", class_file.class_name()?);
    println!(
        "    Superclass: {}",
        class_file.super_class_name()?.unwrap_or_default()
    );
    println!("    Version:    {}.{}", major, minor);
    for interface in class_file.interface_names()? {
        println!("    Implements: {}", interface);
    }
    for field in class_file.field_names()? {
        println!("    Field:      {}", field);
    }
    for method in class_file.method_names()? {
        println!("    Method:     {}", method);
    }

    Ok(())
}
