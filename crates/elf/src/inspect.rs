use xmas_elf::ElfFile;
use xmas_elf::header::{self, Data};
use xmas_elf::program::Type;

use crate::{Class, ElfError, TEXT_SECTION};

/// What a loader sees of an emitted image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    pub class: Class,
    pub machine: u16,
    pub entry: u64,
    pub segment_offset: u64,
    pub segment_vaddr: u64,
    pub section_offset: u64,
    pub section_addr: u64,
    pub section_size: u64,
}

/// Parses `image` and checks that the loadable segment and `.text.init` share a file offset.
///
/// # Errors
/// [`ElfError::Parse`] if the image is not a little-endian ELF with one loadable segment and a
/// `.text.init` section, [`ElfError::LayoutMismatch`] if their offsets differ.
pub fn inspect(image: &[u8]) -> Result<Summary, ElfError> {
    let elf = ElfFile::new(image).map_err(ElfError::Parse)?;

    if !matches!(elf.header.pt1.data(), Data::LittleEndian) {
        return Err(ElfError::Parse("not little endian"));
    }

    let class = match elf.header.pt1.class() {
        header::Class::ThirtyTwo => Class::Elf32,
        header::Class::SixtyFour => Class::Elf64,
        _ => return Err(ElfError::Parse("unknown class")),
    };

    // `e_machine` sits at the same offset in both classes.
    let machine = u16::from_le_bytes([image[18], image[19]]);

    let segment = elf
        .program_iter()
        .find(|it| it.get_type() == Ok(Type::Load))
        .ok_or(ElfError::Parse("no loadable segment"))?;

    let section = elf
        .section_iter()
        .find(|it| it.get_name(&elf) == Ok(TEXT_SECTION))
        .ok_or(ElfError::Parse("no .text.init section"))?;

    if segment.offset() != section.offset() {
        return Err(ElfError::LayoutMismatch {
            program_offset: segment.offset(),
            section_offset: section.offset(),
        });
    }

    Ok(Summary {
        class,
        machine,
        entry: elf.header.pt2.entry_point(),
        segment_offset: segment.offset(),
        segment_vaddr: segment.virtual_addr(),
        section_offset: section.offset(),
        section_addr: section.address(),
        section_size: section.size(),
    })
}
