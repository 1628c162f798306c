//! Serialization of the single-section executable.

use crate::Class;

pub const EM_RISCV: u16 = 243;

const ET_EXEC: u16 = 2;
const PT_LOAD: u32 = 1;
const PF_X: u32 = 1;
const PF_R: u32 = 4;
const SHT_PROGBITS: u32 = 1;
const SHT_STRTAB: u32 = 3;
const SHF_ALLOC: u64 = 0x2;
const SHF_EXECINSTR: u64 = 0x4;

pub const TEXT_SECTION: &str = ".text.init";

const SHSTRTAB: &[u8] = b"\0.text.init\0.shstrtab\0";
const TEXT_NAME: u32 = 1;
const SHSTRTAB_NAME: u32 = 12;

const TEXT_ALIGN: u64 = 4;

/// File offsets of every part of the image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    pub class: Class,
    pub phoff: u64,
    pub text_offset: u64,
    pub text_len: u64,
    pub shstrtab_offset: u64,
    pub shoff: u64,
    pub file_len: u64,
}

impl Layout {
    #[must_use]
    pub fn new(class: Class, text_len: u64) -> Self {
        let (ehsize, phentsize, shentsize) = class.header_sizes();
        let word = class.word_len();

        let phoff = ehsize;
        let text_offset = (phoff + phentsize).next_multiple_of(TEXT_ALIGN);
        let shstrtab_offset = text_offset + text_len;
        let shoff = (shstrtab_offset + SHSTRTAB.len() as u64).next_multiple_of(word);
        let file_len = shoff + 3 * shentsize;

        Self { class, phoff, text_offset, text_len, shstrtab_offset, shoff, file_len }
    }
}

impl Class {
    /// `e_ehsize`, `e_phentsize`, `e_shentsize`.
    const fn header_sizes(self) -> (u64, u64, u64) {
        match self {
            Self::Elf32 => (52, 32, 40),
            Self::Elf64 => (64, 56, 64),
        }
    }

    const fn word_len(self) -> u64 {
        match self {
            Self::Elf32 => 4,
            Self::Elf64 => 8,
        }
    }

    const fn ident(self) -> u8 {
        match self {
            Self::Elf32 => 1,
            Self::Elf64 => 2,
        }
    }
}

struct Writer {
    buf: Vec<u8>,
    class: Class,
}

impl Writer {
    fn u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    fn u16(&mut self, v: u16) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    /// An address, offset or size: 4 bytes in ELF32, 8 in ELF64.
    fn word(&mut self, v: u64) {
        match self.class {
            // callers check that addresses fit before serializing.
            Class::Elf32 => self.u32(v as u32),
            Class::Elf64 => self.buf.extend_from_slice(&v.to_le_bytes()),
        }
    }

    fn pad_to(&mut self, offset: u64) {
        debug_assert!(self.buf.len() as u64 <= offset);
        self.buf.resize(offset as usize, 0);
    }

    #[allow(clippy::too_many_arguments)]
    fn section_header(
        &mut self,
        name: u32,
        kind: u32,
        flags: u64,
        addr: u64,
        offset: u64,
        size: u64,
        addralign: u64,
    ) {
        self.u32(name);
        self.u32(kind);
        self.word(flags);
        self.word(addr);
        self.word(offset);
        self.word(size);
        // sh_link, sh_info
        self.u32(0);
        self.u32(0);
        self.word(addralign);
        // sh_entsize
        self.word(0);
    }
}

/// Serializes `text` as the only loadable section, mapped at `section_address`.
#[must_use]
pub fn serialize(text: &[u8], entry: u64, section_address: u64, class: Class) -> Vec<u8> {
    let layout = Layout::new(class, text.len() as u64);
    let (ehsize, phentsize, shentsize) = class.header_sizes();

    let mut w = Writer { buf: Vec::with_capacity(layout.file_len as usize), class };

    // e_ident
    w.buf.extend_from_slice(b"\x7fELF");
    w.u8(class.ident());
    // little endian, current version, System V ABI.
    w.u8(1);
    w.u8(1);
    w.u8(0);
    w.pad_to(16);

    w.u16(ET_EXEC);
    w.u16(EM_RISCV);
    w.u32(1);
    w.word(entry);
    w.word(layout.phoff);
    w.word(layout.shoff);
    // e_flags
    w.u32(0);
    w.u16(ehsize as u16);
    w.u16(phentsize as u16);
    w.u16(1);
    w.u16(shentsize as u16);
    w.u16(3);
    // e_shstrndx
    w.u16(2);

    debug_assert_eq!(w.buf.len() as u64, layout.phoff);

    let flags = PF_R | PF_X;
    w.u32(PT_LOAD);
    if class == Class::Elf64 {
        w.u32(flags);
    }
    w.word(layout.text_offset);
    w.word(section_address);
    w.word(section_address);
    w.word(layout.text_len);
    w.word(layout.text_len);
    if class == Class::Elf32 {
        w.u32(flags);
    }
    w.word(TEXT_ALIGN);

    w.pad_to(layout.text_offset);
    w.buf.extend_from_slice(text);

    debug_assert_eq!(w.buf.len() as u64, layout.shstrtab_offset);
    w.buf.extend_from_slice(SHSTRTAB);

    w.pad_to(layout.shoff);
    w.section_header(0, 0, 0, 0, 0, 0, 0);
    w.section_header(
        TEXT_NAME,
        SHT_PROGBITS,
        SHF_ALLOC | SHF_EXECINSTR,
        section_address,
        layout.text_offset,
        layout.text_len,
        TEXT_ALIGN,
    );
    w.section_header(
        SHSTRTAB_NAME,
        SHT_STRTAB,
        0,
        0,
        layout.shstrtab_offset,
        SHSTRTAB.len() as u64,
        1,
    );

    debug_assert_eq!(w.buf.len() as u64, layout.file_len);

    w.buf
}

#[cfg(test)]
mod tests {
    use expect_test::expect;

    use super::{Layout, serialize};
    use crate::Class;

    #[test]
    fn layouts() {
        expect![[r#"
            Layout {
                class: Elf32,
                phoff: 52,
                text_offset: 84,
                text_len: 16,
                shstrtab_offset: 100,
                shoff: 124,
                file_len: 244,
            }
        "#]]
        .assert_debug_eq(&Layout::new(Class::Elf32, 16));

        expect![[r#"
            Layout {
                class: Elf64,
                phoff: 64,
                text_offset: 120,
                text_len: 16,
                shstrtab_offset: 136,
                shoff: 160,
                file_len: 352,
            }
        "#]]
        .assert_debug_eq(&Layout::new(Class::Elf64, 16));
    }

    #[test]
    fn header_bytes() {
        let image = serialize(&[0x13, 0, 0, 0], 0x8000_0000, 0x8000_0000, Class::Elf32);

        expect![[r#"
            7f454c46010101000000000000000000
            0200f30001000000000000803400000070000000
        "#]]
        .assert_eq(&format!(
            "{}\n{}\n",
            hex(&image[..16]),
            hex(&image[16..36]),
        ));

        assert_eq!(&image[84..88], [0x13, 0, 0, 0]);
        assert_eq!(image.len(), 232);
    }

    fn hex(bytes: &[u8]) -> String {
        bytes.iter().map(|b| format!("{b:02x}")).collect()
    }
}
