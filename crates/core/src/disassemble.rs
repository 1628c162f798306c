use core::fmt;

use crate::instruction::{self, Instruction};
use crate::register;

struct WrapRegister(Option<register::RiscV>);

impl fmt::Display for WrapRegister {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            None => f.write_str("x0"),
            Some(xnum) => write!(f, "x{}", xnum.get()),
        }
    }
}

struct WrapFloat(register::Float);

impl fmt::Display for WrapFloat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "f{}", self.0.get())
    }
}

/// Unresolved placeholder immediates print as `?`.
struct Resolved<T>(Option<T>);

impl<T: fmt::Display> fmt::Display for Resolved<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Some(it) => it.fmt(f),
            None => f.write_str("?"),
        }
    }
}

const fn signed(imm: u16) -> i16 {
    imm.cast_signed()
}

pub struct FmtInstruction<'a> {
    instruction: &'a Instruction,
}

impl<'a> FmtInstruction<'a> {
    #[must_use]
    pub const fn new(instruction: &'a Instruction) -> Self {
        Self { instruction }
    }
}

impl fmt::Display for FmtInstruction<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = self.instruction.mnemonic();

        match self.instruction {
            Instruction::R(instruction::R { rs1, rs2, rd, opcode: _ }) => {
                let rs1 = WrapRegister(*rs1);
                let rs2 = WrapRegister(*rs2);
                let rd = WrapRegister(*rd);

                write!(f, "{op} {rd}, {rs1}, {rs2}")
            }

            Instruction::I(instruction::I { rd, rs1, imm, opcode }) => {
                let rs1 = WrapRegister(*rs1);
                let rd = WrapRegister(*rd);
                match opcode.max_shamt() {
                    Some(_) => write!(f, "{op} {rd}, {rs1}, {imm}"),
                    None => write!(f, "{op} {rd}, {rs1}, {}", signed(*imm)),
                }
            }

            Instruction::Load(instruction::Load { rd, rs1, imm, opcode: _ }) => {
                let rs1 = WrapRegister(*rs1);
                let rd = WrapRegister(*rd);
                write!(f, "{op} {rd}, {}({rs1})", signed(*imm))
            }

            Instruction::FLoad(instruction::FLoad { rd, rs1, imm, opcode: _ }) => {
                let rs1 = WrapRegister(*rs1);
                let rd = WrapFloat(*rd);
                write!(f, "{op} {rd}, {}({rs1})", signed(*imm))
            }

            Instruction::Store(instruction::Store { imm, rs1, rs2, opcode: _ }) => {
                let rs1 = WrapRegister(*rs1);
                let rs2 = WrapRegister(*rs2);
                write!(f, "{op} {rs2}, {}({rs1})", signed(*imm))
            }

            Instruction::FStore(instruction::FStore { imm, rs1, rs2, opcode: _ }) => {
                let rs1 = WrapRegister(*rs1);
                let rs2 = WrapFloat(*rs2);
                write!(f, "{op} {rs2}, {}({rs1})", signed(*imm))
            }

            Instruction::FToInt(instruction::FToInt { rd, rs1, rm, opcode }) => {
                let rd = WrapRegister(*rd);
                let rs1 = WrapFloat(*rs1);
                match opcode.has_rounding_mode() {
                    true => write!(f, "{op} {rd}, {rs1}, {rm}"),
                    false => write!(f, "{op} {rd}, {rs1}"),
                }
            }

            Instruction::IntToF(instruction::IntToF { rd, rs1, rm, opcode }) => {
                let rd = WrapFloat(*rd);
                let rs1 = WrapRegister(*rs1);
                match opcode.has_rounding_mode() {
                    true => write!(f, "{op} {rd}, {rs1}, {rm}"),
                    false => write!(f, "{op} {rd}, {rs1}"),
                }
            }

            Instruction::Csr(instruction::Csr { csr, rs1, rd, opcode: _ }) => {
                let rs1 = WrapRegister(*rs1);
                let rd = WrapRegister(*rd);
                write!(f, "{op} {rd}, {csr:#05x}, {rs1}")
            }

            Instruction::CsrI(instruction::CsrI { csr, uimm, rd, opcode: _ }) => {
                let rd = WrapRegister(*rd);
                write!(f, "{op} {rd}, {csr:#05x}, {uimm}")
            }

            Instruction::U(instruction::U { imm, rd, opcode: _ }) => {
                let rd = WrapRegister(*rd);
                write!(f, "{op} {rd}, {:#x}", imm >> 12)
            }

            Instruction::J(instruction::J { imm, rd, opcode: _ }) => {
                let rd = WrapRegister(*rd);
                // sign extend the 21-bit offset for display.
                let imm = ((imm << 11).cast_signed()) >> 11;
                write!(f, "{op} {rd}, {imm}")
            }

            Instruction::IJump(instruction::IJump { rd, rs1, imm, opcode: _ }) => {
                let rs1 = WrapRegister(*rs1);
                let rd = WrapRegister(*rd);
                write!(f, "{op} {rd}, {}({rs1})", signed(*imm))
            }

            Instruction::Branch(instruction::Branch { rs1, rs2, imm, opcode: _ }) => {
                let rs1 = WrapRegister(*rs1);
                let rs2 = WrapRegister(*rs2);
                write!(f, "{op} {rs1}, {rs2}, {}", signed(*imm))
            }

            Instruction::Sys(_) => write!(f, "{op}"),

            Instruction::Vma(instruction::Vma { rs1, rs2, opcode: _ }) => {
                let rs1 = WrapRegister(*rs1);
                let rs2 = WrapRegister(*rs2);
                write!(f, "{op} {rs1}, {rs2}")
            }

            Instruction::PlaceholderProducer0(instruction::Producer0 { rd, imm }) => {
                let rd = WrapRegister(*rd);
                let imm = Resolved(imm.map(|it| format!("{:#x}", it >> 12)));
                write!(f, "{op} {rd}, {imm}")
            }

            Instruction::PlaceholderProducer1(instruction::Producer1 { rd, imm }) => {
                let rd = WrapRegister(*rd);
                let imm = Resolved(imm.map(signed));
                write!(f, "{op} {rd}, {rd}, {imm}")
            }

            Instruction::PlaceholderConsumer(instruction::Consumer { rd, rs1, imm }) => {
                let rd = WrapRegister(*rd);
                let rs1 = WrapRegister(*rs1);
                let imm = Resolved(imm.map(signed));
                write!(f, "{op} {rd}, {imm}({rs1})")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use expect_test::expect;

    use super::FmtInstruction;
    use crate::instruction::{self, Instruction};
    use crate::opcode;
    use crate::register::{Float, RiscV};

    fn listing(instructions: &[Instruction]) -> String {
        instructions.iter().map(|it| format!("{}\n", FmtInstruction::new(it))).collect()
    }

    #[test]
    fn mixed_block() {
        let x = RiscV::with_u8;
        let f0 = Float::with_u8(10).unwrap();

        let block = [
            Instruction::from(instruction::Producer0 { rd: Some(RiscV::S1), imm: None }),
            Instruction::from(instruction::Producer1 { rd: Some(RiscV::S1), imm: Some(0xfff0) }),
            instruction::R::new(x(6), x(7), x(5), opcode::R::MUL).into(),
            instruction::I::new(0xfffe, x(10), x(10), opcode::I::ADDIW).into(),
            instruction::I::new(33, x(10), x(11), opcode::I::SRAI).into(),
            instruction::Load::new(8, Some(RiscV::SP), x(10), opcode::Load::LD).into(),
            instruction::FStore { imm: 0xfff8, rs1: x(9), rs2: f0, opcode: opcode::FStore::FSD }
                .into(),
            instruction::FToInt {
                rd: x(10),
                rs1: f0,
                rm: opcode::RoundingMode::DYN,
                opcode: opcode::FToInt::FCVT_L_D,
            }
            .into(),
            instruction::Csr::new(0x305, x(2), x(1), opcode::Csr::CSRRW).into(),
            instruction::Branch::new(4, x(5), None, opcode::B::BNE).into(),
            instruction::J::new(0x1f_fff8, None, opcode::J::JAL).into(),
            instruction::Sys::new(opcode::Sys::MRET).into(),
            instruction::Vma { rs1: None, rs2: x(31), opcode: opcode::Vma::SINVAL_VMA }.into(),
            Instruction::from(instruction::Consumer { rd: None, rs1: Some(RiscV::S1), imm: None }),
        ];

        expect![[r#"
            lui x9, ?
            addi x9, x9, -16
            mul x5, x6, x7
            addiw x10, x10, -2
            srai x11, x10, 33
            ld x10, 8(x2)
            fsd f10, -8(x9)
            fcvt.l.d x10, f10, dyn
            csrrw x1, 0x305, x2
            bne x5, x0, 4
            jal x0, -8
            mret
            sinval.vma x0, x31
            jalr x0, ?(x9)
        "#]]
        .assert_eq(&listing(&block));
    }
}
