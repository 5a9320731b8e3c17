//! Instruction set definitions for the MEPA machine.
//!
//! The [`for_each_opcode!`](crate::for_each_opcode) macro holds the canonical
//! opcode list and invokes a callback macro for code generation, so the enum,
//! the mnemonic table, and the arity table stay in one place.
//!
//! Mnemonics are matched case-insensitively by the parser; the canonical
//! spelling is uppercase.

/// Invokes a callback macro with the complete opcode definition list.
///
/// Each entry is `Name = "MNEMONIC", arity`, where `arity` is the number of
/// arguments the opcode requires. Zero-arity opcodes tolerate (and ignore)
/// extra tokens on the line.
#[macro_export]
macro_rules! for_each_opcode {
    ($callback:ident) => {
        $callback! {
            // =========================
            // Program control
            // =========================
            /// INPP ; program start marker, no effect when executed
            Inpp = "INPP", 0,
            /// PARA ; halts execution immediately
            Para = "PARA", 0,
            /// NADA ; no operation
            Nada = "NADA", 0,
            // =========================
            // Memory
            // =========================
            /// AMEM n ; appends n zeroed cells to memory
            Amem = "AMEM", 1,
            /// DMEM n ; removes n cells from the end of memory
            Dmem = "DMEM", 1,
            /// CRVL n ; pushes memory[n]
            Crvl = "CRVL", 1,
            /// ARMZ n ; pops the top of stack into memory[n]
            Armz = "ARMZ", 1,
            // =========================
            // Stack
            // =========================
            /// CRCT v ; pushes the constant v
            Crct = "CRCT", 1,
            /// IMPR ; emits the top of stack without popping it
            Impr = "IMPR", 0,
            // =========================
            // Arithmetic
            // =========================
            /// SOMA ; pops b then a, pushes a + b
            Soma = "SOMA", 0,
            /// SUBT ; pops b then a, pushes a - b
            Subt = "SUBT", 0,
            /// MULT ; pops b then a, pushes a * b
            Mult = "MULT", 0,
            /// DIVI ; pops b then a, pushes floor(a / b)
            Divi = "DIVI", 0,
            /// INVR ; pops a, pushes -a
            Invr = "INVR", 0,
            // =========================
            // Logic
            // =========================
            /// CONJ ; pops b then a, pushes 1 when both are non-zero
            Conj = "CONJ", 0,
            /// DISJ ; pops b then a, pushes 1 when either is non-zero
            Disj = "DISJ", 0,
            // =========================
            // Comparison
            // =========================
            /// CMME ; pops b then a, pushes 1 when a < b
            Cmme = "CMME", 0,
            /// CMMA ; pops b then a, pushes 1 when a > b
            Cmma = "CMMA", 0,
            /// CMIG ; pops b then a, pushes 1 when a == b
            Cmig = "CMIG", 0,
            /// CMDG ; pops b then a, pushes 1 when a != b
            Cmdg = "CMDG", 0,
            /// CMEG ; pops b then a, pushes 1 when a <= b
            Cmeg = "CMEG", 0,
            /// CMAG ; pops b then a, pushes 1 when a >= b
            Cmag = "CMAG", 0,
            // =========================
            // Control flow
            // =========================
            /// DSVS t ; unconditional jump to line number or label t
            Dsvs = "DSVS", 1,
            /// DSVF t ; pops the condition, jumps to t when it is zero
            Dsvf = "DSVF", 1,
        }
    };
}

macro_rules! define_opcodes {
    (
        $(
            $(#[$doc:meta])*
            $name:ident = $mnemonic:literal, $arity:expr
        ),* $(,)?
    ) => {
        /// One of the fixed MEPA opcodes.
        #[derive(Copy, Clone, Debug, Eq, PartialEq)]
        pub enum Opcode {
            $(
                $(#[$doc])*
                $name,
            )*
        }

        impl Opcode {
            /// Returns the canonical (uppercase) mnemonic for this opcode.
            pub const fn mnemonic(self) -> &'static str {
                match self {
                    $( Opcode::$name => $mnemonic, )*
                }
            }

            /// Returns the number of arguments the opcode requires.
            pub const fn arity(self) -> usize {
                match self {
                    $( Opcode::$name => $arity, )*
                }
            }

            /// Looks up an opcode by mnemonic.
            ///
            /// The input must already be uppercased; the parser normalizes
            /// case before calling this.
            pub fn from_mnemonic(name: &str) -> Option<Opcode> {
                match name {
                    $( $mnemonic => Some(Opcode::$name), )*
                    _ => None,
                }
            }
        }
    };
}

for_each_opcode!(define_opcodes);
