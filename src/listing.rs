use std::fmt::Write;

use crate::{instr::Instruction, memory::MemoryImage, symbol::SymbolTable};

/// Table of the first `len` mailboxes: address, word, decoded instruction and label.
///
/// Words that do not decode are shown as `DAT`.
pub fn listing(image: &MemoryImage, symbols: &SymbolTable, len: usize) -> String {
    let mut text = String::new();
    let _ = writeln!(text, "addr  word  instruction  label");
    for addr in 0..len.min(image.words().len()) {
        let word = image[addr];
        let decoded = match Instruction::decode(word) {
            Some(instr) => instr.to_string(),
            None => format!("DAT {word}"),
        };
        let label = symbols.label_at(addr).unwrap_or_default();
        let _ = writeln!(text, "  {addr:02}  {word:>4}  {decoded:<11}  {label}");
    }
    text
}

/// Mailboxes up to and including the last non-zero one.
pub fn used_len(image: &MemoryImage) -> usize {
    image
        .words()
        .iter()
        .rposition(|&word| word != 0)
        .map_or(0, |addr| addr + 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assemble_program;

    #[test]
    fn lists_program() {
        let program = assemble_program("start LDA x\n OUT\n HLT\nx DAT 999").unwrap();
        let text = listing(&program.image, &program.symbols, program.len);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 5);
        assert_eq!(lines[1].trim_end(), "  00   503  LDA 03       start");
        assert_eq!(lines[2].trim_end(), "  01   902  OUT");
        assert_eq!(lines[4].trim_end(), "  03   999  DAT 999      x");
    }

    #[test]
    fn used_len_trims_trailing_zeroes() {
        let mut image = MemoryImage::new();
        assert_eq!(used_len(&image), 0);
        image[4] = 1;
        assert_eq!(used_len(&image), 5);
    }
}
