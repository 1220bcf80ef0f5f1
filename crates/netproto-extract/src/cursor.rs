use netproto_metadata::Instruction;

/// Forward cursor over one method's instruction stream with bounded
/// lookahead. The pattern scanners peek a fixed window at the current
/// position and advance one instruction at a time; no index arithmetic on
/// the raw slice.
pub struct InstrCursor<'a> {
    instrs: &'a [Instruction],
    pos: usize,
}

impl<'a> InstrCursor<'a> {
    pub fn new(instrs: &'a [Instruction]) -> Self {
        InstrCursor { instrs, pos: 0 }
    }

    /// Current position in the stream.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Instruction at `position() + offset`, if the stream is long enough.
    pub fn peek(&self, offset: usize) -> Option<&'a Instruction> {
        self.instrs.get(self.pos + offset)
    }

    /// Instruction at the current position.
    pub fn current(&self) -> Option<&'a Instruction> {
        self.peek(0)
    }

    pub fn advance(&mut self) {
        self.pos += 1;
    }

    pub fn is_done(&self) -> bool {
        self.pos >= self.instrs.len()
    }
}
