//! Output sink for dumped blocks.

use std::io::{self, Write};

use crate::protocol::Block;

/// Append-only destination for blocks, in ascending order.
pub trait BlockSink {
    fn write_block(&mut self, block: &Block) -> io::Result<()>;

    /// Called once after the last block of a successful dump.
    fn finish(&mut self) -> io::Result<()>;
}

impl<W: Write> BlockSink for W {
    fn write_block(&mut self, block: &Block) -> io::Result<()> {
        self.write_all(block.as_bytes())
    }

    fn finish(&mut self) -> io::Result<()> {
        self.flush()
    }
}
