/// Snapshot of a heap's bookkeeping, anchor excluded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeapStats {
  /// Blocks currently on the free list.
  pub free_blocks: usize,
  /// Units held by those blocks, headers included.
  pub free_units: usize,
  /// Successful address-space extensions so far.
  pub arenas: usize,
  /// Units obtained across all extensions.
  pub arena_units: usize,
}

impl HeapStats {
  /// Payload bytes summed over all free blocks, one header per block excluded.
  pub fn free_bytes(&self) -> usize {
    self.free_units.saturating_sub(self.free_blocks) * crate::align::UNIT
  }
}
