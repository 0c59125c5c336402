use std::io::Read;

use rheap::{Heap, HeapError, HeapStats, program_break};

/// Waits until the user presses ENTER.
/// Useful when you want to inspect memory state with tools like `pmap`, `htop`,
/// `gdb`, or just watch the program break move as the heap grows.
fn block_until_enter_pressed() {
  println!("\n>>> Press ENTER to continue...");
  let _ = std::io::stdin().bytes().next();
}

/// Prints the current program break. The heap only ever moves it upwards.
fn print_program_break(label: &str) {
  println!(
    "[{}] PID = {}, program break (sbrk(0)) = {:?}",
    label,
    std::process::id(),
    program_break(),
  );
}

fn print_stats(stats: HeapStats) {
  println!(
    "    free blocks = {}, free units = {}, arenas = {}, arena units = {}",
    stats.free_blocks, stats.free_units, stats.arenas, stats.arena_units
  );
}

fn main() -> Result<(), HeapError> {
  env_logger::init();

  let mut heap = Heap::sbrk();

  print_program_break("start");
  block_until_enter_pressed();

  // --------------------------------------------------------------------
  // 1) Three allocations of different sizes. The first one grows the heap
  //    by a whole batch; the rest are carved from the tail of that arena.
  // --------------------------------------------------------------------
  let a = heap.acquire(16)?;
  let b = heap.acquire(32)?;
  let c = heap.acquire(64)?;
  println!("\n[1] Acquired 16, 32 and 64 bytes at {:?}, {:?}, {:?}", a, b, c);
  print_stats(heap.stats());
  print_program_break("after first growth");

  unsafe {
    b.as_ptr().write_bytes(0xAB, 32);
  }

  block_until_enter_pressed();

  // --------------------------------------------------------------------
  // 2) Release the middle block and ask for something that fits in it.
  //    Next-fit resumes next to the freed block, so it gets reused.
  // --------------------------------------------------------------------
  unsafe { heap.release(b.as_ptr()) };
  let d = heap.acquire(20)?;
  println!(
    "\n[2] Released the 32-byte block, acquired 20 bytes at {:?} (reused: {})",
    d,
    d == b
  );
  print_stats(heap.stats());

  block_until_enter_pressed();

  // --------------------------------------------------------------------
  // 3) Release everything. Neighbours merge back into one free block.
  // --------------------------------------------------------------------
  unsafe {
    heap.release(a.as_ptr());
    heap.release(c.as_ptr());
    heap.release(d.as_ptr());
  }
  println!("\n[3] Released every block");
  print_stats(heap.stats());

  block_until_enter_pressed();

  // --------------------------------------------------------------------
  // 4) A request larger than the free list can serve grows the heap again.
  // --------------------------------------------------------------------
  print_program_break("before large acquire");
  let big = heap.acquire(64 * 1024)?;
  println!("\n[4] Acquired 64 KiB at {:?}", big);
  print_stats(heap.stats());
  print_program_break("after large acquire");

  unsafe { heap.release(big.as_ptr()) };

  // --------------------------------------------------------------------
  // 5) End of demo. The heap never shrinks the program break; the OS
  //    reclaims everything when the process exits.
  // --------------------------------------------------------------------
  println!("\n[5] End of example.");
  print_stats(heap.stats());

  Ok(())
}
