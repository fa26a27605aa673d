use std::{io::Read, ptr};

use brkalloc::{BrkAllocator, HeapBoundary, Locked, Sbrk};

/// Waits until the user presses ENTER.
/// Useful when you want to inspect memory state with tools like `pmap`, `htop`,
/// `gdb`, or just visually track how allocations move the program break.
fn block_until_enter_pressed() {
  println!("\n>>> Press ENTER to continue...");
  let _ = std::io::stdin().bytes().next();
}

fn print_program_break(label: &str) {
  println!(
    "[{}] PID = {}, program break = {:?}",
    label,
    std::process::id(),
    Sbrk.current_boundary(),
  );
}

fn print_alloc(
  allocator: &BrkAllocator,
  size: usize,
  address: *mut u8,
) {
  println!(
    "Requested {} bytes, got {} usable at {:?}, {} blocks tracked",
    size,
    unsafe { allocator.usable_size(address) },
    address,
    allocator.lock().len(),
  );
}

fn main() {
  // Not the global allocator: everything `println!` needs still comes from
  // the system one.
  let allocator: BrkAllocator = Locked::new(Sbrk);

  unsafe {
    print_program_break("start");
    block_until_enter_pressed();

    // --------------------------------------------------------------------
    // 1) Two blocks of 64 bytes, back to back on the break.
    // --------------------------------------------------------------------
    let a = allocator.allocate(64);
    println!("\n[1] Allocate A");
    print_alloc(&allocator, 64, a);

    let b = allocator.allocate(64);
    println!("[1] Allocate B");
    print_alloc(&allocator, 64, b);

    ptr::write_bytes(a, 0xAB, 64);
    print_program_break("after A and B");
    block_until_enter_pressed();

    // --------------------------------------------------------------------
    // 2) Free A. It is not the last block, so it is only marked free and
    //    the break stays where it is.
    // --------------------------------------------------------------------
    allocator.deallocate(a);
    println!("\n[2] Deallocated A at {:?}", a);
    print_program_break("after freeing A");
    block_until_enter_pressed();

    // --------------------------------------------------------------------
    // 3) A smaller request takes A back whole (first fit, no splitting).
    // --------------------------------------------------------------------
    let c = allocator.allocate(40);
    println!("\n[3] Allocate 40 bytes");
    print_alloc(&allocator, 40, c);
    println!(
      "[3] c == a? {}",
      if c == a {
        "Yes, it reused the freed block"
      } else {
        "No, it allocated somewhere else"
      }
    );
    block_until_enter_pressed();

    // --------------------------------------------------------------------
    // 4) Grow C past its capacity: the contents move to a new block.
    // --------------------------------------------------------------------
    let d = allocator.resize(c, 256);
    println!("\n[4] Resize C to 256 bytes");
    print_alloc(&allocator, 256, d);
    println!("[4] First byte carried over = 0x{:X}", d.read());
    print_program_break("after resize");
    block_until_enter_pressed();

    // --------------------------------------------------------------------
    // 5) Free the last block. If nothing else moved the break in the
    //    meantime, the break goes back down.
    // --------------------------------------------------------------------
    allocator.deallocate(d);
    println!("\n[5] Deallocated D at {:?}", d);
    print_program_break("after freeing D");
    block_until_enter_pressed();

    allocator.deallocate(b);
    println!("\n[6] End of example. {} blocks still tracked.", allocator.lock().len());
  }
}
