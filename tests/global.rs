use std::{collections::HashMap, mem, sync::mpsc, thread};

use brkalloc::{BrkAllocator, Locked, Sbrk};

#[global_allocator]
static A: BrkAllocator = Locked::new(Sbrk);

#[test]
fn map() {
  let mut m = HashMap::new();
  m.insert(1, 2);
  m.insert(5, 3);
  assert_eq!(m.get(&5), Some(&3));
  drop(m);
}

#[test]
fn strings() {
  let s = format!("foo, bar, {}", "baz");
  assert_eq!(s, "foo, bar, baz");
}

#[test]
fn growing_vec_keeps_contents() {
  let mut v = Vec::new();
  for i in 0..10_000u32 {
    v.push(i);
  }

  assert!(v.iter().enumerate().all(|(i, &x)| i as u32 == x));

  v.truncate(10);
  v.shrink_to_fit();
  assert_eq!(v, (0..10).collect::<Vec<_>>());
}

#[test]
fn boxes_are_aligned() {
  for _ in 0..100 {
    let b = Box::new(42u128);
    assert_eq!(&*b as *const u128 as usize % 16, 0);
  }
}

#[test]
fn larger_than_header_alignment() {
  #[repr(align(128))]
  struct Align128(u8);

  assert_eq!(mem::align_of::<Align128>(), 128);

  for _ in 0..100 {
    let b = Box::new(Align128(42));

    let p = Box::into_raw(b);
    assert_eq!(p as usize % 128, 0, "{:p} should be aligned to 128", p);

    unsafe {
      let b = Box::from_raw(p);
      assert_eq!(b.0, 42);
    }
  }
}

#[test]
fn channels() {
  let (tx, rx) = mpsc::channel();

  let producer = thread::spawn(move || {
    for i in 0..1000u32 {
      tx.send(vec![i; 8]).unwrap();
    }
  });

  let sum: u64 = rx.iter().map(|v| v[0] as u64).sum();
  producer.join().unwrap();

  assert_eq!(sum, (0..1000u64).sum());
}

#[test]
fn threads() {
  let workers: Vec<_> = (0..4)
    .map(|i| thread::spawn(move || (0..100).map(|j| vec![i; j]).count()))
    .collect();

  for worker in workers {
    assert_eq!(worker.join().unwrap(), 100);
  }

  assert!(thread::spawn(|| panic!()).join().is_err());
}
