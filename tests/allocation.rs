use std::{
    alloc::{GlobalAlloc, Layout, System},
    cell::Cell,
};

use reg_thompson::compile;

struct Counting;

thread_local! {
    static LIVE: Cell<isize> = const { Cell::new(0) };
}

fn adjust(delta: isize) {
    let _ = LIVE.try_with(|live| live.set(live.get() + delta));
}

fn live() -> isize {
    LIVE.with(|live| live.get())
}

unsafe impl GlobalAlloc for Counting {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        let ptr = System.alloc(layout);
        if !ptr.is_null() {
            adjust(1);
        }
        ptr
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        adjust(-1);
        System.dealloc(ptr, layout)
    }

    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        System.realloc(ptr, layout, new_size)
    }
}

#[global_allocator]
static ALLOCATOR: Counting = Counting;

// One test only: the counter is per thread, but the harness must not run
// anything else on this thread in between.
#[test]
fn test_dropping_an_automaton_releases_every_node() {
    // warm up lazily initialised runtime state
    drop(compile("a"));

    let before = live();
    {
        let nfa = compile("(a|b)*a+(c?d)*").unwrap();
        assert!(nfa.state_count() > 0);
        assert!(live() > before);
    }
    assert_eq!(live(), before);

    let before = live();
    for pattern in ["a**", "((a+)+)+", "(a|b|c)*\\d+e?"] {
        let nfa = compile(pattern).unwrap();
        drop(nfa);
    }
    assert_eq!(live(), before);

    let before = live();
    for pattern in ["(ab", "ab)", "a|", "a\\", "*a", "()", "a&b"] {
        assert!(compile(pattern).is_err());
    }
    assert_eq!(live(), before);
}
