#![no_main]
use libfuzzer_sys::fuzz_target;

use awdl::channel::OPCLASS_6;
use awdl::state::State;

fuzz_target!(|data: &[u8]| {
    let mut state = State::new([1, 2, 3, 4, 5, 6], OPCLASS_6, 1);
    let mut out = Vec::new();
    let _ = awdl::rx::receive(&mut state, data, 0, &mut out);
});
