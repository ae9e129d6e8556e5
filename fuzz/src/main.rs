extern crate afl;
extern crate awdl;

use afl::fuzz;

use awdl::channel::OPCLASS_6;
use awdl::state::State;

fn main() {
    fuzz!(|data: &[u8]| {
        let mut state = State::new([1, 2, 3, 4, 5, 6], OPCLASS_6, 1);
        let mut out = Vec::new();
        let outcome = awdl::rx::receive(&mut state, data, 0, &mut out);
        println!("{:?}", outcome);
    });
}
