//! Fuzz target: `Command::try_from(CommandFrame)`
//!
//! Builds a frame from arbitrary bytes (kind, five floats, one bool) and
//! checks that conversion never panics and that every accepted command
//! goes back onto the queue with the same kind.
//!
//! cargo fuzz run fuzz_command_frame

#![no_main]

use libfuzzer_sys::fuzz_target;
use lcc_controller::app::commands::{Command, CommandFrame};

fuzz_target!(|data: &[u8]| {
    if data.len() < 22 {
        return;
    }
    let f = |i: usize| f32::from_le_bytes([data[i], data[i + 1], data[i + 2], data[i + 3]]);
    let frame = CommandFrame {
        kind: data[0],
        float1: f(1),
        float2: f(5),
        float3: f(9),
        float4: f(13),
        float5: f(17),
        bool1: data[21] & 1 != 0,
    };

    if let Ok(cmd) = Command::try_from(frame) {
        let back = CommandFrame::from(cmd);
        assert_eq!(back.kind, frame.kind, "kind changed on re-encode");
        assert!(Command::try_from(back).is_ok(), "re-encoded frame rejected");
    }
});
