#![no_main]

use driver_core::{
    decode_ascii_uint, DeviceConfig, DeviceSession, Program, ResultCode, SimulatedDevice,
};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let _ = decode_ascii_uint(data);

    if let Some(&byte) = data.first() {
        let _ = ResultCode::from_wire(byte);
    }

    if let Ok(text) = std::str::from_utf8(data) {
        let _ = Program::from_hex_listing(text);
    }

    // Feed arbitrary bytes through the device-side state machine, then make
    // sure a session layered on top never panics regardless of what the
    // device has queued up.
    let mut device = SimulatedDevice::new();
    device.push_outcome(ResultCode::MatchFound, 120);
    let mut session = DeviceSession::new(Box::new(device), DeviceConfig::default());
    if let Ok(program) = Program::from_words(&[0x0049]) {
        let _ = session.load_program(&program);
        let _ = session.enter_text_mode();
        let _ = session.submit_input(data);
        let _ = session.await_result();
        let _ = session.exit_text_mode();
    }
});
