#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|input: (csi::Options, &[u8])| {
    let (opts, data) = input;
    let entry = csi::decode_with(data, &opts, &mut ());

    if let Ok(channel) = &entry.channel {
        assert_eq!(channel.csi.dim().2, csi::matrix::SUBCARRIERS);
    }
});
