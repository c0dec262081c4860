use irobot_core::device::Pokey;
use irobot_core::device::pokey::CLOCK_HZ;
use irobot_core::device::quad_pokey::{AudioSink, QuadPokey, SAMPLE_RATE};

const AUDF1: u8 = 0x00;
const AUDC1: u8 = 0x01;
const AUDF2: u8 = 0x02;
const AUDC2: u8 = 0x03;
const AUDCTL: u8 = 0x08;

fn pokey() -> Pokey {
    Pokey::new(CLOCK_HZ, SAMPLE_RATE)
}

#[test]
fn test_silent_chip_outputs_midpoint() {
    let mut p = pokey();
    let mut buf = [0u8; 256];
    p.fill(&mut buf);
    assert!(buf.iter().all(|&s| s == 128));
}

#[test]
fn test_pure_tone_square_wave() {
    let mut p = pokey();
    // Pure tone, volume 15. AUDF 9 at 64 kHz: (9 + 1) * 28 = 280 clocks,
    // which is 7 output samples of 40 clocks.
    p.write(AUDC1, 0xAF);
    p.write(AUDF1, 9);
    assert_eq!(p.channel(0).div_n_max, 280);

    let mut buf = [0u8; 28];
    p.fill(&mut buf);
    for (n, chunk) in buf.chunks(7).enumerate() {
        let expected = if n % 2 == 0 { 143 } else { 113 };
        assert!(chunk.iter().all(|&s| s == expected), "chunk {n}: {chunk:?}");
    }
}

#[test]
fn test_volume_only_holds_level() {
    let mut p = pokey();
    p.write(AUDC1, 0x18);
    p.write(AUDF1, 9);
    let mut buf = [0u8; 64];
    p.fill(&mut buf);
    // Parked high: 128 - 8 + 16
    assert!(buf.iter().all(|&s| s == 136));
}

#[test]
fn test_too_fast_channel_is_parked() {
    let mut p = pokey();
    p.write(AUDC1, 0xAF);
    // 1.79 MHz clocking: AUDF + 4 clocks, far below one sample period.
    p.write(AUDCTL, 0x40);
    p.write(AUDF1, 0x10);
    assert!(p.channel(0).output_on);
    assert!(p.channel(0).div_n_max > 1 << 30);
}

#[test]
fn test_joined_channels_use_sixteen_bit_period() {
    let mut p = pokey();
    // Channel 1 at 1.79 MHz, joined with channel 2.
    p.write(AUDCTL, 0x50);
    p.write(AUDC2, 0xA8);
    p.write(AUDF2, 0x02);
    p.write(AUDF1, 0x10);
    assert_eq!(p.channel(1).div_n_max, 0x0210 + 7);
}

#[test]
fn test_audctl_selects_15khz_base() {
    let mut p = pokey();
    p.write(AUDCTL, 0x01);
    p.write(AUDC1, 0xA8);
    p.write(AUDF1, 9);
    assert_eq!(p.channel(0).div_n_max, 10 * 114);
}

#[test]
fn test_reset_silences() {
    let mut p = pokey();
    p.write(AUDC1, 0xAF);
    p.write(AUDF1, 9);
    p.reset();
    let mut buf = [0u8; 64];
    p.fill(&mut buf);
    assert!(buf.iter().all(|&s| s == 128));
}

#[test]
fn test_state_round_trip_continues_identically() {
    let mut p = pokey();
    // Noise on channel 1, tone on channel 2.
    p.write(AUDC1, 0x08);
    p.write(AUDF1, 3);
    p.write(AUDC2, 0xA6);
    p.write(AUDF2, 40);
    let mut warmup = [0u8; 333];
    p.fill(&mut warmup);

    let json = serde_json::to_string(&p).unwrap();
    let mut restored: Pokey = serde_json::from_str(&json).unwrap();

    let mut a = [0u8; 1024];
    let mut b = [0u8; 1024];
    p.fill(&mut a);
    restored.fill(&mut b);
    assert_eq!(a, b);
}

/// Sink that counts what it is given and never drains.
#[derive(Default)]
struct CountingSink {
    buffers: usize,
    samples: usize,
}

impl AudioSink for CountingSink {
    fn queued_buffers(&self) -> usize {
        self.buffers
    }

    fn submit(&mut self, voices: &[&[u8]]) {
        assert_eq!(voices.len(), 4);
        self.buffers += 1;
        self.samples += voices[0].len();
    }
}

#[test]
fn test_quad_update_fills_to_low_water() {
    let mut quad = QuadPokey::new(true);
    let mut sink = CountingSink::default();
    quad.update(&mut sink);
    assert_eq!(sink.buffers, 20);
    assert_eq!(sink.samples, 20 * 44);

    // Already full: nothing more.
    quad.update(&mut sink);
    assert_eq!(sink.buffers, 20);
}

#[test]
fn test_quad_disabled_produces_nothing() {
    let mut quad = QuadPokey::new(false);
    let mut sink = CountingSink::default();
    quad.update(&mut sink);
    assert_eq!(sink.buffers, 0);
}

#[test]
fn test_quad_routes_writes_to_chips() {
    let mut quad = QuadPokey::new(true);
    // chip 2, AUDC2
    quad.write(0x1413, 0xA4);
    assert_eq!(quad.chip(2).channel(1).audc, 0xA4);
    // chip 3, AUDCTL
    quad.write(0x1438, 0x01);
    assert_eq!(quad.chip(3).audctl(), 0x01);
    assert_eq!(quad.chip(0).audctl(), 0);

    let voices = quad.render(16);
    assert!(voices[0].iter().all(|&s| s == 128));
}

#[test]
fn test_quad_state_round_trip() {
    let mut quad = QuadPokey::new(true);
    quad.write(0x1401, 0xAF);
    quad.write(0x1400, 20);
    let state = quad.save_state();
    let json = serde_json::to_string(&state).unwrap();

    let mut other = QuadPokey::new(true);
    other.load_state(&serde_json::from_str(&json).unwrap()).unwrap();
    assert_eq!(quad.render(500), other.render(500));
}
