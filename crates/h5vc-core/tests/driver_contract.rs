mod common;

use common::{Script, ScriptedBackend, volume};
use h5vc_core::codec_table::Decoder;
use h5vc_core::{CompressionParameters, Direction, FilterConfig, FilterError, transform_with};

fn params(width: u32, height: u32, depth: u32, bit_mode: u32) -> CompressionParameters {
    CompressionParameters::from_array([2, 1, width, height, depth, bit_mode, 15, 0, 20, 0, 0])
}

fn compress(backend: &ScriptedBackend, p: &CompressionParameters, raw: &[u8]) -> Vec<u8> {
    transform_with(backend, Direction::Compress, p, raw, &FilterConfig::default())
        .expect("compress should succeed")
}

fn decompress(
    backend: &ScriptedBackend,
    p: &CompressionParameters,
    stream: &[u8],
) -> Result<Vec<u8>, FilterError> {
    transform_with(backend, Direction::Decompress, p, stream, &FilterConfig::default())
}

#[test]
fn round_trip_preserves_every_byte_with_reordering() {
    let backend = ScriptedBackend::new(Script {
        delay: 2,
        parse_window: 7,
        ..Script::default()
    });
    let p = params(16, 8, 12, 0);
    let raw = volume(16, 8, 12, 1);

    let stream = compress(&backend, &p, &raw);
    assert_eq!(stream.len(), 12 * (4 + 16 * 8));
    let restored = decompress(&backend, &p, &stream).expect("decompress should succeed");

    assert_eq!(restored, raw);
    assert_eq!(backend.live_sessions(), 0, "sessions must be released");
}

#[test]
fn delay_longer_than_chunk_is_drained_by_flush() {
    let backend = ScriptedBackend::new(Script {
        delay: 64,
        parse_window: 1024,
        ..Script::default()
    });
    let p = params(4, 4, 3, 0);
    let raw = volume(4, 4, 3, 1);

    let stream = compress(&backend, &p, &raw);
    let restored = decompress(&backend, &p, &stream).unwrap();
    assert_eq!(restored, raw);
}

#[test]
fn decoded_size_follows_bit_mode() {
    let backend = ScriptedBackend::new(Script {
        parse_window: 33,
        ..Script::default()
    });
    for (bit_mode, bpp) in [(0u32, 1usize), (1, 2), (2, 2)] {
        let p = params(10, 6, 5, bit_mode);
        let raw = volume(10, 6, 5, bpp);
        let restored = decompress(&backend, &p, &compress(&backend, &p, &raw)).unwrap();
        assert_eq!(restored.len(), 10 * 6 * 5 * bpp);
        assert_eq!(restored, raw);
    }
}

#[test]
fn truncated_stream_is_unreadable_not_a_hang() {
    let backend = ScriptedBackend::new(Script {
        delay: 1,
        parse_window: 16,
        ..Script::default()
    });
    let p = params(8, 8, 6, 0);
    let stream = compress(&backend, &p, &volume(8, 8, 6, 1));

    let err = decompress(&backend, &p, &stream[..stream.len() - 3]).unwrap_err();
    assert!(
        matches!(err, FilterError::BitstreamUnreadable(_)),
        "unexpected error: {err}"
    );
    assert!(err.to_string().contains("5 of 6 planes"));
    assert_eq!(backend.live_sessions(), 0);
}

#[test]
fn corrupted_packet_is_unreadable() {
    let backend = ScriptedBackend::new(Script {
        parse_window: 16,
        ..Script::default()
    });
    let p = params(8, 8, 4, 0);
    let mut stream = compress(&backend, &p, &volume(8, 8, 4, 1));
    stream[0..4].copy_from_slice(&65u32.to_le_bytes());

    let err = decompress(&backend, &p, &stream).unwrap_err();
    assert!(matches!(err, FilterError::BitstreamUnreadable(_)));
    assert_eq!(backend.live_sessions(), 0);
}

#[test]
fn parser_without_progress_is_rejected() {
    let backend = ScriptedBackend::new(Script {
        stalled_parser: true,
        ..Script::default()
    });
    let p = params(4, 4, 2, 0);
    let err = decompress(&backend, &p, &[1, 2, 3, 4]).unwrap_err();
    assert!(err.to_string().contains("no progress"));
}

#[test]
fn packets_without_consumed_input_are_bounded() {
    let backend = ScriptedBackend::new(Script {
        parse_window: 4 + 16,
        replay_packet: true,
        ..Script::default()
    });
    let p = params(4, 4, 32, 0);
    let stream = compress(&ScriptedBackend::default(), &p, &volume(4, 4, 32, 1));

    let err = decompress(&backend, &p, &stream).unwrap_err();
    assert!(matches!(err, FilterError::BitstreamUnreadable(_)), "unexpected error: {err}");
    assert!(err.to_string().contains("no progress"));
    assert_eq!(backend.live_sessions(), 0);
}

#[test]
fn encoder_failure_releases_the_session() {
    let backend = ScriptedBackend::new(Script {
        fail_at_frame: Some(2),
        ..Script::default()
    });
    let p = params(4, 4, 5, 0);
    let err = transform_with(
        &backend,
        Direction::Compress,
        &p,
        &volume(4, 4, 5, 1),
        &FilterConfig::default(),
    )
    .unwrap_err();
    assert!(matches!(err, FilterError::FrameNotWritable(_)));
    assert_eq!(err.error_code(), 102);
    assert_eq!(backend.live_sessions(), 0);
}

#[test]
fn wrong_input_length_fails_before_opening_a_session() {
    let backend = ScriptedBackend::default();
    let p = params(4, 4, 2, 0);
    let err = transform_with(&backend, Direction::Compress, &p, &[0; 31], &FilterConfig::default())
        .unwrap_err();
    assert!(matches!(
        err,
        FilterError::SizeMismatch {
            expected: 32,
            actual: 31
        }
    ));
}

#[test]
fn missing_hardware_decoder_falls_back_to_software() {
    let backend = ScriptedBackend::new(Script {
        parse_window: 64,
        missing_decoders: vec![Decoder::H264Cuvid],
        ..Script::default()
    });
    let mut p = params(8, 4, 3, 0);
    let raw = volume(8, 4, 3, 1);
    let stream = compress(&backend, &p, &raw);

    p.decoder_id = Decoder::H264Cuvid.id();
    let restored = decompress(&backend, &p, &stream).unwrap();
    assert_eq!(restored, raw);
    assert_eq!(*backend.opened_decoders.borrow(), vec![Decoder::H264]);

    let no_fallback = FilterConfig {
        hw_decoder_fallback: false,
        ..FilterConfig::default()
    };
    let err = transform_with(&backend, Direction::Decompress, &p, &stream, &no_fallback)
        .unwrap_err();
    assert!(matches!(err, FilterError::CodecNotFound(_)));
}

#[test]
fn zero_depth_is_rejected() {
    let backend = ScriptedBackend::default();
    let err = decompress(&backend, &params(4, 4, 0, 0), &[]).unwrap_err();
    assert!(matches!(err, FilterError::InvalidParameters(_)));
}
