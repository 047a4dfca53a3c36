use anyhow::Result;
use castle_video::{
    CinepakDecoder, CodebookKind, DecodeError, DecodeLimits, DecodeWarning, peek_frame_header,
};

const KEY: u16 = 0x1000;
const DELTA: u16 = 0x1100;

const V4_COLOR_FULL: u16 = 0x2000;
const V1_COLOR_FULL: u16 = 0x2200;
const V1_COLOR_SELECTIVE: u16 = 0x2300;
const V4_MONO_FULL: u16 = 0x2400;
const INTRA: u16 = 0x3000;
const INTER: u16 = 0x3100;
const V1_ONLY: u16 = 0x3200;

fn chunk(tag: u16, body: &[u8]) -> Vec<u8> {
    let mut out = tag.to_be_bytes().to_vec();
    out.extend(((body.len() + 4) as u16).to_be_bytes());
    out.extend_from_slice(body);
    out
}

fn strip_with_rect(tag: u16, rect: [u16; 4], chunks: &[Vec<u8>]) -> Vec<u8> {
    let body: Vec<u8> = chunks.concat();
    let mut out = tag.to_be_bytes().to_vec();
    out.extend(((body.len() + 12) as u16).to_be_bytes());
    for edge in rect {
        out.extend(edge.to_be_bytes());
    }
    out.extend(body);
    out
}

/// Strip covering the whole `width` x `height` frame.
fn strip(tag: u16, width: u16, height: u16, chunks: &[Vec<u8>]) -> Vec<u8> {
    strip_with_rect(tag, [0, 0, height, width], chunks)
}

fn frame(width: u16, height: u16, strips: &[Vec<u8>]) -> Vec<u8> {
    let body: Vec<u8> = strips.concat();
    let total = (body.len() + 10) as u32;
    let mut out = vec![0u8];
    out.extend(&total.to_be_bytes()[1..]);
    out.extend(width.to_be_bytes());
    out.extend(height.to_be_bytes());
    out.extend((strips.len() as u16).to_be_bytes());
    out.extend(body);
    out
}

fn color_entry(luma: [u8; 4], u: i8, v: i8) -> Vec<u8> {
    let mut out = luma.to_vec();
    out.push(u as u8);
    out.push(v as u8);
    out
}

fn pixels(buffer: &[u8], bytes_per_pixel: usize) -> Vec<&[u8]> {
    buffer.chunks_exact(bytes_per_pixel).collect()
}

/// 8x4 frame, one key strip: V1 slot 0 is flat grey 200, painted twice.
fn grey_scenario() -> Vec<u8> {
    frame(
        8,
        4,
        &[strip(
            KEY,
            8,
            4,
            &[
                chunk(V1_COLOR_FULL, &color_entry([200; 4], 0, 0)),
                chunk(V1_ONLY, &[0, 0]),
            ],
        )],
    )
}

/// 8x8 frame, one key strip mixing V1 and V4 blocks through an intra chunk.
fn mixed_key_frame() -> Vec<u8> {
    let mut v4 = Vec::new();
    for (n, (u, v)) in [(0, 0), (10, -20), (-30, 5), (64, 64)].into_iter().enumerate() {
        let base = 40 * n as u8;
        v4.extend(color_entry([base, base + 10, base + 20, base + 30], u, v));
    }
    let mut vectors = 0xA000_0000u32.to_be_bytes().to_vec();
    vectors.extend([0, 1, 2, 3]);
    vectors.push(0);
    vectors.extend([3, 2, 1, 0]);
    vectors.push(0);
    frame(
        8,
        8,
        &[strip(
            KEY,
            8,
            8,
            &[
                chunk(V4_COLOR_FULL, &v4),
                chunk(V1_COLOR_FULL, &color_entry([90, 120, 150, 180], -4, 9)),
                chunk(INTRA, &vectors),
            ],
        )],
    )
}

#[test]
fn grey_scenario_fills_every_pixel_24_bit() -> Result<()> {
    let mut out = vec![0u8; 8 * 4 * 3];
    CinepakDecoder::new().decode(&grey_scenario(), &mut out, 8, 4, 24)?;
    for pixel in pixels(&out, 3) {
        assert_eq!(pixel, &[200, 200, 200]);
    }
    Ok(())
}

#[test]
fn grey_scenario_fills_every_pixel_32_bit() -> Result<()> {
    let mut out = vec![0xFFu8; 8 * 4 * 4];
    CinepakDecoder::new().decode(&grey_scenario(), &mut out, 8, 4, 32)?;
    // The fourth byte belongs to the caller and is left as it was.
    for pixel in pixels(&out, 4) {
        assert_eq!(pixel, &[200, 200, 200, 0xFF]);
    }
    Ok(())
}

#[test]
fn chroma_lands_in_bgr_order() -> Result<()> {
    let bytes = frame(
        4,
        4,
        &[strip(
            KEY,
            4,
            4,
            &[
                chunk(V1_COLOR_FULL, &color_entry([100; 4], 10, -20)),
                chunk(V1_ONLY, &[0]),
            ],
        )],
    );
    let mut out = vec![0u8; 4 * 4 * 3];
    CinepakDecoder::new().decode(&bytes, &mut out, 4, 4, 24)?;
    for pixel in pixels(&out, 3) {
        assert_eq!(pixel, &[120, 115, 60]);
    }
    Ok(())
}

#[test]
fn fresh_contexts_decode_identically() -> Result<()> {
    let bytes = mixed_key_frame();
    let mut first = vec![0u8; 8 * 8 * 3];
    let mut second = vec![0xCCu8; 8 * 8 * 3];
    CinepakDecoder::new().decode(&bytes, &mut first, 8, 8, 24)?;
    CinepakDecoder::new().decode(&bytes, &mut second, 8, 8, 24)?;
    assert_eq!(first, second);
    Ok(())
}

#[test]
fn strip_without_codebooks_reuses_previous_strip_tables() -> Result<()> {
    let mut table = color_entry([30; 4], 0, 0);
    table.extend(color_entry([60, 70, 80, 90], 12, -6));
    let load = chunk(V1_COLOR_FULL, &table);

    let inherited = frame(
        8,
        8,
        &[
            strip(KEY, 8, 8, &[load.clone(), chunk(V1_ONLY, &[0, 1])]),
            strip(DELTA, 8, 8, &[chunk(V1_ONLY, &[1, 0])]),
        ],
    );
    // Same frame but strip 1 loads the tables itself.
    let explicit = frame(
        8,
        8,
        &[
            strip(KEY, 8, 8, &[load.clone(), chunk(V1_ONLY, &[0, 1])]),
            strip(DELTA, 8, 8, &[load, chunk(V1_ONLY, &[1, 0])]),
        ],
    );

    let mut decoder = CinepakDecoder::new();
    let mut out = vec![0u8; 8 * 8 * 3];
    decoder.decode(&inherited, &mut out, 8, 8, 24)?;
    let mut reference = vec![0u8; 8 * 8 * 3];
    CinepakDecoder::new().decode(&explicit, &mut reference, 8, 8, 24)?;

    assert_eq!(out, reference);
    assert_eq!(decoder.strip_codebooks(1), decoder.strip_codebooks(0));
    // Second block row comes from strip 1 and starts with slot 1.
    let row4 = 4 * 8 * 3;
    assert_ne!(out[row4..row4 + 3], out[..3]);
    Ok(())
}

#[test]
fn codebooks_carry_over_between_frames() -> Result<()> {
    let mut decoder = CinepakDecoder::new();
    let key = frame(
        4,
        4,
        &[strip(
            KEY,
            4,
            4,
            &[
                chunk(V4_MONO_FULL, &[11, 22, 33, 44, 55, 66, 77, 88]),
                chunk(INTRA, &{
                    let mut body = 0x8000_0000u32.to_be_bytes().to_vec();
                    body.extend([0, 1, 1, 0]);
                    body
                }),
            ],
        )],
    );
    let mut first = vec![0u8; 4 * 4 * 3];
    decoder.decode(&key, &mut first, 4, 4, 24)?;

    // Delta frame repaints with the same indices and no codebook chunk.
    let delta = frame(
        4,
        4,
        &[strip(
            DELTA,
            4,
            4,
            &[chunk(INTRA, &{
                let mut body = 0x8000_0000u32.to_be_bytes().to_vec();
                body.extend([0, 1, 1, 0]);
                body
            })],
        )],
    );
    let mut second = vec![0u8; 4 * 4 * 3];
    decoder.decode(&delta, &mut second, 4, 4, 24)?;
    assert_eq!(first, second);
    assert_eq!(
        decoder
            .strip_codebooks(0)
            .map(|books| books.table(CodebookKind::V4).entry(1).luma),
        Some([55, 66, 77, 88])
    );
    Ok(())
}

#[test]
fn inter_frame_only_touches_coded_blocks() -> Result<()> {
    let mut table = color_entry([10; 4], 0, 0);
    table.extend(color_entry([250; 4], 0, 0));
    let key = frame(
        8,
        4,
        &[strip(
            KEY,
            8,
            4,
            &[chunk(V1_COLOR_FULL, &table), chunk(V1_ONLY, &[0, 0])],
        )],
    );
    // Bits 0, 10: skip the left block, paint the right one from slot 1.
    let mut vectors = 0x4000_0000u32.to_be_bytes().to_vec();
    vectors.push(1);
    let delta = frame(8, 4, &[strip(DELTA, 8, 4, &[chunk(INTER, &vectors)])]);

    let mut decoder = CinepakDecoder::new();
    let mut out = vec![0u8; 8 * 4 * 3];
    decoder.decode(&key, &mut out, 8, 4, 24)?;
    decoder.decode(&delta, &mut out, 8, 4, 24)?;
    for row in out.chunks_exact(8 * 3) {
        assert!(row[..12].iter().all(|&b| b == 10));
        assert!(row[12..].iter().all(|&b| b == 250));
    }
    Ok(())
}

#[test]
fn empty_selective_mask_keeps_previous_table() -> Result<()> {
    let mut decoder = CinepakDecoder::new();
    let mut out = vec![0u8; 8 * 4 * 3];
    decoder.decode(&grey_scenario(), &mut out, 8, 4, 24)?;
    let before = decoder.strip_codebooks(0).cloned();

    let mut selective = 0u32.to_be_bytes().to_vec();
    selective.extend(color_entry([5; 4], 40, 40));
    let delta = frame(
        8,
        4,
        &[strip(
            DELTA,
            8,
            4,
            &[chunk(V1_COLOR_SELECTIVE, &selective), chunk(V1_ONLY, &[0, 0])],
        )],
    );
    decoder.decode(&delta, &mut out, 8, 4, 24)?;
    assert_eq!(decoder.strip_codebooks(0).cloned(), before);
    assert!(out.iter().all(|&b| b == 200));
    Ok(())
}

#[test]
fn one_byte_short_frame_is_truncated_read() {
    let minimal = frame(4, 4, &[strip(KEY, 4, 4, &[])]);
    let short = &minimal[..minimal.len() - 1];
    let mut out = vec![0u8; 4 * 4 * 3];
    let err = CinepakDecoder::new()
        .decode(short, &mut out, 4, 4, 24)
        .unwrap_err();
    assert!(matches!(err, DecodeError::TruncatedRead { .. }), "{err:?}");
}

#[test]
fn every_prefix_fails_cleanly_without_touching_guard_bytes() {
    let bytes = frame(
        8,
        8,
        &[
            strip(
                KEY,
                8,
                8,
                &[
                    chunk(V1_COLOR_FULL, &color_entry([77; 4], 3, -3)),
                    chunk(V1_ONLY, &[0, 0]),
                ],
            ),
            strip(DELTA, 8, 8, &[chunk(V1_ONLY, &[0, 0])]),
        ],
    );
    let frame_bytes = 8 * 8 * 4;
    let guard = 64;
    let mut decoder = CinepakDecoder::new();
    for len in 0..bytes.len() {
        let mut buffer = vec![0x5Au8; frame_bytes + guard];
        let result = decoder.decode(&bytes[..len], &mut buffer[..frame_bytes], 8, 8, 32);
        assert!(
            matches!(result, Err(DecodeError::TruncatedRead { .. })),
            "prefix of {len} bytes gave {result:?}"
        );
        assert!(buffer[frame_bytes..].iter().all(|&b| b == 0x5A));
    }

    let mut buffer = vec![0x5Au8; frame_bytes + guard];
    assert_eq!(
        decoder.decode(&bytes, &mut buffer[..frame_bytes], 8, 8, 32),
        Ok(())
    );
    assert!(buffer[frame_bytes..].iter().all(|&b| b == 0x5A));
}

#[test]
fn short_output_buffer_is_clipped() -> Result<()> {
    // Room for two of the frame's four rows.
    let mut out = vec![0u8; 8 * 2 * 3];
    CinepakDecoder::new().decode(&grey_scenario(), &mut out, 8, 4, 24)?;
    assert!(out.iter().all(|&b| b == 200));
    Ok(())
}

#[test]
fn partial_strip_rect_is_unsupported() {
    let bytes = frame(
        8,
        4,
        &[strip_with_rect(
            KEY,
            [5, 0, 4, 8],
            &[chunk(V1_ONLY, &[0, 0])],
        )],
    );
    let mut out = vec![0u8; 8 * 4 * 3];
    let err = CinepakDecoder::new()
        .decode(&bytes, &mut out, 8, 4, 24)
        .unwrap_err();
    assert_eq!(
        err,
        DecodeError::UnsupportedStripRect {
            strip: 0,
            top: 5,
            left: 0,
            bottom: 4,
            right: 8
        }
    );
    assert!(out.iter().all(|&b| b == 0));
}

#[test]
fn failed_frame_leaves_context_usable() -> Result<()> {
    let mut decoder = CinepakDecoder::new();
    let mut out = vec![0u8; 8 * 4 * 3];
    decoder.decode(&grey_scenario(), &mut out, 8, 4, 24)?;

    let broken = &grey_scenario()[..15];
    assert!(decoder.decode(broken, &mut out, 8, 4, 24).is_err());

    let repaint = frame(8, 4, &[strip(DELTA, 8, 4, &[chunk(V1_ONLY, &[0, 0])])]);
    let mut again = vec![0u8; 8 * 4 * 3];
    decoder.decode(&repaint, &mut again, 8, 4, 24)?;
    assert!(again.iter().all(|&b| b == 200));
    Ok(())
}

#[test]
fn report_serializes_warnings_for_host_logs() -> Result<()> {
    let mut bytes = grey_scenario();
    bytes[1..4].copy_from_slice(&[0, 0, 99]);
    let mut out = vec![0u8; 8 * 4 * 3];
    let report = CinepakDecoder::new().decode_with_report(&bytes, &mut out, 8, 4, 24)?;
    assert_eq!(
        report.warnings,
        vec![DecodeWarning::HeaderMismatch {
            declared: 99,
            actual: bytes.len()
        }]
    );
    assert_eq!(report.header, peek_frame_header(&bytes)?);

    let json = serde_json::to_value(&report)?;
    assert_eq!(json["header"]["width"], 8);
    assert_eq!(json["strips_decoded"], 1);
    assert_eq!(json["warnings"][0]["kind"], "header_mismatch");
    assert_eq!(json["warnings"][0]["declared"], 99);
    Ok(())
}

#[test]
fn limits_loaded_from_json_drive_clamping() -> Result<()> {
    let limits: DecodeLimits = serde_json::from_str(r#"{ "max_strips": 1 }"#)?;
    let bytes = frame(
        8,
        4,
        &[
            strip(
                KEY,
                8,
                4,
                &[
                    chunk(V1_COLOR_FULL, &color_entry([200; 4], 0, 0)),
                    chunk(V1_ONLY, &[0, 0]),
                ],
            ),
            strip(DELTA, 8, 4, &[chunk(V1_ONLY, &[0, 0])]),
        ],
    );
    let mut decoder = CinepakDecoder::with_limits(limits);
    assert_eq!(decoder.limits().max_strips, 1);
    assert_eq!(decoder.limits().max_resync_attempts, 10);
    let mut out = vec![0u8; 8 * 4 * 3];
    let report = decoder.decode_with_report(&bytes, &mut out, 8, 4, 24)?;
    assert_eq!(report.strips_decoded, 1);
    assert_eq!(
        report.warnings,
        vec![DecodeWarning::StripsClamped {
            declared: 2,
            used: 1
        }]
    );
    assert_eq!(decoder.strip_count(), 1);
    assert!(out.iter().all(|&b| b == 200));
    Ok(())
}
