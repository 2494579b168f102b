//! End-to-end scenarios from spec §8: parse, emit, and bytecode-encode a
//! shader and check the externally observable properties at each stage.

use dx8gl_shader::{emit_glsl, emit_wgsl, encode, parse};

#[test]
fn basic_vertex_shader() {
    // spec §8 end-to-end scenario 1.
    let source = "vs.1.1\ndcl_position v0\nm4x4 oPos, v0, c0\n";
    let shader = parse(source).unwrap();

    assert_eq!(shader.version.major, 1);
    assert_eq!(shader.version.minor, 1);
    assert_eq!(shader.instructions.len(), 1);
    assert!(shader.uses_position);

    let glsl = emit_glsl(&shader);
    assert!(glsl.contains("gl_Position"));
    assert!(shader.referenced_varyings().is_empty());

    let wgsl = emit_wgsl(&shader);
    assert!(wgsl.contains("position"));

    let bytes = encode(&shader);
    assert_eq!(bytes[0], 0xFFFE_0101);
    assert_eq!(*bytes.last().unwrap(), 0x0000_FFFF);
}

#[test]
fn pixel_shader_with_phase_and_bump_mapping() {
    // spec §8 end-to-end scenario 2.
    let source = "ps.1.4\ntex t0\nbem t1, t0\nphase\ntex t0\nmad r0, t1, c0, t0\nmov oC0, r0\nend\n";
    let shader = parse(source).unwrap();

    assert_eq!(shader.version.major, 1);
    assert_eq!(shader.version.minor, 4);

    let glsl = emit_glsl(&shader);
    assert!(glsl.contains("bem_mat1"));
    assert!(glsl.contains("--- phase boundary ---"));

    let bytes = encode(&shader);
    assert!(bytes.len() > 5);
}
