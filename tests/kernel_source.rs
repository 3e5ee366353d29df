//! Generated kernel text: WGSL validation and the transcribed cipher steps
//!
//! The host backend never executes the OpenCL text and the WGSL only runs
//! with an adapter, so the round function is pinned here line by line.

use naga::valid::{Capabilities, ValidationFlags, Validator};
use naga::{AddressSpace, ShaderStage, StorageAccess};
use threefry_engine::cipher::{SKEIN_KS_PARITY32, THREEFRY2X32_ROTATIONS};
use threefry_engine::kernel::{
    ENTRY_POINT, KernelDialect, WORKGROUP_SIZE, threefry_source, wgsl_source,
};

fn parse_wgsl(src: &str) -> naga::Module {
    naga::front::wgsl::parse_str(src).unwrap_or_else(|e| panic!("{}", e.emit_to_string(src)))
}

fn validate_wgsl(src: &str) -> naga::Module {
    let module = parse_wgsl(src);
    Validator::new(ValidationFlags::all(), Capabilities::empty())
        .validate(&module)
        .unwrap_or_else(|e| panic!("WGSL validation error: {e:?}"));
    module
}

fn trimmed_lines(src: &str) -> Vec<&str> {
    src.lines().map(str::trim).collect()
}

fn assert_has_lines(src: &str, expected: &[&str]) {
    let lines = trimmed_lines(src);
    for line in expected {
        assert!(lines.contains(line), "missing line `{}` in:\n{}", line, src);
    }
}

/// Parse the `u32` literals between `open` and the next `close`
fn literal_list(src: &str, open: &str, close: char) -> Vec<u32> {
    let start = src.find(open).expect("table present") + open.len();
    let end = start + src[start..].find(close).expect("table closed");
    src[start..end]
        .split(',')
        .map(|s| s.trim().trim_end_matches('u').parse().unwrap())
        .collect()
}

fn hex_literal_after(src: &str, prefix: &str) -> u32 {
    let start = src.find(prefix).expect("constant present") + prefix.len();
    let digits: String = src[start..]
        .trim_start_matches("0x")
        .trim_start_matches("0X")
        .chars()
        .take_while(|c| c.is_ascii_hexdigit())
        .collect();
    u32::from_str_radix(&digits, 16).unwrap()
}

#[test]
fn test_wgsl_validates() {
    let module = validate_wgsl(&threefry_source(KernelDialect::Wgsl));

    let entry = module
        .entry_points
        .iter()
        .find(|ep| ep.name == ENTRY_POINT)
        .expect("entry point compiled");
    assert_eq!(entry.stage, ShaderStage::Compute);
    assert_eq!(entry.workgroup_size, [WORKGROUP_SIZE, 1, 1]);

    // Other workgroup sizes produce valid modules too
    validate_wgsl(&wgsl_source(64));
}

#[test]
fn test_wgsl_bindings_match_argument_layout() {
    let module = parse_wgsl(&threefry_source(KernelDialect::Wgsl));

    let mut bindings: Vec<(u32, AddressSpace)> = module
        .global_variables
        .iter()
        .filter_map(|(_, var)| var.binding.as_ref().map(|b| (b.binding, var.space)))
        .collect();
    bindings.sort_by_key(|(binding, _)| *binding);

    let bound: Vec<u32> = bindings.iter().map(|(b, _)| *b).collect();
    assert_eq!(bound, vec![0, 1, 2, 3]);

    for (binding, space) in &bindings[..3] {
        let AddressSpace::Storage { access } = space else {
            panic!("binding {} is not a storage buffer", binding);
        };
        assert_eq!(access.contains(StorageAccess::STORE), *binding == 2);
    }
    assert_eq!(bindings[3].1, AddressSpace::Uniform);
}

#[test]
fn test_wgsl_rejects_broken_source() {
    let src = threefry_source(KernelDialect::Wgsl).replace("ks[inject % 3u]", "ks[inject % 3u");
    assert!(naga::front::wgsl::parse_str(&src).is_err());
}

#[test]
fn test_opencl_transcribes_round_function() {
    let src = threefry_source(KernelDialect::OpenCl);
    assert_has_lines(
        &src,
        &[
            "ks[0] = key.x;",
            "ks[1] = key.y;",
            "ks[2] = SKEIN_KS_PARITY32 ^ key.x ^ key.y;",
            "uint2 x = (uint2)(ctr.x + ks[0], ctr.y + ks[1]);",
            "for (uint r = 0u; r < rounds; r++) {",
            "x.x += x.y;",
            "x.y = rotl32(x.y, THREEFRY2X32_ROTATIONS[r & 7u]);",
            "x.y ^= x.x;",
            "if (((r + 1u) & 3u) == 0u) {",
            "uint inject = (r + 1u) >> 2;",
            "x.x += ks[inject % 3u];",
            "x.y += ks[(inject + 1u) % 3u] + inject;",
            "return (x << (n & 31u)) | (x >> ((32u - n) & 31u));",
        ],
    );
    assert_has_lines(
        &src,
        &[
            "const uint idx = offset + gid;",
            "const uint2 c = (uint2)(ctr[2u * idx], ctr[2u * idx + 1u]);",
            "const uint2 k = (uint2)(key[0], key[1]);",
            "out[2u * idx] = r.x;",
            "out[2u * idx + 1u] = r.y;",
        ],
    );
}

#[test]
fn test_wgsl_transcribes_round_function() {
    let src = threefry_source(KernelDialect::Wgsl);
    assert_has_lines(
        &src,
        &[
            "var ks = array<u32, 3>(k.x, k.y, SKEIN_KS_PARITY32 ^ k.x ^ k.y);",
            "var x = vec2<u32>(c.x + ks[0], c.y + ks[1]);",
            "for (var r = 0u; r < rounds; r++) {",
            "x.x = x.x + x.y;",
            "x.y = rotl(x.y, rot[r % 8u]);",
            "x.y = x.y ^ x.x;",
            "if ((r + 1u) % 4u == 0u) {",
            "let inject = (r + 1u) / 4u;",
            "x.x = x.x + ks[inject % 3u];",
            "x.y = x.y + ks[(inject + 1u) % 3u] + inject;",
            "return (x << (n & 31u)) | (x >> ((32u - n) & 31u));",
        ],
    );
    assert_has_lines(
        &src,
        &[
            "let idx = params.offset + gid.x;",
            "let c = vec2<u32>(ctr[2u * idx], ctr[2u * idx + 1u]);",
            "let k = vec2<u32>(key[0], key[1]);",
            "output[2u * idx] = r.x;",
            "output[2u * idx + 1u] = r.y;",
        ],
    );
}

#[test]
fn test_embedded_tables_match_cipher() {
    let cl = threefry_source(KernelDialect::OpenCl);
    assert_eq!(
        literal_list(&cl, "THREEFRY2X32_ROTATIONS[8] = {", '}'),
        THREEFRY2X32_ROTATIONS.to_vec()
    );
    assert_eq!(
        hex_literal_after(&cl, "#define SKEIN_KS_PARITY32 "),
        SKEIN_KS_PARITY32
    );

    let wgsl = threefry_source(KernelDialect::Wgsl);
    assert_eq!(
        literal_list(&wgsl, "array<u32, 8>(", ')'),
        THREEFRY2X32_ROTATIONS.to_vec()
    );
    assert_eq!(
        hex_literal_after(&wgsl, "const SKEIN_KS_PARITY32: u32 = "),
        SKEIN_KS_PARITY32
    );
}
