//! WGSL source for the Threefry-2x32 kernel
//!
//! WGSL has no scalar kernel arguments, so `offset`, `count` and `rounds`
//! travel in a uniform block bound after the three storage buffers.

use super::{ENTRY_POINT, rotation_literals};
use crate::cipher::{Rounds, SKEIN_KS_PARITY32};

/// Synthesize WGSL source for the Threefry-2x32 kernel
pub fn wgsl_source(workgroup_size: u32) -> String {
    format!(
        r#"const THREEFRY2X32_ROTATIONS: array<u32, 8> = array<u32, 8>({rotations});
const SKEIN_KS_PARITY32: u32 = {parity:#010x}u;
const THREEFRY2X32_MAX_ROUNDS: u32 = {max_rounds}u;

struct ThreeFryParams {{
    offset: u32,
    count: u32,
    rounds: u32,
    _pad0: u32,
}}

@group(0) @binding(0) var<storage, read> ctr: array<u32>;
@group(0) @binding(1) var<storage, read> key: array<u32>;
@group(0) @binding(2) var<storage, read_write> output: array<u32>;
@group(0) @binding(3) var<uniform> params: ThreeFryParams;

fn rotl(x: u32, n: u32) -> u32 {{
    return (x << (n & 31u)) | (x >> ((32u - n) & 31u));
}}

fn threefry2x32(c: vec2<u32>, k: vec2<u32>, rounds: u32) -> vec2<u32> {{
    var rot = THREEFRY2X32_ROTATIONS;
    var ks = array<u32, 3>(k.x, k.y, SKEIN_KS_PARITY32 ^ k.x ^ k.y);
    var x = vec2<u32>(c.x + ks[0], c.y + ks[1]);
    for (var r = 0u; r < rounds; r++) {{
        x.x = x.x + x.y;
        x.y = rotl(x.y, rot[r % 8u]);
        x.y = x.y ^ x.x;
        if ((r + 1u) % 4u == 0u) {{
            let inject = (r + 1u) / 4u;
            x.x = x.x + ks[inject % 3u];
            x.y = x.y + ks[(inject + 1u) % 3u] + inject;
        }}
    }}
    return x;
}}

@compute @workgroup_size({workgroup_size})
fn {entry}(@builtin(global_invocation_id) gid: vec3<u32>) {{
    if (gid.x >= params.count || params.rounds > THREEFRY2X32_MAX_ROUNDS) {{
        return;
    }}
    let idx = params.offset + gid.x;
    let c = vec2<u32>(ctr[2u * idx], ctr[2u * idx + 1u]);
    let k = vec2<u32>(key[0], key[1]);
    let r = threefry2x32(c, k, params.rounds);
    output[2u * idx] = r.x;
    output[2u * idx + 1u] = r.y;
}}
"#,
        rotations = rotation_literals(),
        parity = SKEIN_KS_PARITY32,
        max_rounds = Rounds::MAX.get(),
        workgroup_size = workgroup_size,
        entry = ENTRY_POINT,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embeds_constants() {
        let src = wgsl_source(64);
        assert!(src.contains("0x1bd11bdau"));
        assert!(src.contains("array<u32, 8>(13u, 15u, 26u, 6u, 17u, 29u, 16u, 24u)"));
        assert!(src.contains("@workgroup_size(64)"));
        assert!(src.contains("var<uniform> params: ThreeFryParams"));
    }
}
