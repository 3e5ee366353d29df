//! OpenCL C source for the Threefry-2x32 kernel

use super::{ENTRY_POINT, rotation_literals};
use crate::cipher::{Rounds, SKEIN_KS_PARITY32};

/// Synthesize OpenCL C source for the Threefry-2x32 kernel
pub fn opencl_source() -> String {
    format!(
        r#"#define THREEFRY2X32_DEFAULT_ROUNDS {default_rounds}u
#define THREEFRY2X32_MAX_ROUNDS {max_rounds}u
#define SKEIN_KS_PARITY32 {parity:#010X}u

__constant uint THREEFRY2X32_ROTATIONS[8] = {{ {rotations} }};

inline uint rotl32(uint x, uint n)
{{
    return (x << (n & 31u)) | (x >> ((32u - n) & 31u));
}}

inline uint2 threefry2x32(uint2 ctr, uint2 key, uint rounds)
{{
    uint ks[3];
    ks[0] = key.x;
    ks[1] = key.y;
    ks[2] = SKEIN_KS_PARITY32 ^ key.x ^ key.y;

    uint2 x = (uint2)(ctr.x + ks[0], ctr.y + ks[1]);
    for (uint r = 0u; r < rounds; r++) {{
        x.x += x.y;
        x.y = rotl32(x.y, THREEFRY2X32_ROTATIONS[r & 7u]);
        x.y ^= x.x;
        if (((r + 1u) & 3u) == 0u) {{
            uint inject = (r + 1u) >> 2;
            x.x += ks[inject % 3u];
            x.y += ks[(inject + 1u) % 3u] + inject;
        }}
    }}
    return x;
}}

__kernel void {entry}(__global const uint *ctr,
                      __global const uint *key,
                      __global uint *out,
                      const uint offset,
                      const uint count,
                      const uint rounds)
{{
    const uint gid = get_global_id(0);
    if (gid >= count || rounds > THREEFRY2X32_MAX_ROUNDS) {{
        return;
    }}
    const uint idx = offset + gid;
    const uint2 c = (uint2)(ctr[2u * idx], ctr[2u * idx + 1u]);
    const uint2 k = (uint2)(key[0], key[1]);
    const uint2 r = threefry2x32(c, k, rounds);
    out[2u * idx] = r.x;
    out[2u * idx + 1u] = r.y;
}}
"#,
        default_rounds = Rounds::DEFAULT.get(),
        max_rounds = Rounds::MAX.get(),
        parity = SKEIN_KS_PARITY32,
        rotations = rotation_literals(),
        entry = ENTRY_POINT,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_braces_balanced() {
        let src = opencl_source();
        let open = src.matches('{').count();
        let close = src.matches('}').count();
        assert_eq!(open, close);
    }
}
