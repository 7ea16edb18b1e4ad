/// Big-endian key encoding for the numbered write workload.
pub fn kv(i: u64) -> Vec<u8> {
    i.to_be_bytes().to_vec()
}

/// Inverse of [`kv`]; short inputs are treated as left-padded with
/// zeros.
pub fn vk(v: &[u8]) -> u64 {
    let mut padded = [0u8; 8];
    let len = v.len().min(8);
    padded[8 - len..].copy_from_slice(&v[..len]);
    u64::from_be_bytes(padded)
}

/// size in bytes
pub fn value_with_size(size_in_bytes: usize) -> Vec<u8> {
    vec![0; size_in_bytes]
}
