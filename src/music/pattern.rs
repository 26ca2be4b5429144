// Euclidean onset patterns via the bucket method: walking the steps while
// accumulating `pulses` per slot spreads the onsets as evenly as possible
// without the recursive Bjorklund bookkeeping.

pub fn euclidean(pulses: usize, steps: usize) -> Vec<bool> {
    let mut pattern = Vec::with_capacity(steps);
    let mut bucket = 0;
    for _ in 0..steps {
        bucket += pulses;
        if bucket >= steps {
            bucket -= steps;
            pattern.push(true);
        } else {
            pattern.push(false);
        }
    }
    pattern
}

// cyclic left rotation, so the same pulse spacing lands on different
// downbeats from seed to seed
pub fn rotate_left(pattern: &[bool], offset: usize) -> Vec<bool> {
    if pattern.is_empty() {
        return Vec::new();
    }
    let offset = offset % pattern.len();
    let mut out = Vec::with_capacity(pattern.len());
    out.extend_from_slice(&pattern[offset..]);
    out.extend_from_slice(&pattern[..offset]);
    out
}
